//! Construction of the shell command that pipes a document into ktlint

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use sha2::{Digest, Sha256};
use tokio::process::Command;

use crate::config::FormatterConfig;
use crate::document::SourceDocument;
use crate::platform::Platform;

/// A fully built formatter command for one platform family
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatCommand {
    /// `sh` reading the script, the text in a here-document, from stdin
    Posix {
        script: String,
        working_dir: Option<PathBuf>,
        /// The here-document added a final newline the text did not have
        appended_newline: bool,
    },
    /// `cmd /C` with the text replayed through a chain of `echo` statements
    Windows {
        script: String,
        working_dir: Option<PathBuf>,
        /// Terminator the source text uses; `echo.` always emits `\r\n`
        line_ending: &'static str,
        /// The source text ended with a terminator
        final_newline: bool,
    },
}

impl FormatCommand {
    pub fn build(
        platform: Platform,
        doc: &SourceDocument,
        config_path: Option<&Path>,
        config: &FormatterConfig,
    ) -> Self {
        match platform {
            Platform::Posix => Self::posix(doc, config_path, config),
            Platform::Windows => Self::windows(doc, config_path, config),
        }
    }

    pub fn posix(
        doc: &SourceDocument,
        config_path: Option<&Path>,
        config: &FormatterConfig,
    ) -> Self {
        let text = doc.text();
        let delimiter = delimiter_for(text);

        let mut script = format!(
            "cat <<'{}' | {}",
            delimiter,
            posix_quote(&config.executable())
        );
        if let Some(path) = config_path {
            script.push(' ');
            script.push_str(&config.config_flag);
            script.push(' ');
            script.push_str(&posix_quote(&path.display().to_string()));
        }
        for arg in &config.tool_args {
            script.push(' ');
            script.push_str(&posix_quote(arg));
        }
        script.push('\n');
        script.push_str(text);

        let appended_newline = !text.ends_with('\n');
        if appended_newline {
            script.push('\n');
        }
        script.push_str(&delimiter);
        script.push('\n');

        FormatCommand::Posix {
            script,
            working_dir: doc.working_dir().map(Path::to_path_buf),
            appended_newline,
        }
    }

    pub fn windows(
        doc: &SourceDocument,
        config_path: Option<&Path>,
        config: &FormatterConfig,
    ) -> Self {
        let working_dir = doc.working_dir().map(Path::to_path_buf);

        let mut script = String::new();
        if let Some(dir) = &working_dir {
            script.push_str(&format!("cd /d \"{}\" & ", dir.display()));
        }

        let lines = split_lines(doc.text());
        let chain = if lines.is_empty() {
            "type nul".to_string()
        } else {
            lines
                .iter()
                .map(|line| echo_statement(line))
                .collect::<Vec<_>>()
                .join(" & ")
        };

        script.push_str(&format!(
            "( {} ) | {} -jar {}",
            chain,
            config.java_launcher,
            cmd_quote(&config.jar_path().display().to_string())
        ));
        if let Some(path) = config_path {
            script.push_str(&format!(" {} \"{}\"", config.config_flag, path.display()));
        }
        for arg in &config.tool_args {
            script.push(' ');
            script.push_str(arg);
        }

        let text = doc.text();
        FormatCommand::Windows {
            script,
            working_dir,
            line_ending: line_ending_of(text),
            final_newline: text.ends_with(['\r', '\n']),
        }
    }

    /// Shell program that runs the script
    pub fn program(&self) -> &'static str {
        match self {
            FormatCommand::Posix { .. } => "sh",
            FormatCommand::Windows { .. } => "cmd",
        }
    }

    pub fn script(&self) -> &str {
        match self {
            FormatCommand::Posix { script, .. } | FormatCommand::Windows { script, .. } => script,
        }
    }

    pub fn working_dir(&self) -> Option<&Path> {
        match self {
            FormatCommand::Posix { working_dir, .. }
            | FormatCommand::Windows { working_dir, .. } => working_dir.as_deref(),
        }
    }

    /// Script fed to the shell's stdin, if the shell reads it from there
    pub fn stdin_script(&self) -> Option<&str> {
        match self {
            FormatCommand::Posix { script, .. } => Some(script),
            FormatCommand::Windows { .. } => None,
        }
    }

    /// Undo framing the command added to the text
    ///
    /// POSIX drops the newline the here-document appended. Windows rewrites the
    /// `\r\n` terminators of the echo chain back to the source's style and
    /// final-newline state.
    pub fn restore(&self, mut output: String) -> String {
        match self {
            FormatCommand::Posix {
                appended_newline, ..
            } => {
                if *appended_newline && output.ends_with('\n') {
                    output.pop();
                }
                output
            }
            FormatCommand::Windows {
                line_ending,
                final_newline,
                ..
            } => {
                let lines = split_lines(&output);
                if lines.is_empty() {
                    return String::new();
                }
                let mut restored = lines.join(line_ending);
                if *final_newline {
                    restored.push_str(line_ending);
                }
                restored
            }
        }
    }

    /// Child process for this command, with stdout and stderr captured
    pub(crate) fn to_command(&self) -> Command {
        let mut command = Command::new(self.program());
        match self {
            FormatCommand::Posix { .. } => {
                command.arg("-s").stdin(Stdio::piped());
            }
            FormatCommand::Windows { script, .. } => {
                push_cmd_script(&mut command, script);
                command.stdin(Stdio::null());
            }
        }
        if let Some(dir) = self.working_dir().filter(|dir| dir.is_dir()) {
            command.current_dir(dir);
        }
        command
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[cfg(windows)]
fn push_cmd_script(command: &mut Command, script: &str) {
    // cmd.exe does its own parsing; Rust's argument quoting would break it
    command.arg("/C").raw_arg(script);
}

#[cfg(not(windows))]
fn push_cmd_script(command: &mut Command, script: &str) {
    command.arg("/C").arg(script);
}

/// Here-document terminator that does not occur anywhere in `text`
///
/// The SHA-256 hex digest of the text, re-salted in the unlikely case the
/// digest appears in the text itself.
pub fn delimiter_for(text: &str) -> String {
    let mut salt = 0u64;
    loop {
        let mut hasher = Sha256::new();
        hasher.update(text.as_bytes());
        if salt > 0 {
            hasher.update(salt.to_le_bytes());
        }
        let delimiter = hex::encode(hasher.finalize());
        if !text.contains(&delimiter) {
            return delimiter;
        }
        salt += 1;
    }
}

/// Split text into lines, treating `\r\n`, `\n` and `\r` each as one terminator
///
/// A trailing terminator does not produce an empty last line. Blank lines in
/// the middle are kept.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while !rest.is_empty() {
        match rest.find(['\r', '\n']) {
            Some(idx) => {
                lines.push(&rest[..idx]);
                let width = if rest[idx..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[idx + width..];
            }
            None => {
                lines.push(rest);
                break;
            }
        }
    }
    lines
}

/// First line terminator in `text`, `\r\n` when there is none
fn line_ending_of(text: &str) -> &'static str {
    match text.find(['\r', '\n']) {
        Some(idx) if text[idx..].starts_with("\r\n") => "\r\n",
        Some(idx) if text[idx..].starts_with('\r') => "\r",
        Some(_) => "\n",
        None => "\r\n",
    }
}

/// One line of the Windows echo chain; blank lines emit just a newline
fn echo_statement(line: &str) -> String {
    if line.is_empty() {
        "echo.".to_string()
    } else {
        format!("echo|set /p=\"{}\" & echo.", line.replace('"', "\"\""))
    }
}

fn cmd_quote(value: &str) -> Cow<'_, str> {
    if value.contains(char::is_whitespace) {
        Cow::Owned(format!("\"{value}\""))
    } else {
        Cow::Borrowed(value)
    }
}

/// Quote a word for `sh`, leaving plain words untouched
pub(crate) fn posix_quote(value: &str) -> Cow<'_, str> {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if plain {
        Cow::Borrowed(value)
    } else {
        Cow::Owned(format!("'{}'", value.replace('\'', "'\\''")))
    }
}
