//! Formatter configuration

use std::path::PathBuf;
use std::time::Duration;

/// File name searched for by the config locator unless told otherwise
pub const DEFAULT_CONFIG_FILE_NAME: &str = ".editorconfig";

/// Options controlling how ktlint is found and invoked
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Executable looked up on `PATH` when no override is set (default: `ktlint`)
    pub tool_name: String,

    /// Explicit path to the tool: an executable on POSIX, a jar on Windows
    pub tool_path: Option<PathBuf>,

    /// Jar used on Windows when no override is set (default: `.\ktlint`)
    pub default_jar_path: PathBuf,

    /// Launcher for the jar on Windows (default: `java`)
    pub java_launcher: String,

    /// Flag that introduces the configuration file path
    pub config_flag: String,

    /// Arguments that make the tool read stdin and print the formatted text
    pub tool_args: Vec<String>,

    /// Token at which the tool's own diagnostics begin in its error output
    pub stdin_marker: String,

    /// Upper bound on how long the tool may run. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            tool_name: "ktlint".to_string(),
            tool_path: None,
            default_jar_path: PathBuf::from(".\\ktlint"),
            java_launcher: "java".to_string(),
            config_flag: "--editorconfig".to_string(),
            tool_args: vec!["--stdin".to_string(), "-F".to_string()],
            stdin_marker: "<stdin>".to_string(),
            timeout: None,
        }
    }
}

impl FormatterConfig {
    /// Program run by the POSIX command: the override if set, else the tool name
    pub fn executable(&self) -> String {
        match &self.tool_path {
            Some(path) => path.display().to_string(),
            None => self.tool_name.clone(),
        }
    }

    /// Anchor a relative tool override at the current directory
    ///
    /// The formatter runs in the document's directory, so a path like
    /// `./bin/ktlint` must be resolved before that. Bare names are left alone
    /// for the shell's `PATH` lookup.
    pub fn with_absolute_tool_path(mut self) -> Self {
        if let Some(path) = &self.tool_path
            && path.is_relative()
            && path.parent().is_some_and(|p| !p.as_os_str().is_empty())
            && let Ok(absolute) = std::path::absolute(path)
        {
            self.tool_path = Some(absolute);
        }
        self
    }

    /// Jar run by the Windows command: the override if set, else the default jar
    pub fn jar_path(&self) -> PathBuf {
        self.tool_path
            .clone()
            .unwrap_or_else(|| self.default_jar_path.clone())
    }
}
