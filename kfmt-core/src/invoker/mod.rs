//! Format Invoker - Run ktlint over a document through standard input
//!
//! The document text is handed to the tool through a shell pipe: a
//! here-document on POSIX shells, a chain of `echo` statements on Windows.
//! The tool's stdout, minus its log lines, is the formatted text.
//!
//! When the run fails, a probe decides whether ktlint is missing altogether or
//! ran and reported a problem with the input.

mod command;
mod output;
mod probe;

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use log::{debug, error, info, trace};
use tokio::io::AsyncWriteExt;

pub use command::{FormatCommand, delimiter_for, split_lines};
pub use output::{extract_diagnostic, strip_log_lines};
pub use probe::tool_available;

use crate::config::FormatterConfig;
use crate::document::SourceDocument;
use crate::platform::Platform;

/// Kind of formatting failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatErrorKind {
    ToolMissing,
    ToolReportedError,
    ProcessFailure,
}

/// Formatting error
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// ktlint could not be found; carries installation guidance
    #[error("{0}")]
    ToolMissing(String),

    /// ktlint ran and rejected the input; carries its diagnostic
    #[error("{0}")]
    ToolReportedError(String),

    /// The process could not be run or its failure could not be classified
    #[error("Formatter process failed: {0}")]
    ProcessFailure(String),
}

impl FormatError {
    pub fn kind(&self) -> FormatErrorKind {
        match self {
            FormatError::ToolMissing(_) => FormatErrorKind::ToolMissing,
            FormatError::ToolReportedError(_) => FormatErrorKind::ToolReportedError,
            FormatError::ProcessFailure(_) => FormatErrorKind::ProcessFailure,
        }
    }

    /// Message for the user, tagged the way the output log shows errors
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        let message = message.trim();
        if message.is_empty() {
            "[ERROR]: Unknown error".to_string()
        } else {
            format!("[ERROR]: {message}")
        }
    }
}

/// Why a formatter run did not produce output
enum RunFailure {
    Exited(Output),
    Spawn(std::io::Error),
    TimedOut(Duration),
}

/// Runs ktlint over source documents
#[derive(Debug, Clone, Default)]
pub struct FormatInvoker {
    config: FormatterConfig,
}

impl FormatInvoker {
    /// Create an invoker; a relative tool override is resolved against the
    /// current directory here, before any command runs elsewhere
    pub fn new(config: FormatterConfig) -> Self {
        Self {
            config: config.with_absolute_tool_path(),
        }
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Build the command `format` would run on `platform`
    pub fn command_for(
        &self,
        platform: Platform,
        doc: &SourceDocument,
        config_path: Option<&Path>,
    ) -> FormatCommand {
        FormatCommand::build(platform, doc, config_path, &self.config)
    }

    /// Format a document, returning the new text
    ///
    /// `config_path` is passed to ktlint when present. The document is never
    /// modified.
    pub async fn format(
        &self,
        doc: &SourceDocument,
        config_path: Option<&Path>,
    ) -> Result<String, FormatError> {
        let platform = Platform::current();
        let command = self.command_for(platform, doc, config_path);
        trace!("Formatter script:\n{}", command.script());

        info!("Formatting file: {}", doc.path().display());
        let failure = match self.run(&command).await {
            Ok(output) if output.status.success() => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                return Ok(command.restore(strip_log_lines(&stdout)));
            }
            Ok(output) => RunFailure::Exited(output),
            Err(failure) => failure,
        };

        let err = self.classify(platform, doc, failure).await;
        error!("{}", err.user_message());
        Err(err)
    }

    /// Whether formatting would change the document
    pub async fn needs_format(
        &self,
        doc: &SourceDocument,
        config_path: Option<&Path>,
    ) -> Result<bool, FormatError> {
        let formatted = self.format(doc, config_path).await?;
        Ok(formatted != doc.text())
    }

    /// Whether ktlint can be found from `working_dir`
    pub async fn check_tool(&self, working_dir: Option<&Path>) -> bool {
        tool_available(Platform::current(), &self.config, working_dir).await
    }

    async fn run(&self, command: &FormatCommand) -> Result<Output, RunFailure> {
        let mut child = command.to_command().spawn().map_err(RunFailure::Spawn)?;

        // sh reads the whole here-document before starting the pipeline, so the
        // script is written out in full before any output is collected.
        let script = command.stdin_script().map(str::to_owned);
        let finished = async move {
            if let (Some(mut stdin), Some(script)) = (child.stdin.take(), script) {
                let written = async {
                    stdin.write_all(script.as_bytes()).await?;
                    stdin.shutdown().await
                };
                if let Err(err) = written.await {
                    // A shell that quits early closes the pipe; its exit status tells the rest
                    debug!("Failed to write formatter script: {}", err);
                }
            }
            child.wait_with_output().await.map_err(RunFailure::Spawn)
        };

        match self.config.timeout {
            Some(limit) => match tokio::time::timeout(limit, finished).await {
                Ok(result) => result,
                Err(_) => Err(RunFailure::TimedOut(limit)),
            },
            None => finished.await,
        }
    }

    async fn classify(
        &self,
        platform: Platform,
        doc: &SourceDocument,
        failure: RunFailure,
    ) -> FormatError {
        if !tool_available(platform, &self.config, doc.working_dir()).await {
            return FormatError::ToolMissing(platform.install_guidance().to_string());
        }

        match failure {
            RunFailure::Exited(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let stdout = String::from_utf8_lossy(&output.stdout);
                debug!("Formatter exited with {}", output.status);
                match extract_diagnostic(&stderr, &stdout, &self.config.stdin_marker) {
                    Some(diagnostic) => FormatError::ToolReportedError(diagnostic),
                    None => FormatError::ProcessFailure(format!(
                        "formatter exited with {} and no diagnostic",
                        output.status
                    )),
                }
            }
            RunFailure::Spawn(err) => FormatError::ProcessFailure(err.to_string()),
            RunFailure::TimedOut(limit) => FormatError::ProcessFailure(format!(
                "formatter did not finish within {:?}",
                limit
            )),
        }
    }
}
