//! Tool-presence probe
//!
//! Only consulted after a failed run, to tell "ktlint is not installed" apart
//! from "ktlint ran and rejected the input".

use std::path::{Path, PathBuf};
use std::process::Stdio;

use log::debug;
use tokio::process::Command;

use super::command::posix_quote;
use crate::config::FormatterConfig;
use crate::platform::Platform;

/// Whether the formatter can be found on `platform`
///
/// Windows checks that the jar exists. POSIX asks the shell with
/// `command -v`. Both resolve relative paths against `working_dir`, where the
/// formatter command runs.
pub async fn tool_available(
    platform: Platform,
    config: &FormatterConfig,
    working_dir: Option<&Path>,
) -> bool {
    match platform {
        Platform::Windows => {
            let jar = resolve_jar(&config.jar_path(), working_dir);
            let found = jar.exists();
            debug!("Probe for {}: {}", jar.display(), found);
            found
        }
        Platform::Posix => {
            let executable = config.executable();
            let mut command = Command::new("sh");
            command
                .arg("-c")
                .arg(format!("command -v {}", posix_quote(&executable)))
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null());
            // Same directory the formatter runs in, so relative paths agree
            if let Some(dir) = working_dir.filter(|dir| dir.is_dir()) {
                command.current_dir(dir);
            }
            let status = command.status().await;
            let found = status.is_ok_and(|s| s.success());
            debug!("Probe for {}: {}", executable, found);
            found
        }
    }
}

fn resolve_jar(jar: &Path, working_dir: Option<&Path>) -> PathBuf {
    match working_dir {
        Some(dir) if jar.is_relative() => dir.join(jar),
        _ => jar.to_path_buf(),
    }
}
