//! Platform families the formatter command is built for

/// Shell family used to run the formatter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// `sh` with here-documents
    Posix,
    /// `cmd.exe`, with ktlint shipped as a jar
    Windows,
}

impl Platform {
    /// Platform of the running process
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    /// What to tell the user when ktlint cannot be found
    pub fn install_guidance(self) -> &'static str {
        match self {
            Platform::Windows => {
                "You don't have ktlint in your project root or your ktlint path is set up incorrectly. \
                 Go to https://github.com/pinterest/ktlint/releases to download the latest jar"
            }
            Platform::Posix => {
                "You don't have ktlint installed, go to https://github.com/pinterest/ktlint#installation \
                 and follow the instructions for your OS"
            }
        }
    }
}
