//! kfmt Core
//!
//! Finds the `.editorconfig` that governs a Kotlin source file and runs ktlint
//! over the file's text through standard input.
//!
//! # Example
//!
//! ```no_run
//! use kfmt_core::{ConfigLocator, FormatInvoker, FormatterConfig, SourceDocument};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let doc = SourceDocument::read("src/main/kotlin/App.kt")?;
//! let config_path = ConfigLocator::default().locate(doc.path())?;
//!
//! let invoker = FormatInvoker::new(FormatterConfig::default());
//! let formatted = invoker.format(&doc, config_path.as_deref()).await?;
//! # let _ = formatted;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod invoker;
pub mod locator;
pub mod platform;

pub use config::{DEFAULT_CONFIG_FILE_NAME, FormatterConfig};
pub use document::SourceDocument;
pub use invoker::{FormatCommand, FormatError, FormatErrorKind, FormatInvoker};
pub use locator::{ConfigLocator, LocateError, locate};
pub use platform::Platform;
