use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use log::{error, info};
use similar::{ChangeTag, TextDiff};

use kfmt_core::document::is_kotlin_path;
use kfmt_core::{
    ConfigLocator, DEFAULT_CONFIG_FILE_NAME, FormatError, FormatInvoker, FormatterConfig,
    Platform, SourceDocument,
};

#[derive(Parser)]
#[command(name = "kfmt")]
#[command(about = "Format Kotlin files with ktlint and the nearest .editorconfig", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    options: GlobalOptions,
}

#[derive(clap::Args)]
struct GlobalOptions {
    /// Path to the ktlint executable (or jar on Windows)
    #[arg(long, env = "KFMT_KTLINT_PATH", global = true)]
    ktlint_path: Option<PathBuf>,

    /// Name of the configuration file to look for
    #[arg(long, default_value = DEFAULT_CONFIG_FILE_NAME, global = true)]
    config_name: String,

    /// Give up on ktlint after this many seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Increase log output (-v: info, -vv: debug)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

impl GlobalOptions {
    fn formatter_config(&self) -> FormatterConfig {
        FormatterConfig {
            tool_path: self.ktlint_path.clone(),
            timeout: self.timeout.map(Duration::from_secs),
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Format Kotlin files
    Fmt {
        /// Path to a .kt/.kts file or a directory
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Check if files are formatted (don't modify)
        #[arg(long, short)]
        check: bool,

        /// Show diff of formatting changes
        #[arg(long)]
        diff: bool,

        /// Recursively format all Kotlin files in directory
        #[arg(long, short)]
        recursive: bool,
    },
    /// Print the configuration file that applies to a file
    Locate {
        /// Path to a source file
        file: PathBuf,
    },
    /// Check that ktlint can be found
    Doctor,
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.options.verbose);

    let options = &cli.options;
    let result = match cli.command {
        Commands::Fmt {
            path,
            check,
            diff,
            recursive,
        } => run_fmt(options, &path, check, diff, recursive).await,
        Commands::Locate { file } => run_locate(options, &file),
        Commands::Doctor => run_doctor(options).await,
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "kfmt", &mut io::stdout());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .init();
}

async fn run_fmt(
    options: &GlobalOptions,
    path: &Path,
    check: bool,
    show_diff: bool,
    recursive: bool,
) -> Result<(), String> {
    let invoker = FormatInvoker::new(options.formatter_config());
    let locator = ConfigLocator::new(&options.config_name);
    info!("Enabled kfmt");

    let probe_dir = if path.is_dir() {
        Some(path)
    } else {
        path.parent().filter(|p| !p.as_os_str().is_empty())
    };
    if !invoker.check_tool(probe_dir).await {
        return Err(Platform::current().install_guidance().to_string());
    }

    let files = if path.is_file() {
        vec![path.to_path_buf()]
    } else if recursive {
        find_kotlin_files_recursive(path)?
    } else {
        find_kotlin_files_in_dir(path)?
    };

    if files.is_empty() {
        println!("{}", "No Kotlin files found.".yellow());
        return Ok(());
    }

    let mut needs_formatting = Vec::new();
    let mut errors = Vec::new();

    for file in &files {
        let doc = SourceDocument::read(file)
            .map_err(|e| format!("Failed to read {}: {}", file.display(), e))?;
        let config_path = locator.locate(doc.path()).map_err(|e| e.to_string())?;

        match invoker.format(&doc, config_path.as_deref()).await {
            Ok(formatted) => {
                if doc.text() != formatted {
                    if show_diff {
                        print_diff(file, doc.text(), &formatted);
                    }

                    if !check {
                        fs::write(file, &formatted)
                            .map_err(|e| format!("Failed to write {}: {}", file.display(), e))?;
                        println!("{} {}", "Formatted:".green(), file.display());
                    }
                    needs_formatting.push(file.clone());
                }
            }
            Err(e @ FormatError::ToolMissing(_)) => return Err(e.to_string()),
            Err(e) => {
                errors.push((file.clone(), e.user_message()));
            }
        }
    }

    // Print summary
    if check {
        if needs_formatting.is_empty() && errors.is_empty() {
            println!("{}", "All files are properly formatted.".green());
            Ok(())
        } else {
            if !needs_formatting.is_empty() {
                println!("{}", "The following files need formatting:".yellow());
                for file in &needs_formatting {
                    println!("  {}", file.display());
                }
            }
            print_errors(&errors);
            Err("Some files are not properly formatted".to_string())
        }
    } else if !errors.is_empty() {
        print_errors(&errors);
        Err("Some files had formatting errors".to_string())
    } else {
        let count = needs_formatting.len();
        if count > 0 {
            println!("{}", format!("Formatted {} file(s).", count).green().bold());
        } else {
            println!("{}", "All files are already properly formatted.".green());
        }
        Ok(())
    }
}

fn print_errors(errors: &[(PathBuf, String)]) {
    for (file, err) in errors {
        error!("{}: {}", file.display(), err);
        eprintln!("{} {}: {}", "Error:".red(), file.display(), err);
    }
}

fn run_locate(options: &GlobalOptions, file: &Path) -> Result<(), String> {
    let locator = ConfigLocator::new(&options.config_name);
    match locator.locate(file).map_err(|e| e.to_string())? {
        Some(path) => println!("{}", path.display()),
        None => eprintln!(
            "{}",
            format!("No {} found for {}", options.config_name, file.display()).yellow()
        ),
    }
    Ok(())
}

async fn run_doctor(options: &GlobalOptions) -> Result<(), String> {
    let invoker = FormatInvoker::new(options.formatter_config());
    let cwd = std::env::current_dir().ok();
    if invoker.check_tool(cwd.as_deref()).await {
        let config = invoker.config();
        let tool = match Platform::current() {
            Platform::Windows => config.jar_path().display().to_string(),
            Platform::Posix => config.executable(),
        };
        println!("{} {}", "Found ktlint:".green(), tool);
        Ok(())
    } else {
        Err(Platform::current().install_guidance().to_string())
    }
}

fn find_kotlin_files_recursive(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let mut files = Vec::new();
    collect_kotlin_files_recursive(dir, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_kotlin_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), String> {
    let entries = fs::read_dir(dir)
        .map_err(|e| format!("Failed to read directory {}: {}", dir.display(), e))?;

    for entry in entries {
        let entry = entry.map_err(|e| e.to_string())?;
        let path = entry.path();
        // file_type does not follow symlinks, so linked directories are never entered
        let file_type = entry
            .file_type()
            .map_err(|e| format!("Failed to inspect {}: {}", path.display(), e))?;

        if file_type.is_dir() {
            // Skip hidden directories and build output
            let name = path.file_name().unwrap_or_default().to_string_lossy();
            if !name.starts_with('.')
                && !["build", "target", "node_modules"].contains(&name.as_ref())
            {
                collect_kotlin_files_recursive(&path, files)?;
            }
        } else if is_kotlin_path(&path) {
            files.push(path);
        }
    }

    Ok(())
}

fn find_kotlin_files_in_dir(dir: &Path) -> Result<Vec<PathBuf>, String> {
    let entries = fs::read_dir(dir)
        .map_err(|e| format!("Failed to read directory {}: {}", dir.display(), e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| e.to_string())?;
        let path = entry.path();
        if path.is_file() && is_kotlin_path(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn print_diff(file: &Path, original: &str, formatted: &str) {
    println!("\n{} {}:", "Diff for".cyan().bold(), file.display());

    let diff = TextDiff::from_lines(original, formatted);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-".red(),
            ChangeTag::Insert => "+".green(),
            ChangeTag::Equal => " ".normal(),
        };
        print!("{}{}", sign, change);
    }
}
