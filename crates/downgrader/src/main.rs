use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use downgrader::commands::check::CheckResult;
use downgrader::commands::downgrade::{DowngradeError, DowngradeOptions};
use downgrader::config::Config;
use downgrader::report;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "downgrader")]
#[command(about = "Downgrade a game install to a prior revision")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a config file (defaults to the per-user config)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a downgraded copy of a game install
    Downgrade(DowngradeArgs),
    /// Apply a single patch file
    PatchFile {
        /// Original file
        source: PathBuf,
        /// Patch payload
        patch: PathBuf,
        /// Path to write the patched file to
        output: PathBuf,
        #[arg(long)]
        cache_dir: Option<PathBuf>,
        #[arg(long)]
        work_dir: Option<PathBuf>,
    },
    /// Manifest operations
    Manifest {
        #[command(subcommand)]
        command: ManifestCommands,
    },
    /// Hash-related operations
    Hash {
        #[command(subcommand)]
        command: HashCommands,
    },
}

#[derive(clap::Args, Debug)]
struct DowngradeArgs {
    /// Game install directory
    #[arg(long)]
    source: PathBuf,
    /// Empty directory to build the downgraded install in
    #[arg(long)]
    output: PathBuf,
    /// Local manifest file (skips the catalog)
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Manifest URL template with {locale} and {language} placeholders
    #[arg(long)]
    catalog_url: Option<String>,
    #[arg(long)]
    language: Option<String>,
    #[arg(long)]
    locale: Option<String>,
    /// Keep downloaded patches in the cache
    #[arg(long)]
    keep_patches: bool,
    #[arg(long)]
    cache_dir: Option<PathBuf>,
    #[arg(long)]
    work_dir: Option<PathBuf>,
}

impl From<DowngradeArgs> for DowngradeOptions {
    fn from(args: DowngradeArgs) -> Self {
        DowngradeOptions {
            source: args.source,
            output: args.output,
            manifest: args.manifest,
            catalog_url: args.catalog_url,
            language: args.language,
            locale: args.locale,
            keep_patches: args.keep_patches,
            cache_dir: args.cache_dir,
            work_dir: args.work_dir,
        }
    }
}

#[derive(Subcommand)]
enum ManifestCommands {
    /// Summarise a manifest file
    Info {
        /// Manifest file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum HashCommands {
    /// Calculate the SHA-256 hash of a file
    Calculate {
        /// File to hash
        file: PathBuf,
    },
    /// Check if a file matches a SHA-256 hash
    Check {
        /// Hash to reference
        hash: String,
        /// File to compare
        file: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Config {
    match Config::resolve(path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: failed to load config: {}", e);
            process::exit(2);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Downgrade(args) => {
            let config = load_config(cli.config.as_deref());
            let options = DowngradeOptions::from(args);
            let result = downgrader::commands::downgrade::run(&options, &config, |event| {
                if let Some(line) = report::format_event(event) {
                    println!("{}", line);
                }
            });
            match result {
                Ok(summary) => {
                    for line in report::summary_lines(&summary) {
                        println!("{}", line);
                    }
                }
                Err(DowngradeError::Pipeline(e)) => {
                    eprintln!("{}", e.user_message());
                    process::exit(1);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(2);
                }
            }
        }
        Commands::PatchFile {
            source,
            patch,
            output,
            cache_dir,
            work_dir,
        } => {
            let config = load_config(cli.config.as_deref());
            let result = downgrader::commands::patch_file::run(
                &source,
                &patch,
                &output,
                cache_dir,
                work_dir,
                &config,
                |event| {
                    if let Some(line) = report::format_event(event) {
                        println!("{}", line);
                    }
                },
            );
            match result {
                Ok(_) => {
                    println!("Output written to {}", output.display());
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    process::exit(1);
                }
            }
        }
        Commands::Manifest { command } => match command {
            ManifestCommands::Info { file } => {
                match downgrader::commands::manifest_info::run(&file) {
                    Ok(info) => {
                        for line in downgrader::commands::manifest_info::describe(&info) {
                            println!("{}", line);
                        }
                    }
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(2);
                    }
                }
            }
        },
        Commands::Hash { command } => match command {
            HashCommands::Calculate { file } => {
                match downgrader::commands::calculate::run(&file) {
                    Ok(result) => {
                        println!("Hash for file {}: {}", file.display(), result);
                    }
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(2);
                    }
                }
            }
            HashCommands::Check { hash, file } => {
                match downgrader::commands::check::run(&hash, &file) {
                    Ok(result) => match result {
                        CheckResult::Match => {
                            println!("Hash match");
                        }
                        CheckResult::NoMatch { actual } => {
                            println!("Hashes differ");
                            println!("Expected hash: {}", hash);
                            println!("Actual hash: {}", actual);
                            process::exit(1);
                        }
                    },
                    Err(e) => {
                        eprintln!("Error: {}", e);
                        process::exit(2);
                    }
                }
            }
        },
    }
}
