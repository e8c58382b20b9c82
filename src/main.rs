use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use jsplens::cli::commands::analyze::AnalyzeOptions;

#[derive(Parser)]
#[command(name = "jsplens")]
#[command(
    version,
    about = "Static structure, include-graph and complexity analyzer for JSP codebases"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a project tree and write reports
    Analyze {
        #[arg(help = "Project root (default: current directory)")]
        path: Option<PathBuf>,
        #[arg(long, short, help = "Output directory for reports (default: ./output)")]
        output: Option<PathBuf>,
        #[arg(long, short, help = "Report file name prefix")]
        prefix: Option<String>,
        #[arg(
            long,
            short,
            value_delimiter = ',',
            num_args = 1..,
            help = "Report formats: json, markdown, dot, all"
        )]
        format: Vec<String>,
        #[arg(long, help = "Analyze files one at a time")]
        sequential: bool,
        #[arg(long, help = "Use pattern extraction for forms and custom tags")]
        no_markup_parser: bool,
        #[arg(long, help = "Use pattern scoring for scriptlets")]
        no_script_parser: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(help = "Project root (default: current directory)")]
        path: Option<PathBuf>,
        #[arg(
            short = 'f',
            long,
            default_value = "toml",
            help = "Output format: toml, json"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path {
        #[arg(help = "Project root (default: current directory)")]
        path: Option<PathBuf>,
    },
    /// Write a project configuration file with the defaults
    Init {
        #[arg(help = "Project root (default: current directory)")]
        path: Option<PathBuf>,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n\x1b[1;31m━━━ PANIC ━━━\x1b[0m");
        eprintln!("\x1b[31mjsplens encountered an unexpected error:\x1b[0m");
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "\x1b[90mLocation: {}:{}:{}\x1b[0m",
                location.file(),
                location.line(),
                location.column()
            );
        }
        eprintln!();

        // Call default hook for backtrace (if RUST_BACKTRACE=1)
        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError:\x1b[0m {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Analyze {
            path,
            output,
            prefix,
            format,
            sequential,
            no_markup_parser,
            no_script_parser,
        } => {
            jsplens::cli::commands::analyze::run(AnalyzeOptions {
                path,
                output,
                prefix,
                formats: format,
                sequential,
                no_markup_parser,
                no_script_parser,
                quiet: cli.quiet,
            })?;
        }

        Commands::Config { action } => match action {
            ConfigAction::Show { path, format } => {
                jsplens::cli::commands::config::show(path, &format)?;
            }
            ConfigAction::Path { path } => {
                jsplens::cli::commands::config::path(path)?;
            }
            ConfigAction::Init { path, force } => {
                jsplens::cli::commands::config::init(path, force)?;
            }
        },
    }

    Ok(())
}
