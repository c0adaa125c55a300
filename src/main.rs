use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "markflow", version, about)]
struct Args {
    /// The path to the configuration file
    #[arg(short, long, global = true)]
    config_file: Option<PathBuf>,

    /// Log at info level (otherwise RUST_LOG applies)
    #[arg(short, long, global = true, default_value = "false")]
    verbose: bool,

    /// The command to execute
    #[command(subcommand)]
    command: MarkflowCommand,
}

#[derive(Parser)]
struct RenderArgs {
    /// Markdown files to render
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Sanitize the output regardless of the configuration file
    #[arg(short, long, default_value = "false")]
    sanitize: bool,
}

#[derive(Parser)]
struct BuildArgs {
    /// The directory containing the pages
    #[arg(default_value = ".")]
    input: PathBuf,

    /// The directory to write the HTML to
    #[arg(short, long, default_value = "_site")]
    output: PathBuf,

    /// A Tera template wrapping every page
    #[arg(short, long)]
    layout: Option<PathBuf>,
}

#[derive(Subcommand)]
enum MarkflowCommand {
    /// Render markdown files and print the HTML
    Render(RenderArgs),

    /// Render every page in a directory to an output directory
    Build(BuildArgs),
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_file = args.config_file.as_deref();
    match args.command {
        MarkflowCommand::Render(args) => {
            commands::render::run(&args, config_file).await?;
        }
        MarkflowCommand::Build(args) => {
            commands::build::run(&args, config_file).await?;
        }
    }

    Ok(())
}
