//! `unexport` - list exported Go symbols or print gorename commands that
//! unexport them.

use clap::Parser;
use go_unexport::unexport::providers::{GoSourceProvider, GoTool};
use go_unexport::unexport::render::{rename_command, write_rows};
use go_unexport::unexport::{ConfigurationError, RunError, UnexportPipeline, DEFAULT_CONCURRENCY};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "unexport", version, about = "Unexport Go symbols with gorename")]
struct Cli {
    /// List names (CSV)
    #[arg(short = 'l', long, conflicts_with = "run")]
    list: bool,

    /// Print gorename commands for every non-blacklisted name
    #[arg(short = 'r', long)]
    run: bool,

    /// Package pattern to operate on
    #[arg(short = 'p', long, default_value = "./...")]
    package: String,

    /// CSV of items to blacklist (package,receiver,name)
    #[arg(short = 'b', long)]
    blacklist: Option<PathBuf>,

    /// Packages extracted concurrently
    #[arg(short = 'j', long, env = "UNEXPORT_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Go tool used to enumerate and locate packages
    #[arg(long = "go", env = "GO", default_value = "go")]
    go_binary: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

enum Mode {
    List,
    Run,
}

impl Cli {
    fn mode(&self) -> Result<Mode, ConfigurationError> {
        match (self.list, self.run) {
            (true, _) => Ok(Mode::List),
            (false, true) => Ok(Mode::Run),
            (false, false) => Err(ConfigurationError::MissingMode),
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn execute(cli: Cli) -> Result<(), RunError> {
    let mode = cli.mode()?;

    info!("Package: {}", cli.package);
    if let Some(blacklist) = &cli.blacklist {
        info!("Blacklist: {}", blacklist.display());
    }

    let tool = GoTool::new(&cli.go_binary);
    let provider = GoSourceProvider::new().with_go_binary(&cli.go_binary);
    let pipeline = UnexportPipeline::new(Arc::new(provider)).with_concurrency(cli.concurrency);
    let packages = pipeline.enumerate(&tool, &cli.package).await?;

    let stdout = std::io::stdout();
    match mode {
        Mode::List => {
            let result = pipeline.list(&packages).await;
            write_rows(stdout.lock(), &result.symbols)?;
        }
        Mode::Run => {
            let result = pipeline.run(&packages, cli.blacklist.as_deref()).await?;
            let mut out = stdout.lock();
            for symbol in &result.symbols {
                writeln!(out, "{}", rename_command(symbol))?;
            }
            out.flush()?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
