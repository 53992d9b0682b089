// Command-line entry point for PyFlow Bridge.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

use pyflow_bridge::config::{BridgeConfig, ConfigOverrides};
use pyflow_bridge::infrastructure::init_logging;
use pyflow_bridge::FlowchartService;

const DEMO_SNIPPET: &str = "x = 5
y = 10
while x != y:
    if x > y:
        x = x - y
    else:
        y = y - x

assert x == y
print(x)
";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Python source file to analyze (reads stdin when omitted)
    #[arg(short, long, conflicts_with = "demo")]
    input: Option<PathBuf>,

    /// Analyze a built-in example snippet
    #[arg(long)]
    demo: bool,

    /// Write the flowchart here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Python interpreter to use
    #[arg(long)]
    python: Option<PathBuf>,

    /// Package providing the flowchart analysis
    #[arg(long)]
    package: Option<String>,

    /// Package index used for installs
    #[arg(long)]
    index_url: Option<String>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

async fn read_snippet(cli: &Cli) -> Result<String> {
    if cli.demo {
        return Ok(DEMO_SNIPPET.to_string());
    }
    match &cli.input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Cannot read input file: {}", path.display())),
        None => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("Cannot read snippet from stdin")?;
            Ok(buf)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = BridgeConfig::load_or_default(cli.config.as_deref())?.apply_overrides(
        ConfigOverrides {
            python: cli.python.clone(),
            package: cli.package.clone(),
            index_url: cli.index_url.clone(),
        },
    );

    let service = FlowchartService::from_config(&config);
    // Overlap runtime setup with reading the input; errors resurface in analyze.
    let _preload = service.runtime().spawn_preload();

    let snippet = read_snippet(&cli).await?;
    if snippet.trim().is_empty() {
        warn!("snippet is empty");
    }

    let flowchart = service.analyze(&snippet).await?;

    match &cli.output {
        Some(path) => {
            fs::write(path, &flowchart)
                .with_context(|| format!("Cannot write output file: {}", path.display()))?;
            info!(path = %path.display(), "flowchart written");
        }
        None => println!("{}", flowchart),
    }
    Ok(())
}
