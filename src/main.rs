//! availgraph - Host Availability Grapher
//!
//! Pings a set of hosts, records latency and availability in an rrdtool
//! database and publishes graphs as static HTML. Run it once a minute.

mod command;
mod config;
mod db;
mod probe;
mod report;
mod scheduler;

use config::{RunConfig, DEFAULT_CONFIG_NAME};

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Full documentation, printed by `--comments`.
const DOCUMENTATION: &str = include_str!("../README.md");

/// Host Availability Grapher: ping hosts and graph the results with rrdtool
#[derive(Parser, Debug)]
#[command(
    name = "availgraph",
    version,
    arg_required_else_help = true,
    after_help = "Example:\n  availgraph -D /var/lib/availgraph -H /var/www/html/graphs"
)]
struct Cli {
    /// Turn on debugging output
    #[arg(short = 'd', long)]
    debug: bool,

    /// Display the full documentation and exit
    #[arg(short = 'c', long)]
    comments: bool,

    /// Config file name, `.json` appended if missing (placed in the data directory)
    #[arg(short = 'C', long = "conf", default_value = DEFAULT_CONFIG_NAME)]
    conf: String,

    /// Directory for the config and database files
    #[arg(short = 'D', long = "data", required_unless_present = "comments")]
    data: Option<PathBuf>,

    /// Directory for HTML pages and graphs
    #[arg(short = 'H', long = "html", required_unless_present = "comments")]
    html: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    if cli.comments {
        print!("{}", DOCUMENTATION);
        return Ok(());
    }

    let (Some(data), Some(html)) = (cli.data, cli.html) else {
        return Err("--data and --html are required".into());
    };

    let cfg = RunConfig::new(&data, &html, &cli.conf, cli.debug).with_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(cfg.log_directive().parse()?))
        .init();

    tracing::debug!("{:?}", cfg);

    let states = scheduler::run_cycle(&cfg).await?;
    if !states.is_empty() {
        tracing::info!("Cycle complete for {} targets", states.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_requires_directories() {
        assert!(Cli::try_parse_from(["availgraph", "-d"]).is_err());
        assert!(Cli::try_parse_from(["availgraph", "-D", "/data"]).is_err());

        let cli = Cli::try_parse_from(["availgraph", "-D", "/data", "-H", "/html", "-C", "lab"]).unwrap();
        assert_eq!(cli.conf, "lab");
        assert_eq!(cli.data, Some(PathBuf::from("/data")));
        assert!(!cli.debug);
    }

    #[test]
    fn test_cli_comments_alone() {
        let cli = Cli::try_parse_from(["availgraph", "--comments"]).unwrap();
        assert!(cli.comments);
        assert!(cli.data.is_none());
    }

    #[test]
    fn test_cli_no_arguments_shows_help() {
        let err = Cli::try_parse_from(["availgraph"]).unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }
}
