use tracing_subscriber::EnvFilter;

use crate::cli::args::{Cli, Commands};
use crate::error::Result;
use crate::processors::{RainfallConfig, RainfallPipeline, SitesConfig, SitesPipeline};
use crate::remote::RemoteClient;

pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbosity);

    let client = RemoteClient::new()?;

    match cli.command {
        Commands::Sites {
            state,
            limit,
            filter,
            no_comments,
            no_header,
            outdata,
        } => {
            let config = SitesConfig {
                state,
                limit,
                filter,
                no_comments,
                no_header,
                outdata,
                verbosity: cli.verbosity,
            };
            SitesPipeline::new(config, client).run()?;
        }

        Commands::Rainfall {
            filter,
            limit,
            dry_run,
            no_comments,
            no_header,
            sites,
            outdata,
        } => {
            let config = RainfallConfig {
                filter,
                limit,
                dry_run,
                no_comments,
                no_header,
                sites,
                outdata,
                verbosity: cli.verbosity,
            };
            RainfallPipeline::new(config, client).run()?;
        }
    }

    Ok(())
}

/// Map `--verbosity` onto a tracing filter writing to stderr, so diagnostics
/// never mix into data written to stdout.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
