use clap::{Parser, Subcommand};

use crate::models::site::State;

#[derive(Parser)]
#[command(name = "bom-processor")]
#[command(about = "Ingest Australian Bureau of Meteorology station and rainfall data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short,
        long,
        global = true,
        default_value_t = 1,
        help = "Diagnostic verbosity (0 = warnings only)"
    )]
    pub verbosity: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch the station directory for a state and write site metadata
    Sites {
        #[arg(short, long, value_enum, help = "State whose station directory to fetch")]
        state: State,

        #[arg(short, long, help = "Limit number of rows to process")]
        limit: Option<usize>,

        #[arg(
            short,
            long,
            help = "Boolean expression over the listing columns; rows that fail it are dropped"
        )]
        filter: Option<String>,

        #[arg(long, help = "Do not output descriptive comments")]
        no_comments: bool,

        #[arg(long, help = "Do not output CSV header with column names")]
        no_header: bool,

        /// Output CSV file or connection string, otherwise stdout
        outdata: Option<String>,
    },

    /// Fetch daily rainfall observations for previously ingested sites
    Rainfall {
        #[arg(
            short,
            long,
            help = "Boolean expression over the site columns; sites that fail it are dropped"
        )]
        filter: Option<String>,

        #[arg(short, long, help = "Limit number of observations per site")]
        limit: Option<usize>,

        #[arg(short, long, help = "Just select sites without collecting data")]
        dry_run: bool,

        #[arg(long, help = "Do not output descriptive comments")]
        no_comments: bool,

        #[arg(long, help = "Do not output CSV header with column names")]
        no_header: bool,

        #[arg(
            long,
            help = "Site metadata source (CSV file or connection string) [default: the destination]"
        )]
        sites: Option<String>,

        /// Output CSV file or connection string, otherwise stdout
        outdata: Option<String>,
    },
}
