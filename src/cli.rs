//! CLI command definitions using clap.

use clap::{Parser, Subcommand};

/// mapsyncproxy - HAProxy runtime maps from Cloud Storage manifests
#[derive(Parser, Debug)]
#[command(name = "mapsyncproxy")]
#[command(version)]
#[command(about = "Synchronize HAProxy runtime maps from JSON manifests stored in Cloud Storage")]
#[command(
    long_about = "mapsyncproxy converges HAProxy runtime maps towards JSON manifests kept in a Cloud Storage bucket, through the HAProxy Data Plane API. Connection settings are read from MAPSYNCPROXY_* environment variables."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Port to listen on (overrides API_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Synchronize one map and print the report
    Sync {
        /// Runtime map to converge
        #[arg(short, long)]
        map: String,

        /// Bucket holding the manifests
        #[arg(short, long)]
        bucket: String,

        /// Manifest object name, or "*" for every JSON object of the bucket
        #[arg(short, long)]
        file: String,
    },

    /// Print the live entries of a map as a JSON manifest
    Generate {
        /// Runtime map to dump
        #[arg(short, long)]
        map: String,
    },
}
