use clap::Parser;
use fiscal_nexus::NexusError;
use fiscal_nexus::cli::{self, Args};
use std::process;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let result: anyhow::Result<_> = tokio::select! {
        result = cli::run(args) => result.map_err(anyhow::Error::from),
        signal = tokio::signal::ctrl_c() => {
            eprintln!("\nReceived CTRL+C, shutting down...");
            match signal {
                Ok(()) => Err(NexusError::processing_interrupted("interrupted by user").into()),
                Err(e) => Err(anyhow::Error::from(e).context("failed to listen for CTRL+C")),
            }
        }
    };

    if let Err(error) = result {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}
