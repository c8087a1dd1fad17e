use clap::Parser;
use tracing_subscriber::EnvFilter;

use nestegg::api::{Cli, Command, run_cli, run_http_server};
use nestegg::core::HistoricalData;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => {
            if let Err(e) = run_cli(args) {
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        }
        Command::Serve(args) => {
            let history = match HistoricalData::load_dir(&args.data.data_dir) {
                Ok(history) => history,
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(1);
                }
            };
            if let Err(e) = run_http_server(args.port, history).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
    }
}
