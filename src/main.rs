use clap::Parser;
use don_calc::cli::{Cli, run};

#[tokio::main]
async fn main() {
    don_calc::logging::init_logging();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
