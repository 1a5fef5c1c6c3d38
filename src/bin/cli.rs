use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use backstop::cli::{run, Cli};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("backstop=info")),
        )
        .with_target(false)
        .init();

    // Exit 1 on bad/missing arguments; help and version stay exit 0
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };
    if let Err(err) = run(cli).await {
        eprintln!("{} {err:#}", style("error:").red().bold());
        std::process::exit(1);
    }
}
