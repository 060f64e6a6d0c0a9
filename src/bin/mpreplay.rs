use std::process;

use clap::Parser;
use mpstream::commands::replay::{self, ReplayArgs};

#[derive(Debug, Parser)]
#[command(
    name = "mpreplay",
    about = "Replay a recorded chunk stream into conversation messages",
    version = mpstream::VERSION
)]
struct Cli {
    #[command(flatten)]
    replay: ReplayArgs,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = replay::run(cli.replay).await {
        eprintln!("{err}");
        process::exit(1);
    }
}
