use std::io;
use std::process;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, shells};
use mpstream::commands::config::{self, ConfigArgs};
use mpstream::commands::replay::{self, ReplayArgs};

const ROOT_HELP_EXAMPLES: &str = "Examples:\n  mpstream replay events.jsonl\n  cat events.jsonl | mpstream replay --json --show-stats\n  mpstream replay --delay-ms 20 --throttle-ms 50 --frames events.jsonl\n  mpstream config check\n  mpstream completion bash > ~/.local/share/bash-completion/completions/mpstream";

const REPLAY_HELP_EXAMPLES: &str = "Each input line is one transport event: a chunk object, or a [chunk, metadata] pair.\n\nExamples:\n  mpstream replay events.jsonl\n  echo '{\"id\":\"r1\",\"type\":\"AIMessageChunk\",\"content\":\"Hi\"}' | mpstream replay --json";

#[derive(Debug, Parser)]
#[command(
    name = "mpstream",
    about = "Assemble streamed LLM chunks into conversation messages",
    version = mpstream::VERSION,
    after_help = ROOT_HELP_EXAMPLES
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Replay a recorded chunk stream", after_help = REPLAY_HELP_EXAMPLES)]
    Replay(ReplayArgs),
    #[command(about = "Manage local config")]
    Config(ConfigArgs),
    #[command(about = "Generate shell completion script")]
    Completion {
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

fn print_completion(shell: CompletionShell) {
    let mut cmd = Cli::command();
    match shell {
        CompletionShell::Bash => generate(shells::Bash, &mut cmd, "mpstream", &mut io::stdout()),
        CompletionShell::Zsh => generate(shells::Zsh, &mut cmd, "mpstream", &mut io::stdout()),
        CompletionShell::Fish => generate(shells::Fish, &mut cmd, "mpstream", &mut io::stdout()),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay(args) => replay::run(args).await,
        Commands::Config(args) => config::run(args),
        Commands::Completion { shell } => {
            print_completion(shell);
            Ok(())
        }
    };

    if let Err(err) = result {
        eprintln!("{err}");
        process::exit(1);
    }
}
