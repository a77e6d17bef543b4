//! Interactive terminal chat
//!
//! Run with: cargo run -p hr-policy-rag --bin hr-policy-chat

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use console::style;
use hr_policy_rag::{
    AnsweringOrchestrator, ConversationHistory, PipelineBuilder, RagConfig,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hr-policy-chat", version, about = "Ask questions about the HR policy")]
struct Cli {
    /// TOML configuration file (defaults to HR_RAG_CONFIG or built-in settings)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip the menu and start in this mode
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Follow-up questions see the earlier turns
    Conversational,
    /// Each question is widened with generated variants
    MultiQuery,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hr_policy_rag=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => {
            let mut config = RagConfig::from_file(path)?;
            config.apply_env_overrides();
            config.validate()?;
            config
        }
        None => RagConfig::load()?,
    };

    let mode = match cli.mode {
        Some(mode) => mode,
        None => match choose_mode()? {
            Some(mode) => mode,
            None => return Ok(()),
        },
    };

    let builder = match PipelineBuilder::from_config(config) {
        Ok(builder) => builder,
        Err(e) => {
            eprintln!("{} {}", style("Failed to start:").red().bold(), e);
            std::process::exit(1);
        }
    };
    let orchestrator = builder.expand_queries(mode == Mode::MultiQuery).build();

    println!(
        "\n{} Type your question, or 'exit' to quit.\n",
        style("HR Policy Assistant").cyan().bold()
    );

    run(&orchestrator, mode).await
}

fn choose_mode() -> io::Result<Option<Mode>> {
    println!("{}", style("Choose a bot:").bold());
    println!("  1. Conversational bot");
    println!("  2. Multi-query bot");

    loop {
        let Some(choice) = prompt("Selection: ")? else {
            return Ok(None);
        };
        match choice.trim() {
            "1" => return Ok(Some(Mode::Conversational)),
            "2" => return Ok(Some(Mode::MultiQuery)),
            "exit" | "quit" => return Ok(None),
            _ => println!("{}", style("Please enter 1 or 2.").yellow()),
        }
    }
}

async fn run(orchestrator: &AnsweringOrchestrator, mode: Mode) -> anyhow::Result<()> {
    let mut history = ConversationHistory::new();

    while let Some(line) = prompt(&format!("{} ", style("You:").bold()))? {
        let question = line.trim();
        if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }

        let reply = match mode {
            Mode::Conversational => {
                let (reply, updated) = orchestrator
                    .reply_with_history(question, std::mem::take(&mut history))
                    .await;
                history = updated;
                reply
            }
            Mode::MultiQuery => orchestrator.reply(question).await,
        };

        let label = if reply.status.is_success() {
            style("Bot:").green().bold()
        } else {
            style("Bot:").red().bold()
        };
        println!("{} {}\n", label, reply.answer);
    }

    println!("Goodbye.");
    Ok(())
}

/// Read one line; `None` on end of input
fn prompt(label: &str) -> io::Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
