use std::time::{Duration, Instant};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use chatguard::config::Config;
use chatguard::filter::detect_language;
use chatguard::output::terminal;
use chatguard::pipeline::{MemoryTransport, SendError, SendPipeline};
use chatguard::ratelimit::RateDecision;

/// Chatguard: rate limiting and profanity moderation for outgoing chat.
///
/// Every message passes a per-sender rate gate and a multilingual content
/// filter (English, Hindi, Gujarati) before it is sent.
#[derive(Parser)]
#[command(name = "chatguard", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Moderate a message and print the full report
    Check {
        /// The message text
        text: String,
    },

    /// Run only the local lexicon filter
    Scan {
        /// The message text
        text: String,
    },

    /// Detect the language of a message from its script
    Language {
        /// The message text
        text: String,
    },

    /// Replay synthetic send attempts through the rate limiter
    Simulate {
        /// Sender identity to simulate
        #[arg(long, default_value = "demo-user")]
        identity: String,

        /// Number of send attempts (default: 15)
        #[arg(long, default_value = "15")]
        count: u32,

        /// Milliseconds between attempts (default: 200)
        #[arg(long, default_value = "200")]
        interval_ms: u64,
    },

    /// Interactive chat over stdin through the full send pipeline
    Chat {
        /// Sender identity for this session
        #[arg(long, default_value = "demo-user")]
        identity: String,
    },

    /// Show the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("chatguard=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { text } => {
            let config = Config::load()?;
            let moderator = config.build_moderator()?;
            if moderator.remote_enabled() {
                info!(model = %config.moderation.classifier_model, "Remote moderation enabled");
            }
            let report = moderator.review(&text).await;
            terminal::display_report(&text, &report);
        }

        Commands::Scan { text } => {
            let config = Config::load()?;
            let filter = config.build_filter();
            let verdict = filter.scan(&text);
            println!("\n{}", "=== Local filter ===".bold());
            terminal::display_verdict(&text, &verdict);
            println!();
        }

        Commands::Language { text } => {
            let language = detect_language(&text);
            println!(
                "{} ({})",
                terminal::language_name(language).bold(),
                language
            );
        }

        Commands::Simulate {
            identity,
            count,
            interval_ms,
        } => {
            let config = Config::load()?;
            let limiter = config.build_rate_limiter();
            let interval = Duration::from_millis(interval_ms);

            println!(
                "\n{}",
                format!(
                    "=== Simulating {count} sends from {identity}, {interval_ms}ms apart ==="
                )
                .bold()
            );
            println!();

            // Synthetic clock: no real sleeping, attempt i happens at start + i*interval
            let start = Instant::now();
            let mut allowed = 0u32;
            for i in 0..count {
                let now = start + interval * i;
                let decision = limiter.check_send(&identity, now);
                let status = limiter.status(&identity, now);
                let label = match decision {
                    RateDecision::Allowed => {
                        allowed += 1;
                        "allowed".green()
                    }
                    RateDecision::Blocked { .. } => {
                        format!("blocked ({}s)", decision.cooldown_seconds()).red()
                    }
                };
                println!(
                    "  {:>4}. t+{:>6}ms  {:<16}  remaining {:>2}{}",
                    i + 1,
                    interval_ms * u64::from(i),
                    label,
                    status.remaining,
                    if status.rapid { "  rapid".yellow().to_string() } else { String::new() }
                );
            }

            println!();
            println!("  {allowed}/{count} attempts allowed");
        }

        Commands::Chat { identity } => {
            let config = Config::load()?;
            let moderator = config.build_moderator()?;
            moderator.filter().warm_up();
            let pipeline = SendPipeline::new(
                config.build_rate_limiter(),
                moderator,
                MemoryTransport::new(),
            );
            run_chat(&pipeline, &identity).await?;
        }

        Commands::Config => {
            let config = Config::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            let key_state = if config.moderation.api_key.is_empty() {
                "not set".dimmed()
            } else {
                "set (redacted)".green()
            };
            println!("OPENAI_API_KEY: {key_state}");
        }
    }

    Ok(())
}

/// Read lines from stdin and push each through the send pipeline until EOF
/// or `/quit`. `/status` shows the rate gate.
async fn run_chat(pipeline: &SendPipeline<MemoryTransport>, identity: &str) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    println!(
        "Chatting as {}. Type /status for your send gate, /quit to leave.",
        identity.bold()
    );

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = line.trim();
        match text {
            "" => continue,
            "/quit" => break,
            "/status" => {
                terminal::display_status(identity, &pipeline.status(identity));
                continue;
            }
            _ => {}
        }

        match pipeline.submit(identity, text).await {
            Ok(message) => terminal::display_sent(&message),
            Err(SendError::ModerationRejected { report, pending }) => {
                terminal::display_report(text, &report);
                let Some(pending) = pending else {
                    println!("  {}", "Message can't be masked. Please edit and resend.".red());
                    continue;
                };
                println!("  Send masked version \"{}\"? [y/N]", pending.masked_text());
                stdout.write_all(b"> ").await?;
                stdout.flush().await?;
                let answer = lines.next_line().await?.unwrap_or_default();
                if matches!(answer.trim(), "y" | "Y" | "yes") {
                    match pipeline.confirm_masked(pending).await {
                        Ok(message) => terminal::display_sent(&message),
                        Err(e) => println!("  {}", e.to_string().red()),
                    }
                } else {
                    println!("  {}", "Discarded.".dimmed());
                }
            }
            Err(e) => println!("  {}", e.to_string().red()),
        }
    }

    let sent = pipeline.transport().messages().len();
    println!("Session over, {sent} message(s) sent.");
    Ok(())
}
