//! daily-sentence - translate a Korean sentence into study cards

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use daily_sentence::study::config::CONFIG_FILE_NAME;
use daily_sentence::study::controller::TipOutcome;
use daily_sentence::study::render::{card_skin, print_session};
use daily_sentence::study::{Language, SessionStatus, StudyConfig, StudySession, TranslateOutcome};
use std::path::PathBuf;
use termimad::MadSkin;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gemini API key (overrides config and GEMINI_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Session file (overrides config)
    #[arg(long)]
    session: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate TEXT (or the saved sentence) and show the cards
    Translate { text: Option<String> },

    /// Show the saved cards
    Show,

    /// Speak a saved translation (en, ja or zh)
    Speak { lang: Language },

    /// Type sentences one per line; `:help` lists commands
    Interactive,

    /// Create an example config in the current directory
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Some(Command::Init { force }) = &args.command {
        return init_config(*force);
    }

    let mut config = StudyConfig::load(args.config.as_deref()).context("loading config")?;
    if let Some(key) = &args.api_key {
        config.api_key = Some(key.clone());
    }
    if let Some(session) = &args.session {
        config.session_path = session.clone();
    }

    let mut session = StudySession::from_config(&config)?;
    let skin = card_skin();

    match args.command.unwrap_or(Command::Show) {
        Command::Translate { text } => {
            if let Some(text) = text {
                session.set_input(text)?;
            }
            translate_and_print(&mut session, &skin).await;
        }
        Command::Show => print_session(&skin, session.state()),
        Command::Speak { lang } => {
            if session.state().translations.get(lang).is_empty() {
                println!("{}", format!("No {} translation saved yet.", lang.name()).dim());
            }
            session.speak(lang)?;
        }
        Command::Interactive => interactive(&mut session, &config, &skin).await?,
        Command::Init { .. } => unreachable!("handled above"),
    }

    session.close()?;
    Ok(())
}

fn init_config(force: bool) -> anyhow::Result<()> {
    let path = PathBuf::from(CONFIG_FILE_NAME);
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }

    let example = StudyConfig {
        speech_command: Some(vec!["espeak-ng".to_string(), "-v".to_string(), "{voice}".to_string()]),
        ..StudyConfig::default()
    };
    example.to_file(&path)?;
    println!("✅ Created example config at: {}", path.display());
    Ok(())
}

async fn translate_and_print(session: &mut StudySession, skin: &MadSkin) {
    if session.state().input_text.trim().is_empty() {
        println!("{}", "Enter a Korean sentence first.".dim());
        return;
    }

    let mut status = session.subscribe_status();
    let outcome = {
        let round = session.translate();
        tokio::pin!(round);
        loop {
            tokio::select! {
                outcome = &mut round => break outcome,
                Ok(()) = status.changed() => print_status(*status.borrow_and_update()),
            }
        }
    };

    match outcome {
        Ok(TranslateOutcome::Skipped) => {}
        Ok(TranslateOutcome::Translated { tips }) => {
            print_session(skin, session.state());
            if let TipOutcome::Failed(e) = tips {
                println!("{}", format!("⚠️  {}", e).yellow());
            }
        }
        Err(e) => {
            tracing::debug!(error = %e, "translate round failed");
            if let Some(notice) = session.notice() {
                println!("{}", format!("❌ {}", notice).red());
            }
        }
    }
}

fn print_status(status: SessionStatus) {
    match status {
        SessionStatus::Translating => println!("{}", "번역 중...".dim()),
        SessionStatus::GeneratingTips => println!("{}", "처리 중... (AI 팁 생성)".dim()),
        SessionStatus::Idle => {}
    }
}

async fn interactive(session: &mut StudySession, config: &StudyConfig, skin: &MadSkin) -> anyhow::Result<()> {
    println!("🔤 Daily Sentence - type a Korean sentence, or :help");
    if !session.tips_enabled() {
        println!("{}", "No Gemini API key set. Use :key <KEY> to enable AI tips.".dim());
    }
    if !session.state().input_text.is_empty() {
        print_session(skin, session.state());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print_prompt();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line.split_once(' ').unwrap_or((line, "")) {
            ("", _) => continue,
            (":quit" | ":q", _) => break,
            (":help", _) => print_help(),
            (":show", _) => print_session(skin, session.state()),
            (":key", key) => {
                session.set_api_key(config, key)?;
                if session.tips_enabled() {
                    println!("🔑 AI tips enabled");
                } else {
                    println!("🔑 AI tips disabled");
                }
            }
            (":speak", lang) => match lang.parse::<Language>() {
                Ok(lang) => {
                    if let Err(e) = session.speak(lang) {
                        println!("{}", format!("❌ {}", e).red());
                    }
                }
                Err(e) => println!("{}", e.red()),
            },
            (command, _) if command.starts_with(':') => {
                println!("Unknown command: {} (try :help)", command);
            }
            _ => {
                session.set_input(line)?;
                translate_and_print(session, skin).await;
            }
        }
    }

    Ok(())
}

fn print_prompt() {
    use std::io::Write;

    let timestamp = chrono::Local::now().format("%H:%M:%S");
    print!("[{}] > ", timestamp);
    let _ = std::io::stdout().flush();
}

fn print_help() {
    println!("Commands:");
    println!("  <sentence>       Translate a Korean sentence");
    println!("  :show            Show the current cards");
    println!("  :speak <lang>    Speak a translation (en, ja, zh)");
    println!("  :key <KEY>       Set the Gemini API key (empty to disable tips)");
    println!("  :quit            Save and exit");
}
