use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use study_assistant_core::{
    AppConfig, ChatCompletionClient, ChatCoordinator, ChatRole, ConfigError, DocumentExtractor,
    ExtractorConfig, Session,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "studygenie", version, about = "Your intelligent study companion")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Chat-completion base URL
    #[arg(long, global = true, env = "STUDYGENIE_BASE_URL")]
    base_url: Option<String>,

    /// Model identifier
    #[arg(long, global = true, env = "STUDYGENIE_MODEL")]
    model: Option<String>,

    /// Sampling temperature, 0.0 to 2.0
    #[arg(long, global = true, env = "STUDYGENIE_TEMPERATURE")]
    temperature: Option<f32>,

    /// Maximum reply tokens
    #[arg(long, global = true, env = "STUDYGENIE_MAX_TOKENS")]
    max_tokens: Option<u32>,

    /// Completion request timeout in seconds
    #[arg(long, global = true, env = "STUDYGENIE_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// OCR time budget in seconds
    #[arg(long, global = true, env = "STUDYGENIE_OCR_TIMEOUT_SECS")]
    ocr_timeout_secs: Option<u64>,

    /// Directory uploads are written to
    #[arg(long, global = true, env = "STUDYGENIE_WORKDIR")]
    workdir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive study session.
    Chat {
        /// Files to upload before the first question.
        #[arg(long = "upload")]
        uploads: Vec<PathBuf>,
    },
    /// Ask a single question and print the reply.
    Ask {
        /// The question to send.
        #[arg(long)]
        message: String,
        /// Files to upload before asking.
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },
    /// Print the text that would be stored for a file.
    Extract {
        /// File to extract.
        #[arg(long)]
        file: PathBuf,
    },
}

#[derive(Debug, PartialEq)]
enum ReplCommand {
    Message(String),
    Upload(PathBuf),
    Remove(String),
    Docs,
    History,
    Clear,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

impl ReplCommand {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if !line.starts_with('/') {
            return Self::Message(line.to_string());
        }

        let (name, argument) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        match (name, argument) {
            ("/upload", path) if !path.is_empty() => Self::Upload(PathBuf::from(path)),
            ("/remove", filename) if !filename.is_empty() => Self::Remove(filename.to_string()),
            ("/docs", _) => Self::Docs,
            ("/history", _) => Self::History,
            ("/clear", _) => Self::Clear,
            ("/help", _) => Self::Help,
            ("/quit", _) | ("/exit", _) => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

const HELP: &str = "\
Type a question to chat. Mention an uploaded filename to include its content.
  /upload <path>     upload a .txt, .pdf, .docx, .png or .jpg file
  /remove <name>     forget an uploaded document
  /docs              list uploaded documents
  /history           show the conversation so far
  /clear             clear the conversation (documents are kept)
  /quit              leave";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    if let Err(error) = dotenvy::dotenv() {
        if !error.not_found() {
            return Err(error).context("failed to load .env");
        }
    }

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "studygenie boot"
    );

    match &cli.command {
        Command::Extract { file } => {
            let config = extractor_config(&cli)?;
            let extractor = DocumentExtractor::new(&config);
            let extension = file
                .extension()
                .and_then(|ext| ext.to_str())
                .unwrap_or_default();
            println!("{}", extractor.extract_text(file, extension).await);
        }
        Command::Ask {
            message,
            attachments,
        } => {
            let (coordinator, mut session) = start_session(&cli)?;
            for path in attachments {
                upload(&coordinator, &mut session, path).await;
            }
            println!("{}", coordinator.send(&mut session, message).await);
        }
        Command::Chat { uploads } => {
            let (coordinator, mut session) = start_session(&cli)?;
            for path in uploads {
                upload(&coordinator, &mut session, path).await;
            }
            run_chat(&coordinator, &mut session).await?;
        }
    }

    Ok(())
}

fn extractor_config(cli: &Cli) -> anyhow::Result<ExtractorConfig> {
    let mut config = ExtractorConfig::from_env()?;
    if let Some(secs) = cli.ocr_timeout_secs {
        config.ocr_timeout = Duration::from_secs(secs);
    }
    Ok(config)
}

/// Missing or invalid configuration stops the process here.
fn start_session(cli: &Cli) -> anyhow::Result<(ChatCoordinator<ChatCompletionClient>, Session)> {
    let mut config = AppConfig::from_env().context("configuration error")?;
    apply_overrides(cli, &mut config).context("configuration error")?;

    info!(
        endpoint = %config.completion.endpoint(),
        model = %config.completion.options.model,
        ocr_command = %config.extractor.ocr_command.display(),
        workdir = %config.workdir.display(),
        "configuration loaded"
    );

    let client = ChatCompletionClient::new(&config.completion)?;
    let extractor = DocumentExtractor::new(&config.extractor);
    let coordinator =
        ChatCoordinator::new(client, extractor, config.workdir, config.system_prompt);

    let session = Session::new();
    info!(session_id = %session.id(), "session started");
    Ok((coordinator, session))
}

/// Flag values go through the same validation as the environment.
fn apply_overrides(cli: &Cli, config: &mut AppConfig) -> Result<(), ConfigError> {
    if let Some(base_url) = &cli.base_url {
        config.completion.set_base_url(base_url)?;
    }
    if let Some(model) = &cli.model {
        config.completion.options.model = model.clone();
    }
    if let Some(temperature) = cli.temperature {
        config.completion.set_temperature(temperature)?;
    }
    if let Some(max_tokens) = cli.max_tokens {
        config.completion.options.max_tokens = max_tokens;
    }
    if let Some(secs) = cli.timeout_secs {
        config.completion.timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = cli.ocr_timeout_secs {
        config.extractor.ocr_timeout = Duration::from_secs(secs);
    }
    if let Some(workdir) = &cli.workdir {
        config.workdir = workdir.clone();
    }
    Ok(())
}

async fn upload(
    coordinator: &ChatCoordinator<ChatCompletionClient>,
    session: &mut Session,
    path: &Path,
) {
    match coordinator.upload_path(session, path).await {
        Ok(record) => println!("{} uploaded", record.filename),
        Err(error) => {
            warn!(path = %path.display(), error = %error, "upload failed");
            println!("{}", error.diagnostic());
        }
    }
}

async fn run_chat(
    coordinator: &ChatCoordinator<ChatCompletionClient>,
    session: &mut Session,
) -> anyhow::Result<()> {
    println!("StudyGenie: your intelligent study companion. Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Empty => {}
            ReplCommand::Message(message) => {
                println!("Thinking...");
                let reply = coordinator.send(session, &message).await;
                println!("StudyGenie: {reply}");
            }
            ReplCommand::Upload(path) => upload(coordinator, session, &path).await,
            ReplCommand::Remove(filename) => {
                match coordinator.remove_document(session, &filename).await {
                    Some(_) => println!("{filename} removed"),
                    None => println!("no uploaded document named {filename}"),
                }
            }
            ReplCommand::Docs => {
                if session.documents().is_empty() {
                    println!("no documents uploaded");
                }
                for record in session.documents().iter() {
                    println!(
                        "{} ({}, {} bytes, {} chars)",
                        record.filename,
                        record.format,
                        record.size_bytes,
                        record.text.chars().count()
                    );
                }
            }
            ReplCommand::History => {
                for turn in session.turns() {
                    let speaker = match turn.role {
                        ChatRole::User => "you",
                        ChatRole::Assistant => "StudyGenie",
                        ChatRole::System => "system",
                    };
                    println!("{speaker}: {}", turn.content);
                }
            }
            ReplCommand::Clear => {
                coordinator.clear(session);
                println!("conversation cleared");
            }
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Quit => break,
            ReplCommand::Unknown(input) => println!("unknown command: {input} (try /help)"),
        }
    }

    info!(session_id = %session.id(), turns = session.turns().len(), "session ended");
    Ok(())
}
