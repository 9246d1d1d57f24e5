mod display;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use peticion_ai::config::{DEFAULT_TIMEOUT_SECS, usable_key};
use peticion_ai::{AiConfig, ClientError, Orchestrator, brainbox, gemini};
use peticion_core::Session;
use peticion_docs::DocumentKind;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "peticion")]
#[command(about = "Analyze and improve Colombian derecho de petición documents", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    backend: BackendArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct BackendArgs {
    /// Gemini API key; without it the local analyzer is used
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, global = true, env = "GEMINI_MODEL", default_value = gemini::DEFAULT_MODEL)]
    gemini_model: String,

    /// Gemini REST base URL
    #[arg(long, global = true, env = "GEMINI_BASE_URL", default_value = gemini::DEFAULT_BASE_URL)]
    gemini_base_url: String,

    /// Brainbox API key; enables retrieval-grounded prompts
    #[arg(long, global = true, env = "BRAINBOX_API_KEY", hide_env_values = true)]
    brainbox_api_key: Option<String>,

    /// Brainbox box holding the legal reference corpus
    #[arg(long, global = true, env = "BRAINBOX_BOX_ID", default_value = brainbox::DEFAULT_BOX_ID)]
    brainbox_box_id: String,

    /// Brainbox REST base URL
    #[arg(long, global = true, env = "BRAINBOX_BASE_URL", default_value = brainbox::DEFAULT_BASE_URL)]
    brainbox_base_url: String,

    /// Request timeout in seconds
    #[arg(long, global = true, env = "PETICION_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
}

impl From<BackendArgs> for AiConfig {
    fn from(args: BackendArgs) -> Self {
        Self {
            gemini_api_key: usable_key(args.gemini_api_key),
            gemini_model: args.gemini_model,
            gemini_base_url: args.gemini_base_url,
            brainbox_api_key: usable_key(args.brainbox_api_key),
            brainbox_box_id: args.brainbox_box_id,
            brainbox_base_url: args.brainbox_base_url,
            timeout_secs: args.timeout_secs,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full wizard on a document: analysis, problems, recommendations, chat
    Analyze {
        /// PDF, DOCX or plain-text file
        file: PathBuf,

        /// Follow-up question for the chat stage (repeatable)
        #[arg(short, long)]
        question: Vec<String>,

        /// Print the finished session as JSON instead of cards
        #[arg(long)]
        json: bool,

        /// Write the finished session as JSON to this path
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Probe the configured providers and report key, quota and network status
    Check,

    /// List the files indexed in the Brainbox reference box
    Files {
        /// Also fetch a temporary download URL for each file
        #[arg(long)]
        urls: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AiConfig::from(cli.backend);
    info!(backend = ?config.backend(), "peticion v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Analyze {
            file,
            question,
            json,
            save,
        } => cmd_analyze(&config, &file, &question, json, save.as_deref()).await,
        Commands::Check => cmd_check(&config).await,
        Commands::Files { urls } => cmd_files(&config, urls).await,
    }
}

async fn cmd_analyze(
    config: &AiConfig,
    file: &Path,
    questions: &[String],
    json: bool,
    save: Option<&Path>,
) -> Result<()> {
    let kind = DocumentKind::from_path(file)
        .with_context(|| format!("unsupported file type: {}", file.display()))?;
    let bytes = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let Some(document) = peticion_docs::extract_text(&bytes, kind.mime()) else {
        bail!("no text could be extracted from {}", file.display());
    };
    info!(path = %file.display(), chars = document.chars().count(), "document loaded");

    let client = config.select_client().context("building model client")?;
    let mut orchestrator = Orchestrator::new(client);
    let mut session = Session::new(document.clone());
    let cards = !json;

    let analysis = orchestrator.analyze(&document).await;
    if cards {
        display::print_notice(&analysis);
        display::print_analysis_card(&analysis.value, analysis.source);
    }
    session.record_analysis(analysis.value.clone())?;

    let problems = orchestrator.detect_problems(&document, &analysis.value).await;
    if cards {
        display::print_notice(&problems);
        display::print_problems(&problems.value, problems.source);
    }
    session.record_problems(problems.value.clone())?;

    let recommendations = orchestrator
        .generate_recommendations(&document, &problems.value)
        .await;
    if cards {
        display::print_notice(&recommendations);
        display::print_recommendations(&recommendations.value, recommendations.source);
    }
    session.record_recommendations(recommendations.value)?;
    session.open_chat()?;

    for question in questions {
        let answer = orchestrator.chat(question, &session.chat_context()).await;
        if cards {
            display::print_notice(&answer);
        }
        let turn = session.push_turn(question.as_str(), answer.value)?;
        if cards {
            display::print_chat_turn(turn, answer.source);
        }
    }

    info!(
        client = orchestrator.client_name(),
        degraded = orchestrator.is_degraded(),
        "wizard finished"
    );

    if json || save.is_some() {
        let rendered = serde_json::to_string_pretty(&session).context("serializing session")?;
        if json {
            println!("{rendered}");
        }
        if let Some(path) = save {
            std::fs::write(path, &rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "session saved");
        }
    }
    Ok(())
}

async fn cmd_check(config: &AiConfig) -> Result<()> {
    println!("Backend: {}", display::backend_label(config.backend()));

    let gemini = match config.gemini_generator().context("building Gemini client")? {
        Some(generator) => Some(generator.probe().await.map(|_| ())),
        None => None,
    };
    display::print_check("Gemini", gemini.as_ref());

    let brainbox = match config.brainbox_client().context("building Brainbox client")? {
        Some(client) => Some(client.health_check().await.and_then(|healthy| {
            if healthy {
                Ok(())
            } else {
                Err(ClientError::Malformed("health check reported failure".into()))
            }
        })),
        None => None,
    };
    display::print_check("Brainbox", brainbox.as_ref());
    Ok(())
}

async fn cmd_files(config: &AiConfig, urls: bool) -> Result<()> {
    let client = config
        .brainbox_client()
        .context("building Brainbox client")?
        .context("BRAINBOX_API_KEY is not set")?;
    let files = client.list_files().await.context("listing box files")?;
    info!(box_id = client.box_id(), count = files.len(), "listed box files");
    display::print_files(&files);

    if urls {
        println!();
        for file in &files {
            let Some(id) = file.id.as_deref() else {
                continue;
            };
            let url = client
                .signed_url(id)
                .await
                .with_context(|| format!("fetching signed url for {id}"))?;
            display::print_signed_url(id, url.as_deref());
        }
    }
    Ok(())
}
