use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use medibot::cli::{prompt_responses, run_chat, write_answer, Cli, Commands, ConfigAction};
use medibot::config::{expand_path, Config, ConfigValidator};
use medibot::embedding::FastEmbedProvider;
use medibot::error::{MedibotError, Result};
use medibot::ingest::Ingestor;
use medibot::llm::{HuggingFaceEndpoint, TextGenerator};
use medibot::rag::{QaChain, Retriever};
use medibot::screening::{Questionnaire, QuestionnaireId, ScreeningReport};
use medibot::server::{self, AppState};

fn main() -> Result<()> {
    // .env may hold the API token
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Ingest {
            data_dir,
            index_dir,
        } => {
            cmd_ingest(cli.config, data_dir, index_dir)?;
        }
        Commands::Ask { question, json } => {
            cmd_ask(cli.config, &question, json)?;
        }
        Commands::Chat => {
            cmd_chat(cli.config)?;
        }
        Commands::Screen {
            questionnaire,
            responses,
            json,
        } => {
            cmd_screen(&questionnaire, responses, json)?;
        }
        Commands::Serve { bind } => {
            cmd_serve(cli.config, bind)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

/// Logs go to stderr so answers and scores on stdout stay clean
fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "medibot=debug" } else { "medibot=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| MedibotError::Io {
        source: e,
        context: "Failed to create tokio runtime".to_string(),
    })
}

fn cmd_ingest(
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    index_dir: Option<PathBuf>,
) -> Result<()> {
    let config = load_config(config_path)?;

    let data_dir = expand_path(&data_dir.unwrap_or_else(|| config.paths.data_dir.clone()))?;
    let index_dir = expand_path(&index_dir.unwrap_or_else(|| config.paths.index_dir.clone()))?;

    let provider = FastEmbedProvider::new(&config.embedding.model, config.embedding.batch_size)?;
    let report = Ingestor::from_config(Arc::new(provider), &config)
        .with_data_dir(data_dir)
        .with_index_dir(index_dir)
        .run()?;

    println!(
        "  Files: {}  Pages: {}  Chunks: {}  ({} ms)",
        report.files, report.pages, report.chunks, report.duration_ms
    );
    println!(
        "✓ Embeddings stored successfully in {}",
        report.index_dir.display()
    );

    Ok(())
}

fn build_chain(config: &Config) -> Result<QaChain> {
    let token = config.llm.api_token()?;
    let generator: Arc<dyn TextGenerator> = Arc::new(HuggingFaceEndpoint::new(&config.llm, token));
    let retriever = Retriever::from_config(config)?;
    QaChain::new(Arc::new(retriever), generator, &config.retrieval)
}

fn cmd_ask(config_path: Option<PathBuf>, question: &str, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let chain = build_chain(&config)?;

    let answer = runtime()?.block_on(chain.invoke(question))?;

    if json {
        let out = serde_json::to_string_pretty(&answer).map_err(|e| MedibotError::Json {
            source: e,
            context: "Failed to serialize answer".to_string(),
        })?;
        println!("{}", out);
    } else {
        let mut stdout = io::stdout().lock();
        write_answer(&mut stdout, &answer).map_err(|e| MedibotError::Io {
            source: e,
            context: "Failed to write answer".to_string(),
        })?;
    }

    Ok(())
}

fn cmd_chat(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;
    // A missing token stops the loop before it starts
    config.llm.api_token()?;

    let rt = runtime()?;
    run_chat(io::stdin().lock(), &mut io::stdout(), &rt, || build_chain(&config))
}

fn cmd_screen(questionnaire: &str, responses: Option<Vec<u8>>, json: bool) -> Result<()> {
    let id: QuestionnaireId = questionnaire.parse()?;

    let responses = match responses {
        Some(responses) => responses,
        None => {
            let questionnaire = Questionnaire::get(id);
            prompt_responses(io::stdin().lock(), &mut io::stdout(), questionnaire)?
        }
    };

    let report = ScreeningReport::evaluate(id, &responses)?;

    if json {
        let out = serde_json::to_string_pretty(&report).map_err(|e| MedibotError::Json {
            source: e,
            context: "Failed to serialize screening report".to_string(),
        })?;
        println!("{}", out);
        return Ok(());
    }

    println!("{}", report.headline());
    if let Some(notice) = report.crisis_notice {
        println!("⚠ {}", notice);
    }
    println!("Resources:");
    for link in report.resources {
        println!("  - {}", link);
    }

    Ok(())
}

fn cmd_serve(config_path: Option<PathBuf>, bind: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let bind = bind.unwrap_or_else(|| config.server.bind_addr.clone());

    if let Err(e) = config.llm.api_token() {
        tracing::warn!("{} Chat messages will fail until it is set.", e);
    }

    println!("✓ MediBot chat UI at http://{}", bind);
    runtime()?.block_on(server::serve(AppState::new(config), &bind))
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| MedibotError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| MedibotError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::warn!(
            "Config file not found, using defaults. Run 'medibot config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;
        return Ok(config);
    }

    Config::load(&path)
}
