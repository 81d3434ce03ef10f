use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::config::Config;
use crate::error::{MedibotError, Result};
use crate::llm::{HuggingFaceEndpoint, TextGenerator};
use crate::rag::Retriever;
use crate::session::SessionManager;

/// Builds the retriever; runs on a blocking thread
pub type RetrieverLoader = Arc<dyn Fn(&Config) -> Result<Retriever> + Send + Sync>;

/// Builds a generator for one message
pub type GeneratorFactory = Arc<dyn Fn(&Config) -> Result<Arc<dyn TextGenerator>> + Send + Sync>;

/// Shared application state, injected into all route handlers via Axum state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<Mutex<SessionManager>>,
    retriever: Arc<OnceCell<Arc<Retriever>>>,
    load_retriever: RetrieverLoader,
    make_generator: GeneratorFactory,
}

impl AppState {
    /// State backed by the on-disk index, the local embedding model and the
    /// hosted model named in `config`.
    pub fn new(config: Config) -> Self {
        let sessions = SessionManager::new().with_idle_timeout(config.server.session_ttl_secs);
        Self {
            config: Arc::new(config),
            sessions: Arc::new(Mutex::new(sessions)),
            retriever: Arc::new(OnceCell::new()),
            load_retriever: Arc::new(Retriever::from_config),
            make_generator: Arc::new(|config: &Config| -> Result<Arc<dyn TextGenerator>> {
                let token = config.llm.api_token()?;
                let endpoint: Arc<dyn TextGenerator> =
                    Arc::new(HuggingFaceEndpoint::new(&config.llm, token));
                Ok(endpoint)
            }),
        }
    }

    pub fn with_retriever_loader(mut self, loader: RetrieverLoader) -> Self {
        self.load_retriever = loader;
        self
    }

    pub fn with_generator_factory(mut self, factory: GeneratorFactory) -> Self {
        self.make_generator = factory;
        self
    }

    /// The shared retriever, loaded on first use. A failed load is not
    /// cached, so the next message tries again.
    pub async fn retriever(&self) -> Result<Arc<Retriever>> {
        let retriever = self
            .retriever
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.load_retriever);
                let config = Arc::clone(&self.config);
                let retriever = tokio::task::spawn_blocking(move || loader(&config))
                    .await
                    .map_err(|e| {
                        MedibotError::Other(anyhow::anyhow!("retriever load task failed: {}", e))
                    })??;
                Ok::<_, MedibotError>(Arc::new(retriever))
            })
            .await?;

        Ok(Arc::clone(retriever))
    }

    /// Checks the credential on every call.
    pub fn generator(&self) -> Result<Arc<dyn TextGenerator>> {
        (self.make_generator)(&self.config)
    }
}
