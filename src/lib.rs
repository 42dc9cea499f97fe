//! msbuild-lsp: completion for MSBuild project files.
//!
//! The [`Backend`] owns the open documents and the completion engine.
//! The LSP protocol surface lives in `server.rs`; completion request
//! handling in `completion/handler.rs`.
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use tower_lsp::Client;
use tower_lsp::lsp_types::MessageType;
use tracing::{debug, info};

pub mod completion;
pub mod config;
pub mod document;
pub mod evaluation;
pub mod location;
pub mod parser;
pub mod reference;
pub mod registry;
mod server;
pub mod types;
pub mod util;

use crate::completion::engine::CompletionEngine;
use crate::config::Config;
use crate::document::DocumentModel;
use crate::evaluation::{ProjectEvaluator, XmlProjectEvaluator};
use crate::reference::ReferenceData;
use crate::registry::{HttpRegistry, PackageRegistry};

/// Where configuration comes from.
enum ConfigSource {
    /// Discover files (explicit path, workspace, user dir) at initialize.
    Discover { explicit: Option<PathBuf> },
    /// Use this configuration as is.
    Fixed,
}

pub struct Backend {
    name: String,
    version: String,
    client: Option<Client>,
    /// Open documents keyed by URI.
    documents: RwLock<HashMap<String, Arc<DocumentModel>>>,
    engine: RwLock<Arc<CompletionEngine>>,
    config: RwLock<Config>,
    config_source: ConfigSource,
    workspace_root: RwLock<Option<PathBuf>>,
    evaluator: Arc<dyn ProjectEvaluator>,
    /// Registry used instead of the configured HTTP one.
    registry_override: Option<Arc<dyn PackageRegistry>>,
}

impl Backend {
    pub fn new(client: Client, config_path: Option<PathBuf>) -> Self {
        Self::build(
            Some(client),
            ConfigSource::Discover {
                explicit: config_path,
            },
            Config::default(),
            Arc::new(XmlProjectEvaluator),
            None,
        )
    }

    /// A backend without a client or registry, using default settings.
    pub fn new_test() -> Self {
        Self::new_test_with_evaluator(Arc::new(XmlProjectEvaluator))
    }

    pub fn new_test_with_registry(registry: Arc<dyn PackageRegistry>) -> Self {
        Self::new_test_with(Config::default(), Arc::new(XmlProjectEvaluator), Some(registry))
    }

    pub fn new_test_with_evaluator(evaluator: Arc<dyn ProjectEvaluator>) -> Self {
        let mut config = Config::default();
        config.registry.enabled = false;
        Self::new_test_with(config, evaluator, None)
    }

    pub fn new_test_with(
        config: Config,
        evaluator: Arc<dyn ProjectEvaluator>,
        registry: Option<Arc<dyn PackageRegistry>>,
    ) -> Self {
        Self::build(None, ConfigSource::Fixed, config, evaluator, registry)
    }

    fn build(
        client: Option<Client>,
        config_source: ConfigSource,
        config: Config,
        evaluator: Arc<dyn ProjectEvaluator>,
        registry_override: Option<Arc<dyn PackageRegistry>>,
    ) -> Self {
        let engine = Self::build_engine(&config, registry_override.clone());
        Self {
            name: "msbuild-lsp".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            client,
            documents: RwLock::new(HashMap::new()),
            engine: RwLock::new(Arc::new(engine)),
            config: RwLock::new(config),
            config_source,
            workspace_root: RwLock::new(None),
            evaluator,
            registry_override,
        }
    }

    fn build_engine(
        config: &Config,
        registry_override: Option<Arc<dyn PackageRegistry>>,
    ) -> CompletionEngine {
        let reference = Arc::new(ReferenceData::builtin_with_overrides(
            config.reference.path.as_deref(),
        ));
        let registry = if !config.registry.enabled {
            None
        } else {
            registry_override.or_else(|| {
                Some(Arc::new(HttpRegistry::new(&config.registry)) as Arc<dyn PackageRegistry>)
            })
        };
        CompletionEngine::standard(config, reference, registry)
    }

    /// Load settings for `workspace_root` and rebuild the engine.
    pub(crate) fn configure(&self, workspace_root: Option<PathBuf>) {
        if let ConfigSource::Discover { explicit } = &self.config_source {
            let config = Config::discover(explicit.as_deref(), workspace_root.as_deref());
            *self.config.write() = config;
        }
        let config = self.config.read().clone();
        let engine = Self::build_engine(&config, self.registry_override.clone());
        info!(providers = ?engine.provider_names(), "completion engine ready");
        *self.engine.write() = Arc::new(engine);
        *self.workspace_root.write() = workspace_root;
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    pub fn workspace_root(&self) -> Option<PathBuf> {
        self.workspace_root.read().clone()
    }

    pub(crate) fn engine(&self) -> Arc<CompletionEngine> {
        Arc::clone(&self.engine.read())
    }

    /// The model for an open document.
    pub fn document(&self, uri: &str) -> Option<Arc<DocumentModel>> {
        self.documents.read().get(uri).cloned()
    }

    pub(crate) fn open_document(&self, uri: &str, text: String, version: i32) {
        let model = DocumentModel::new(uri, text, version, Arc::clone(&self.evaluator));
        self.documents
            .write()
            .insert(uri.to_string(), Arc::new(model));
        debug!(uri, "document opened");
    }

    pub(crate) fn close_document(&self, uri: &str) -> bool {
        self.documents.write().remove(uri).is_some()
    }

    pub fn open_document_count(&self) -> usize {
        self.documents.read().len()
    }

    /// Mirror a message to the client's log, when there is a client.
    pub(crate) async fn log(&self, typ: MessageType, message: String) {
        if let Some(client) = &self.client {
            client.log_message(typ, message).await;
        }
    }
}

/// File-system path of a `file://` URI, if it has one.
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    tower_lsp::lsp_types::Url::parse(uri)
        .ok()
        .and_then(|url| url.to_file_path().ok())
}
