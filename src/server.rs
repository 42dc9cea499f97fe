/// LSP server trait implementation.
///
/// This module contains the `impl LanguageServer for Backend` block,
/// which handles the LSP protocol messages (initialize, didOpen,
/// didChange, didClose, completion, shutdown).
use tokio_util::sync::CancellationToken;
use tower_lsp::LanguageServer;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tracing::{debug, info, warn};

use crate::Backend;

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        #[allow(deprecated)]
        let root_uri = params
            .workspace_folders
            .as_ref()
            .and_then(|folders| folders.first())
            .map(|folder| folder.uri.clone())
            .or(params.root_uri);
        let workspace_root = root_uri.and_then(|uri| uri.to_file_path().ok());
        self.configure(workspace_root);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec![
                        "<".to_string(),
                        "\"".to_string(),
                        " ".to_string(),
                    ]),
                    ..CompletionOptions::default()
                }),
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                ..ServerCapabilities::default()
            },
            server_info: Some(ServerInfo {
                name: self.name.clone(),
                version: Some(self.version.clone()),
            }),
            offset_encoding: None,
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let message = match self.workspace_root() {
            Some(root) => format!("{} initialized for {}", self.name, root.display()),
            None => format!("{} initialized", self.name),
        };
        info!("{message}");
        self.log(MessageType::INFO, message).await;
    }

    async fn shutdown(&self) -> Result<()> {
        info!("shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        let uri = doc.uri.to_string();
        self.open_document(&uri, doc.text, doc.version);
        self.log(MessageType::INFO, format!("Opened file: {}", uri))
            .await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        let Some(model) = self.document(&uri) else {
            warn!(%uri, "change for a document that is not open");
            return;
        };
        let version = params.text_document.version;
        let changes = params.content_changes;
        model
            .with_write_access(move |doc| {
                for change in changes {
                    doc.apply_change(change);
                }
                doc.set_client_version(version);
            })
            .await;
        debug!(%uri, version, "document changed");
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri.to_string();
        if self.close_document(&uri) {
            self.log(MessageType::INFO, format!("Closed file: {}", uri))
                .await;
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        // tower-lsp drops this future when the client cancels the request;
        // the guard turns that drop into a cancellation signal.
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();
        self.handle_completion(params, &cancel).await
    }
}
