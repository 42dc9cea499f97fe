#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use msbuild_lsp::Backend;
use msbuild_lsp::registry::{PackageRegistry, RegistryError};
use tower_lsp::LanguageServer;
use tower_lsp::lsp_types::*;

pub fn create_test_backend() -> Backend {
    Backend::new_test()
}

pub fn create_test_backend_with_registry(registry: Arc<dyn PackageRegistry>) -> Backend {
    Backend::new_test_with_registry(registry)
}

/// Split a `|` cursor marker out of `marked`, returning the text and the
/// cursor position.
pub fn split_marker(marked: &str) -> (String, Position) {
    let offset = marked.find('|').expect("text should contain a | marker");
    let before = &marked[..offset];
    let line = before.matches('\n').count() as u32;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let character = before[line_start..].encode_utf16().count() as u32;
    (marked.replacen('|', "", 1), Position { line, character })
}

pub async fn open(backend: &Backend, uri: &Url, text: &str) {
    backend
        .did_open(DidOpenTextDocumentParams {
            text_document: TextDocumentItem {
                uri: uri.clone(),
                language_id: "msbuild".to_string(),
                version: 1,
                text: text.to_string(),
            },
        })
        .await;
}

pub fn completion_params(uri: &Url, position: Position) -> CompletionParams {
    CompletionParams {
        text_document_position: TextDocumentPositionParams {
            text_document: TextDocumentIdentifier { uri: uri.clone() },
            position,
        },
        work_done_progress_params: WorkDoneProgressParams::default(),
        partial_result_params: PartialResultParams::default(),
        context: None,
    }
}

pub async fn complete(backend: &Backend, uri: &Url, position: Position) -> Option<CompletionList> {
    match backend
        .completion(completion_params(uri, position))
        .await
        .expect("completion never returns a protocol error")
    {
        Some(CompletionResponse::List(list)) => Some(list),
        Some(CompletionResponse::Array(_)) => panic!("expected a completion list"),
        None => None,
    }
}

/// Open `marked` (with a `|` cursor) and complete at the marker.
pub async fn complete_marked(backend: &Backend, uri: &str, marked: &str) -> Option<CompletionList> {
    let uri = Url::parse(uri).unwrap();
    let (text, position) = split_marker(marked);
    open(backend, &uri, &text).await;
    complete(backend, &uri, position).await
}

pub fn labels(list: &CompletionList) -> Vec<&str> {
    list.items.iter().map(|i| i.label.as_str()).collect()
}

pub fn find<'a>(list: &'a CompletionList, label: &str) -> &'a CompletionItem {
    list.items
        .iter()
        .find(|i| i.label == label)
        .unwrap_or_else(|| panic!("no completion labelled {label}"))
}

pub fn text_edit(item: &CompletionItem) -> &TextEdit {
    match item.text_edit.as_ref() {
        Some(CompletionTextEdit::Edit(edit)) => edit,
        other => panic!("expected a plain text edit, got {other:?}"),
    }
}

/// In-memory registry that records how often it was asked.
pub struct MockRegistry {
    pub packages: Vec<String>,
    pub versions: Vec<String>,
    pub delay: Option<Duration>,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockRegistry {
    pub fn new(packages: &[&str], versions: &[&str]) -> Self {
        Self {
            packages: packages.iter().map(|s| s.to_string()).collect(),
            versions: versions.iter().map(|s| s.to_string()).collect(),
            delay: None,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn respond(&self, list: &[String]) -> Result<Vec<String>, RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(RegistryError::Status {
                url: "mock://registry".to_string(),
                status: 503,
            });
        }
        Ok(list.to_vec())
    }
}

#[async_trait]
impl PackageRegistry for MockRegistry {
    /// Returns every package regardless of the query, like a registry
    /// doing fuzzy matching would.
    async fn search(&self, _query: &str, take: usize) -> Result<Vec<String>, RegistryError> {
        let mut list = self.respond(&self.packages).await?;
        list.truncate(take);
        Ok(list)
    }

    async fn versions(&self, _id: &str) -> Result<Vec<String>, RegistryError> {
        self.respond(&self.versions).await
    }
}
