//! The per-document model.
//!
//! A [`DocumentModel`] owns one open document: its text, parsed tree, line
//! index, version counter and lazily evaluated project view, all behind a
//! single `tokio::sync::RwLock`.  Completion requests are readers and run
//! concurrently; edits are writers and exclude everyone.  Every lock
//! acquisition is a guard, so the lock is released on return, early exit,
//! cancellation (the future being dropped) or panic.
//!
//! The evaluated-project view lives in an [`EvaluationCell`] that is
//! replaced wholesale on every write.  Readers that need the view share a
//! single build of it and see either the finished snapshot or nothing.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{OnceCell, RwLock, RwLockReadGuard};
use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::TextDocumentContentChangeEvent;
use tracing::{debug, trace};

use crate::evaluation::{EvaluatedProject, EvaluationError, EvaluationInput, ProjectEvaluator};
use crate::parser::{self, SyntaxTree};
use crate::util::{LineIndex, TextRange, apply_edit};

type EvaluationOutcome = Result<Arc<EvaluatedProject>, Arc<EvaluationError>>;

/// Observable state of a document's evaluated-project view.
#[derive(Debug, Clone)]
pub enum EvaluationState {
    /// Nobody has asked for it since the last edit.
    Absent,
    /// A reader is building it right now.
    Rebuilding,
    Ready(Arc<EvaluatedProject>),
    /// Evaluation failed; the reason is kept for logging.
    Unavailable(String),
}

impl EvaluationState {
    pub fn is_valid(&self) -> bool {
        matches!(self, EvaluationState::Ready(_))
    }
}

/// Lazily computed evaluation for one document version.
#[derive(Debug, Default)]
pub struct EvaluationCell {
    outcome: OnceCell<EvaluationOutcome>,
    building: AtomicBool,
}

impl EvaluationCell {
    pub fn state(&self) -> EvaluationState {
        match self.outcome.get() {
            Some(Ok(project)) => EvaluationState::Ready(Arc::clone(project)),
            Some(Err(err)) => EvaluationState::Unavailable(err.to_string()),
            None if self.building.load(Ordering::Acquire) => EvaluationState::Rebuilding,
            None => EvaluationState::Absent,
        }
    }

    /// Build the view (once) and return it.  Concurrent callers wait for
    /// the same build.  If the building caller is cancelled, the next
    /// caller starts over; no half-built value is ever stored.
    async fn get_or_evaluate(
        &self,
        evaluator: &Arc<dyn ProjectEvaluator>,
        input: EvaluationInput,
    ) -> &EvaluationOutcome {
        self.outcome
            .get_or_init(|| async {
                let _building = BuildingFlag::set(&self.building);
                let evaluator = Arc::clone(evaluator);
                let result = tokio::task::spawn_blocking(move || evaluator.evaluate(&input)).await;
                match result {
                    Ok(Ok(project)) => Ok(Arc::new(project)),
                    Ok(Err(err)) => Err(Arc::new(err)),
                    Err(join_err) => Err(Arc::new(EvaluationError::Task(join_err.to_string()))),
                }
            })
            .await
    }
}

/// Raises the "building" flag for as long as it lives.
struct BuildingFlag<'a>(&'a AtomicBool);

impl<'a> BuildingFlag<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for BuildingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// One open document.  Only reachable through a [`DocumentModel`] lock.
pub struct Document {
    uri: String,
    path: Option<PathBuf>,
    text: String,
    tree: Arc<SyntaxTree>,
    line_index: LineIndex,
    /// Bumped on every write.
    version: u64,
    /// The version number the client sent with its last change.
    client_version: i32,
    evaluation: Arc<EvaluationCell>,
    evaluator: Arc<dyn ProjectEvaluator>,
    dirty: bool,
}

impl Document {
    fn new(uri: &str, text: String, client_version: i32, evaluator: Arc<dyn ProjectEvaluator>) -> Self {
        let path = crate::uri_to_path(uri);
        let tree = Arc::new(parser::parse(&text));
        let line_index = LineIndex::new(&text);
        Self {
            uri: uri.to_string(),
            path,
            text,
            tree,
            line_index,
            version: 1,
            client_version,
            evaluation: Arc::new(EvaluationCell::default()),
            evaluator,
            dirty: false,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tree(&self) -> &Arc<SyntaxTree> {
        &self.tree
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn client_version(&self) -> i32 {
        self.client_version
    }

    pub fn evaluation_state(&self) -> EvaluationState {
        self.evaluation.state()
    }

    /// The evaluated-project view, building it if needed.
    ///
    /// `None` means "unavailable": evaluation failed or is disabled.
    /// Callers fall back to what they know statically.
    pub async fn evaluated_project(&self) -> Option<Arc<EvaluatedProject>> {
        let input = EvaluationInput {
            path: self.path.clone(),
            tree: Arc::clone(&self.tree),
        };
        match self.evaluation.get_or_evaluate(&self.evaluator, input).await {
            Ok(project) => Some(Arc::clone(project)),
            Err(err) => {
                debug!(uri = %self.uri, %err, "project evaluation unavailable");
                None
            }
        }
    }

    /// Replace the whole text.
    pub fn replace_text(&mut self, text: String) {
        self.text = text;
        self.line_index = LineIndex::new(&self.text);
        self.dirty = true;
    }

    /// Apply one change event from the client: a ranged edit, or a full
    /// replacement when the event has no range.
    pub fn apply_change(&mut self, change: TextDocumentContentChangeEvent) {
        let Some(range) = change.range else {
            self.replace_text(change.text);
            return;
        };
        let start = self
            .line_index
            .offset(&self.text, range.start)
            .unwrap_or(self.text.len());
        let end = self
            .line_index
            .offset(&self.text, range.end)
            .unwrap_or(self.text.len())
            .max(start);
        let text = apply_edit(&self.text, TextRange::new(start, end), &change.text);
        self.replace_text(text);
    }

    pub fn set_client_version(&mut self, version: i32) {
        self.client_version = version;
    }

    /// Finish a write: re-parse if the text changed, bump the version and
    /// drop the evaluated view so the next reader rebuilds it.
    fn commit(&mut self) {
        if self.dirty {
            self.tree = Arc::new(parser::parse(&self.text));
            self.dirty = false;
        }
        self.version += 1;
        self.evaluation = Arc::new(EvaluationCell::default());
        trace!(uri = %self.uri, version = self.version, "document updated");
    }
}

/// Reader/writer access to one [`Document`].
pub struct DocumentModel {
    state: RwLock<Document>,
}

impl DocumentModel {
    pub fn new(
        uri: &str,
        text: String,
        client_version: i32,
        evaluator: Arc<dyn ProjectEvaluator>,
    ) -> Self {
        Self {
            state: RwLock::new(Document::new(uri, text, client_version, evaluator)),
        }
    }

    /// Acquire shared access.  Suspends while a write is in progress.
    pub async fn read(&self) -> RwLockReadGuard<'_, Document> {
        self.state.read().await
    }

    /// Acquire shared access unless `cancel` fires first.
    pub async fn read_cancellable(
        &self,
        cancel: &CancellationToken,
    ) -> Option<RwLockReadGuard<'_, Document>> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            guard = self.state.read() => Some(guard),
        }
    }

    /// Run `f` with a consistent, read-only view of the document.
    pub async fn with_read_access<R>(&self, f: impl FnOnce(&Document) -> R) -> R {
        let guard = self.state.read().await;
        f(&guard)
    }

    /// Run `f` with exclusive access, then commit: the tree is re-parsed,
    /// the evaluated view is reset and the version increments.
    pub async fn with_write_access<R>(&self, f: impl FnOnce(&mut Document) -> R) -> R {
        let mut guard = self.state.write().await;
        let result = f(&mut guard);
        guard.commit();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{NoEvaluation, XmlProjectEvaluator};
    use tower_lsp::lsp_types::{Position, Range};

    fn model(text: &str) -> DocumentModel {
        DocumentModel::new(
            "file:///tmp/test.proj",
            text.to_string(),
            1,
            Arc::new(XmlProjectEvaluator),
        )
    }

    #[tokio::test]
    async fn writes_bump_version_and_reparse() {
        let model = model("<Project></Project>");
        let before = model.with_read_access(|doc| doc.version()).await;
        model
            .with_write_access(|doc| {
                doc.replace_text("<Project><PropertyGroup /></Project>".to_string());
            })
            .await;
        model
            .with_read_access(|doc| {
                assert_eq!(doc.version(), before + 1);
                assert_eq!(doc.tree().elements().count(), 2);
            })
            .await;
    }

    #[tokio::test]
    async fn ranged_changes_are_applied_in_order() {
        let model = model("<Project>\n</Project>");
        model
            .with_write_access(|doc| {
                doc.apply_change(TextDocumentContentChangeEvent {
                    range: Some(Range {
                        start: Position {
                            line: 0,
                            character: 9,
                        },
                        end: Position {
                            line: 0,
                            character: 9,
                        },
                    }),
                    range_length: None,
                    text: "<A />".to_string(),
                });
                doc.apply_change(TextDocumentContentChangeEvent {
                    range: Some(Range {
                        start: Position {
                            line: 0,
                            character: 10,
                        },
                        end: Position {
                            line: 0,
                            character: 11,
                        },
                    }),
                    range_length: None,
                    text: "B".to_string(),
                });
            })
            .await;
        let text = model.with_read_access(|doc| doc.text().to_string()).await;
        assert_eq!(text, "<Project><B />\n</Project>");
    }

    #[tokio::test]
    async fn evaluation_is_lazy_and_reset_by_writes() {
        let model = model("<Project><PropertyGroup><Foo>1</Foo></PropertyGroup></Project>");
        {
            let doc = model.read().await;
            assert!(matches!(doc.evaluation_state(), EvaluationState::Absent));
            let project = doc.evaluated_project().await.unwrap();
            assert!(project.has_property("Foo"));
            assert!(doc.evaluation_state().is_valid());
        }
        model
            .with_write_access(|doc| doc.replace_text("<Project><".to_string()))
            .await;
        let doc = model.read().await;
        assert!(matches!(doc.evaluation_state(), EvaluationState::Absent));
        assert!(doc.evaluated_project().await.is_none());
        assert!(matches!(
            doc.evaluation_state(),
            EvaluationState::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn disabled_evaluation_is_unavailable() {
        let model = DocumentModel::new(
            "untitled:Untitled-1",
            "<Project />".to_string(),
            1,
            Arc::new(NoEvaluation),
        );
        let doc = model.read().await;
        assert!(doc.evaluated_project().await.is_none());
    }

    #[tokio::test]
    async fn cancelled_read_returns_none() {
        let model = model("<Project />");
        let _writer = model.state.write().await;
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(model.read_cancellable(&cancel).await.is_none());
    }
}
