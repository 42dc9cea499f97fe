/// The uniform provider capability.
///
/// Every unit of completion knowledge implements [`CompletionProvider`]:
/// given a resolved location and the read-locked document, return items
/// or decline.  Providers never see each other; merging, ordering and
/// the exhaustive/incomplete decision belong to the engine.
use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::document::Document;
use crate::location::ResolvedLocation;
use crate::registry::RegistryError;
use crate::types::{CompletionEntry, Documentation, EntryKind, InsertFormat, ProviderOutput, SortKey};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Stable display name, used in logs.
    fn name(&self) -> &'static str;

    /// Base of this provider's sort-key bands.  Lower sorts first.  Each
    /// provider owns the hundred bands starting here.
    fn priority(&self) -> u16;

    /// `Ok(None)` declines: the location is not one this provider knows.
    /// `Ok(Some(output))` with no items means "applies, nothing to offer".
    async fn provide(
        &self,
        location: &ResolvedLocation,
        document: &Document,
        cancel: &CancellationToken,
    ) -> Result<Option<ProviderOutput>, ProviderError>;
}

/// Shorthand for building entries that overwrite the location's
/// replacement range.
pub(crate) struct EntryBuilder<'a> {
    location: &'a ResolvedLocation,
    kind: EntryKind,
}

impl<'a> EntryBuilder<'a> {
    pub(crate) fn new(location: &'a ResolvedLocation, kind: EntryKind) -> Self {
        Self { location, kind }
    }

    pub(crate) fn plain(&self, band: u16, label: &str, new_text: String) -> CompletionEntry {
        self.entry(band, label, new_text, InsertFormat::PlainText)
    }

    pub(crate) fn snippet(&self, band: u16, label: &str, new_text: String) -> CompletionEntry {
        self.entry(band, label, new_text, InsertFormat::Snippet)
    }

    fn entry(&self, band: u16, label: &str, new_text: String, format: InsertFormat) -> CompletionEntry {
        CompletionEntry {
            label: label.to_string(),
            sort_key: SortKey::new(band, label),
            range: self.location.replace_range(),
            new_text,
            format,
            kind: self.kind,
            detail: None,
            documentation: None,
        }
    }
}

impl CompletionEntry {
    pub(crate) fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub(crate) fn with_documentation(mut self, documentation: Option<Documentation>) -> Self {
        self.documentation = documentation;
        self
    }
}

/// Escape `$`, `}` and `\` so text is inserted literally inside a snippet.
pub(crate) fn escape_snippet(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '$' | '}' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
