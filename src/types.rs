//! Data types used throughout the msbuild-lsp server.
//!
//! This module contains the completion "model" values that providers
//! produce and the engine merges: [`CompletionEntry`], its [`SortKey`] and
//! [`InsertFormat`], and the per-provider [`ProviderOutput`].  They are
//! plain values; converting them to LSP types happens in the handler.

use std::cmp::Ordering;

use crate::util::TextRange;

/// Two-part sort key: a numeric priority band, then the label.
///
/// Lower bands sort first.  Providers use the band to promote curated
/// entries ahead of generic ones; the label breaks ties.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortKey {
    pub band: u16,
    pub label: String,
}

impl SortKey {
    pub fn new(band: u16, label: impl Into<String>) -> Self {
        Self {
            band,
            label: label.into(),
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.band
            .cmp(&other.band)
            .then_with(|| self.label.cmp(&other.label))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// How the replacement text is interpreted by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertFormat {
    /// Inserted verbatim.
    PlainText,
    /// LSP snippet syntax (`$1`, `${1|a,b|}`, `$0`).
    Snippet,
}

/// What kind of thing an entry inserts; maps onto the LSP item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    Property,
    Item,
    Element,
    Attribute,
    Target,
    Package,
    Version,
}

/// Documentation shown next to a completion entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Documentation {
    pub description: String,
    pub help_link: Option<String>,
}

impl Documentation {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            help_link: None,
        }
    }

    pub fn with_help_link(mut self, link: impl Into<String>) -> Self {
        self.help_link = Some(link.into());
        self
    }

    /// Markdown rendering used for the LSP `documentation` field.
    pub fn to_markdown(&self) -> String {
        match &self.help_link {
            Some(link) => format!("{}\n\n[More information]({})", self.description, link),
            None => self.description.clone(),
        }
    }
}

/// One insertable fragment.
///
/// Entries carry no identity: two entries are the same entry when they
/// are structurally equal, which is what de-duplication relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompletionEntry {
    /// Visible label, e.g. `<OutputType>`.
    pub label: String,
    pub sort_key: SortKey,
    /// Span of the document the entry overwrites.
    pub range: TextRange,
    pub new_text: String,
    pub format: InsertFormat,
    pub kind: EntryKind,
    /// Short one-line detail (e.g. "Property").
    pub detail: Option<String>,
    pub documentation: Option<Documentation>,
}

/// A provider's answer for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderOutput {
    pub items: Vec<CompletionEntry>,
    /// The items are a truncated page of a larger result; the editor
    /// should ask again as the user keeps typing.
    pub is_incomplete: bool,
}

impl ProviderOutput {
    pub fn complete(items: Vec<CompletionEntry>) -> Self {
        Self {
            items,
            is_incomplete: false,
        }
    }

    pub fn incomplete(items: Vec<CompletionEntry>) -> Self {
        Self {
            items,
            is_incomplete: true,
        }
    }
}

/// The engine's merged, sorted answer.  Never empty: "no completions" is
/// represented by the absence of a `CompletionSet`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSet {
    pub items: Vec<CompletionEntry>,
    pub is_incomplete: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_orders_before_label() {
        let mut keys = vec![
            SortKey::new(2, "Alpha"),
            SortKey::new(0, "Zeta"),
            SortKey::new(0, "Beta"),
            SortKey::new(10, "Aardvark"),
        ];
        keys.sort();
        let labels: Vec<&str> = keys.iter().map(|k| k.label.as_str()).collect();
        // A string concatenation ("10Aardvark" < "2Alpha") would get this wrong.
        assert_eq!(labels, vec!["Beta", "Zeta", "Alpha", "Aardvark"]);
    }

    #[test]
    fn markdown_includes_help_link() {
        let doc = Documentation::new("The output type.").with_help_link("https://example.com/x");
        assert_eq!(
            doc.to_markdown(),
            "The output type.\n\n[More information](https://example.com/x)"
        );
    }
}
