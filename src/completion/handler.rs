/// Completion request orchestration.
///
/// `handle_completion` is called by `LanguageServer::completion`.  It
/// takes the document's read lock for the whole request, resolves the
/// cursor, runs the engine and converts the merged set into an LSP
/// `CompletionList`.  Every failure along the way is "no completions".
use tokio_util::sync::CancellationToken;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tracing::trace;

use crate::Backend;
use crate::location::resolve;
use crate::types::{CompletionEntry, CompletionSet, EntryKind, InsertFormat};
use crate::util::LineIndex;

impl Backend {
    pub(crate) async fn handle_completion(
        &self,
        params: CompletionParams,
        cancel: &CancellationToken,
    ) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri.to_string();
        let position = params.text_document_position.position;

        let Some(model) = self.document(&uri) else {
            return Ok(None);
        };
        let Some(doc) = model.read_cancellable(cancel).await else {
            return Ok(None);
        };
        let Some(offset) = doc.line_index().offset(doc.text(), position) else {
            return Ok(None);
        };
        let Some(location) = resolve(doc.tree(), doc.text(), offset) else {
            trace!(%uri, offset, "no completion location");
            return Ok(None);
        };

        let engine = self.engine();
        let Some(set) = engine.complete_at(&location, &doc, cancel).await else {
            return Ok(None);
        };
        let list = to_completion_list(&set, doc.text(), doc.line_index());
        Ok(Some(CompletionResponse::List(list)))
    }
}

/// Convert the engine's answer to the wire type.  `sort_text` is the
/// zero-padded rank, so the editor keeps the engine's order.
pub(crate) fn to_completion_list(set: &CompletionSet, text: &str, index: &LineIndex) -> CompletionList {
    let width = set.items.len().to_string().len();
    let items = set
        .items
        .iter()
        .enumerate()
        .map(|(rank, entry)| to_completion_item(entry, format!("{rank:0width$}"), text, index))
        .collect();
    CompletionList {
        is_incomplete: set.is_incomplete,
        items,
    }
}

fn to_completion_item(
    entry: &CompletionEntry,
    sort_text: String,
    text: &str,
    index: &LineIndex,
) -> CompletionItem {
    CompletionItem {
        label: entry.label.clone(),
        kind: Some(item_kind(entry.kind)),
        detail: entry.detail.clone(),
        documentation: entry.documentation.as_ref().map(|doc| {
            Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value: doc.to_markdown(),
            })
        }),
        sort_text: Some(sort_text),
        insert_text_format: Some(match entry.format {
            InsertFormat::PlainText => InsertTextFormat::PLAIN_TEXT,
            InsertFormat::Snippet => InsertTextFormat::SNIPPET,
        }),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit {
            range: index.range(text, entry.range),
            new_text: entry.new_text.clone(),
        })),
        ..CompletionItem::default()
    }
}

fn item_kind(kind: EntryKind) -> CompletionItemKind {
    match kind {
        EntryKind::Property => CompletionItemKind::PROPERTY,
        EntryKind::Item => CompletionItemKind::CLASS,
        EntryKind::Element => CompletionItemKind::KEYWORD,
        EntryKind::Attribute => CompletionItemKind::FIELD,
        EntryKind::Target => CompletionItemKind::FUNCTION,
        EntryKind::Package => CompletionItemKind::MODULE,
        EntryKind::Version => CompletionItemKind::VALUE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Documentation as EntryDocumentation, SortKey};
    use crate::util::TextRange;

    #[test]
    fn ranks_are_zero_padded_and_edits_mapped() {
        let text = "<Project>\n  <Pro\n</Project>";
        let index = LineIndex::new(text);
        let start = text.find("<Pro\n").unwrap();
        let entries: Vec<CompletionEntry> = (0..12)
            .map(|i| CompletionEntry {
                label: format!("<P{i}>"),
                sort_key: SortKey::new(0, format!("<P{i}>")),
                range: TextRange::new(start, start + 4),
                new_text: format!("<P{i}>$1</P{i}>"),
                format: InsertFormat::Snippet,
                kind: EntryKind::Property,
                detail: None,
                documentation: Some(EntryDocumentation::new("doc")),
            })
            .collect();
        let list = to_completion_list(
            &CompletionSet {
                items: entries,
                is_incomplete: false,
            },
            text,
            &index,
        );
        assert_eq!(list.items[0].sort_text.as_deref(), Some("00"));
        assert_eq!(list.items[11].sort_text.as_deref(), Some("11"));
        let Some(CompletionTextEdit::Edit(edit)) = &list.items[3].text_edit else {
            panic!("expected a text edit");
        };
        assert_eq!(edit.range.start, Position { line: 1, character: 2 });
        assert_eq!(edit.range.end, Position { line: 1, character: 6 });
        assert_eq!(list.items[3].insert_text_format, Some(InsertTextFormat::SNIPPET));
    }
}
