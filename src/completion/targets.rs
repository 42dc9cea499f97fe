/// Target-name completions in target-list attribute values:
/// `DependsOnTargets`, `BeforeTargets` and `AfterTargets` on `<Target>`,
/// `Targets` on `<CallTarget>` and `<MSBuild>`.
///
/// Values are `;`-separated lists, so an entry replaces only the list
/// segment under the cursor.  Targets declared in the document come
/// first, imported ones after.  The enclosing target and names already
/// in the list are skipped.
use std::collections::HashSet;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::completion::provider::{CompletionProvider, ProviderError};
use crate::document::Document;
use crate::location::ResolvedLocation;
use crate::types::{CompletionEntry, Documentation, EntryKind, InsertFormat, ProviderOutput, SortKey};
use crate::util::TextRange;

const DOCUMENT_BAND: u16 = 0;
const IMPORTED_BAND: u16 = 10;

const TARGET_LIST_ATTRIBUTES: &[(&str, &str)] = &[
    ("Target", "DependsOnTargets"),
    ("Target", "BeforeTargets"),
    ("Target", "AfterTargets"),
    ("CallTarget", "Targets"),
    ("MSBuild", "Targets"),
];

#[derive(Default)]
pub struct TargetProvider;

impl TargetProvider {
    pub fn new() -> Self {
        Self
    }
}

/// The list segment around `offset` inside `value` (which starts at
/// `value_start`), whitespace trimmed.
fn segment_at(value: &str, value_start: usize, offset: usize) -> TextRange {
    let rel = offset - value_start;
    let start = value[..rel].rfind(';').map_or(0, |i| i + 1);
    let end = value[rel..].find(';').map_or(value.len(), |i| rel + i);
    let leading = value[start..rel].len() - value[start..rel].trim_start().len();
    let trailing = value[rel..end].len() - value[rel..end].trim_end().len();
    TextRange::new(value_start + start + leading, value_start + end - trailing)
}

#[async_trait]
impl CompletionProvider for TargetProvider {
    fn name(&self) -> &'static str {
        "targets"
    }

    fn priority(&self) -> u16 {
        400
    }

    async fn provide(
        &self,
        location: &ResolvedLocation,
        document: &Document,
        _cancel: &CancellationToken,
    ) -> Result<Option<ProviderOutput>, ProviderError> {
        if !TARGET_LIST_ATTRIBUTES
            .iter()
            .any(|(element, attribute)| location.is_attribute_value(element, attribute))
        {
            return Ok(None);
        }
        let Some((element, _)) = location.attribute_value() else {
            return Ok(None);
        };
        let tree = location.tree();
        let value_range = location.replace_range();
        let Some(value) = document.text().get(value_range.start..value_range.end) else {
            return Ok(None);
        };
        let range = segment_at(value, value_range.start, location.offset());

        let mut excluded: HashSet<&str> = value
            .split(';')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();
        // The segment being typed is not "already listed".
        if let Some(current) = document.text().get(range.start..range.end) {
            excluded.remove(current);
        }
        let enclosing_target = tree
            .ancestors(element)
            .chain(std::iter::once(element))
            .find(|&id| tree.node(id).name == "Target")
            .and_then(|id| tree.attribute_value(id, "Name"));
        if let Some(name) = enclosing_target {
            excluded.insert(name);
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut items = Vec::new();
        let mut push = |name: &str, band: u16, detail: &str| {
            if excluded.contains(name) || !seen.insert(name.to_string()) {
                return;
            }
            items.push(CompletionEntry {
                label: name.to_string(),
                sort_key: SortKey::new(self.priority() + band, name),
                range,
                new_text: name.to_string(),
                format: InsertFormat::PlainText,
                kind: EntryKind::Target,
                detail: Some(detail.to_string()),
                documentation: Some(Documentation::new(format!("Target `{name}`."))),
            });
        };

        for id in tree.elements() {
            if tree.node(id).name == "Target"
                && let Some(name) = tree.attribute_value(id, "Name")
            {
                push(name, DOCUMENT_BAND, "Target");
            }
        }
        if let Some(project) = document.evaluated_project().await {
            for name in &project.targets {
                push(name, IMPORTED_BAND, "Target (imported)");
            }
        }

        Ok(Some(ProviderOutput::complete(items)))
    }
}
