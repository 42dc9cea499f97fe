/// Package identifier and version completions backed by a remote
/// registry.
///
/// Applies to the `Include` and `Version` values of `<PackageReference>`
/// and `<PackageVersion>`.  One page-limited query is issued per request;
/// the results are filtered client-side against what was typed, because
/// the registry's own matching is looser than a prefix match.  Whenever
/// the filter dropped something, or the page came back full, the output
/// is flagged incomplete so the editor asks again as the user types.
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::completion::provider::{CompletionProvider, ProviderError};
use crate::document::Document;
use crate::location::ResolvedLocation;
use crate::registry::PackageRegistry;
use crate::types::{CompletionEntry, EntryKind, InsertFormat, ProviderOutput, SortKey};

const PACKAGE_ELEMENTS: &[&str] = &["PackageReference", "PackageVersion"];

enum Lookup<'a> {
    Identifier,
    Version { id: &'a str },
}

pub struct PackageProvider {
    registry: Arc<dyn PackageRegistry>,
    page_size: usize,
}

impl PackageProvider {
    pub fn new(registry: Arc<dyn PackageRegistry>, page_size: usize) -> Self {
        Self {
            registry,
            page_size: page_size.max(1),
        }
    }

    fn lookup<'a>(&self, location: &'a ResolvedLocation) -> Option<Lookup<'a>> {
        let element = PACKAGE_ELEMENTS
            .iter()
            .find(|name| location.nearest_element_name() == **name)?;
        if location.is_attribute_value(element, "Include") {
            return Some(Lookup::Identifier);
        }
        if location.is_attribute_value(element, "Version") {
            let (owner, _) = location.attribute_value()?;
            let tree = location.tree();
            let id = tree
                .attribute_value(owner, "Include")
                .or_else(|| tree.attribute_value(owner, "Update"))?
                .trim();
            if id.is_empty() || id.contains("$(") {
                return None;
            }
            return Some(Lookup::Version { id });
        }
        None
    }
}

/// Keep the results matching `typed`; report whether anything was
/// dropped.
fn filter_matches(results: Vec<String>, typed: &str, case_insensitive: bool) -> (Vec<String>, bool) {
    let total = results.len();
    let typed_lower = typed.to_lowercase();
    let kept: Vec<String> = results
        .into_iter()
        .filter(|candidate| {
            if case_insensitive {
                candidate.to_lowercase().starts_with(&typed_lower)
            } else {
                candidate.starts_with(typed)
            }
        })
        .collect();
    let dropped = kept.len() < total;
    (kept, dropped)
}

#[async_trait]
impl CompletionProvider for PackageProvider {
    fn name(&self) -> &'static str {
        "packages"
    }

    fn priority(&self) -> u16 {
        500
    }

    async fn provide(
        &self,
        location: &ResolvedLocation,
        _document: &Document,
        cancel: &CancellationToken,
    ) -> Result<Option<ProviderOutput>, ProviderError> {
        let Some(lookup) = self.lookup(location) else {
            return Ok(None);
        };
        let typed = location.partial().trim_start();

        let request = async {
            match &lookup {
                Lookup::Identifier => self.registry.search(typed, self.page_size).await,
                Lookup::Version { id } => self.registry.versions(id).await,
            }
        };
        let results = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("package lookup cancelled");
                return Ok(None);
            }
            results = request => results?,
        };

        let page_full = results.len() >= self.page_size;
        let (kind, matches, dropped) = match lookup {
            Lookup::Identifier => {
                let (kept, dropped) = filter_matches(results, typed, true);
                (EntryKind::Package, kept, dropped)
            }
            Lookup::Version { .. } => {
                let (mut kept, dropped) = filter_matches(results, typed, false);
                // Registries list versions oldest first.
                kept.reverse();
                (EntryKind::Version, kept, dropped)
            }
        };

        let range = location.replace_range();
        let items = matches
            .into_iter()
            .enumerate()
            .map(|(rank, value)| CompletionEntry {
                // Registry order is meaningful; keep it through the sort.
                sort_key: SortKey::new(self.priority(), format!("{rank:05}")),
                label: value.clone(),
                range,
                new_text: value,
                format: InsertFormat::PlainText,
                kind,
                detail: Some(match kind {
                    EntryKind::Version => "Package version".to_string(),
                    _ => "Package".to_string(),
                }),
                documentation: None,
            })
            .collect();

        Ok(Some(ProviderOutput {
            items,
            is_incomplete: dropped || page_full,
        }))
    }
}
