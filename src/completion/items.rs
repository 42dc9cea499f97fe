/// Item-element completions inside `<ItemGroup>` and
/// `<ItemDefinitionGroup>`.
///
/// Well-known item types come with an `Include` (and, for packages,
/// `Version`) attribute already in place.  Item types defined by the
/// evaluated project follow in a lower band.
use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::completion::provider::{CompletionProvider, EntryBuilder, ProviderError, escape_snippet};
use crate::config::CompletionConfig;
use crate::document::Document;
use crate::location::ResolvedLocation;
use crate::reference::{ReferenceData, ReferenceKind};
use crate::types::{Documentation, EntryKind, ProviderOutput};

const WELL_KNOWN_BAND: u16 = 0;
const PROJECT_BAND: u16 = 20;

/// Item types whose snippet carries a `Version` attribute as well.
const VERSIONED_ITEMS: &[&str] = &["PackageReference", "PackageVersion", "DotNetCliToolReference"];

pub struct ItemProvider {
    reference: Arc<ReferenceData>,
    config: CompletionConfig,
}

impl ItemProvider {
    pub fn new(reference: Arc<ReferenceData>, config: CompletionConfig) -> Self {
        Self { reference, config }
    }
}

#[async_trait]
impl CompletionProvider for ItemProvider {
    fn name(&self) -> &'static str {
        "items"
    }

    fn priority(&self) -> u16 {
        200
    }

    async fn provide(
        &self,
        location: &ResolvedLocation,
        document: &Document,
        _cancel: &CancellationToken,
    ) -> Result<Option<ProviderOutput>, ProviderError> {
        let definitions = location.is_element_slot_under("ItemDefinitionGroup");
        if !definitions && !location.is_element_slot_under("ItemGroup") {
            return Ok(None);
        }
        let base = self.priority();
        let builder = EntryBuilder::new(location, EntryKind::Item);
        let snippet_for = |name: &str| {
            if definitions {
                definition_snippet(name)
            } else {
                item_snippet(name)
            }
        };

        let mut seen = HashSet::new();
        let mut items = Vec::new();
        for name in self.reference.names(ReferenceKind::Item) {
            seen.insert(name.to_string());
            items.push(
                builder
                    .snippet(base + WELL_KNOWN_BAND, &format!("<{name}>"), snippet_for(name))
                    .with_detail("Item")
                    .with_documentation(self.reference.documentation(ReferenceKind::Item, name)),
            );
        }

        let mut project_names_added = false;
        if self.config.project_names
            && let Some(project) = document.evaluated_project().await
        {
            for name in &project.item_types {
                if name.starts_with(&self.config.private_name_prefix) || !seen.insert(name.clone())
                {
                    continue;
                }
                project_names_added = true;
                items.push(
                    builder
                        .snippet(base + PROJECT_BAND, &format!("<{name}>"), snippet_for(name))
                        .with_detail("Item (project)")
                        .with_documentation(Some(Documentation::new(
                            "Item type used by this project or one of its imports.",
                        ))),
                );
            }
        }

        Ok(Some(ProviderOutput {
            items,
            is_incomplete: project_names_added,
        }))
    }
}

fn item_snippet(name: &str) -> String {
    let name = escape_snippet(name);
    if VERSIONED_ITEMS.contains(&name.as_str()) {
        format!("<{name} Include=\"$1\" Version=\"$2\" />$0")
    } else {
        format!("<{name} Include=\"$1\" />$0")
    }
}

fn definition_snippet(name: &str) -> String {
    let name = escape_snippet(name);
    format!("<{name}>\n\t$0\n</{name}>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentModel;
    use crate::evaluation::XmlProjectEvaluator;
    use crate::location::resolve;

    async fn complete(marked: &str) -> Option<ProviderOutput> {
        let offset = marked.find('|').unwrap();
        let text = marked.replacen('|', "", 1);
        let model = DocumentModel::new("untitled:a.proj", text.clone(), 1, Arc::new(XmlProjectEvaluator));
        let doc = model.read().await;
        let location = resolve(doc.tree(), &text, offset)?;
        ItemProvider::new(Arc::new(ReferenceData::builtin()), CompletionConfig::default())
            .provide(&location, &doc, &CancellationToken::new())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn package_reference_snippet_has_version() {
        let output = complete("<Project><ItemGroup>|</ItemGroup></Project>").await.unwrap();
        let package = output
            .items
            .iter()
            .find(|i| i.label == "<PackageReference>")
            .unwrap();
        assert_eq!(
            package.new_text,
            "<PackageReference Include=\"$1\" Version=\"$2\" />$0"
        );
        let compile = output.items.iter().find(|i| i.label == "<Compile>").unwrap();
        assert_eq!(compile.new_text, "<Compile Include=\"$1\" />$0");
        assert!(!output.is_incomplete);
    }

    #[tokio::test]
    async fn project_item_types_follow_well_known_ones() {
        let output = complete(concat!(
            "<Project><ItemGroup><Widget Include=\"a\" /><_Private Include=\"b\" /></ItemGroup>",
            "<ItemGroup>|</ItemGroup></Project>",
        ))
        .await
        .unwrap();
        let widget = output.items.iter().find(|i| i.label == "<Widget>").unwrap();
        assert_eq!(widget.sort_key.band, 200 + PROJECT_BAND);
        assert!(!output.items.iter().any(|i| i.label == "<_Private>"));
        assert!(output.is_incomplete);
    }

    #[tokio::test]
    async fn declines_in_property_groups() {
        assert!(
            complete("<Project><PropertyGroup>|</PropertyGroup></Project>")
                .await
                .is_none()
        );
    }
}
