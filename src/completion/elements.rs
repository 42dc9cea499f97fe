/// Structural element completions: the catch-all for element slots that
/// are neither property nor item groups.
///
/// Which children are legal depends only on the parent element's name
/// (and, for `<Output>`, on the grandparent being a `<Target>`).
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::completion::provider::{CompletionProvider, EntryBuilder, ProviderError};
use crate::document::Document;
use crate::location::ResolvedLocation;
use crate::reference::{ReferenceData, ReferenceKind};
use crate::types::{CompletionEntry, EntryKind, ProviderOutput};

const STRUCTURE_BAND: u16 = 0;
const TASK_BAND: u16 = 10;

/// (element, snippet) for elements that are not tasks.
const STRUCTURAL: &[(&str, &str)] = &[
    ("PropertyGroup", "<PropertyGroup>\n\t$0\n</PropertyGroup>"),
    ("ItemGroup", "<ItemGroup>\n\t$0\n</ItemGroup>"),
    ("ItemDefinitionGroup", "<ItemDefinitionGroup>\n\t$0\n</ItemDefinitionGroup>"),
    ("Target", "<Target Name=\"$1\">\n\t$0\n</Target>"),
    ("Import", "<Import Project=\"$1\" />$0"),
    ("ImportGroup", "<ImportGroup>\n\t$0\n</ImportGroup>"),
    ("Choose", "<Choose>\n\t<When Condition=\"$1\">\n\t\t$0\n\t</When>\n</Choose>"),
    ("When", "<When Condition=\"$1\">\n\t$0\n</When>"),
    ("Otherwise", "<Otherwise>\n\t$0\n</Otherwise>"),
    ("UsingTask", "<UsingTask TaskName=\"$1\" AssemblyFile=\"$2\" />$0"),
    ("Sdk", "<Sdk Name=\"$1\" />$0"),
    ("ProjectExtensions", "<ProjectExtensions>\n\t$0\n</ProjectExtensions>"),
    ("OnError", "<OnError ExecuteTargets=\"$1\" />$0"),
    ("Output", "<Output TaskParameter=\"$1\" PropertyName=\"$2\" />$0"),
];

/// (task, snippet) for the built-in tasks offered inside targets.
const TASKS: &[(&str, &str)] = &[
    ("Message", "<Message Text=\"$1\" Importance=\"${2|high,normal,low|}\" />$0"),
    ("Warning", "<Warning Text=\"$1\" />$0"),
    ("Error", "<Error Text=\"$1\" />$0"),
    ("Exec", "<Exec Command=\"$1\" />$0"),
    ("Copy", "<Copy SourceFiles=\"$1\" DestinationFolder=\"$2\" />$0"),
    ("Delete", "<Delete Files=\"$1\" />$0"),
    ("MakeDir", "<MakeDir Directories=\"$1\" />$0"),
    ("RemoveDir", "<RemoveDir Directories=\"$1\" />$0"),
    ("Touch", "<Touch Files=\"$1\" />$0"),
    ("CallTarget", "<CallTarget Targets=\"$1\" />$0"),
    ("MSBuild", "<MSBuild Projects=\"$1\" />$0"),
    ("WriteLinesToFile", "<WriteLinesToFile File=\"$1\" Lines=\"$2\" />$0"),
    ("ReadLinesFromFile", "<ReadLinesFromFile File=\"$1\">\n\t<Output TaskParameter=\"Lines\" ItemName=\"$2\" />\n</ReadLinesFromFile>$0"),
    ("Csc", "<Csc Sources=\"$1\" />$0"),
];

/// Structural children allowed under each parent.
fn structural_children(parent: &str) -> &'static [&'static str] {
    match parent {
        "Project" => &[
            "PropertyGroup",
            "ItemGroup",
            "ItemDefinitionGroup",
            "Target",
            "Import",
            "ImportGroup",
            "Choose",
            "UsingTask",
            "Sdk",
            "ProjectExtensions",
        ],
        "Target" => &["PropertyGroup", "ItemGroup", "OnError"],
        "Choose" => &["When", "Otherwise"],
        "When" | "Otherwise" => &["PropertyGroup", "ItemGroup", "Choose"],
        "ImportGroup" => &["Import"],
        _ => &[],
    }
}

pub struct ElementProvider {
    reference: Arc<ReferenceData>,
}

impl ElementProvider {
    pub fn new(reference: Arc<ReferenceData>) -> Self {
        Self { reference }
    }

    fn entry(
        &self,
        builder: &EntryBuilder<'_>,
        band: u16,
        name: &str,
        snippet: &str,
        kind: ReferenceKind,
    ) -> CompletionEntry {
        builder
            .snippet(band, &format!("<{name}>"), snippet.to_string())
            .with_detail(match kind {
                ReferenceKind::Task => "Task",
                _ => "Element",
            })
            .with_documentation(self.reference.documentation(kind, name))
    }
}

#[async_trait]
impl CompletionProvider for ElementProvider {
    fn name(&self) -> &'static str {
        "elements"
    }

    fn priority(&self) -> u16 {
        900
    }

    async fn provide(
        &self,
        location: &ResolvedLocation,
        _document: &Document,
        _cancel: &CancellationToken,
    ) -> Result<Option<ProviderOutput>, ProviderError> {
        let Some(parent) = location.element_slot_parent() else {
            return Ok(None);
        };
        let tree = location.tree();
        let parent_name = tree.node(parent).name.as_str();
        let grandparent_name = tree.parent(parent).map(|id| tree.node(id).name.as_str());
        let base = self.priority();
        let builder = EntryBuilder::new(location, EntryKind::Element);

        let mut items: Vec<CompletionEntry> = structural_children(parent_name)
            .iter()
            .filter_map(|child| STRUCTURAL.iter().find(|(name, _)| name == child))
            .map(|(name, snippet)| {
                self.entry(&builder, base + STRUCTURE_BAND, name, snippet, ReferenceKind::Element)
            })
            .collect();

        if parent_name == "Target" {
            items.extend(TASKS.iter().map(|(name, snippet)| {
                self.entry(&builder, base + TASK_BAND, name, snippet, ReferenceKind::Task)
            }));
        }

        // Task elements inside a target take <Output> children.
        if grandparent_name == Some("Target")
            && !matches!(parent_name, "PropertyGroup" | "ItemGroup" | "OnError")
            && let Some((name, snippet)) = STRUCTURAL.iter().find(|(name, _)| *name == "Output")
        {
            items.push(self.entry(&builder, base + STRUCTURE_BAND, name, snippet, ReferenceKind::Element));
        }

        if items.is_empty() {
            return Ok(None);
        }
        Ok(Some(ProviderOutput::complete(items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentModel;
    use crate::evaluation::NoEvaluation;
    use crate::location::resolve;

    async fn labels(marked: &str) -> Option<Vec<String>> {
        let offset = marked.find('|').unwrap();
        let text = marked.replacen('|', "", 1);
        let model = DocumentModel::new("untitled:a.proj", text.clone(), 1, Arc::new(NoEvaluation));
        let doc = model.read().await;
        let location = resolve(doc.tree(), &text, offset)?;
        let output = ElementProvider::new(Arc::new(ReferenceData::builtin()))
            .provide(&location, &doc, &CancellationToken::new())
            .await
            .unwrap()?;
        Some(output.items.into_iter().map(|i| i.label).collect())
    }

    #[tokio::test]
    async fn project_children() {
        let labels = labels("<Project>\n  |\n</Project>").await.unwrap();
        assert!(labels.contains(&"<PropertyGroup>".to_string()));
        assert!(labels.contains(&"<Target>".to_string()));
        assert!(!labels.contains(&"<Message>".to_string()));
    }

    #[tokio::test]
    async fn targets_offer_tasks() {
        let labels = labels("<Project><Target Name=\"Build\">|</Target></Project>")
            .await
            .unwrap();
        assert!(labels.contains(&"<Message>".to_string()));
        assert!(labels.contains(&"<ItemGroup>".to_string()));
    }

    #[tokio::test]
    async fn tasks_offer_output() {
        let labels = labels("<Project><Target Name=\"B\"><Exec Command=\"x\">|</Exec></Target></Project>")
            .await
            .unwrap();
        assert_eq!(labels, vec!["<Output>".to_string()]);
    }

    #[tokio::test]
    async fn declines_in_property_groups() {
        assert!(labels("<Project><PropertyGroup>|</PropertyGroup></Project>").await.is_none());
    }
}
