/// Attribute-name completions inside a start tag.
///
/// The legal set depends on the element name, falling back on the
/// parent's name for items (under `ItemGroup`), properties (under
/// `PropertyGroup`) and tasks (under `Target`).  Attributes already on
/// the element are not offered again.
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::completion::provider::{CompletionProvider, EntryBuilder, ProviderError, escape_snippet};
use crate::document::Document;
use crate::location::ResolvedLocation;
use crate::reference::{ReferenceData, ReferenceKind};
use crate::types::{EntryKind, ProviderOutput};

const ITEM_ATTRIBUTES: &[&str] = &["Include", "Exclude", "Remove", "Update", "Condition", "Label"];
const GROUP_ATTRIBUTES: &[&str] = &["Condition", "Label"];
const TASK_ATTRIBUTES: &[&str] = &["Condition", "ContinueOnError"];

fn element_attributes(name: &str) -> Option<&'static [&'static str]> {
    let attributes: &'static [&'static str] = match name {
        "Project" => &[
            "Sdk",
            "DefaultTargets",
            "InitialTargets",
            "ToolsVersion",
            "TreatAsLocalProperty",
        ],
        "Target" => &[
            "Name",
            "DependsOnTargets",
            "BeforeTargets",
            "AfterTargets",
            "Inputs",
            "Outputs",
            "Returns",
            "KeepDuplicateOutputs",
            "Condition",
            "Label",
        ],
        "Import" => &["Project", "Sdk", "Condition", "Label"],
        "PropertyGroup" | "ItemGroup" | "ItemDefinitionGroup" | "ImportGroup" | "When" => {
            GROUP_ATTRIBUTES
        }
        "UsingTask" => &[
            "TaskName",
            "AssemblyFile",
            "AssemblyName",
            "TaskFactory",
            "Condition",
        ],
        "Sdk" => &["Name", "Version"],
        "OnError" => &["ExecuteTargets", "Condition"],
        "Output" => &["TaskParameter", "ItemName", "PropertyName", "Condition"],
        "PackageReference" | "PackageVersion" => &[
            "Include",
            "Version",
            "PrivateAssets",
            "IncludeAssets",
            "ExcludeAssets",
            "VersionOverride",
            "Update",
            "Remove",
            "Exclude",
            "Condition",
        ],
        "Message" => &["Text", "Importance", "Condition", "ContinueOnError"],
        "Warning" | "Error" => &["Text", "Condition", "ContinueOnError"],
        "Exec" => &["Command", "WorkingDirectory", "Condition", "ContinueOnError"],
        "Copy" => &["SourceFiles", "DestinationFolder", "Condition", "ContinueOnError"],
        "Delete" | "Touch" => &["Files", "Condition", "ContinueOnError"],
        "MakeDir" | "RemoveDir" => &["Directories", "Condition", "ContinueOnError"],
        "CallTarget" => &["Targets", "Condition", "ContinueOnError"],
        "MSBuild" => &["Projects", "Targets", "Condition", "ContinueOnError"],
        _ => return None,
    };
    Some(attributes)
}

pub struct AttributeProvider {
    reference: Arc<ReferenceData>,
}

impl AttributeProvider {
    pub fn new(reference: Arc<ReferenceData>) -> Self {
        Self { reference }
    }
}

#[async_trait]
impl CompletionProvider for AttributeProvider {
    fn name(&self) -> &'static str {
        "attributes"
    }

    fn priority(&self) -> u16 {
        300
    }

    async fn provide(
        &self,
        location: &ResolvedLocation,
        _document: &Document,
        _cancel: &CancellationToken,
    ) -> Result<Option<ProviderOutput>, ProviderError> {
        let Some(element) = location.attribute_slot_element() else {
            return Ok(None);
        };
        let tree = location.tree();
        let name = tree.node(element).name.as_str();
        let parent_name = tree.parent(element).map(|id| tree.node(id).name.as_str());

        let legal = element_attributes(name).or(match parent_name {
            Some("ItemGroup") => Some(ITEM_ATTRIBUTES),
            Some("PropertyGroup") => Some(&["Condition"][..]),
            Some("Target") => Some(TASK_ATTRIBUTES),
            _ => None,
        });
        let Some(legal) = legal else {
            return Ok(None);
        };

        let existing = location.existing_attribute_names();
        let builder = EntryBuilder::new(location, EntryKind::Attribute);
        let items = legal
            .iter()
            .enumerate()
            .filter(|(_, attribute)| !existing.contains(*attribute))
            .map(|(rank, attribute)| {
                // Keep the table order: most useful attributes first.
                builder
                    .snippet(
                        self.priority() + rank as u16,
                        attribute,
                        format!("{}=\"$1\"$0", escape_snippet(attribute)),
                    )
                    .with_detail("Attribute")
                    .with_documentation(
                        self.reference
                            .documentation(ReferenceKind::Attribute, attribute),
                    )
            })
            .collect();
        Ok(Some(ProviderOutput::complete(items)))
    }
}
