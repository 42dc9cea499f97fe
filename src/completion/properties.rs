/// Property-element completions inside `<PropertyGroup>`.
///
/// Three tiers, de-duplicated by exact property name (first wins):
/// - curated properties with closed-choice snippets (`OutputType`,
///   `Nullable`, boolean switches ...)
/// - every other documented well-known property, as an open snippet
/// - properties the evaluated project defines, minus private ones, in a
///   lower band with a disclaiming description
///
/// The list is only flagged incomplete when project-defined names were
/// added, since those change as the project is edited.
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

const CURATED_BAND: u16 = 0;
const WELL_KNOWN_BAND: u16 = 10;
const PROJECT_BAND: u16 = 20;

const BOOLEAN: &str = "true,false";

/// Properties with a closed set of sensible values.
const CURATED: &[(&str, &str)] = &[
    ("OutputType", "Exe,Library,WinExe,Module"),
    (
        "TargetFramework",
        "net8.0,net9.0,netstandard2.0,netstandard2.1,net48,net472",
    ),
    ("Nullable", "enable,disable,warnings,annotations"),
    ("ImplicitUsings", "enable,disable"),
    ("LangVersion", "latest,preview,latestMajor,default"),
    ("Configuration", "Debug,Release"),
    ("Platform", "AnyCPU,x86,x64,ARM64"),
    ("DebugType", "portable,embedded,full,pdbonly,none"),
    ("TreatWarningsAsErrors", BOOLEAN),
    ("GenerateDocumentationFile", BOOLEAN),
    ("IsPackable", BOOLEAN),
    ("SelfContained", BOOLEAN),
    ("PublishSingleFile", BOOLEAN),
    ("PublishTrimmed", BOOLEAN),
    ("PublishAot", BOOLEAN),
    ("InvariantGlobalization", BOOLEAN),
    ("AllowUnsafeBlocks", BOOLEAN),
    ("Deterministic", BOOLEAN),
    ("Optimize", BOOLEAN),
    ("EnableDefaultItems", BOOLEAN),
    ("EnableDefaultCompileItems", BOOLEAN),
    ("ManagePackageVersionsCentrally", BOOLEAN),
    ("UseWindowsForms", BOOLEAN),
    ("UseWPF", BOOLEAN),
];

const PROJECT_PROPERTY_DESCRIPTION: &str =
    "Property defined by this project or one of its imports. It is not documented and may not be meant to be set here.";

pub struct PropertyProvider {
    reference: Arc<ReferenceData>,
    config: CompletionConfig,
}

impl PropertyProvider {
    pub fn new(reference: Arc<ReferenceData>, config: CompletionConfig) -> Self {
        Self { reference, config }
    }

    fn documentation(&self, name: &str) -> Option<Documentation> {
        self.reference.documentation(ReferenceKind::Property, name)
    }
}

#[async_trait]
impl CompletionProvider for PropertyProvider {
    fn name(&self) -> &'static str {
        "properties"
    }

    fn priority(&self) -> u16 {
        100
    }

    async fn provide(
        &self,
        location: &ResolvedLocation,
        document: &Document,
        _cancel: &CancellationToken,
    ) -> Result<Option<ProviderOutput>, ProviderError> {
        if !location.is_element_slot_under("PropertyGroup") {
            return Ok(None);
        }
        let base = self.priority();
        let builder = EntryBuilder::new(location, EntryKind::Property);
        let mut seen: HashSet<String> = HashSet::new();
        let mut items = Vec::new();

        for &(name, choices) in CURATED {
            seen.insert(name.to_string());
            let snippet = format!("<{name}>${{1|{choices}|}}</{name}>$0");
            items.push(
                builder
                    .snippet(base + CURATED_BAND, &format!("<{name}>"), snippet)
                    .with_detail("Property")
                    .with_documentation(self.documentation(name)),
            );
        }

        for name in self.reference.names(ReferenceKind::Property) {
            if !seen.insert(name.to_string()) {
                continue;
            }
            items.push(
                builder
                    .snippet(base + WELL_KNOWN_BAND, &format!("<{name}>"), open_snippet(name))
                    .with_detail("Property")
                    .with_documentation(self.documentation(name)),
            );
        }

        let mut project_names_added = false;
        if self.config.project_names
            && let Some(project) = document.evaluated_project().await
        {
            for name in &project.properties {
                if name.starts_with(&self.config.private_name_prefix) || !seen.insert(name.clone())
                {
                    continue;
                }
                project_names_added = true;
                items.push(
                    builder
                        .snippet(base + PROJECT_BAND, &format!("<{name}>"), open_snippet(name))
                        .with_detail("Property (project)")
                        .with_documentation(Some(Documentation::new(PROJECT_PROPERTY_DESCRIPTION))),
                );
            }
        }

        Ok(Some(ProviderOutput {
            items,
            is_incomplete: project_names_added,
        }))
    }
}

fn open_snippet(name: &str) -> String {
    let name = escape_snippet(name);
    format!("<{name}>$1</{name}>$0")
}
