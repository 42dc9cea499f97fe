//! Static reference documentation for project-file names.
//!
//! Maps element, attribute, property and item names to a description and
//! a help link.  The table is built once at startup from the built-in data
//! below, optionally overlaid with a JSON file named in the configuration,
//! and is read-only afterwards.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::types::Documentation;

const ELEMENT_HELP: &str = "https://learn.microsoft.com/visualstudio/msbuild/msbuild-project-file-schema-reference";
const PROPERTY_HELP: &str = "https://learn.microsoft.com/visualstudio/msbuild/common-msbuild-project-properties";
const SDK_PROPERTY_HELP: &str = "https://learn.microsoft.com/dotnet/core/project-sdk/msbuild-props";
const ITEM_HELP: &str = "https://learn.microsoft.com/visualstudio/msbuild/common-msbuild-project-items";
const TASK_HELP: &str = "https://learn.microsoft.com/visualstudio/msbuild/msbuild-task-reference";

/// Which namespace a name is documented in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Element,
    Attribute,
    Property,
    Item,
    Task,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReferenceEntry {
    pub description: String,
    #[serde(default, alias = "help")]
    pub help_link: Option<String>,
}

const ELEMENTS: &[(&str, &str)] = &[
    ("Project", "Required root element of an MSBuild project file."),
    ("PropertyGroup", "Contains a set of user-defined property elements."),
    ("ItemGroup", "Contains a set of user-defined item elements."),
    ("ItemDefinitionGroup", "Defines default metadata for item types."),
    ("Target", "Contains a set of tasks for MSBuild to execute sequentially."),
    ("Import", "Imports the contents of one project file into another."),
    ("ImportGroup", "Contains a collection of Import elements grouped under an optional condition."),
    ("Choose", "Evaluates child elements to select one set of ItemGroup and PropertyGroup elements."),
    ("When", "Specifies a possible block of code for the Choose element to select."),
    ("Otherwise", "Specifies the block of code to execute if none of the When conditions are true."),
    ("UsingTask", "Maps the task referenced in a Task element to the assembly that contains the task implementation."),
    ("Sdk", "References an MSBuild project SDK."),
    ("OnError", "Causes one or more targets to execute when a task fails and ContinueOnError is false."),
    ("Output", "Stores task output values in items and properties."),
    ("ProjectExtensions", "Allows MSBuild project files to contain non-MSBuild information."),
];

const ATTRIBUTES: &[(&str, &str)] = &[
    ("Condition", "Condition to be evaluated before this element is processed."),
    ("Label", "An optional label for the element, used for grouping and tooling."),
    ("Sdk", "The name (and optional version) of the project SDK to import."),
    ("DefaultTargets", "The default target or targets to build when no target is specified."),
    ("InitialTargets", "Targets to run before the default targets."),
    ("ToolsVersion", "The toolset version used to build the project."),
    ("TreatAsLocalProperty", "Property names that global properties do not override."),
    ("Project", "The path of the project file to import."),
    ("Name", "The name of the target."),
    ("DependsOnTargets", "Targets that must run before this target."),
    ("BeforeTargets", "Targets that this target runs before."),
    ("AfterTargets", "Targets that this target runs after."),
    ("Inputs", "Files that form the inputs of this target, for incremental builds."),
    ("Outputs", "Files that form the outputs of this target, for incremental builds."),
    ("Returns", "Items made available to tasks that invoke this target."),
    ("KeepDuplicateOutputs", "Keep duplicate items in the target's Returns."),
    ("Include", "The file or wildcard to include in the list of items."),
    ("Exclude", "The file or wildcard to exclude from the list of items."),
    ("Remove", "The file or wildcard to remove from the list of items."),
    ("Update", "The items whose metadata is updated."),
    ("Version", "The version of the package to reference."),
    ("PrivateAssets", "Assets of the dependency that do not flow to consuming projects."),
    ("IncludeAssets", "Assets of the dependency to consume."),
    ("ExcludeAssets", "Assets of the dependency to exclude."),
    ("VersionOverride", "Overrides the centrally managed package version."),
    ("AssemblyFile", "The path of the assembly that contains the task."),
    ("AssemblyName", "The name of the assembly that contains the task."),
    ("TaskName", "The name of the task to reference."),
    ("TaskFactory", "The task factory that creates instances of the task."),
    ("ContinueOnError", "What to do when the task fails: ErrorAndStop, WarnAndContinue, ErrorAndContinue."),
    ("Importance", "Message importance: high, normal or low."),
    ("Text", "The text to log."),
    ("Command", "The command to run."),
    ("WorkingDirectory", "The directory in which the command runs."),
    ("Targets", "The target or targets to build."),
    ("Projects", "The project files to build."),
    ("SourceFiles", "The files to copy."),
    ("DestinationFolder", "The directory to copy the files to."),
    ("Files", "The files to delete or touch."),
    ("Directories", "The directories to create or remove."),
    ("TaskParameter", "The name of the task's output parameter."),
    ("ItemName", "The item that receives the task's output."),
    ("PropertyName", "The property that receives the task's output."),
];

/// Properties with closed value sets or that almost every project sets.
const PROPERTIES: &[(&str, &str)] = &[
    ("OutputType", "The type of output to generate: `Exe` (console application), `Library` (class library), `WinExe` (Windows application) or `Module`."),
    ("TargetFramework", "The target framework moniker for the project, e.g. `net8.0`."),
    ("TargetFrameworks", "Semicolon-separated target framework monikers for multi-targeted projects."),
    ("Nullable", "The nullable context for C# projects: `enable`, `disable`, `warnings` or `annotations`."),
    ("ImplicitUsings", "Enables global using directives for common namespaces (`enable` / `disable`)."),
    ("LangVersion", "The language version accepted by the compiler."),
    ("Configuration", "The build configuration, typically `Debug` or `Release`."),
    ("Platform", "The target platform, e.g. `AnyCPU`, `x64`, `x86` or `ARM64`."),
    ("TreatWarningsAsErrors", "Treat all compiler warnings as errors."),
    ("GenerateDocumentationFile", "Generate an XML documentation file from doc comments."),
    ("IsPackable", "Whether `dotnet pack` produces a package for this project."),
    ("AssemblyName", "The name of the output assembly, without extension."),
    ("RootNamespace", "The root namespace used for generated code and embedded resources."),
    ("OutputPath", "The output directory, relative to the project directory."),
    ("IntermediateOutputPath", "The intermediate output directory (`obj`)."),
    ("BaseOutputPath", "The base output directory; configuration and framework are appended."),
    ("Version", "The version of the assembly and package."),
    ("VersionPrefix", "The version prefix, combined with VersionSuffix to form Version."),
    ("VersionSuffix", "The prerelease version suffix."),
    ("AssemblyVersion", "The assembly version number."),
    ("FileVersion", "The file version number."),
    ("PackageId", "The identifier of the NuGet package produced by this project."),
    ("PackageVersion", "The version of the produced package."),
    ("Authors", "Semicolon-separated package authors."),
    ("Company", "The company name written to the assembly metadata."),
    ("Product", "The product name written to the assembly metadata."),
    ("Description", "A long description of the package or assembly."),
    ("Copyright", "Copyright details."),
    ("PackageLicenseExpression", "An SPDX license expression for the package."),
    ("PackageProjectUrl", "The URL of the package's home page."),
    ("PackageTags", "Semicolon-separated package tags."),
    ("RepositoryUrl", "The URL of the source repository."),
    ("RuntimeIdentifier", "The runtime identifier to build for, e.g. `linux-x64`."),
    ("RuntimeIdentifiers", "Semicolon-separated runtime identifiers to restore for."),
    ("SelfContained", "Publish the .NET runtime with the application."),
    ("PublishSingleFile", "Publish the application as a single file."),
    ("PublishTrimmed", "Trim unused code when publishing."),
    ("PublishAot", "Publish with native ahead-of-time compilation."),
    ("InvariantGlobalization", "Run without culture-specific data."),
    ("DefineConstants", "Semicolon-separated conditional compilation symbols."),
    ("NoWarn", "Semicolon-separated warning codes to suppress."),
    ("WarningLevel", "The compiler warning level."),
    ("DebugType", "The kind of debug symbols: `portable`, `embedded`, `full`, `pdbonly` or `none`."),
    ("Optimize", "Enable compiler optimizations."),
    ("AllowUnsafeBlocks", "Allow `unsafe` code."),
    ("Deterministic", "Produce byte-for-byte identical outputs for identical inputs."),
    ("EnableDefaultItems", "Include default Compile, EmbeddedResource and None items."),
    ("EnableDefaultCompileItems", "Include default Compile items."),
    ("UseWindowsForms", "Enable Windows Forms support."),
    ("UseWPF", "Enable WPF support."),
    ("UserSecretsId", "The identifier of the user secrets store."),
    ("ManagePackageVersionsCentrally", "Use central package management (Directory.Packages.props)."),
];

const ITEMS: &[(&str, &str)] = &[
    ("PackageReference", "A NuGet package dependency."),
    ("PackageVersion", "A centrally managed NuGet package version."),
    ("ProjectReference", "A reference to another project."),
    ("Reference", "A reference to an assembly."),
    ("FrameworkReference", "A reference to a shared framework."),
    ("Compile", "Source files for the compiler."),
    ("Content", "Files that are not compiled but are published with the project."),
    ("None", "Files that have no role in the build."),
    ("EmbeddedResource", "Resources to embed in the generated assembly."),
    ("Folder", "A folder shown in the project tree."),
    ("Using", "A global using directive."),
    ("InternalsVisibleTo", "A friend assembly that can see internal types."),
    ("AdditionalFiles", "Extra files passed to analyzers and source generators."),
    ("Analyzer", "An analyzer assembly."),
    ("DotNetCliToolReference", "A .NET CLI tool dependency (legacy)."),
];

const TASKS: &[(&str, &str)] = &[
    ("Message", "Logs a message during a build."),
    ("Warning", "Logs a warning during a build."),
    ("Error", "Stops a build and logs an error."),
    ("Exec", "Runs the specified program or command."),
    ("Copy", "Copies files to a new location."),
    ("Delete", "Deletes the specified files."),
    ("MakeDir", "Creates directories."),
    ("RemoveDir", "Removes directories and their contents."),
    ("Touch", "Sets the access and modification times of files."),
    ("CallTarget", "Invokes targets within the project file."),
    ("MSBuild", "Builds MSBuild projects from another MSBuild project."),
    ("WriteLinesToFile", "Writes items to a text file."),
    ("ReadLinesFromFile", "Reads a list of items from a text file."),
    ("Csc", "Invokes the C# compiler."),
];

#[derive(Debug, Default, Deserialize)]
struct ReferenceOverrides {
    #[serde(default)]
    elements: HashMap<String, ReferenceEntry>,
    #[serde(default)]
    attributes: HashMap<String, ReferenceEntry>,
    #[serde(default)]
    properties: HashMap<String, ReferenceEntry>,
    #[serde(default)]
    items: HashMap<String, ReferenceEntry>,
    #[serde(default)]
    tasks: HashMap<String, ReferenceEntry>,
}

/// The read-only name → documentation table.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    entries: HashMap<(ReferenceKind, String), ReferenceEntry>,
}

impl ReferenceData {
    /// The built-in table.
    pub fn builtin() -> Self {
        let mut data = Self::default();
        data.insert_all(ReferenceKind::Element, ELEMENTS, ELEMENT_HELP);
        data.insert_all(ReferenceKind::Attribute, ATTRIBUTES, ELEMENT_HELP);
        data.insert_all(ReferenceKind::Property, PROPERTIES, SDK_PROPERTY_HELP);
        data.insert_all(ReferenceKind::Item, ITEMS, ITEM_HELP);
        data.insert_all(ReferenceKind::Task, TASKS, TASK_HELP);
        for name in ["Configuration", "Platform", "OutputPath", "IntermediateOutputPath"] {
            if let Some(entry) = data.entries.get_mut(&(ReferenceKind::Property, name.to_string())) {
                entry.help_link = Some(PROPERTY_HELP.to_string());
            }
        }
        data
    }

    /// The built-in table overlaid with entries from a JSON file.
    ///
    /// A missing or malformed file is logged and ignored.
    pub fn builtin_with_overrides(path: Option<&Path>) -> Self {
        let mut data = Self::builtin();
        if let Some(path) = path {
            match std::fs::read_to_string(path)
                .map_err(|e| e.to_string())
                .and_then(|s| data.merge_json(&s).map_err(|e| e.to_string()))
            {
                Ok(count) => debug!(path = %path.display(), count, "loaded reference overrides"),
                Err(err) => warn!(path = %path.display(), %err, "ignoring reference data file"),
            }
        }
        data
    }

    /// Merge entries from a JSON document; returns how many were added or
    /// replaced.
    pub fn merge_json(&mut self, json: &str) -> Result<usize, serde_json::Error> {
        let overrides: ReferenceOverrides = serde_json::from_str(json)?;
        let mut count = 0;
        for (kind, map) in [
            (ReferenceKind::Element, overrides.elements),
            (ReferenceKind::Attribute, overrides.attributes),
            (ReferenceKind::Property, overrides.properties),
            (ReferenceKind::Item, overrides.items),
            (ReferenceKind::Task, overrides.tasks),
        ] {
            for (name, entry) in map {
                self.entries.insert((kind, name), entry);
                count += 1;
            }
        }
        Ok(count)
    }

    pub fn get(&self, kind: ReferenceKind, name: &str) -> Option<&ReferenceEntry> {
        self.entries.get(&(kind, name.to_string()))
    }

    pub fn documentation(&self, kind: ReferenceKind, name: &str) -> Option<Documentation> {
        self.get(kind, name).map(|entry| Documentation {
            description: entry.description.clone(),
            help_link: entry.help_link.clone(),
        })
    }

    /// Names documented under `kind`, sorted.
    pub fn names(&self, kind: ReferenceKind) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .entries
            .keys()
            .filter(|(k, _)| *k == kind)
            .map(|(_, name)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    fn insert_all(&mut self, kind: ReferenceKind, table: &[(&str, &str)], help: &str) {
        for &(name, description) in table {
            self.entries.insert(
                (kind, name.to_string()),
                ReferenceEntry {
                    description: description.to_string(),
                    help_link: Some(help.to_string()),
                },
            );
        }
    }
}
