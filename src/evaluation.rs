//! Evaluated-project view.
//!
//! A [`ProjectEvaluator`] turns a parsed project into the names it
//! defines once its imports are followed: properties, item types and
//! targets.  Evaluation may fail (malformed XML, an import that cannot be
//! found); callers treat that as "no project knowledge", never as an error
//! worth surfacing.
//!
//! The built-in [`XmlProjectEvaluator`] reads the document itself, the
//! files it imports, and the implicit `Directory.Build.props` /
//! `Directory.Build.targets` above SDK-style projects.  It does not run
//! conditions or SDK logic.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace};

use crate::parser::{self, NodeId, SyntaxTree};

/// Imports nested deeper than this are treated as a cycle we failed to
/// detect.
const MAX_IMPORT_DEPTH: usize = 32;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("document is not well-formed ({count} syntax error(s))")]
    MalformedDocument { count: usize },
    #[error("root element is <{0}>, expected <Project>")]
    NotAProject(String),
    #[error("cannot resolve import '{import}'")]
    UnresolvedImport { import: String },
    #[error("imported file {path} is not well-formed")]
    MalformedImport { path: PathBuf },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("imports nested more than {MAX_IMPORT_DEPTH} levels deep")]
    ImportDepthExceeded,
    #[error("evaluation task failed: {0}")]
    Task(String),
}

/// What an evaluator gets to look at.
#[derive(Debug, Clone)]
pub struct EvaluationInput {
    /// On-disk location of the project, when the document has one.
    pub path: Option<PathBuf>,
    pub tree: Arc<SyntaxTree>,
}

/// Names defined by a project and everything it imports, in first-seen
/// order without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvaluatedProject {
    pub properties: Vec<String>,
    pub item_types: Vec<String>,
    pub targets: Vec<String>,
    /// Files that contributed, the project itself excluded.
    pub imports: Vec<PathBuf>,
}

impl EvaluatedProject {
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p == name)
    }
}

/// The evaluated-project boundary.  Runs on the blocking thread pool.
pub trait ProjectEvaluator: Send + Sync + 'static {
    fn evaluate(&self, input: &EvaluationInput) -> Result<EvaluatedProject, EvaluationError>;
}

/// Evaluator that never produces a view; every document is treated as
/// having no project knowledge.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEvaluation;

impl ProjectEvaluator for NoEvaluation {
    fn evaluate(&self, _input: &EvaluationInput) -> Result<EvaluatedProject, EvaluationError> {
        Err(EvaluationError::Task("evaluation disabled".to_string()))
    }
}

/// Reads project XML and its imports from disk.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlProjectEvaluator;

impl ProjectEvaluator for XmlProjectEvaluator {
    fn evaluate(&self, input: &EvaluationInput) -> Result<EvaluatedProject, EvaluationError> {
        let tree = &input.tree;
        if tree.has_errors() {
            return Err(EvaluationError::MalformedDocument {
                count: tree.errors().len(),
            });
        }
        let root = tree
            .root()
            .ok_or_else(|| EvaluationError::NotAProject(String::new()))?;
        let root_name = &tree.node(root).name;
        if root_name != "Project" {
            return Err(EvaluationError::NotAProject(root_name.clone()));
        }

        let project_dir = input
            .path
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);
        let mut walk = ImportWalk {
            project_dir: project_dir.clone(),
            project: EvaluatedProject::default(),
            seen: Seen::default(),
            values: HashMap::new(),
            visited: HashSet::new(),
        };
        if let Some(path) = &input.path {
            walk.visited.insert(path.clone());
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                walk.values
                    .insert("MSBuildProjectName".to_string(), stem.to_string());
            }
        }

        let sdk_style = tree.attribute_value(root, "Sdk").is_some();
        if sdk_style
            && let Some(dir) = &project_dir
            && let Some(props) = find_upwards(dir, "Directory.Build.props")
        {
            walk.implicit_import(&props, 1)?;
        }
        walk.collect(tree, project_dir.as_deref(), 0)?;
        if sdk_style
            && let Some(dir) = &project_dir
            && let Some(targets) = find_upwards(dir, "Directory.Build.targets")
        {
            walk.implicit_import(&targets, 1)?;
        }

        debug!(
            properties = walk.project.properties.len(),
            items = walk.project.item_types.len(),
            targets = walk.project.targets.len(),
            imports = walk.project.imports.len(),
            "evaluated project"
        );
        Ok(walk.project)
    }
}

#[derive(Default)]
struct Seen {
    properties: HashSet<String>,
    item_types: HashSet<String>,
    targets: HashSet<String>,
}

struct ImportWalk {
    project_dir: Option<PathBuf>,
    project: EvaluatedProject,
    seen: Seen,
    /// Literal property values seen so far, for `$(Name)` expansion in
    /// import paths.
    values: HashMap<String, String>,
    visited: HashSet<PathBuf>,
}

impl ImportWalk {
    /// Collect names from one file's tree.  `this_dir` is the directory of
    /// the file the tree came from.
    fn collect(
        &mut self,
        tree: &SyntaxTree,
        this_dir: Option<&Path>,
        depth: usize,
    ) -> Result<(), EvaluationError> {
        if depth > MAX_IMPORT_DEPTH {
            return Err(EvaluationError::ImportDepthExceeded);
        }
        for id in tree.elements() {
            let node = tree.node(id);
            let parent_name = tree.parent(id).and_then(|p| tree.element_name(p));
            match (parent_name, node.name.as_str()) {
                (Some("PropertyGroup"), name) => {
                    push_unique(&mut self.project.properties, &mut self.seen.properties, name);
                    if let Some(value) = literal_text(tree, id) {
                        self.values.insert(name.to_string(), value);
                    }
                }
                (Some("ItemGroup"), name) => {
                    push_unique(&mut self.project.item_types, &mut self.seen.item_types, name);
                }
                (_, "Target") => {
                    if let Some(target) = tree.attribute_value(id, "Name") {
                        push_unique(&mut self.project.targets, &mut self.seen.targets, target);
                    }
                }
                (_, "Import") => self.import(tree, id, this_dir, depth)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn import(
        &mut self,
        tree: &SyntaxTree,
        id: NodeId,
        this_dir: Option<&Path>,
        depth: usize,
    ) -> Result<(), EvaluationError> {
        let Some(raw) = tree.attribute_value(id, "Project") else {
            return Ok(());
        };
        let conditional = tree.attribute_value(id, "Condition").is_some()
            || tree
                .parent(id)
                .is_some_and(|p| tree.attribute_value(p, "Condition").is_some());
        let unresolved = || EvaluationError::UnresolvedImport {
            import: raw.to_string(),
        };

        let expanded = self.expand(raw, this_dir);
        if expanded.contains('*') || expanded.contains('?') {
            trace!(import = raw, "skipping wildcard import");
            return Ok(());
        }
        if expanded.contains("$(") {
            return if conditional { Ok(()) } else { Err(unresolved()) };
        }

        let relative = PathBuf::from(expanded.replace('\\', "/"));
        let path = if relative.is_absolute() {
            relative
        } else {
            match this_dir {
                Some(dir) => dir.join(relative),
                None if conditional => return Ok(()),
                None => return Err(unresolved()),
            }
        };

        if !path.is_file() {
            return if conditional { Ok(()) } else { Err(unresolved()) };
        }
        self.implicit_import(&path, depth + 1)
    }

    /// Read, parse and collect an imported file.
    fn implicit_import(&mut self, path: &Path, depth: usize) -> Result<(), EvaluationError> {
        if !self.visited.insert(path.to_path_buf()) {
            trace!(path = %path.display(), "import already visited");
            return Ok(());
        }
        let content = std::fs::read_to_string(path).map_err(|source| EvaluationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let tree = parser::parse(&content);
        if tree.has_errors() {
            return Err(EvaluationError::MalformedImport {
                path: path.to_path_buf(),
            });
        }
        self.project.imports.push(path.to_path_buf());
        self.collect(&tree, path.parent(), depth)
    }

    /// Expand the well-known path properties and any literal property
    /// seen so far.  Unknown `$(...)` references are left in place.
    fn expand(&self, raw: &str, this_dir: Option<&Path>) -> String {
        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;
        while let Some(start) = rest.find("$(") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find(')') else {
                out.push_str(&rest[start..]);
                return out;
            };
            let name = &after[..end];
            match self.lookup(name, this_dir) {
                Some(value) => out.push_str(&value),
                None => out.push_str(&rest[start..start + 2 + end + 1]),
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }

    fn lookup(&self, name: &str, this_dir: Option<&Path>) -> Option<String> {
        let with_separator = |dir: &Path| format!("{}/", dir.display());
        match name {
            "MSBuildThisFileDirectory" => this_dir.map(with_separator),
            "MSBuildProjectDirectory" => self
                .project_dir
                .as_deref()
                .map(|dir| dir.display().to_string()),
            _ => self.values.get(name).cloned(),
        }
    }
}

fn push_unique(list: &mut Vec<String>, seen: &mut HashSet<String>, name: &str) {
    if seen.insert(name.to_string()) {
        list.push(name.to_string());
    }
}

/// The text of a property element when it is a plain literal.
fn literal_text(tree: &SyntaxTree, id: NodeId) -> Option<String> {
    let node = tree.node(id);
    let [child] = node.children.as_slice() else {
        return None;
    };
    let text = tree.node(*child).value.trim();
    (!text.contains("$(") && !text.contains("@(")).then(|| text.to_string())
}

/// Nearest `name` in `start` or one of its ancestors.
fn find_upwards(start: &Path, name: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
