//! Project file enumeration and per-file definition summaries
//!
//! The engine sees a project only through [`ProjectSources`]: a bounded list
//! of `.phel` files and their text. [`WorkspaceDirectory`] walks a directory
//! on disk; [`InMemoryProject`] serves hosts that already hold the documents.
//! [`FileSummary::scan`] reduces one file to what completion needs from it:
//! its namespace and its public top-level definitions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::errors::WorkspaceError;
use crate::ir::forms::FormKind;
use crate::ir::inert;
use crate::ir::reader;
use crate::ir::symbol_resolution::DefinitionKind;
use crate::ir::symbol_resolution::lexical_scope::{head_form, parameter_vector};
use crate::ir::syntax::{Node, SyntaxKind};

pub const SOURCE_EXTENSION: &str = "phel";

/// One project source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// Enumeration of the source files of a project.
pub trait ProjectSources: Send + Sync {
    /// Paths of up to `limit` source files, in a stable order.
    fn file_paths(&self, limit: usize) -> Result<Vec<PathBuf>, WorkspaceError>;

    /// Current text of one of the files returned by [`Self::file_paths`].
    fn read(&self, path: &Path) -> Result<String, WorkspaceError>;
}

/// A project rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct WorkspaceDirectory {
    root: PathBuf,
}

impl WorkspaceDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, WorkspaceError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(WorkspaceError::NotADirectory(root));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_hidden_or_vendor(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || name == "vendor" || name == "node_modules")
}

impl ProjectSources for WorkspaceDirectory {
    fn file_paths(&self, limit: usize) -> Result<Vec<PathBuf>, WorkspaceError> {
        let mut paths = Vec::new();
        let walker = WalkDir::new(&self.root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_hidden_or_vendor(entry));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if err.depth() > 0 => {
                    debug!("Skipping unreadable project entry: {}", err);
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            let is_source = entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .is_some_and(|ext| ext == SOURCE_EXTENSION);
            if is_source {
                paths.push(entry.into_path());
                if paths.len() >= limit {
                    break;
                }
            }
        }
        trace!("Found {} source file(s) under {:?}", paths.len(), self.root);
        Ok(paths)
    }

    fn read(&self, path: &Path) -> Result<String, WorkspaceError> {
        fs::read_to_string(path).map_err(|source| WorkspaceError::Read {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Documents held in memory by the host.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProject {
    files: Vec<SourceFile>,
}

impl InMemoryProject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.files.push(SourceFile::new(path, text));
        self
    }
}

impl ProjectSources for InMemoryProject {
    fn file_paths(&self, limit: usize) -> Result<Vec<PathBuf>, WorkspaceError> {
        Ok(self
            .files
            .iter()
            .take(limit)
            .map(|file| file.path.clone())
            .collect())
    }

    fn read(&self, path: &Path) -> Result<String, WorkspaceError> {
        self.files
            .iter()
            .find(|file| file.path == path)
            .map(|file| file.text.clone())
            .ok_or_else(|| WorkspaceError::Read {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not in project"),
            })
    }
}

/// A public definition found in a project file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectDefinition {
    pub name: String,
    pub kind: DefinitionKind,
    /// Call shape such as `(name a b)` for functions and macros
    pub signature: Option<String>,
}

/// What completion needs to know about one project file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    pub path: PathBuf,
    /// Name from the file's `(ns ...)` form
    pub namespace: Option<String>,
    pub definitions: Vec<ProjectDefinition>,
}

impl FileSummary {
    /// File name without extension, shown as the origin of its definitions.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Read `text` and collect its namespace and public top-level definitions.
    ///
    /// # Arguments
    /// * `path` - Path the text was read from
    /// * `text` - File contents
    /// * `max_text` - Files longer than this are summarised as empty
    pub fn scan(path: &Path, text: &str, max_text: usize) -> Self {
        let mut summary = FileSummary {
            path: path.to_path_buf(),
            namespace: None,
            definitions: Vec::new(),
        };
        if text.len() > max_text {
            debug!("Not scanning {:?}: {} bytes", path, text.len());
            return summary;
        }

        let tree = reader::read(text);
        for form in tree.root().forms() {
            if !form.kind().is_call() || inert::is_deactivated(form) {
                continue;
            }
            let Some(kind) = head_form(form) else {
                continue;
            };
            if kind == FormKind::Ns {
                if summary.namespace.is_none() {
                    summary.namespace = form
                        .nth_form(1)
                        .ok()
                        .filter(|name| name.kind() == SyntaxKind::Symbol)
                        .map(|name| name.text().to_string());
                }
                continue;
            }
            if let Some(definition) = public_definition(form, kind) {
                summary.definitions.push(definition);
            }
        }
        summary
    }
}

fn public_definition(form: Node<'_>, kind: FormKind) -> Option<ProjectDefinition> {
    if !kind.is_public_definition() {
        return None;
    }
    let definition_kind = kind.definition_kind()?;
    // `(defn ^:private name ...)` puts the meta where the name would be.
    let name = form
        .nth_form(1)
        .ok()
        .filter(|name| name.kind() == SyntaxKind::Symbol)?;
    let private_meta = form
        .nth_form(2)
        .ok()
        .is_some_and(|attrs| attrs.kind() == SyntaxKind::Map && attrs.text().contains(":private"));
    if private_meta {
        return None;
    }
    Some(ProjectDefinition {
        name: name.text().to_string(),
        kind: definition_kind,
        signature: call_signature(form, name.text()),
    })
}

/// `(name a b)` from the parameter vector of a `defn`/`defmacro`.
pub fn call_signature(form: Node<'_>, name: &str) -> Option<String> {
    if head_form(form)?.parameter_slot().is_none() {
        return None;
    }
    let params = parameter_vector(form)?;
    let inner: Vec<&str> = params.forms().map(|p| p.text()).collect();
    if inner.is_empty() {
        Some(format!("({})", name))
    } else {
        Some(format!("({} {})", name, inner.join(" ")))
    }
}
