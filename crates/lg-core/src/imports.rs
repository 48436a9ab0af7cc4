//! Import resolution.
//!
//! Expands a document's imports into its resolution scope: the document plus every file
//! reachable through imports, each parsed on its own. Resolution is a depth-first walk that
//! enters every file at most once, so cycles terminate.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use url::Url;

use crate::errors::{Cancelled, SourceError};
use crate::parser;
use crate::types::{Diagnostic, DiagnosticCode, LgFile, LineIndex, RelatedLocation, Span};

/// Where the resolver gets the text of imported files.
pub trait SourceProvider: Send + Sync {
    fn read_source(&self, uri: &Url) -> Result<Arc<str>, SourceError>;
}

#[derive(Debug, Clone)]
pub struct ResolvedFile {
    pub uri: Url,
    pub text: Arc<str>,
    pub file: Arc<LgFile>,
    pub line_index: Arc<LineIndex>,
    /// Index of the root import that first led to this file. `None` for the root.
    pub via: Option<usize>,
    /// Set when the root imports this file directly under an alias.
    pub alias: Option<String>,
}

impl ResolvedFile {
    fn new(uri: Url, text: Arc<str>, file: Arc<LgFile>) -> Self {
        let line_index = Arc::new(LineIndex::shared(text.clone()));
        Self { uri, text, file, line_index, via: None, alias: None }
    }

    pub fn is_root(&self) -> bool {
        self.via.is_none()
    }
}

/// Directed file to imported-file edges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportGraph {
    edges: BTreeMap<Url, BTreeSet<Url>>,
}

impl ImportGraph {
    pub fn add_edge(&mut self, from: Url, to: Url) {
        self.edges.entry(from).or_default().insert(to);
    }

    pub fn imports_of(&self, uri: &Url) -> impl Iterator<Item = &Url> {
        self.edges.get(uri).into_iter().flatten()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(|targets| targets.len()).sum()
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedScope {
    /// The root document comes first, then files in the order they were reached.
    pub files: Vec<ResolvedFile>,
    pub graph: ImportGraph,
    pub diagnostics: Vec<Diagnostic>,
}

impl ResolvedScope {
    pub fn root(&self) -> &ResolvedFile {
        &self.files[0]
    }

    pub fn file(&self, uri: &Url) -> Option<&ResolvedFile> {
        self.files.iter().find(|f| &f.uri == uri)
    }

    /// Every file in scope other than the root.
    pub fn dependencies(&self) -> Vec<Url> {
        self.files.iter().skip(1).map(|f| f.uri.clone()).collect()
    }
}

pub struct ImportResolver<'a> {
    sources: &'a dyn SourceProvider,
}

impl<'a> ImportResolver<'a> {
    pub fn new(sources: &'a dyn SourceProvider) -> Self {
        Self { sources }
    }

    pub fn resolve(
        &self,
        root_uri: &Url,
        root_text: Arc<str>,
        root_file: Arc<LgFile>,
        cancel: &dyn Fn() -> bool,
    ) -> Result<ResolvedScope, Cancelled> {
        let mut walk = Walk {
            sources: self.sources,
            cancel,
            files: vec![ResolvedFile::new(root_uri.clone(), root_text, root_file)],
            visited: HashSet::from([root_uri.clone()]),
            stack: Vec::new(),
            on_stack: HashSet::new(),
            graph: ImportGraph::default(),
            diagnostics: Vec::new(),
        };
        walk.run()?;
        Ok(ResolvedScope { files: walk.files, graph: walk.graph, diagnostics: walk.diagnostics })
    }
}

/// A file being walked and the position of its next import.
struct Frame {
    file: usize,
    next_import: usize,
}

struct Walk<'a> {
    sources: &'a dyn SourceProvider,
    cancel: &'a dyn Fn() -> bool,
    files: Vec<ResolvedFile>,
    visited: HashSet<Url>,
    /// Current DFS path from the root.
    stack: Vec<Frame>,
    on_stack: HashSet<Url>,
    graph: ImportGraph,
    diagnostics: Vec<Diagnostic>,
}

impl Walk<'_> {
    fn run(&mut self) -> Result<(), Cancelled> {
        self.enter(0);
        while let Some(frame) = self.stack.last_mut() {
            let (index, position) = (frame.file, frame.next_import);
            if position >= self.files[index].file.imports.len() {
                self.leave();
                continue;
            }
            frame.next_import += 1;
            if let Some(child) = self.follow(index, position)? {
                self.enter(child);
            }
        }
        Ok(())
    }

    fn enter(&mut self, index: usize) {
        self.on_stack.insert(self.files[index].uri.clone());
        self.stack.push(Frame { file: index, next_import: 0 });
    }

    fn leave(&mut self) {
        if let Some(frame) = self.stack.pop() {
            self.on_stack.remove(&self.files[frame.file].uri);
        }
    }

    /// Handles one import of `files[index]`. Returns the index of a newly loaded file
    /// that should be walked next.
    fn follow(&mut self, index: usize, position: usize) -> Result<Option<usize>, Cancelled> {
        let current = self.files[index].clone();
        let import = &current.file.imports[position];
        let via = current.via.unwrap_or(position);

        let Some(target) = resolve_target(&current.uri, &import.target) else {
            self.report_on_root(
                via,
                DiagnosticCode::InvalidImport,
                &current,
                format!("cannot resolve import target '{}'", import.target),
                import.span,
            );
            return Ok(None);
        };
        self.graph.add_edge(current.uri.clone(), target.clone());

        if self.on_stack.contains(&target) {
            let path: Vec<&Url> = self.stack.iter().map(|frame| &self.files[frame.file].uri).collect();
            let start = path.iter().position(|uri| *uri == &target).unwrap_or(0);
            let cycle: Vec<_> = path[start..]
                .iter()
                .copied()
                .chain(std::iter::once(&target))
                .map(display_name)
                .collect();
            let root_import = self.files[0].file.imports[via].span;
            self.diagnostics.push(
                Diagnostic::information(
                    DiagnosticCode::ImportCycle,
                    root_import,
                    format!("import cycle: {}", cycle.join(" -> ")),
                )
                .with_related(RelatedLocation::new(
                    current.uri.clone(),
                    import.span,
                    "cycle closes here",
                )),
            );
            return Ok(None);
        }
        if self.visited.contains(&target) {
            return Ok(None);
        }
        if (self.cancel)() {
            return Err(Cancelled);
        }

        let text = match self.sources.read_source(&target) {
            Ok(text) => text,
            Err(err) => {
                self.report_on_root(
                    via,
                    DiagnosticCode::UnreadableImport,
                    &current,
                    err.to_string(),
                    import.span,
                );
                return Ok(None);
            }
        };
        self.visited.insert(target.clone());
        let parsed = parser::parse(&text).file;
        let mut resolved = ResolvedFile::new(target, text, Arc::new(parsed));
        resolved.via = Some(via);
        if current.is_root() {
            resolved.alias = import.alias.clone();
        }
        self.files.push(resolved);
        Ok(Some(self.files.len() - 1))
    }

    /// Problems anywhere in the scope surface on the root import line that leads to them.
    fn report_on_root(
        &mut self,
        via: usize,
        code: DiagnosticCode,
        current: &ResolvedFile,
        message: String,
        span: Span,
    ) {
        let root_span = self.files[0].file.imports[via].span;
        let mut diagnostic = Diagnostic::warning(code, root_span, message);
        if !current.is_root() {
            diagnostic.message =
                format!("{} (imported through {})", diagnostic.message, display_name(&current.uri));
            diagnostic = diagnostic.with_related(RelatedLocation::new(
                current.uri.clone(),
                span,
                "imported here",
            ));
        }
        self.diagnostics.push(diagnostic);
    }
}

/// Reads imports straight from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemSources;

impl SourceProvider for FileSystemSources {
    fn read_source(&self, uri: &Url) -> Result<Arc<str>, SourceError> {
        let path = uri.to_file_path().map_err(|_| SourceError::NotAFile(uri.clone()))?;
        std::fs::read_to_string(&path).map(Arc::from).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => SourceError::NotFound(uri.clone()),
            _ => SourceError::Unreadable { uri: uri.clone(), message: err.to_string() },
        })
    }
}

pub fn resolve_target(base: &Url, target: &str) -> Option<Url> {
    let normalized = target.trim().replace('\\', "/");
    if normalized.is_empty() {
        return None;
    }
    base.join(&normalized).ok()
}

fn display_name(uri: &Url) -> String {
    uri.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .map(|name| name.to_string())
        .unwrap_or_else(|| uri.to_string())
}
