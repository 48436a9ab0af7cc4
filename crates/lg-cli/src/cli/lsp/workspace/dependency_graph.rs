//! Which open documents pull in which files.
//!
//! Each committed analysis replaces the forward edges of its document with the
//! files of its resolution scope. Reverse edges answer the question a change
//! notification asks: whose analysis is now out of date?

use lsp_types::Url;
use std::collections::{HashMap, HashSet};

/// Bidirectional dependency edges between documents.
///
/// # Examples
///
/// ```ignore
/// let mut graph = DependencyGraph::new();
/// graph.set_dependencies(&main, vec![common.clone()]);
/// assert!(graph.get_affected_documents(&common).contains(&main));
/// ```
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    /// document -> files in its resolution scope
    depends_on: HashMap<Url, HashSet<Url>>,
    /// file -> documents whose scope contains it
    dependents: HashMap<Url, HashSet<Url>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_dependency(&mut self, dependent: Url, depends_on: Url) {
        self.depends_on.entry(dependent.clone()).or_default().insert(depends_on.clone());
        self.dependents.entry(depends_on).or_default().insert(dependent);
    }

    /// Replaces every forward edge of `dependent`.
    pub fn set_dependencies(&mut self, dependent: &Url, dependencies: Vec<Url>) {
        self.remove_dependencies_of(dependent);
        for dependency in dependencies {
            if &dependency != dependent {
                self.add_dependency(dependent.clone(), dependency);
            }
        }
    }

    /// Drops the forward edges of `uri`. Documents that import `uri` keep their
    /// edges to it.
    pub fn remove_dependencies_of(&mut self, uri: &Url) {
        if let Some(dependencies) = self.depends_on.remove(uri) {
            for dependency in dependencies {
                Self::remove_from_map(&mut self.dependents, &dependency, uri);
            }
        }
    }

    fn remove_from_map(map: &mut HashMap<Url, HashSet<Url>>, key: &Url, value: &Url) {
        if let Some(set) = map.get_mut(key) {
            set.remove(value);
            if set.is_empty() {
                map.remove(key);
            }
        }
    }

    pub fn get_dependents(&self, uri: &Url) -> Option<&HashSet<Url>> {
        self.dependents.get(uri)
    }

    pub fn get_dependencies(&self, uri: &Url) -> Option<&HashSet<Url>> {
        self.depends_on.get(uri)
    }

    /// Every document that transitively depends on `uri`, excluding `uri` itself.
    pub fn get_affected_documents(&self, uri: &Url) -> HashSet<Url> {
        let mut affected = HashSet::new();
        self.collect_dependents(uri, &mut affected);
        affected.remove(uri);
        affected
    }

    fn collect_dependents(&self, uri: &Url, affected: &mut HashSet<Url>) {
        if let Some(dependents) = self.dependents.get(uri) {
            for dependent in dependents {
                if affected.insert(dependent.clone()) {
                    self.collect_dependents(dependent, affected);
                }
            }
        }
    }

    pub fn clear(&mut self) {
        self.depends_on.clear();
        self.dependents.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::lsp::tests::test_utils::url;

    #[test]
    fn test_set_dependencies_replaces_edges() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(&url("main.lg"), vec![url("a.lg"), url("b.lg")]);
        graph.set_dependencies(&url("main.lg"), vec![url("b.lg")]);

        assert!(graph.get_dependents(&url("a.lg")).is_none());
        assert!(graph.get_dependents(&url("b.lg")).unwrap().contains(&url("main.lg")));
        assert_eq!(graph.get_dependencies(&url("main.lg")).unwrap().len(), 1);
    }

    #[test]
    fn test_affected_documents_are_transitive() {
        let mut graph = DependencyGraph::new();
        // main -> lib -> base, other -> base
        graph.set_dependencies(&url("main.lg"), vec![url("lib.lg"), url("base.lg")]);
        graph.set_dependencies(&url("lib.lg"), vec![url("base.lg")]);
        graph.set_dependencies(&url("other.lg"), vec![url("base.lg")]);

        let affected = graph.get_affected_documents(&url("base.lg"));
        assert_eq!(affected.len(), 3);
        let affected = graph.get_affected_documents(&url("lib.lg"));
        assert_eq!(affected, HashSet::from([url("main.lg")]));
    }

    #[test]
    fn test_cycles_terminate() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(&url("a.lg"), vec![url("b.lg")]);
        graph.set_dependencies(&url("b.lg"), vec![url("a.lg")]);

        assert_eq!(graph.get_affected_documents(&url("a.lg")), HashSet::from([url("b.lg")]));
    }

    #[test]
    fn test_removing_a_document_keeps_incoming_edges() {
        let mut graph = DependencyGraph::new();
        graph.set_dependencies(&url("main.lg"), vec![url("lib.lg")]);
        graph.set_dependencies(&url("lib.lg"), vec![url("base.lg")]);

        graph.remove_dependencies_of(&url("lib.lg"));
        assert!(graph.get_dependents(&url("base.lg")).is_none());
        assert!(graph.get_dependents(&url("lib.lg")).unwrap().contains(&url("main.lg")));
    }
}
