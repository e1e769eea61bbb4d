// src/tasks/templates/graph.rs

//! Explicit template dependency graph.
//!
//! Nodes are template names; an edge runs from a template to every template
//! it names in an `extends`/`include`/`import` tag. The graph answers one
//! pure query: given a changed template, which templates are affected
//! (can reach the changed one, the changed one included).

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, Reversed};
use regex::Regex;

#[derive(Debug, Default)]
pub struct DependencyGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl DependencyGraph {
    /// Build the graph from `(name, content)` pairs by scanning each
    /// content for reference tags.
    pub fn scan<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut g = Self::default();
        for (name, content) in files {
            let node = g.node(name);
            for dep in references(content) {
                let dep_node = g.node(&dep);
                g.graph.update_edge(node, dep_node, ());
            }
        }
        g
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(idx) = self.index.get(name) {
            return *idx;
        }
        let idx = self.graph.add_node(name.to_string());
        self.index.insert(name.to_string(), idx);
        idx
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Direct dependencies of a template (what it extends/includes).
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        let Some(&idx) = self.index.get(name) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].as_str())
            .collect()
    }

    /// Every template whose transitive dependency set includes `changed`
    /// (including `changed` itself), or `None` when the changed file is
    /// unknown to the graph.
    pub fn affected(&self, changed: &str) -> Option<HashSet<String>> {
        let &start = self.index.get(changed)?;
        let reversed = Reversed(&self.graph);
        let mut bfs = Bfs::new(reversed, start);
        let mut affected = HashSet::new();
        while let Some(node) = bfs.next(reversed) {
            affected.insert(self.graph[node].clone());
        }
        Some(affected)
    }
}

/// Template names referenced by `extends`/`include`/`import` tags.
fn references(content: &str) -> Vec<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"\{%-?\s*(?:extends|include|import)\s+['"]([^'"]+)['"]"#).unwrap()
    });
    re.captures_iter(content)
        .map(|c| c[1].to_string())
        .collect()
}
