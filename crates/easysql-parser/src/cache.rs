/// LRU cache of parsed trees, keyed by document identity
///
/// Avoids re-parsing unchanged buffers: a hit requires both the same URI and
/// the same version. The owner is responsible for invalidating on close;
/// edits naturally miss because the version changes.
use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::Node;
use crate::parser::parse_with_limit;

struct CacheEntry {
    version: i32,
    nodes: Arc<Vec<Node>>,
}

pub struct AstCache {
    capacity: usize,
    entries: HashMap<String, CacheEntry>,
    /// Least-recently-used first.
    order: Vec<String>,
}

impl AstCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Return the cached tree for `(uri, version)`, or parse `text` and
    /// cache the result, evicting the least recently used document if full.
    pub fn get_or_parse(
        &mut self,
        uri: &str,
        version: i32,
        text: &str,
        max_depth: usize,
    ) -> Arc<Vec<Node>> {
        if let Some(entry) = self.entries.get(uri) {
            if entry.version == version {
                let nodes = Arc::clone(&entry.nodes);
                self.touch(uri);
                return nodes;
            }
        }

        let nodes = Arc::new(parse_with_limit(text, max_depth));
        self.insert(uri, version, Arc::clone(&nodes));
        nodes
    }

    /// Drop a document's tree (e.g. the buffer was closed).
    pub fn invalidate(&mut self, uri: &str) {
        self.entries.remove(uri);
        self.order.retain(|u| u != uri);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, uri: &str, version: i32, nodes: Arc<Vec<Node>>) {
        if !self.entries.contains_key(uri) && self.entries.len() >= self.capacity {
            if !self.order.is_empty() {
                let evicted = self.order.remove(0);
                self.entries.remove(&evicted);
            }
        }
        self.entries
            .insert(uri.to_string(), CacheEntry { version, nodes });
        self.touch(uri);
    }

    fn touch(&mut self, uri: &str) {
        self.order.retain(|u| u != uri);
        self.order.push(uri.to_string());
    }
}
