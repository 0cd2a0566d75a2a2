// Dedup and recursion bookkeeping owned by one engine instance

use crate::target::slash_normalized;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

/// URL -> depth at which it was scheduled. A URL is scheduled at most once.
#[derive(Debug, Default)]
pub struct VisitedSet {
    inner: Mutex<HashMap<String, usize>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomic check-and-set. Returns true if the caller won the URL and may
    /// enqueue it.
    pub fn mark(&self, url: &str, depth: usize) -> bool {
        let mut visited = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if visited.contains_key(url) {
            return false;
        }
        visited.insert(url.to_string(), depth);
        true
    }

    pub fn depth_of(&self, url: &str) -> Option<usize> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(url)
            .copied()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DiscoveredDir {
    url: String,
    depth: usize,
}

/// Directories found during phases 1 and 2, in discovery order.
#[derive(Debug, Default)]
pub struct DirectoryRegistry {
    entries: Mutex<Vec<DiscoveredDir>>,
}

impl DirectoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, url: &str, depth: usize) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(DiscoveredDir {
                url: slash_normalized(url).to_string(),
                depth,
            });
    }

    /// Directories registered at exactly `depth`, first occurrence of each URL.
    pub fn at_depth(&self, depth: usize) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut seen = HashSet::new();
        entries
            .iter()
            .filter(|dir| dir.depth == depth)
            .filter(|dir| seen.insert(dir.url.clone()))
            .map(|dir| dir.url.clone())
            .collect()
    }

    /// Every distinct directory URL, sorted.
    pub fn all_unique(&self) -> Vec<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .map(|dir| dir.url.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Shallowest depth a directory was registered at.
    pub fn depth_of(&self, url: &str) -> Option<usize> {
        let url = slash_normalized(url);
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|dir| dir.url == url)
            .map(|dir| dir.depth)
            .min()
    }
}

/// Slash-normalized URLs already sent to the output sink.
#[derive(Debug, Default)]
pub struct OutputLedger {
    written: Mutex<HashSet<String>>,
}

impl OutputLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time a normalized URL is claimed.
    pub fn claim(&self, url: &str) -> bool {
        self.written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(slash_normalized(url).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_visited_marks_once() {
        let visited = VisitedSet::new();
        assert!(visited.mark("http://e.com/a", 0));
        assert!(!visited.mark("http://e.com/a", 3));
        assert_eq!(visited.depth_of("http://e.com/a"), Some(0));
        // slash variant is a distinct probe
        assert!(visited.mark("http://e.com/a/", 0));
        assert_eq!(visited.depth_of("http://e.com/a/"), Some(0));
    }

    #[test]
    fn test_visited_is_race_free() {
        let visited = Arc::new(VisitedSet::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let visited = visited.clone();
                std::thread::spawn(move || {
                    (0..100)
                        .filter(|i| visited.mark(&format!("http://e.com/{}", i), 0))
                        .count()
                })
            })
            .collect();

        let won: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(won, 100);
    }

    #[test]
    fn test_registry_depth_is_structured() {
        let registry = DirectoryRegistry::new();
        registry.register("http://e.com/a/", 1);
        registry.register("http://e.com/b", 11);
        registry.register("http://e.com/c", 1);
        registry.register("http://e.com/a", 1);

        assert_eq!(registry.at_depth(1), vec!["http://e.com/a", "http://e.com/c"]);
        assert_eq!(registry.at_depth(11), vec!["http://e.com/b"]);
        assert!(registry.at_depth(0).is_empty());
    }

    #[test]
    fn test_registry_all_unique_sorted() {
        let registry = DirectoryRegistry::new();
        registry.register("http://e.com/z", 0);
        registry.register("http://e.com/a", 0);
        registry.register("http://e.com/z/", 1);

        assert_eq!(registry.all_unique(), vec!["http://e.com/a", "http://e.com/z"]);
        assert_eq!(registry.depth_of("http://e.com/z/"), Some(0));
        assert_eq!(registry.depth_of("http://e.com/q"), None);
    }

    #[test]
    fn test_output_ledger_normalizes_slash() {
        let ledger = OutputLedger::new();
        assert!(ledger.claim("http://e.com/admin/"));
        assert!(!ledger.claim("http://e.com/admin"));
        assert!(ledger.claim("http://e.com/login"));
    }
}
