//! Process identity lookups.

use std::collections::VecDeque;

/// Resolves a process id to the bundle identity of the application it
/// belongs to.
pub trait ProcessResolver {
    /// `None` when the process has exited or is not part of an application
    /// bundle.
    fn bundle_identifier(&mut self, pid: i32) -> Option<String>;
}

/// A [`ProcessResolver`] that remembers recent answers.
///
/// Only successful lookups are cached; the least recently used entry is
/// evicted once `capacity` entries are held.
pub struct CachedProcessResolver<R> {
    inner: R,
    capacity: usize,
    entries: VecDeque<(i32, String)>,
}

impl<R: ProcessResolver> CachedProcessResolver<R> {
    pub const DEFAULT_CAPACITY: usize = 16;

    pub fn new(inner: R) -> Self {
        Self::with_capacity(inner, Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(inner: R, capacity: usize) -> Self {
        Self {
            inner,
            capacity: capacity.max(1),
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }
}

impl<R: ProcessResolver> ProcessResolver for CachedProcessResolver<R> {
    fn bundle_identifier(&mut self, pid: i32) -> Option<String> {
        if let Some(index) = self.entries.iter().position(|(cached, _)| *cached == pid) {
            let entry = self.entries.remove(index)?;
            let bundle = entry.1.clone();
            self.entries.push_front(entry);
            return Some(bundle);
        }

        let bundle = self.inner.bundle_identifier(pid)?;
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front((pid, bundle.clone()));
        Some(bundle)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[derive(Default)]
    struct Counting {
        bundles: HashMap<i32, String>,
        lookups: Vec<i32>,
    }

    impl ProcessResolver for Counting {
        fn bundle_identifier(&mut self, pid: i32) -> Option<String> {
            self.lookups.push(pid);
            self.bundles.get(&pid).cloned()
        }
    }

    fn resolver(pids: &[i32]) -> Counting {
        Counting {
            bundles: pids
                .iter()
                .map(|pid| (*pid, format!("com.example.app{pid}")))
                .collect(),
            lookups: Vec::new(),
        }
    }

    #[test]
    fn repeated_lookups_hit_the_cache() {
        let mut cache = CachedProcessResolver::new(resolver(&[100]));
        assert_eq!(cache.bundle_identifier(100).as_deref(), Some("com.example.app100"));
        assert_eq!(cache.bundle_identifier(100).as_deref(), Some("com.example.app100"));
        assert_eq!(cache.inner().lookups, vec![100]);
    }

    #[test]
    fn misses_are_not_cached() {
        let mut cache = CachedProcessResolver::new(resolver(&[]));
        assert_eq!(cache.bundle_identifier(5), None);
        assert_eq!(cache.bundle_identifier(5), None);
        assert_eq!(cache.inner().lookups, vec![5, 5]);
        assert!(cache.is_empty());
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let mut cache = CachedProcessResolver::with_capacity(resolver(&[1, 2, 3]), 2);
        cache.bundle_identifier(1);
        cache.bundle_identifier(2);
        // touch 1 so that 2 becomes the oldest
        cache.bundle_identifier(1);
        cache.bundle_identifier(3);
        assert_eq!(cache.len(), 2);

        cache.bundle_identifier(1);
        cache.bundle_identifier(2);
        assert_eq!(cache.inner().lookups, vec![1, 2, 3, 2]);
    }

    #[test]
    fn default_capacity_is_sixteen() {
        let pids: Vec<i32> = (1..=20).collect();
        let mut cache = CachedProcessResolver::new(resolver(&pids));
        for pid in &pids {
            cache.bundle_identifier(*pid);
        }
        assert_eq!(cache.len(), 16);
    }
}
