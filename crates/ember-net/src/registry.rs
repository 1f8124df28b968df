//! Directory of logged-in connections, keyed by name.
//!
//! Names are unique case-insensitively. Traversals run under the registry
//! lock, so callbacks must only enqueue work (e.g. outgoing frames) and never
//! call back into the registry.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;

/// Something that can take an encoded frame for delivery.
pub trait FrameSink: Send + Sync {
    /// Enqueue an already length-prefixed frame.
    fn deliver(&self, wire: Bytes);
}

/// How [`Registry::find`] matches a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindMode {
    Exact,
    CaseInsensitive,
    /// First name, in alphabetical order, starting with the query (any case).
    Prefix,
}

/// Result of [`Registry::insert_bounded`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Inserted,
    Duplicate,
    Full,
}

struct Entry<C> {
    name: String,
    conn: Arc<C>,
}

pub struct Registry<C> {
    entries: Mutex<BTreeMap<String, Entry<C>>>,
}

impl<C> Registry<C> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Add `conn` under `name`. Fails if a name differing only in case exists.
    pub fn insert(&self, name: &str, conn: Arc<C>) -> bool {
        self.insert_bounded(name, conn, usize::MAX) == Admission::Inserted
    }

    /// Like [`insert`](Self::insert) but also refuses once `max` entries exist.
    pub fn insert_bounded(&self, name: &str, conn: Arc<C>, max: usize) -> Admission {
        let mut entries = self.entries.lock().expect("registry poisoned");
        let key = name.to_lowercase();
        if entries.contains_key(&key) {
            return Admission::Duplicate;
        }
        if entries.len() >= max {
            return Admission::Full;
        }
        entries.insert(
            key,
            Entry {
                name: name.to_string(),
                conn,
            },
        );
        Admission::Inserted
    }

    /// Remove the entry for `name` (any case).
    pub fn remove(&self, name: &str) -> Option<Arc<C>> {
        self.entries
            .lock()
            .expect("registry poisoned")
            .remove(&name.to_lowercase())
            .map(|e| e.conn)
    }

    /// Remove whichever entry points at `conn`. Returns whether one existed.
    pub fn remove_conn(&self, conn: &Arc<C>) -> bool {
        !self.remove_if(|c| Arc::ptr_eq(c, conn)).is_empty()
    }

    /// Remove every connection matching `pred` and return them.
    pub fn remove_if(&self, mut pred: impl FnMut(&Arc<C>) -> bool) -> Vec<Arc<C>> {
        let mut entries = self.entries.lock().expect("registry poisoned");
        let mut removed = Vec::new();
        entries.retain(|_, e| {
            if pred(&e.conn) {
                removed.push(Arc::clone(&e.conn));
                false
            } else {
                true
            }
        });
        removed
    }

    pub fn find(&self, name: &str, mode: FindMode) -> Option<Arc<C>> {
        let entries = self.entries.lock().expect("registry poisoned");
        let lower = name.to_lowercase();
        match mode {
            FindMode::Exact => entries
                .get(&lower)
                .filter(|e| e.name == name)
                .map(|e| Arc::clone(&e.conn)),
            FindMode::CaseInsensitive => entries.get(&lower).map(|e| Arc::clone(&e.conn)),
            FindMode::Prefix => entries
                .range(lower.clone()..)
                .next()
                .filter(|(k, _)| k.starts_with(&lower))
                .map(|(_, e)| Arc::clone(&e.conn)),
        }
    }

    /// Run `f` on every connection except `except`, under the registry lock.
    pub fn for_each(&self, f: impl FnMut(&Arc<C>), except: Option<&Arc<C>>) {
        self.for_each_where(|c| !except.is_some_and(|x| Arc::ptr_eq(x, c)), f);
    }

    /// Run `f` on every connection matching `pred`, under the registry lock.
    pub fn for_each_where(&self, pred: impl Fn(&Arc<C>) -> bool, mut f: impl FnMut(&Arc<C>)) {
        let entries = self.entries.lock().expect("registry poisoned");
        for entry in entries.values().filter(|e| pred(&e.conn)) {
            f(&entry.conn);
        }
    }

    /// All connections except `except`, for work that must not hold the lock.
    pub fn snapshot(&self, except: Option<&Arc<C>>) -> Vec<Arc<C>> {
        let mut out = Vec::new();
        self.for_each(|c| out.push(Arc::clone(c)), except);
        out
    }

    pub fn snapshot_where(&self, pred: impl Fn(&Arc<C>) -> bool) -> Vec<Arc<C>> {
        let mut out = Vec::new();
        self.for_each_where(pred, |c| out.push(Arc::clone(c)));
        out
    }

    /// Registered names in their original case, alphabetically.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .lock()
            .expect("registry poisoned")
            .values()
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.entries.lock().expect("registry poisoned").len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .lock()
            .expect("registry poisoned")
            .contains_key(&name.to_lowercase())
    }
}

impl<C: FrameSink> Registry<C> {
    /// Enqueue `wire` on every connection except `except`.
    pub fn broadcast(&self, wire: &Bytes, except: Option<&Arc<C>>) {
        self.for_each(|c| c.deliver(wire.clone()), except);
    }

    /// Enqueue `wire` on every connection matching `pred`.
    pub fn broadcast_where(&self, wire: &Bytes, pred: impl Fn(&Arc<C>) -> bool) {
        self.for_each_where(pred, |c| c.deliver(wire.clone()));
    }
}

impl<C> Default for Registry<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Sink {
        got: Mutex<Vec<Bytes>>,
    }

    impl FrameSink for Sink {
        fn deliver(&self, wire: Bytes) {
            self.got.lock().unwrap().push(wire);
        }
    }

    #[test]
    fn names_unique_ignoring_case() {
        let reg = Registry::new();
        assert!(reg.insert("Steve", Arc::new(Sink::default())));
        assert!(!reg.insert("steve", Arc::new(Sink::default())));
        assert!(!reg.insert("STEVE", Arc::new(Sink::default())));
        assert!(reg.insert("Alex", Arc::new(Sink::default())));
        assert_eq!(reg.count(), 2);
        assert_eq!(reg.names(), vec!["Alex".to_string(), "Steve".to_string()]);
    }

    #[test]
    fn bounded_insert() {
        let reg = Registry::new();
        assert_eq!(
            reg.insert_bounded("a", Arc::new(Sink::default()), 1),
            Admission::Inserted
        );
        assert_eq!(
            reg.insert_bounded("A", Arc::new(Sink::default()), 1),
            Admission::Duplicate
        );
        assert_eq!(
            reg.insert_bounded("b", Arc::new(Sink::default()), 1),
            Admission::Full
        );
    }

    #[test]
    fn find_modes() {
        let reg = Registry::new();
        let steve = Arc::new(Sink::default());
        reg.insert("Steve", Arc::clone(&steve));
        reg.insert("Stevenson", Arc::new(Sink::default()));

        assert!(reg.find("Steve", FindMode::Exact).is_some());
        assert!(reg.find("steve", FindMode::Exact).is_none());
        let found = reg.find("sTeVe", FindMode::CaseInsensitive).unwrap();
        assert!(Arc::ptr_eq(&found, &steve));
        let found = reg.find("ste", FindMode::Prefix).unwrap();
        assert!(Arc::ptr_eq(&found, &steve));
        assert!(reg.find("x", FindMode::Prefix).is_none());
    }

    #[test]
    fn remove_conn_only_removes_that_connection() {
        let reg = Registry::new();
        let first = Arc::new(Sink::default());
        let imposter = Arc::new(Sink::default());
        reg.insert("Steve", Arc::clone(&first));
        assert!(!reg.insert("steve", Arc::clone(&imposter)));
        assert!(!reg.remove_conn(&imposter));
        assert!(reg.contains("STEVE"));
        assert!(reg.remove_conn(&first));
        assert_eq!(reg.count(), 0);
        assert!(reg.remove("Steve").is_none());
    }

    #[test]
    fn broadcast_skips_sender() {
        let reg = Registry::new();
        let a = Arc::new(Sink::default());
        let b = Arc::new(Sink::default());
        reg.insert("a", Arc::clone(&a));
        reg.insert("b", Arc::clone(&b));
        reg.broadcast(&Bytes::from_static(b"hi"), Some(&a));
        assert!(a.got.lock().unwrap().is_empty());
        assert_eq!(b.got.lock().unwrap().len(), 1);
        assert_eq!(reg.snapshot(Some(&b)).len(), 1);
    }

    struct Room {
        sink: Sink,
        room: &'static str,
    }

    impl FrameSink for Room {
        fn deliver(&self, wire: Bytes) {
            self.sink.deliver(wire);
        }
    }

    fn room(name: &'static str) -> Arc<Room> {
        Arc::new(Room {
            sink: Sink::default(),
            room: name,
        })
    }

    #[test]
    fn scoped_broadcast_reaches_only_matches() {
        let reg = Registry::new();
        let a = room("lobby");
        let b = room("lobby");
        let c = room("arena");
        reg.insert("a", Arc::clone(&a));
        reg.insert("b", Arc::clone(&b));
        reg.insert("c", Arc::clone(&c));

        reg.broadcast_where(&Bytes::from_static(b"hi"), |r| {
            r.room == "lobby" && !Arc::ptr_eq(r, &a)
        });
        assert!(a.sink.got.lock().unwrap().is_empty());
        assert_eq!(b.sink.got.lock().unwrap().len(), 1);
        assert!(c.sink.got.lock().unwrap().is_empty());

        let mut seen = 0;
        reg.for_each_where(|r| r.room == "arena", |_| seen += 1);
        assert_eq!(seen, 1);
        assert_eq!(reg.snapshot_where(|r| r.room == "lobby").len(), 2);
    }

    #[test]
    fn remove_if_returns_removed() {
        let reg = Registry::new();
        reg.insert("a", room("lobby"));
        reg.insert("b", room("arena"));
        reg.insert("c", room("arena"));

        let removed = reg.remove_if(|r| r.room == "arena");
        assert_eq!(removed.len(), 2);
        assert_eq!(reg.names(), vec!["a".to_string()]);
        assert!(reg.remove_if(|r| r.room == "arena").is_empty());
    }
}
