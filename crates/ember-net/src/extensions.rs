//! Typed per-connection side-table.
//!
//! Game logic outside the core attaches its own state to a connection here,
//! one value per type. Values live until removed or until the connection is
//! released.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct Extensions {
    map: Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl Extensions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, returning the previous value of the same type.
    pub fn insert<T: Any + Send + Sync>(&self, value: T) -> Option<T> {
        self.map
            .lock()
            .expect("extensions poisoned")
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|b| *b)
    }

    pub fn get<T: Any + Send + Sync + Clone>(&self) -> Option<T> {
        self.with(|v: &T| v.clone())
    }

    /// Borrow the value of type `T` under the table lock.
    pub fn with<T: Any + Send + Sync, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let map = self.map.lock().expect("extensions poisoned");
        map.get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
            .map(f)
    }

    pub fn with_mut<T: Any + Send + Sync, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut map = self.map.lock().expect("extensions poisoned");
        map.get_mut(&TypeId::of::<T>())
            .and_then(|v| v.downcast_mut::<T>())
            .map(f)
    }

    /// Like [`with_mut`](Self::with_mut), inserting `T::default()` first if absent.
    pub fn with_default<T: Any + Send + Sync + Default, R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut map = self.map.lock().expect("extensions poisoned");
        let entry = map
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::default()));
        match entry.downcast_mut::<T>() {
            Some(v) => f(v),
            None => unreachable!("extension stored under the wrong TypeId"),
        }
    }

    pub fn remove<T: Any + Send + Sync>(&self) -> Option<T> {
        self.map
            .lock()
            .expect("extensions poisoned")
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|b| *b)
    }

    pub fn contains<T: Any + Send + Sync>(&self) -> bool {
        self.map
            .lock()
            .expect("extensions poisoned")
            .contains_key(&TypeId::of::<T>())
    }

    /// Drop every value.
    pub fn clear(&self) {
        // Take the values out first so their destructors run without the lock.
        let drained: Vec<_> = self
            .map
            .lock()
            .expect("extensions poisoned")
            .drain()
            .collect();
        drop(drained);
    }

    pub fn len(&self) -> usize {
        self.map.lock().expect("extensions poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Selection {
        blocks: Vec<(i32, i32, i32)>,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Rank(u8);

    #[test]
    fn values_are_keyed_by_type() {
        let ext = Extensions::new();
        assert!(ext.insert(Rank(3)).is_none());
        ext.insert(Selection::default());
        assert_eq!(ext.get::<Rank>(), Some(Rank(3)));
        assert_eq!(ext.insert(Rank(4)), Some(Rank(3)));
        assert_eq!(ext.len(), 2);
    }

    #[test]
    fn mutate_in_place() {
        let ext = Extensions::new();
        ext.with_default(|s: &mut Selection| s.blocks.push((1, 2, 3)));
        ext.with_mut(|s: &mut Selection| s.blocks.push((4, 5, 6)));
        let count = ext.with(|s: &Selection| s.blocks.len());
        assert_eq!(count, Some(2));
        assert_eq!(ext.with(|r: &Rank| r.0), None);
    }

    #[test]
    fn clear_drops_values() {
        struct Tracked(Arc<AtomicUsize>);
        impl Drop for Tracked {
            fn drop(&mut self) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let drops = Arc::new(AtomicUsize::new(0));
        let ext = Extensions::new();
        ext.insert(Tracked(Arc::clone(&drops)));
        assert!(ext.contains::<Tracked>());
        ext.clear();
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        assert!(ext.is_empty());
        assert!(ext.remove::<Tracked>().is_none());
    }
}
