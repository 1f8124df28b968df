//! Ordered dispatch of play frames onto the worker pool.
//!
//! Frames wait in a per-connection FIFO. A frame with no order class may run
//! at any time; a frame with a class runs only when no frame of that class is
//! executing and no earlier frame of that class is still waiting. Two frames
//! of one class therefore run strictly one after another, in receipt order,
//! while frames of different classes overlap freely.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Mutex;

use ember_proto::packets::id::play::serverbound as sb;

use crate::error::NetError;

/// Index of an order-sensitive class within an [`OrderingPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OrderClass(u16);

/// Mapping from play frame ids to order classes.
#[derive(Debug, Clone)]
pub struct OrderingPolicy {
    names: Vec<String>,
    by_id: HashMap<i32, OrderClass>,
}

impl OrderingPolicy {
    /// Build a policy from `(class name, frame ids)` pairs. A frame id may
    /// belong to at most one class.
    pub fn new<I, S>(classes: I) -> Result<Self, NetError>
    where
        I: IntoIterator<Item = (S, Vec<i32>)>,
        S: Into<String>,
    {
        let mut names = Vec::new();
        let mut by_id = HashMap::new();
        for (name, ids) in classes {
            let name = name.into();
            let class = OrderClass(names.len() as u16);
            for id in ids {
                if let Some(existing) = by_id.insert(id, class) {
                    return Err(NetError::InvalidConfig(format!(
                        "packet 0x{id:02X} is in both {:?} and {name:?}",
                        names[existing.0 as usize]
                    )));
                }
            }
            names.push(name);
        }
        Ok(Self { names, by_id })
    }

    /// A policy with no classes: every frame may run concurrently.
    pub fn unordered() -> Self {
        Self {
            names: Vec::new(),
            by_id: HashMap::new(),
        }
    }

    pub fn class_of(&self, id: i32) -> Option<OrderClass> {
        self.by_id.get(&id).copied()
    }

    pub fn class_name(&self, class: OrderClass) -> &str {
        &self.names[class.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for OrderingPolicy {
    fn default() -> Self {
        let classes = [
            (
                "movement",
                vec![
                    sb::PLAYER,
                    sb::PLAYER_POSITION,
                    sb::PLAYER_LOOK,
                    sb::PLAYER_POSITION_LOOK,
                    sb::CLIENT_STATUS,
                ],
            ),
            (
                "inventory",
                vec![
                    sb::HELD_ITEM_CHANGE,
                    sb::CLOSE_WINDOW,
                    sb::CLICK_WINDOW,
                    sb::CREATIVE_INVENTORY_ACTION,
                ],
            ),
            ("world", vec![sb::PLAYER_DIGGING, sb::BLOCK_PLACEMENT]),
            ("chat", vec![sb::CHAT_MESSAGE]),
        ];
        let mut names = Vec::new();
        let mut by_id = HashMap::new();
        for (i, (name, ids)) in classes.into_iter().enumerate() {
            names.push(name.to_string());
            for id in ids {
                by_id.insert(id, OrderClass(i as u16));
            }
        }
        Self { names, by_id }
    }
}

/// The FIFO grew past its configured bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overflow {
    pub max: usize,
}

impl fmt::Display for Overflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "more than {} frames pending", self.max)
    }
}

impl From<Overflow> for NetError {
    fn from(o: Overflow) -> Self {
        NetError::DispatchOverflow { max: o.max }
    }
}

struct Entry<T> {
    class: Option<OrderClass>,
    item: T,
}

struct Inner<T> {
    pending: VecDeque<Entry<T>>,
    in_flight: HashSet<OrderClass>,
}

/// Per-connection FIFO with per-class mutual exclusion.
pub struct DispatchQueue<T> {
    inner: Mutex<Inner<T>>,
    max_pending: usize,
}

impl<T> DispatchQueue<T> {
    pub fn new(max_pending: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                pending: VecDeque::new(),
                in_flight: HashSet::new(),
            }),
            max_pending,
        }
    }

    /// Append a frame to the FIFO.
    pub fn push(&self, class: Option<OrderClass>, item: T) -> Result<(), Overflow> {
        let mut inner = self.inner.lock().expect("dispatch queue poisoned");
        if inner.pending.len() >= self.max_pending {
            return Err(Overflow {
                max: self.max_pending,
            });
        }
        inner.pending.push_back(Entry { class, item });
        Ok(())
    }

    /// Remove every frame that may run now, in FIFO order, and mark their
    /// classes as executing. Each returned class must later be passed to
    /// [`complete`](Self::complete).
    pub fn take_ready(&self) -> Vec<(Option<OrderClass>, T)> {
        let mut inner = self.inner.lock().expect("dispatch queue poisoned");
        let Inner { pending, in_flight } = &mut *inner;

        let mut ready = Vec::new();
        let mut waiting = HashSet::new();
        let mut kept = VecDeque::with_capacity(pending.len());
        for entry in pending.drain(..) {
            match entry.class {
                None => ready.push((None, entry.item)),
                Some(class) if in_flight.contains(&class) || waiting.contains(&class) => {
                    waiting.insert(class);
                    kept.push_back(entry);
                }
                Some(class) => {
                    in_flight.insert(class);
                    ready.push((Some(class), entry.item));
                }
            }
        }
        *pending = kept;
        ready
    }

    /// Clear the executing marker of `class` after its handler returned.
    pub fn complete(&self, class: Option<OrderClass>) {
        if let Some(class) = class {
            self.inner
                .lock()
                .expect("dispatch queue poisoned")
                .in_flight
                .remove(&class);
        }
    }

    /// Drop every frame not yet dispatched. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock().expect("dispatch queue poisoned");
        let dropped = inner.pending.len();
        inner.pending.clear();
        dropped
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().expect("dispatch queue poisoned").pending.len()
    }

    pub fn is_executing(&self, class: OrderClass) -> bool {
        self.inner
            .lock()
            .expect("dispatch queue poisoned")
            .in_flight
            .contains(&class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> OrderingPolicy {
        OrderingPolicy::default()
    }

    fn items<T: Copy>(ready: &[(Option<OrderClass>, T)]) -> Vec<T> {
        ready.iter().map(|(_, item)| *item).collect()
    }

    #[test]
    fn default_classes() {
        let p = policy();
        let movement = p.class_of(sb::PLAYER_POSITION).unwrap();
        assert_eq!(p.class_name(movement), "movement");
        assert_eq!(p.class_of(sb::PLAYER_LOOK), Some(movement));
        assert_eq!(
            p.class_of(sb::CLICK_WINDOW),
            p.class_of(sb::CREATIVE_INVENTORY_ACTION)
        );
        assert_eq!(p.class_of(sb::KEEP_ALIVE), None);
        // A respawn moves the player, so it queues behind earlier moves.
        assert_eq!(p.class_of(sb::CLIENT_STATUS), Some(movement));
        assert_eq!(p.len(), 4);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let result = OrderingPolicy::new([("a", vec![1, 2]), ("b", vec![2])]);
        assert!(matches!(result, Err(NetError::InvalidConfig(_))));
    }

    #[test]
    fn same_class_runs_one_at_a_time() {
        let p = policy();
        let inv = p.class_of(sb::CLICK_WINDOW);
        let q = DispatchQueue::new(16);
        q.push(inv, 1).unwrap();
        q.push(inv, 2).unwrap();

        let ready = q.take_ready();
        assert_eq!(items(&ready), vec![1]);
        assert!(q.take_ready().is_empty());

        q.complete(inv);
        assert_eq!(items(&q.take_ready()), vec![2]);
    }

    #[test]
    fn unclassified_and_other_classes_pass() {
        let p = policy();
        let inv = p.class_of(sb::CLICK_WINDOW);
        let mov = p.class_of(sb::PLAYER_POSITION);
        let q = DispatchQueue::new(16);
        q.push(inv, 1).unwrap();
        q.push(inv, 2).unwrap();
        q.push(None, 3).unwrap();
        q.push(mov, 4).unwrap();

        assert_eq!(items(&q.take_ready()), vec![1, 3, 4]);
        assert_eq!(q.pending_len(), 1);
    }

    #[test]
    fn later_frame_never_overtakes_waiting_one() {
        let p = policy();
        let chat = p.class_of(sb::CHAT_MESSAGE);
        let q = DispatchQueue::new(16);
        q.push(chat, 1).unwrap();
        assert_eq!(items(&q.take_ready()), vec![1]);

        q.push(chat, 2).unwrap();
        q.push(chat, 3).unwrap();
        q.complete(chat);
        assert_eq!(items(&q.take_ready()), vec![2]);
        q.complete(chat);
        assert_eq!(items(&q.take_ready()), vec![3]);
    }

    #[test]
    fn overflow_and_clear() {
        let q = DispatchQueue::new(2);
        let mov = policy().class_of(sb::PLAYER);
        q.push(mov, 1).unwrap();
        q.push(mov, 2).unwrap();
        assert_eq!(q.push(mov, 3), Err(Overflow { max: 2 }));
        assert_eq!(q.clear(), 2);
        assert_eq!(q.pending_len(), 0);
    }
}
