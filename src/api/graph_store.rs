use axum::body::Bytes;
use log::debug;
use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

#[derive(Default)]
struct Slots {
    shared: Option<Bytes>,
    sessions: HashMap<String, Bytes>,
    /// session ids, least recently written first
    order: VecDeque<String>,
}

/// Last rendered graph, per session. A write swaps the whole buffer, so a reader gets
/// either the previous image or the new one.
///
/// Requests without a session id share one slot (last writer wins). At most
/// `max_sessions` session slots are kept; writing a new one evicts the least recently
/// written. With `max_sessions == 0` session ids are ignored.
pub struct GraphStore {
    slots: RwLock<Slots>,
    max_sessions: usize,
}

impl GraphStore {
    pub fn new(max_sessions: usize) -> Self {
        GraphStore { slots: RwLock::new(Slots::default()), max_sessions }
    }

    fn session<'a>(&self, session: Option<&'a str>) -> Option<&'a str> {
        session.filter(|_| self.max_sessions > 0)
    }

    pub fn put(&self, session: Option<&str>, png: Bytes) {
        let mut slots = self.slots.write().unwrap_or_else(|e| e.into_inner());
        let Some(id) = self.session(session) else {
            slots.shared = Some(png);
            return;
        };
        slots.order.retain(|s| s != id);
        while slots.order.len() >= self.max_sessions {
            if let Some(oldest) = slots.order.pop_front() {
                debug!("graph of session {} evicted", oldest);
                slots.sessions.remove(&oldest);
            }
        }
        slots.order.push_back(id.to_string());
        slots.sessions.insert(id.to_string(), png);
    }

    pub fn get(&self, session: Option<&str>) -> Option<Bytes> {
        let slots = self.slots.read().unwrap_or_else(|e| e.into_inner());
        match self.session(session) {
            Some(id) => slots.sessions.get(id).cloned(),
            None => slots.shared.clone(),
        }
    }

    pub fn session_count(&self) -> usize {
        self.slots.read().unwrap_or_else(|e| e.into_inner()).sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_empty_store() {
        let store = GraphStore::new(4);
        assert!(store.get(None).is_none());
        assert!(store.get(Some("a")).is_none());
    }

    #[test]
    fn test_shared_slot_last_writer_wins() {
        let store = GraphStore::new(4);
        store.put(None, Bytes::from_static(b"first"));
        store.put(None, Bytes::from_static(b"second"));
        assert_eq!(store.get(None).unwrap(), Bytes::from_static(b"second"));
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = GraphStore::new(4);
        store.put(Some("a"), Bytes::from_static(b"A"));
        store.put(None, Bytes::from_static(b"shared"));
        assert_eq!(store.get(Some("a")).unwrap(), Bytes::from_static(b"A"));
        assert!(store.get(Some("b")).is_none());
        assert_eq!(store.get(None).unwrap(), Bytes::from_static(b"shared"));
    }

    #[test]
    fn test_eviction_of_least_recently_written() {
        let store = GraphStore::new(2);
        store.put(Some("a"), Bytes::from_static(b"A"));
        store.put(Some("b"), Bytes::from_static(b"B"));
        store.put(Some("a"), Bytes::from_static(b"A2"));
        store.put(Some("c"), Bytes::from_static(b"C"));
        assert_eq!(store.session_count(), 2);
        assert!(store.get(Some("b")).is_none());
        assert_eq!(store.get(Some("a")).unwrap(), Bytes::from_static(b"A2"));
    }

    #[test]
    fn test_sessions_disabled() {
        let store = GraphStore::new(0);
        store.put(Some("a"), Bytes::from_static(b"A"));
        assert_eq!(store.get(None).unwrap(), Bytes::from_static(b"A"));
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn test_readers_never_see_partial_writes() {
        let store = Arc::new(GraphStore::new(1));
        let images = [Bytes::from(vec![1u8; 4096]), Bytes::from(vec![2u8; 4096])];
        let writers: Vec<_> = (0..2)
            .map(|i| {
                let store = Arc::clone(&store);
                let image = images[i].clone();
                thread::spawn(move || {
                    for _ in 0..200 {
                        store.put(None, image.clone());
                    }
                })
            })
            .collect();
        for _ in 0..200 {
            if let Some(seen) = store.get(None) {
                assert!(images.contains(&seen));
            }
        }
        for w in writers {
            w.join().unwrap();
        }
    }
}
