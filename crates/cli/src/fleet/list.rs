use std::sync::{Mutex, MutexGuard, PoisonError};

use common::api::{Machine, MachinePage};
use serde::Serialize;
use tokio::sync::watch;

/// Current page of machines plus the independent unauthorized badge count.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MachineListState {
    /// Server sort order; never re-sorted here.
    pub items: Vec<Machine>,
    /// Total matching the query that produced `items`.
    pub total: u64,
    /// Total of `authorized=false` machines, whatever view is active.
    pub unauthorized_total: u64,
}

impl MachineListState {
    pub fn find(&self, machine_id: i64) -> Option<&Machine> {
        self.items.iter().find(|m| m.id == machine_id)
    }
}

/// Sequence number stamped on every outgoing list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RequestTag(u64);

impl RequestTag {
    pub fn value(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryClass {
    Primary,
    Probe,
}

#[derive(Debug, Default)]
struct ListInner {
    next_tag: u64,
    latest_primary: Option<RequestTag>,
    latest_probe: Option<RequestTag>,
}

impl ListInner {
    fn latest(&self, class: QueryClass) -> Option<RequestTag> {
        match class {
            QueryClass::Primary => self.latest_primary,
            QueryClass::Probe => self.latest_probe,
        }
    }
}

/// Owns `MachineListState` and the stale-response filter guarding it.
///
/// Responses are applied only when their tag is the latest issued for the
/// same query class. Accepted responses replace state wholesale and are
/// published to subscribers.
pub struct MachineListStore {
    inner: Mutex<ListInner>,
    tx: watch::Sender<MachineListState>,
}

impl MachineListStore {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(MachineListState::default());
        Self {
            inner: Mutex::new(ListInner::default()),
            tx,
        }
    }

    fn lock(&self) -> MutexGuard<'_, ListInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn issue(&self, class: QueryClass) -> RequestTag {
        let mut inner = self.lock();
        inner.next_tag += 1;
        let tag = RequestTag(inner.next_tag);
        match class {
            QueryClass::Primary => inner.latest_primary = Some(tag),
            QueryClass::Probe => inner.latest_probe = Some(tag),
        }
        tag
    }

    pub fn is_current(&self, class: QueryClass, tag: RequestTag) -> bool {
        self.lock().latest(class) == Some(tag)
    }

    /// Replace `items` and `total`. Returns false when the response is stale.
    pub fn apply_primary(&self, tag: RequestTag, page: MachinePage) -> bool {
        let inner = self.lock();
        if inner.latest(QueryClass::Primary) != Some(tag) {
            return false;
        }
        self.tx.send_modify(|state| {
            state.items = page.items;
            state.total = page.total;
        });
        drop(inner);
        true
    }

    /// Replace only `unauthorized_total`. Returns false when the response is stale.
    pub fn apply_probe(&self, tag: RequestTag, page: MachinePage) -> bool {
        let inner = self.lock();
        if inner.latest(QueryClass::Probe) != Some(tag) {
            return false;
        }
        self.tx.send_modify(|state| state.unauthorized_total = page.total);
        drop(inner);
        true
    }

    pub fn snapshot(&self) -> MachineListState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MachineListState> {
        self.tx.subscribe()
    }
}

impl Default for MachineListStore {
    fn default() -> Self {
        Self::new()
    }
}
