use crate::error::GovernorResult;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Device state transition reported to registered clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateEvent {
    Suspend,
    Resume,
}

/// Notification callback. Runs on the notifying thread and must not block.
pub type StateCallback = Arc<dyn Fn(StateEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(u64);

/// Source of suspend/resume transitions.
pub trait StateSource: Send + Sync + 'static {
    fn register(&self, callback: StateCallback) -> GovernorResult<ClientId>;

    /// Once this returns, `id` receives no further notifications.
    fn unregister(&self, id: ClientId);

    fn suspended(&self) -> bool;
}

/// In-process notifier chain owning the suspend flag.
pub struct StateNotifier {
    suspended: AtomicBool,
    next_id: AtomicU64,
    clients: RwLock<Vec<(ClientId, StateCallback)>>,
}

impl StateNotifier {
    pub fn new() -> Self {
        Self {
            suspended: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            clients: RwLock::new(Vec::new()),
        }
    }

    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn suspend(&self) -> bool {
        self.set_suspended(true)
    }

    pub fn resume(&self) -> bool {
        self.set_suspended(false)
    }

    /// Updates the flag and notifies clients if it actually changed.
    /// Returns whether a notification went out.
    pub fn set_suspended(&self, suspended: bool) -> bool {
        if self.suspended.swap(suspended, Ordering::AcqRel) == suspended {
            return false;
        }
        let event = if suspended {
            StateEvent::Suspend
        } else {
            StateEvent::Resume
        };
        // Held across delivery so unregister() waits out in-flight callbacks.
        let clients = self.clients.read();
        for (_, cb) in clients.iter() {
            cb(event);
        }
        true
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }
}

impl Default for StateNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StateNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateNotifier")
            .field("suspended", &self.suspended())
            .field("clients", &self.client_count())
            .finish()
    }
}

impl StateSource for StateNotifier {
    fn register(&self, callback: StateCallback) -> GovernorResult<ClientId> {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.clients.write().push((id, callback));
        Ok(id)
    }

    fn unregister(&self, id: ClientId) {
        self.clients.write().retain(|(cid, _)| *cid != id);
    }

    fn suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire)
    }
}
