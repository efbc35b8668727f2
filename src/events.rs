//! Fan-out of decoded messages and driver failure to registered sinks.

use crate::message::Message;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type MessageListener = Arc<dyn Fn(&Message) + Send + Sync>;
type FailureListener = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by registration, used to remove a sink later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listeners are invoked synchronously, in registration order, on the task
/// that emits. Dispatch iterates over a snapshot of the list, so removing a
/// listener from within a callback is safe and takes effect on the next
/// emission.
#[derive(Default)]
pub struct EventEmitter {
    next_id: AtomicU64,
    message: Mutex<Vec<(ListenerId, MessageListener)>>,
    failure: Mutex<Vec<(ListenerId, FailureListener)>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn on_message(&self, listener: impl Fn(&Message) + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id();
        self.message.lock().unwrap().push((id, Arc::new(listener)));
        id
    }

    pub fn on_failure(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
        let id = self.next_id();
        self.failure.lock().unwrap().push((id, Arc::new(listener)));
        id
    }

    pub fn remove_message_listener(&self, id: ListenerId) {
        self.message.lock().unwrap().retain(|(lid, _)| *lid != id);
    }

    pub fn remove_failure_listener(&self, id: ListenerId) {
        self.failure.lock().unwrap().retain(|(lid, _)| *lid != id);
    }

    pub(crate) fn emit_message(&self, message: &Message) {
        let snapshot: Vec<MessageListener> = self
            .message
            .lock()
            .unwrap()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener(message);
        }
    }

    pub(crate) fn emit_failure(&self) {
        let snapshot: Vec<FailureListener> = self
            .failure
            .lock()
            .unwrap()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in snapshot {
            listener();
        }
    }
}
