//! Framework events and the fire-and-forget event service.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// Events published by the framework.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameworkEvent {
    /// Module descriptors changed (added, removed or updated).
    ModulesUpdated { titles: Vec<String> },
    CommandsAdded { names: Vec<String> },
    CommandsRemoved { names: Vec<String> },
    ModuleStarted { title: String },
    ModulePreprocessed { title: String },
    ModuleCanceled { title: String, reason: String },
    ModuleExecuted { title: String },
    ModulePostprocessed { title: String },
    ModuleFinished { title: String },
    ModuleFailed { title: String, message: String },
    OptionsChanged { class_name: String, name: String },
}

impl FrameworkEvent {
    /// Title of the module the event concerns, for execution events.
    pub fn module_title(&self) -> Option<&str> {
        match self {
            FrameworkEvent::ModuleStarted { title }
            | FrameworkEvent::ModulePreprocessed { title }
            | FrameworkEvent::ModuleCanceled { title, .. }
            | FrameworkEvent::ModuleExecuted { title }
            | FrameworkEvent::ModulePostprocessed { title }
            | FrameworkEvent::ModuleFinished { title }
            | FrameworkEvent::ModuleFailed { title, .. } => Some(title),
            _ => None,
        }
    }
}

struct Inner {
    subscribers: Vec<Sender<FrameworkEvent>>,
    backlog: VecDeque<FrameworkEvent>,
}

/// Fans events out to subscribers without ever blocking the publisher.
///
/// A subscriber whose channel is full misses the event; one whose receiver
/// was dropped is removed. The most recent events are retained in a bounded
/// backlog.
pub struct EventService {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl EventService {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                subscribers: Vec::new(),
                backlog: VecDeque::with_capacity(capacity),
            }),
            capacity,
        }
    }

    pub fn subscribe(&self) -> Receiver<FrameworkEvent> {
        let (tx, rx) = unbounded();
        self.inner.lock().subscribers.push(tx);
        rx
    }

    pub fn subscribe_bounded(&self, cap: usize) -> Receiver<FrameworkEvent> {
        let (tx, rx) = bounded(cap);
        self.inner.lock().subscribers.push(tx);
        rx
    }

    pub fn publish(&self, event: FrameworkEvent) {
        tracing::trace!("Publishing {:?}", event);
        let mut inner = self.inner.lock();
        if self.capacity > 0 {
            if inner.backlog.len() == self.capacity {
                inner.backlog.pop_front();
            }
            inner.backlog.push_back(event.clone());
        }
        inner.subscribers.retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!("Event subscriber is full, dropping event");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    /// Snapshot of retained events, oldest first.
    pub fn recent(&self) -> Vec<FrameworkEvent> {
        self.inner.lock().backlog.iter().cloned().collect()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }
}

impl Default for EventService {
    fn default() -> Self {
        Self::new(crate::context::DEFAULT_EVENT_BACKLOG)
    }
}
