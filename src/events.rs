//! Synchronous event bus connecting the core to its UI-side consumers.
//!
//! The VaultManager owns the canonical bus. Emission is synchronous on the
//! calling (UI) thread; the background indexing worker never emits directly,
//! it hands results back and the UI side emits when it installs them.

use std::fmt;
use uuid::Uuid;

/// Notifications emitted by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The current vault changed to the named vault.
    VaultChanged(String),
    /// A vault was registered.
    VaultAdded(String),
    /// A vault was removed from the registry.
    VaultRemoved(String),
    /// A project was added to a vault.
    ProjectAdded { vault: String, project: String },
    /// A project was removed from a vault.
    ProjectRemoved { vault: String, project: String },
    /// A vault scan was scheduled on the indexing queue.
    IndexingStarted,
    /// A finished scan was installed into its vault.
    IndexingFinished,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::VaultChanged(name) => write!(f, "vault_changed({name})"),
            Event::VaultAdded(name) => write!(f, "vault_added({name})"),
            Event::VaultRemoved(name) => write!(f, "vault_removed({name})"),
            Event::ProjectAdded { vault, project } => {
                write!(f, "project_added({vault}, {project})")
            }
            Event::ProjectRemoved { vault, project } => {
                write!(f, "project_removed({vault}, {project})")
            }
            Event::IndexingStarted => write!(f, "indexing_started"),
            Event::IndexingFinished => write!(f, "indexing_finished"),
        }
    }
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

type Callback = Box<dyn Fn(&Event)>;

/// Registry of event callbacks.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(SubscriberId, Callback)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for every emitted event.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriberId
    where
        F: Fn(&Event) + 'static,
    {
        let id = SubscriberId(Uuid::new_v4());
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a previously registered callback. Unknown ids are ignored.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    /// Deliver an event to every subscriber, in subscription order.
    pub fn emit(&self, event: &Event) {
        for (_, callback) in &self.subscribers {
            callback(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
