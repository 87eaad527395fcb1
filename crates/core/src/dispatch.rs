//! Observer registry and synchronous event fan-out

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

use crate::types::ChatEvent;

/// Recipient of chat events
///
/// Implement [`on_event`](Self::on_event) to see every event, or override only
/// the per-notification hooks you care about; the default `on_event` routes to
/// them and every hook defaults to a no-op.
///
/// Events are delivered on the reader task (or on the caller of
/// `disconnect`). Observers that need another context, such as a UI thread,
/// must hop there themselves.
pub trait ChatObserver: Send + Sync {
    fn on_event(&self, event: &ChatEvent) -> anyhow::Result<()> {
        match event {
            ChatEvent::LoginResult { success, message } => self.on_login_result(*success, message),
            ChatEvent::Disconnected => self.on_disconnect(),
            ChatEvent::UserList { users } => self.on_user_list(users),
            ChatEvent::MessageReceived {
                private,
                sender,
                text,
            } => self.on_message_received(*private, sender, text),
            ChatEvent::MessageError { reason } => self.on_message_error(reason),
            ChatEvent::CommandError { reason } => self.on_command_error(reason),
            ChatEvent::SupportedCommands { commands } => self.on_supported_commands(commands),
        }
    }

    fn on_login_result(&self, _success: bool, _message: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_disconnect(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_user_list(&self, _users: &[String]) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_message_received(&self, _private: bool, _sender: &str, _text: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_message_error(&self, _reason: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_command_error(&self, _reason: &str) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_supported_commands(&self, _commands: &[String]) -> anyhow::Result<()> {
        Ok(())
    }
}

struct FnObserver<F>(F);

impl<F> ChatObserver for FnObserver<F>
where
    F: Fn(&ChatEvent) -> anyhow::Result<()> + Send + Sync,
{
    fn on_event(&self, event: &ChatEvent) -> anyhow::Result<()> {
        (self.0)(event)
    }
}

/// Wrap a closure as an observer
pub fn observer_fn<F>(f: F) -> Arc<dyn ChatObserver>
where
    F: Fn(&ChatEvent) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(FnObserver(f))
}

/// Ordered set of observers, unique by identity
///
/// Dispatch iterates over a snapshot, so observers may register or
/// unregister (themselves or others) while an event is being delivered.
/// Changes apply from the next dispatch on.
#[derive(Default)]
pub struct EventDispatcher {
    observers: RwLock<Vec<Arc<dyn ChatObserver>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add observer. Returns false if it was already registered.
    pub fn register(&self, observer: Arc<dyn ChatObserver>) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(|e| e.into_inner());
        if observers.iter().any(|o| same_observer(o, &observer)) {
            return false;
        }
        observers.push(observer);
        true
    }

    /// Remove observer. Returns false if it was not registered.
    pub fn unregister(&self, observer: &Arc<dyn ChatObserver>) -> bool {
        let mut observers = self.observers.write().unwrap_or_else(|e| e.into_inner());
        let before = observers.len();
        observers.retain(|o| !same_observer(o, observer));
        observers.len() != before
    }

    /// Number of registered observers
    pub fn len(&self) -> usize {
        self.observers.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver `event` to every observer in registration order, on the
    /// calling context
    ///
    /// An observer that returns an error or panics is logged and skipped;
    /// the rest still receive the event.
    pub fn dispatch(&self, event: &ChatEvent) {
        let snapshot: Vec<Arc<dyn ChatObserver>> = self
            .observers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        tracing::trace!(kind = event.kind(), observers = snapshot.len(), "Dispatching event");

        for (index, observer) in snapshot.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| observer.on_event(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(kind = event.kind(), index, "Observer failed: {:#}", e);
                }
                Err(_) => {
                    tracing::error!(kind = event.kind(), index, "Observer panicked");
                }
            }
        }
    }
}

/// Identity comparison on the data pointer (vtable pointers may differ
/// between codegen units for the same object)
fn same_observer(a: &Arc<dyn ChatObserver>, b: &Arc<dyn ChatObserver>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}
