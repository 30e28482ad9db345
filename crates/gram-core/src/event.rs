//! Event system for editor notifications.
//!
//! The core never calls into a toolkit. It publishes `EditorEvent`s on a
//! `tokio::sync::broadcast` bus; a front-end subscribes and renders.
//! Senders never block, and a lagging receiver only loses old events.

use std::ops::Range;
use std::path::PathBuf;
use tokio::sync::broadcast;

use crate::key::BufferKey;

/// Events that can occur in the editor.
#[derive(Debug, Clone)]
pub enum EditorEvent {
    // Buffer events
    /// A buffer entered the store
    BufferOpened(BufferKey),
    /// A buffer was closed
    BufferClosed(BufferKey),
    /// A buffer was written to disk
    BufferSaved(BufferKey),
    /// Another buffer became the active one
    ActiveChanged(BufferKey),
    /// Window title changed
    TitleChanged(String),
    /// Tags were re-applied to a character range
    TagsChanged { key: BufferKey, range: Range<usize> },

    // Palette events
    /// The palette text or selection changed
    PaletteChanged,
    /// New completion candidates are available
    CompletionsChanged,

    // Editor events
    /// Configuration was (re)applied
    ConfigApplied,
    /// Audible alert
    Bell,
    /// A web link should be opened
    OpenUrl(String),
    /// Fullscreen was toggled
    FullscreenToggled(bool),
    /// A new editor instance should be started
    SpawnInstance { path: PathBuf, geo: String },
    /// Editor is quitting
    Quit,
}

/// Event bus for broadcasting editor events.
///
/// Clones share one channel, so worker threads can hold their own copy.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EditorEvent>,
}

impl EventBus {
    /// Creates a new event bus.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self { sender }
    }

    /// Emits an event to all subscribers.
    pub fn emit(&self, event: EditorEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    /// Subscribes to events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Helper for consuming events.
pub struct EventHandler {
    receiver: broadcast::Receiver<EditorEvent>,
}

impl EventHandler {
    pub fn new(receiver: broadcast::Receiver<EditorEvent>) -> Self {
        Self { receiver }
    }

    /// Waits for the next event.
    pub async fn next(&mut self) -> Option<EditorEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Event handler lagged, missed {} events", n);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Returns every event already queued, without waiting.
    pub fn drain(&mut self) -> Vec<EditorEvent> {
        let mut events = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!("Event handler lagged, missed {} events", n);
                }
                Err(_) => return events,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(EditorEvent::ConfigApplied);

        let event = rx.recv().await.unwrap();
        assert!(matches!(event, EditorEvent::ConfigApplied));
    }

    #[tokio::test]
    async fn test_clones_share_channel() {
        let bus = EventBus::new();
        let worker_bus = bus.clone();
        let mut handler = EventHandler::new(bus.subscribe());

        std::thread::spawn(move || worker_bus.emit(EditorEvent::Bell))
            .join()
            .unwrap();

        assert!(matches!(handler.next().await, Some(EditorEvent::Bell)));
    }

    #[test]
    fn test_drain_without_runtime() {
        let bus = EventBus::new();
        let mut handler = EventHandler::new(bus.subscribe());
        bus.emit(EditorEvent::PaletteChanged);
        bus.emit(EditorEvent::Quit);
        let events = handler.drain();
        assert_eq!(events.len(), 2);
        assert!(handler.drain().is_empty());
    }
}
