//! Outbound Notifications
//!
//! The engine reports a handful of host-visible moments through one injected
//! sink: dirty-state flips for title bars, whole-document swaps, and search
//! outcomes that UIs typically surface as an alert or a beep. Delivery is
//! synchronous and the engine never depends on what the sink does.

/// Host-visible engine events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    /// The modified-since-save state changed
    DirtyChanged(bool),
    /// The whole document was replaced (open / new file)
    DocumentReplaced,
    /// Replace-all finished, with the number of replacements made
    ReplaceAllFinished(usize),
    /// A search found nothing
    NoMatch,
}

pub trait EventSink {
    fn notify(&mut self, event: EditorEvent);
}

/// Sink that drops every event; the default until a host installs one
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn notify(&mut self, _event: EditorEvent) {}
}

/// Any `FnMut(EditorEvent)` works as a sink
impl<F: FnMut(EditorEvent)> EventSink for F {
    fn notify(&mut self, event: EditorEvent) {
        self(event);
    }
}
