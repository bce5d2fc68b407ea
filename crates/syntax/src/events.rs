// Chunk: docs/chunks/highlighter_events - Observer list for highlighter notifications

//! Notifications emitted by the highlighter.
//!
//! The core only ever emits a small fixed set of events. Observers register a
//! callback; the highlighter calls each one in registration order.

/// Something the highlighter wants observers to know.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlighterEvent {
    /// A reformatting run reached its fixpoint; `blocks` is the number of
    /// blocks the final burst processed.
    Finished { blocks: usize },
    /// A burst ran out of budget; work resumes at `next_block`.
    Yielded { next_block: usize },
    /// Pending work was dropped by cancellation.
    Cancelled,
}

type Listener = Box<dyn FnMut(&HighlighterEvent) + Send>;

/// Registered observers.
#[derive(Default)]
pub struct Listeners {
    listeners: Vec<Listener>,
}

impl Listeners {
    pub fn add(&mut self, listener: impl FnMut(&HighlighterEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    pub fn emit(&mut self, event: HighlighterEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_listeners_called_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = Listeners::default();
        for tag in 0..2 {
            let seen = Arc::clone(&seen);
            listeners.add(move |event| seen.lock().unwrap().push((tag, *event)));
        }
        listeners.emit(HighlighterEvent::Cancelled);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(0, HighlighterEvent::Cancelled), (1, HighlighterEvent::Cancelled)]
        );
    }
}
