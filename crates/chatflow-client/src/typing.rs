//! Local typing advisory signals.
//!
//! A [`TypingNotifier`] turns raw keystrokes into a Started/Stopped signal
//! pair for other local UI (e.g. a typing indicator next to the input):
//! `Started` fires on the first keystroke, every further keystroke re-arms
//! the timer, and `Stopped` fires after [`TYPING_IDLE`] of inactivity.
//! These signals never leave the process.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use chatflow_shared::constants::TYPING_IDLE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    Started,
    Stopped,
}

#[derive(Debug, Default)]
struct TypingState {
    typing: bool,
    /// Bumped on every keystroke so an outdated idle timer can tell it
    /// has been superseded.
    epoch: u64,
}

#[derive(Clone)]
pub struct TypingNotifier {
    tx: mpsc::UnboundedSender<TypingSignal>,
    state: Arc<Mutex<TypingState>>,
}

impl TypingNotifier {
    /// Create a notifier plus the receiver the local UI listens on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TypingSignal>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                state: Arc::new(Mutex::new(TypingState::default())),
            },
            rx,
        )
    }

    /// Record one keystroke.
    ///
    /// Emits `Started` when a typing burst begins and arms (or re-arms)
    /// the idle timer that will emit `Stopped`.
    pub async fn keystroke(&self) {
        let epoch = {
            let mut state = self.state.lock().await;
            state.epoch += 1;
            if !state.typing {
                state.typing = true;
                let _ = self.tx.send(TypingSignal::Started);
            }
            state.epoch
        };

        let tx = self.tx.clone();
        let shared = Arc::clone(&self.state);
        tokio::spawn(async move {
            tokio::time::sleep(TYPING_IDLE).await;
            let mut state = shared.lock().await;
            // A later keystroke re-armed the timer; this one is stale.
            if state.typing && state.epoch == epoch {
                state.typing = false;
                let _ = tx.send(TypingSignal::Stopped);
            }
        });
    }
}
