//! Global keyboard hook: live key-state table and press-edge feed.
//!
//! Backed by `rdev::listen`, which runs for the rest of the process once started, so the
//! hook is a process-wide singleton shared by every [`RdevKeyboard`] handle.

use crate::keycodes::{key_name, sided_codes};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use keyloop_core::{KeyCode, KeyPressFeed, KeyStateSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::thread;
use tracing::{debug, info, warn};

mod rdev_impl;

const TABLE_SIZE: usize = 256;

/// State updated by the hook thread.
pub(crate) struct HookState {
    held: [AtomicBool; TABLE_SIZE],
    subscribers: Mutex<Vec<Sender<KeyCode>>>,
}

impl HookState {
    fn new() -> Self {
        Self {
            held: std::array::from_fn(|_| AtomicBool::new(false)),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Mark `code` held; broadcast only on the up -> down edge so auto-repeat is dropped.
    pub(crate) fn press(&self, code: KeyCode) {
        let Some(slot) = self.held.get(usize::from(code)) else {
            return;
        };
        if slot.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(code, key = %key_name(code), "key pressed");

        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| match tx.try_send(code) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(code, "Press feed subscriber is full, dropping key");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    pub(crate) fn release(&self, code: KeyCode) {
        if let Some(slot) = self.held.get(usize::from(code)) {
            slot.store(false, Ordering::SeqCst);
        }
    }

    fn is_held(&self, code: KeyCode) -> bool {
        match sided_codes(code) {
            Some(sides) => sides.iter().any(|&c| self.is_held(c)),
            None => self
                .held
                .get(usize::from(code))
                .is_some_and(|slot| slot.load(Ordering::SeqCst)),
        }
    }
}

static HOOK: OnceLock<Arc<HookState>> = OnceLock::new();

/// Handle to the global keyboard hook.
#[derive(Clone)]
pub struct RdevKeyboard {
    state: Arc<HookState>,
}

impl RdevKeyboard {
    /// Get the hook, starting its listener thread on first use.
    pub fn start() -> Self {
        let state = HOOK
            .get_or_init(|| {
                let state = Arc::new(HookState::new());
                let hook_state = state.clone();
                thread::spawn(move || rdev_impl::run_hook(hook_state));
                info!("Keyboard hook installed");
                state
            })
            .clone();
        Self { state }
    }
}

impl KeyStateSource for RdevKeyboard {
    fn is_key_down(&self, code: KeyCode) -> bool {
        self.state.is_held(code)
    }
}

impl KeyPressFeed for RdevKeyboard {
    fn subscribe(&self) -> Receiver<KeyCode> {
        let (tx, rx) = bounded(1024);
        self.state
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }
}
