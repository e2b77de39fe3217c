//! rdev-based keyboard listener.

use super::HookState;
use crate::keycodes::vk_from_rdev;
use rdev::{listen, Event, EventType};
use std::sync::Arc;
use tracing::{error, info, trace};

/// Run the rdev listener. Blocks for the life of the hook.
pub(super) fn run_hook(state: Arc<HookState>) {
    info!("Input hook thread started (rdev)");

    let callback = move |event: Event| match event.event_type {
        EventType::KeyPress(key) => match vk_from_rdev(key) {
            Some(code) => state.press(code),
            None => trace!(?key, "Unmapped key press"),
        },
        EventType::KeyRelease(key) => {
            if let Some(code) = vk_from_rdev(key) {
                state.release(code);
            }
        }
        _ => {
            // Mouse events are not recorded
        }
    };

    if let Err(error) = listen(callback) {
        error!(?error, "Input hook error");
    }

    info!("Input hook thread exiting");
}
