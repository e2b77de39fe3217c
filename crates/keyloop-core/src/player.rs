//! Playback engine: replays the macro through the injector on a background thread.

use crate::config::{PlaybackConfig, Repeat};
use crate::engine::{EngineEvent, EngineShared, Refusal, Transition};
use crate::platform::KeyInjector;
use crate::KeyEvent;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info};

/// Owns the replay thread. `playing` in the shared status is the loop condition.
pub(crate) struct Player {
    shared: Arc<EngineShared>,
    injector: Arc<dyn KeyInjector>,
    config: PlaybackConfig,
    thread: Option<JoinHandle<()>>,
}

impl Player {
    pub fn new(
        shared: Arc<EngineShared>,
        injector: Arc<dyn KeyInjector>,
        config: PlaybackConfig,
    ) -> Self {
        Self { shared, injector, config, thread: None }
    }

    pub fn start(&mut self) -> Transition {
        if self.shared.status.is_playing() {
            return Transition::refuse(Refusal::AlreadyPlaying);
        }
        // A run with a finite repeat count may have ended on its own.
        self.join();

        let events = self.shared.log.snapshot();
        if events.is_empty() {
            return Transition::refuse(Refusal::NoMacro);
        }

        let run = PlaybackRun {
            shared: self.shared.clone(),
            injector: self.injector.clone(),
            config: self.config.clone(),
            events,
        };

        self.shared.status.set_playing(true);
        let event_count = run.events.len();
        info!(event_count, speed = self.config.speed, repeat = ?self.config.repeat, "Playback started");
        self.shared.emit(EngineEvent::PlaybackStarted { event_count });

        self.thread = Some(thread::spawn(move || run.run()));
        Transition::Applied
    }

    /// Stop playback. Blocks until the thread has exited.
    pub fn stop(&mut self) -> Transition {
        if !self.shared.status.is_playing() {
            self.join();
            return Transition::refuse(Refusal::NotPlaying);
        }

        self.shared.status.set_playing(false);
        self.join();

        info!("Playback stopped");
        self.shared.emit(EngineEvent::PlaybackStopped);
        Transition::Applied
    }

    /// Teardown: stop quietly if running.
    pub fn shutdown(&mut self) {
        if self.shared.status.is_playing() {
            let _ = self.stop();
        }
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("Player thread panicked");
            }
        }
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.shared.status.set_playing(false);
        self.join();
    }
}

struct PlaybackRun {
    shared: Arc<EngineShared>,
    injector: Arc<dyn KeyInjector>,
    config: PlaybackConfig,
    events: Vec<KeyEvent>,
}

impl PlaybackRun {
    fn run(self) {
        info!("Player thread started");

        let mut pass = 0u32;
        loop {
            if !self.play_pass() {
                debug!(pass, "Playback interrupted");
                break;
            }
            pass += 1;
            self.shared.emit(EngineEvent::PassCompleted { pass });

            if let Repeat::Times(n) = self.config.repeat {
                if pass >= n {
                    self.shared.status.set_playing(false);
                    info!(passes = pass, "Playback finished");
                    self.shared.emit(EngineEvent::PlaybackFinished { passes: pass });
                    break;
                }
            }
        }

        info!("Player thread exiting");
    }

    /// Replay every event once, each at `pass start + offset`. Returns false if stopped.
    fn play_pass(&self) -> bool {
        let pass_start = self.shared.clock.now_ms();

        for event in &self.events {
            let due = pass_start.saturating_add(self.scale(event.offset_ms));
            if !self.wait_until(due) {
                return false;
            }
            self.tap(event);
        }

        true
    }

    /// Sleep in `stop_check_ms` slices until `due_ms`. Returns false if playback was stopped.
    fn wait_until(&self, due_ms: u64) -> bool {
        loop {
            if !self.shared.status.is_playing() {
                return false;
            }
            let now = self.shared.clock.now_ms();
            if now >= due_ms {
                return true;
            }
            let chunk = (due_ms - now).min(self.config.stop_check_ms);
            self.shared.clock.sleep(chunk);
        }
    }

    fn tap(&self, event: &KeyEvent) {
        let code = event.code;
        if let Err(e) = self.injector.key_down(code) {
            error!(code, error = %e, "key down injection failed");
        }
        if let Err(e) = self.injector.key_up(code) {
            error!(code, error = %e, "key up injection failed");
        }
        debug!(code, offset_ms = event.offset_ms, "Injected key");
    }

    fn scale(&self, offset_ms: u64) -> u64 {
        if self.config.speed == 1.0 {
            offset_ms
        } else {
            (offset_ms as f64 / f64::from(self.config.speed))
                .round()
                .min(u64::MAX as f64) as u64
        }
    }
}
