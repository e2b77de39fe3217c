//! Macro engine: transition guards over the recorder and player threads.

use crate::config::{CaptureMode, ConfigResult, EngineConfig};
use crate::event_log::EventLog;
use crate::platform::{Clock, KeyInjector, KeyPressFeed, KeyStateSource, MonotonicClock};
use crate::player::Player;
use crate::recorder::{CaptureSource, Recorder};
use crate::status::{EngineStatus, StatusSnapshot};
use crate::{KeyCode, KeyEvent};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Events emitted by the engine and its threads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EngineEvent {
    RecordingStarted,
    /// A key press was appended to the macro.
    KeyCaptured { code: KeyCode, offset_ms: u64, count: usize },
    RecordingStopped { event_count: usize, macro_available: bool },
    PlaybackStarted { event_count: usize },
    /// One full pass over the macro was replayed.
    PassCompleted { pass: u32 },
    /// The configured repeat count was reached.
    PlaybackFinished { passes: u32 },
    PlaybackStopped,
}

/// Why a start/stop call was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Refusal {
    #[error("already recording")]
    AlreadyRecording,
    #[error("not currently recording")]
    NotRecording,
    #[error("already playing back a macro")]
    AlreadyPlaying,
    #[error("not currently playing back a macro")]
    NotPlaying,
    #[error("no macro recorded to play")]
    NoMacro,
    #[error("cannot play back while recording")]
    RecordingActive,
    #[error("cannot record during playback")]
    PlaybackActive,
}

/// Outcome of a start/stop call. Ignored calls change nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Ignored(Refusal),
}

impl Transition {
    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied)
    }

    pub(crate) fn refuse(refusal: Refusal) -> Self {
        warn!("{}", refusal);
        Transition::Ignored(refusal)
    }
}

/// Capacity of the engine event channel.
pub const EVENT_CAPACITY: usize = 256;

/// State shared by the engine and its background threads.
pub(crate) struct EngineShared {
    pub status: EngineStatus,
    pub log: EventLog,
    pub clock: Arc<dyn Clock>,
    event_tx: Sender<EngineEvent>,
    /// Events dropped since the channel last had room.
    dropped: AtomicU64,
}

impl EngineShared {
    pub fn new(clock: Arc<dyn Clock>) -> (Arc<Self>, Receiver<EngineEvent>) {
        let (event_tx, event_rx) = bounded(EVENT_CAPACITY);
        let shared = Arc::new(Self {
            status: EngineStatus::new(),
            log: EventLog::new(),
            clock,
            event_tx,
            dropped: AtomicU64::new(0),
        });
        (shared, event_rx)
    }

    /// Send without blocking. A full channel drops the event, warning once per full spell.
    pub fn emit(&self, event: EngineEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {
                let dropped = self.dropped.swap(0, Ordering::SeqCst);
                if dropped > 0 {
                    info!(dropped, "Event channel has room again");
                }
            }
            Err(TrySendError::Full(_)) => {
                if self.dropped.fetch_add(1, Ordering::SeqCst) == 0 {
                    warn!("Event channel full, dropping events until it is drained");
                }
            }
            Err(TrySendError::Disconnected(event)) => {
                debug!(?event, "Event receiver gone");
            }
        }
    }

    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::SeqCst)
    }
}

struct Lifecycle {
    recorder: Recorder,
    player: Player,
}

/// Builder for [`MacroEngine`].
pub struct EngineBuilder {
    keys: Arc<dyn KeyStateSource>,
    injector: Arc<dyn KeyInjector>,
    clock: Option<Arc<dyn Clock>>,
    press_feed: Option<Arc<dyn KeyPressFeed>>,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Press feed used by [`CaptureMode::Hook`].
    pub fn press_feed(mut self, feed: Arc<dyn KeyPressFeed>) -> Self {
        self.press_feed = Some(feed);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> ConfigResult<MacroEngine> {
        let mut config = self.config;
        config.validate()?;

        let source = match (config.capture, self.press_feed) {
            (CaptureMode::Hook, Some(feed)) => CaptureSource::Hook(feed),
            (CaptureMode::Hook, None) => {
                warn!("Hook capture requested without a press feed, falling back to sequential");
                config.capture = CaptureMode::Sequential;
                CaptureSource::Sequential(self.keys)
            }
            (CaptureMode::Overlapping, _) => CaptureSource::Overlapping(self.keys),
            (CaptureMode::Sequential, _) => CaptureSource::Sequential(self.keys),
        };

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let (shared, event_rx) = EngineShared::new(clock);

        let recorder = Recorder::new(shared.clone(), source, &config);
        let player = Player::new(shared.clone(), self.injector, config.playback.clone());

        info!(capture = ?config.capture, "Macro engine ready");

        Ok(MacroEngine {
            shared,
            lifecycle: Mutex::new(Lifecycle { recorder, player }),
            event_rx,
            config,
        })
    }
}

/// Owns the macro and the recorder/player threads.
///
/// Recording and playback are mutually exclusive. Every start/stop runs under one transition
/// lock, while the status reads never block.
///
/// Notifications queue up to [`EVENT_CAPACITY`] events; callers should [`drain`](Self::drain)
/// them regularly or later events are dropped.
pub struct MacroEngine {
    shared: Arc<EngineShared>,
    lifecycle: Mutex<Lifecycle>,
    event_rx: Receiver<EngineEvent>,
    config: EngineConfig,
}

impl MacroEngine {
    pub fn builder(keys: Arc<dyn KeyStateSource>, injector: Arc<dyn KeyInjector>) -> EngineBuilder {
        EngineBuilder {
            keys,
            injector,
            clock: None,
            press_feed: None,
            config: EngineConfig::default(),
        }
    }

    /// Engine with the default config and the real monotonic clock.
    pub fn new(keys: Arc<dyn KeyStateSource>, injector: Arc<dyn KeyInjector>) -> ConfigResult<Self> {
        Self::builder(keys, injector).build()
    }

    pub fn start_recording(&self) -> Transition {
        let mut lifecycle = self.lock();
        if self.shared.status.is_playing() {
            return Transition::refuse(Refusal::PlaybackActive);
        }
        lifecycle.recorder.start()
    }

    /// Stop recording. Blocks until the capture thread has exited.
    pub fn stop_recording(&self) -> Transition {
        self.lock().recorder.stop()
    }

    pub fn start_playback(&self) -> Transition {
        let mut lifecycle = self.lock();
        if self.shared.status.is_recording() {
            return Transition::refuse(Refusal::RecordingActive);
        }
        lifecycle.player.start()
    }

    /// Stop playback. Blocks until the replay thread has exited.
    pub fn stop_playback(&self) -> Transition {
        self.lock().player.stop()
    }

    pub fn toggle_recording(&self) -> Transition {
        if self.is_recording() {
            self.stop_recording()
        } else {
            self.start_recording()
        }
    }

    pub fn toggle_playback(&self) -> Transition {
        if self.is_playing() {
            self.stop_playback()
        } else {
            self.start_playback()
        }
    }

    pub fn is_recording(&self) -> bool {
        self.shared.status.is_recording()
    }

    pub fn is_playing(&self) -> bool {
        self.shared.status.is_playing()
    }

    pub fn is_macro_available(&self) -> bool {
        self.shared.status.is_macro_available()
    }

    pub fn status(&self) -> StatusSnapshot {
        StatusSnapshot {
            recording: self.is_recording(),
            playing: self.is_playing(),
            macro_available: self.is_macro_available(),
            event_count: self.shared.log.len(),
        }
    }

    /// Copy of the current macro.
    pub fn recorded_macro(&self) -> Vec<KeyEvent> {
        self.shared.log.snapshot()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive all pending events.
    pub fn drain(&self) -> Vec<EngineEvent> {
        self.event_rx.try_iter().collect()
    }

    /// Stop whatever is running and join both threads.
    pub fn shutdown(&self) {
        let mut lifecycle = self.lock();
        lifecycle.recorder.shutdown();
        lifecycle.player.shutdown();
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MacroEngine {
    fn drop(&mut self) {
        self.shutdown();
        info!("Macro engine shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PlaybackConfig, Repeat};
    use crate::test_support::{
        run_until, wait_for, ChannelFeed, FakeClock, RecordingInjector, ScriptedKeys,
    };

    struct Rig {
        clock: Arc<FakeClock>,
        injector: Arc<RecordingInjector>,
        engine: MacroEngine,
    }

    fn rig(presses: Vec<(KeyCode, u64, u64)>, config: EngineConfig) -> Rig {
        let clock = FakeClock::new();
        let keys = Arc::new(ScriptedKeys::new(clock.clone(), presses));
        let injector = Arc::new(RecordingInjector::new(clock.clone()));
        let engine = MacroEngine::builder(keys, injector.clone())
            .clock(clock.clone())
            .config(config)
            .build()
            .unwrap();
        Rig { clock, injector, engine }
    }

    /// Record until the virtual clock passes `until_ms`.
    fn record(rig: &Rig, until_ms: u64) {
        rig.clock.hold_at(rig.clock.now_ms());
        assert_eq!(rig.engine.start_recording(), Transition::Applied);
        run_until(&rig.clock, until_ms, || {
            assert_eq!(rig.engine.stop_recording(), Transition::Applied)
        });
    }

    #[test]
    fn test_record_then_play_scenario() {
        let rig = rig(vec![(0x41, 100, 150)], EngineConfig::default());

        record(&rig, 300);
        assert_eq!(rig.engine.recorded_macro(), vec![KeyEvent::new(0x41, 100)]);
        assert!(rig.engine.is_macro_available());
        assert!(!rig.engine.is_recording());

        let t0 = rig.clock.now_ms();
        assert_eq!(rig.engine.start_playback(), Transition::Applied);
        assert!(wait_for(|| rig.injector.downs().len() >= 2));
        assert_eq!(rig.engine.stop_playback(), Transition::Applied);

        let downs = rig.injector.downs();
        assert_eq!(downs[0], (t0 + 100, 0x41));
        assert_eq!(downs[1], (t0 + 200, 0x41));
        assert!(!rig.engine.is_playing());
    }

    #[test]
    fn test_stop_recording_without_start_is_noop() {
        let rig = rig(vec![], EngineConfig::default());
        let before = rig.engine.status();

        assert_eq!(
            rig.engine.stop_recording(),
            Transition::Ignored(Refusal::NotRecording)
        );
        assert_eq!(rig.engine.status(), before);
        assert!(rig.engine.drain().is_empty());
    }

    #[test]
    fn test_start_playback_without_macro_is_noop() {
        let rig = rig(vec![], EngineConfig::default());
        assert_eq!(rig.engine.start_playback(), Transition::Ignored(Refusal::NoMacro));
        assert!(!rig.engine.is_playing());

        // An empty recording session does not make a macro available either.
        record(&rig, 50);
        assert!(!rig.engine.is_macro_available());
        assert_eq!(rig.engine.start_playback(), Transition::Ignored(Refusal::NoMacro));
        assert!(!rig.engine.is_playing());
    }

    #[test]
    fn test_start_playback_twice_keeps_one_player() {
        let rig = rig(vec![(0x41, 20, 40)], EngineConfig::default());
        record(&rig, 100);

        assert_eq!(rig.engine.start_playback(), Transition::Applied);
        assert_eq!(
            rig.engine.start_playback(),
            Transition::Ignored(Refusal::AlreadyPlaying)
        );
        assert!(rig.engine.is_playing());
        assert_eq!(rig.engine.stop_playback(), Transition::Applied);
        assert_eq!(
            rig.engine.stop_playback(),
            Transition::Ignored(Refusal::NotPlaying)
        );
    }

    #[test]
    fn test_recording_and_playback_are_exclusive() {
        let rig = rig(vec![(0x41, 20, 40)], EngineConfig::default());
        record(&rig, 100);

        assert!(rig.engine.start_playback().is_applied());
        assert_eq!(
            rig.engine.start_recording(),
            Transition::Ignored(Refusal::PlaybackActive)
        );
        assert!(!rig.engine.is_recording());
        assert!(rig.engine.stop_playback().is_applied());

        assert!(rig.engine.start_recording().is_applied());
        assert_eq!(
            rig.engine.start_playback(),
            Transition::Ignored(Refusal::RecordingActive)
        );
        assert!(!rig.engine.is_playing());
        assert!(rig.engine.stop_recording().is_applied());
    }

    #[test]
    fn test_new_recording_discards_previous_macro() {
        let rig = rig(vec![(0x41, 20, 40)], EngineConfig::default());
        record(&rig, 100);
        assert_eq!(rig.engine.recorded_macro().len(), 1);

        // Second session: the scripted press is in the past, nothing is captured.
        assert!(rig.engine.start_recording().is_applied());
        assert!(rig.engine.recorded_macro().is_empty());
        assert!(!rig.engine.is_macro_available());
        assert!(rig.engine.stop_recording().is_applied());
        assert!(!rig.engine.is_macro_available());
        assert!(rig.engine.recorded_macro().is_empty());
    }

    #[test]
    fn test_each_session_replaces_the_macro() {
        let rig = rig(vec![(0x41, 150, 170)], EngineConfig::default());

        record(&rig, 100);
        assert!(rig.engine.recorded_macro().is_empty());
        assert!(!rig.engine.is_macro_available());

        record(&rig, 300);
        assert_eq!(rig.engine.recorded_macro(), vec![KeyEvent::new(0x41, 50)]);
        assert!(rig.engine.is_macro_available());

        record(&rig, 400);
        assert!(rig.engine.recorded_macro().is_empty());
        assert!(!rig.engine.is_macro_available());

        let stops: Vec<_> = rig
            .engine
            .drain()
            .into_iter()
            .filter(|e| matches!(e, EngineEvent::RecordingStopped { .. }))
            .collect();
        assert_eq!(
            stops,
            vec![
                EngineEvent::RecordingStopped { event_count: 0, macro_available: false },
                EngineEvent::RecordingStopped { event_count: 1, macro_available: true },
                EngineEvent::RecordingStopped { event_count: 0, macro_available: false },
            ]
        );
    }

    #[test]
    fn test_full_event_channel_drops_and_recovers() {
        let (shared, rx) = EngineShared::new(FakeClock::new());

        for pass in 0..(EVENT_CAPACITY as u32 + 10) {
            shared.emit(EngineEvent::PassCompleted { pass });
        }
        assert_eq!(shared.dropped_events(), 10);
        assert_eq!(rx.len(), EVENT_CAPACITY);

        rx.try_iter().for_each(drop);
        shared.emit(EngineEvent::PlaybackStopped);
        assert_eq!(shared.dropped_events(), 0);
        assert_eq!(rx.try_recv().ok(), Some(EngineEvent::PlaybackStopped));
    }

    #[test]
    fn test_toggles_follow_status() {
        let rig = rig(vec![(0x41, 20, 40)], EngineConfig::default());

        assert!(rig.engine.toggle_recording().is_applied());
        assert!(rig.engine.is_recording());
        assert!(wait_for(|| rig.clock.now_ms() >= 100));
        assert!(rig.engine.toggle_recording().is_applied());
        assert!(!rig.engine.is_recording());

        assert!(rig.engine.toggle_playback().is_applied());
        assert!(rig.engine.is_playing());
        assert!(rig.engine.toggle_playback().is_applied());
        assert!(!rig.engine.is_playing());
    }

    #[test]
    fn test_events_describe_session() {
        let rig = rig(vec![(0x41, 20, 40)], EngineConfig::default());
        record(&rig, 100);

        let events = rig.engine.drain();
        assert_eq!(events[0], EngineEvent::RecordingStarted);
        assert_eq!(
            events[1],
            EngineEvent::KeyCaptured { code: 0x41, offset_ms: 20, count: 1 }
        );
        assert_eq!(
            events[2],
            EngineEvent::RecordingStopped { event_count: 1, macro_available: true }
        );
        assert!(rig.engine.try_recv().is_none());
    }

    #[test]
    fn test_finite_repeat_ends_playback() {
        let config = EngineConfig {
            playback: PlaybackConfig { repeat: Repeat::Times(2), ..PlaybackConfig::default() },
            ..EngineConfig::default()
        };
        let rig = rig(vec![(0x41, 20, 40)], config);
        record(&rig, 100);
        rig.engine.drain();

        assert!(rig.engine.start_playback().is_applied());
        assert!(wait_for(|| !rig.engine.is_playing()));
        assert_eq!(rig.injector.downs().len(), 2);

        // The finished player can be started again.
        assert!(rig.engine.start_playback().is_applied());
        assert!(wait_for(|| !rig.engine.is_playing()));
        assert_eq!(rig.injector.downs().len(), 4);

        let events = rig.engine.drain();
        assert!(events.contains(&EngineEvent::PlaybackFinished { passes: 2 }));
    }

    #[test]
    fn test_drop_joins_running_player() {
        let rig = rig(vec![(0x41, 20, 40)], EngineConfig::default());
        record(&rig, 100);
        assert!(rig.engine.start_playback().is_applied());
        assert!(wait_for(|| !rig.injector.downs().is_empty()));

        let injector = rig.injector.clone();
        drop(rig);
        let count = injector.injected().len();
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(injector.injected().len(), count);
    }

    #[test]
    fn test_hook_mode_without_feed_falls_back() {
        let config = EngineConfig { capture: CaptureMode::Hook, ..EngineConfig::default() };
        let rig = rig(vec![(0x41, 20, 40)], config);
        assert_eq!(rig.engine.config().capture, CaptureMode::Sequential);

        record(&rig, 100);
        assert_eq!(rig.engine.recorded_macro(), vec![KeyEvent::new(0x41, 20)]);
    }

    #[test]
    fn test_hook_mode_uses_press_feed() {
        let clock = FakeClock::new();
        let keys = Arc::new(ScriptedKeys::new(clock.clone(), vec![]));
        let injector = Arc::new(RecordingInjector::new(clock.clone()));
        let feed = Arc::new(ChannelFeed::new());
        let engine = MacroEngine::builder(keys, injector)
            .clock(clock.clone())
            .press_feed(feed.clone())
            .config(EngineConfig { capture: CaptureMode::Hook, ..EngineConfig::default() })
            .build()
            .unwrap();

        assert!(engine.start_recording().is_applied());
        clock.set(40);
        feed.press(0x41);
        assert!(wait_for(|| engine.recorded_macro().len() == 1));
        clock.set(75);
        feed.press(0x10);
        assert!(wait_for(|| engine.recorded_macro().len() == 2));
        assert!(engine.stop_recording().is_applied());

        assert_eq!(
            engine.recorded_macro(),
            vec![KeyEvent::new(0x41, 40), KeyEvent::new(0x10, 75)]
        );
        assert!(engine.is_macro_available());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let clock = FakeClock::new();
        let keys = Arc::new(ScriptedKeys::new(clock.clone(), vec![]));
        let injector = Arc::new(RecordingInjector::new(clock));
        let config = EngineConfig { first_code: 0xF0, last_code: 0x10, ..EngineConfig::default() };
        assert!(MacroEngine::builder(keys, injector).config(config).build().is_err());
    }
}
