//! Recording engine: captures key presses into the event log on a background thread.

use crate::config::{EngineConfig, HotkeyConfig};
use crate::engine::{EngineEvent, EngineShared, Refusal, Transition};
use crate::platform::{KeyPressFeed, KeyStateSource};
use crate::{KeyCode, KeyEvent};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Where key presses come from, one variant per [`crate::CaptureMode`].
pub(crate) enum CaptureSource {
    Sequential(Arc<dyn KeyStateSource>),
    Overlapping(Arc<dyn KeyStateSource>),
    Hook(Arc<dyn KeyPressFeed>),
}

#[derive(Debug, Clone, Copy)]
struct ScanSettings {
    first_code: KeyCode,
    last_code: KeyCode,
    release_poll_ms: u64,
    scan_pause_ms: u64,
    hotkeys: HotkeyConfig,
}

impl ScanSettings {
    /// In the scan range and not a hotkey.
    fn captures(&self, code: KeyCode) -> bool {
        (self.first_code..=self.last_code).contains(&code) && !self.hotkeys.contains(code)
    }
}

/// Owns the capture thread. `recording` in the shared status is the loop condition.
pub(crate) struct Recorder {
    shared: Arc<EngineShared>,
    source: CaptureSource,
    settings: ScanSettings,
    any_key_seen: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl Recorder {
    pub fn new(shared: Arc<EngineShared>, source: CaptureSource, config: &EngineConfig) -> Self {
        Self {
            shared,
            source,
            settings: ScanSettings {
                first_code: config.first_code,
                last_code: config.last_code,
                release_poll_ms: config.release_poll_ms,
                scan_pause_ms: config.scan_pause_ms,
                hotkeys: config.hotkeys,
            },
            any_key_seen: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }

    /// Start a new session, discarding the previous macro.
    pub fn start(&mut self) -> Transition {
        if self.shared.status.is_recording() {
            return Transition::refuse(Refusal::AlreadyRecording);
        }
        self.join();

        self.shared.log.clear();
        self.shared.status.set_macro_available(false);
        self.any_key_seen.store(false, Ordering::SeqCst);

        let session = Session {
            shared: self.shared.clone(),
            settings: self.settings,
            start_ms: self.shared.clock.now_ms(),
            any_key_seen: self.any_key_seen.clone(),
        };
        let capture = match &self.source {
            CaptureSource::Sequential(keys) => Capture::Sequential(keys.clone()),
            CaptureSource::Overlapping(keys) => Capture::Overlapping(keys.clone()),
            // Subscribe before the flag flips so no press between here and thread start is lost.
            CaptureSource::Hook(feed) => Capture::Hook(feed.subscribe()),
        };

        self.shared.status.set_recording(true);
        info!(start_ms = session.start_ms, "Recording started");
        self.shared.emit(EngineEvent::RecordingStarted);

        self.thread = Some(thread::spawn(move || session.run(capture)));
        Transition::Applied
    }

    /// Stop the session and finalize the macro. Blocks until the thread has exited.
    pub fn stop(&mut self) -> Transition {
        if !self.shared.status.is_recording() {
            return Transition::refuse(Refusal::NotRecording);
        }

        self.shared.status.set_recording(false);
        self.join();

        let macro_available = self.any_key_seen.load(Ordering::SeqCst);
        self.shared.status.set_macro_available(macro_available);

        let event_count = self.shared.log.len();
        info!(event_count, macro_available, "Recording stopped");
        self.shared.emit(EngineEvent::RecordingStopped { event_count, macro_available });
        Transition::Applied
    }

    /// Teardown: stop quietly if running.
    pub fn shutdown(&mut self) {
        if self.shared.status.is_recording() {
            let _ = self.stop();
        }
        self.join();
    }

    fn join(&mut self) {
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                error!("Recorder thread panicked");
            }
        }
    }
}

enum Capture {
    Sequential(Arc<dyn KeyStateSource>),
    Overlapping(Arc<dyn KeyStateSource>),
    Hook(Receiver<KeyCode>),
}

/// Everything the capture thread needs for one session.
struct Session {
    shared: Arc<EngineShared>,
    settings: ScanSettings,
    start_ms: u64,
    any_key_seen: Arc<AtomicBool>,
}

impl Session {
    fn run(self, capture: Capture) {
        info!("Recorder thread started");
        match capture {
            Capture::Sequential(keys) => self.scan_sequential(keys.as_ref()),
            Capture::Overlapping(keys) => self.scan_overlapping(keys.as_ref()),
            Capture::Hook(rx) => self.listen(&rx),
        }
        info!("Recorder thread exiting");
    }

    fn recording(&self) -> bool {
        self.shared.status.is_recording()
    }

    /// Walk the key range; on a pressed key, record it and wait for its release before moving on.
    ///
    /// Only one held key is observed at a time: a key pressed and released while another is
    /// held is missed.
    fn scan_sequential(&self, keys: &dyn KeyStateSource) {
        let ScanSettings { first_code, last_code, release_poll_ms, .. } = self.settings;

        while self.recording() {
            for code in first_code..=last_code {
                if !self.recording() {
                    break;
                }
                if self.settings.hotkeys.contains(code) || !keys.is_key_down(code) {
                    continue;
                }

                self.capture(code);

                while keys.is_key_down(code) && self.recording() {
                    self.shared.clock.sleep(release_poll_ms);
                }
            }
            self.shared.clock.sleep(self.settings.scan_pause_ms);
        }
    }

    /// Walk the key range each pass and record press edges for every key independently.
    fn scan_overlapping(&self, keys: &dyn KeyStateSource) {
        let ScanSettings { first_code, last_code, .. } = self.settings;
        let mut held = vec![false; usize::from(last_code - first_code) + 1];

        while self.recording() {
            for code in first_code..=last_code {
                if self.settings.hotkeys.contains(code) {
                    continue;
                }
                let slot = &mut held[usize::from(code - first_code)];
                let down = keys.is_key_down(code);
                if down && !*slot {
                    self.capture(code);
                }
                *slot = down;
            }
            self.shared.clock.sleep(self.settings.scan_pause_ms);
        }
    }

    /// Record press edges pushed by a platform hook.
    fn listen(&self, rx: &Receiver<KeyCode>) {
        let timeout = Duration::from_millis(self.settings.release_poll_ms.max(1));

        while self.recording() {
            match rx.recv_timeout(timeout) {
                Ok(code) if self.settings.captures(code) => self.capture(code),
                Ok(code) => debug!(code, "Ignoring hotkey or key outside capture range"),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    warn!("Key press feed closed, no further keys will be captured");
                    break;
                }
            }
        }
    }

    fn capture(&self, code: KeyCode) {
        let offset_ms = self.shared.clock.now_ms().saturating_sub(self.start_ms);
        let count = self.shared.log.append(KeyEvent::new(code, offset_ms));
        self.any_key_seen.store(true, Ordering::SeqCst);

        debug!(code, offset_ms, count, "Captured key");
        self.shared.emit(EngineEvent::KeyCaptured { code, offset_ms, count });
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.shared.status.set_recording(false);
        self.join();
    }
}
