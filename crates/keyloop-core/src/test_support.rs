//! Deterministic collaborators for tests, driven by a virtual clock.

use crate::platform::{Clock, KeyInjector, KeyPressFeed, KeyStateSource};
use crate::KeyCode;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Virtual clock: `sleep` advances time instantly instead of blocking.
///
/// Time never passes `limit`. A sleeper at the limit backs off briefly in real time and
/// returns, so loops keep checking their flags while virtual time stands still.
#[derive(Debug)]
pub struct FakeClock {
    now: AtomicU64,
    limit: AtomicU64,
}

impl FakeClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { now: AtomicU64::new(0), limit: AtomicU64::new(u64::MAX) })
    }

    pub fn set(&self, ms: u64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    /// Stop virtual time at `ms`.
    pub fn hold_at(&self, ms: u64) {
        self.limit.store(ms, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.limit.store(u64::MAX, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep(&self, ms: u64) {
        let limit = self.limit.load(Ordering::SeqCst);
        let advanced = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| {
                (now < limit).then(|| now.saturating_add(ms).min(limit))
            })
            .is_ok();
        if advanced {
            thread::yield_now();
        } else {
            thread::sleep(Duration::from_micros(200));
        }
    }
}

/// Key source answering from a script of `(code, down_at, up_at)` windows on the virtual clock.
pub struct ScriptedKeys {
    clock: Arc<FakeClock>,
    presses: Vec<(KeyCode, u64, u64)>,
}

impl ScriptedKeys {
    pub fn new(clock: Arc<FakeClock>, presses: Vec<(KeyCode, u64, u64)>) -> Self {
        Self { clock, presses }
    }
}

impl KeyStateSource for ScriptedKeys {
    fn is_key_down(&self, code: KeyCode) -> bool {
        let now = self.clock.now_ms();
        self.presses
            .iter()
            .any(|&(c, down, up)| c == code && down <= now && now < up)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Injected {
    pub at_ms: u64,
    pub code: KeyCode,
    pub down: bool,
}

/// Injector that records what it was asked to do, stamped with virtual time.
pub struct RecordingInjector {
    clock: Arc<FakeClock>,
    injected: Mutex<Vec<Injected>>,
    failing: Mutex<Option<KeyCode>>,
}

impl RecordingInjector {
    pub fn new(clock: Arc<FakeClock>) -> Self {
        Self { clock, injected: Mutex::new(Vec::new()), failing: Mutex::new(None) }
    }

    /// Make every injection of `code` fail.
    pub fn fail_on(&self, code: KeyCode) {
        *self.failing.lock().unwrap() = Some(code);
    }

    pub fn injected(&self) -> Vec<Injected> {
        self.injected.lock().unwrap().clone()
    }

    /// `(time, code)` of every key down.
    pub fn downs(&self) -> Vec<(u64, KeyCode)> {
        self.injected()
            .into_iter()
            .filter(|i| i.down)
            .map(|i| (i.at_ms, i.code))
            .collect()
    }

    fn push(&self, code: KeyCode, down: bool) -> Result<(), String> {
        if *self.failing.lock().unwrap() == Some(code) {
            return Err(format!("refusing {code:#04x}"));
        }
        self.injected.lock().unwrap().push(Injected { at_ms: self.clock.now_ms(), code, down });
        Ok(())
    }
}

impl KeyInjector for RecordingInjector {
    fn key_down(&self, code: KeyCode) -> Result<(), String> {
        self.push(code, true)
    }

    fn key_up(&self, code: KeyCode) -> Result<(), String> {
        self.push(code, false)
    }
}

/// Press feed the test pushes into by hand.
#[derive(Default)]
pub struct ChannelFeed {
    subscribers: Mutex<Vec<Sender<KeyCode>>>,
}

impl ChannelFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, code: KeyCode) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.send(code).is_ok());
    }
}

impl KeyPressFeed for ChannelFeed {
    fn subscribe(&self) -> Receiver<KeyCode> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }
}

/// Let virtual time run up to `until_ms`, wait until it gets there, then lift the limit
/// after `stop` has run.
pub fn run_until(clock: &FakeClock, until_ms: u64, stop: impl FnOnce()) {
    clock.hold_at(until_ms);
    assert!(wait_for(|| clock.now_ms() >= until_ms));
    stop();
    clock.release();
}

/// Poll `cond` in real time for up to five seconds.
pub fn wait_for(cond: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    cond()
}
