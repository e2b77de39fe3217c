//! Key injection implementations.

use crate::keycodes::{enigo_key, key_name};
use crate::{PlatformError, PlatformResult};
use enigo::{Direction, Enigo, Keyboard, Settings};
use keyloop_core::{KeyCode, KeyInjector};
use std::sync::{Mutex, PoisonError};
use tracing::debug;

/// Injector that only logs, for dry runs.
pub struct NoopInjector;

impl KeyInjector for NoopInjector {
    fn key_down(&self, code: KeyCode) -> Result<(), String> {
        debug!(code, key = %key_name(code), "NoopInjector: would press key");
        Ok(())
    }

    fn key_up(&self, code: KeyCode) -> Result<(), String> {
        debug!(code, key = %key_name(code), "NoopInjector: would release key");
        Ok(())
    }
}

/// Real key injector using `enigo` crate.
pub struct EnigoInjector {
    enigo: Mutex<Enigo>,
}

impl EnigoInjector {
    /// Create a new EnigoInjector.
    pub fn new() -> PlatformResult<Self> {
        let settings = Settings::default();
        let enigo = Enigo::new(&settings).map_err(|e| {
            PlatformError::InjectionFailed(format!("failed to create Enigo: {e}"))
        })?;
        Ok(Self {
            enigo: Mutex::new(enigo),
        })
    }

    fn send(&self, code: KeyCode, direction: Direction) -> PlatformResult<()> {
        let key = enigo_key(code).ok_or(PlatformError::UnmappedKey(code))?;
        debug!(code, ?key, ?direction, "injecting key");
        self.enigo
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .key(key, direction)
            .map_err(|e| PlatformError::InjectionFailed(e.to_string()))
    }
}

impl KeyInjector for EnigoInjector {
    fn key_down(&self, code: KeyCode) -> Result<(), String> {
        self.send(code, Direction::Press).map_err(|e| e.to_string())
    }

    fn key_up(&self, code: KeyCode) -> Result<(), String> {
        self.send(code, Direction::Release).map_err(|e| e.to_string())
    }
}
