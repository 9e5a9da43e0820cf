//! Fallback devices for builds without a platform backend

use std::sync::Arc;

use crate::error::{MacroError, Result};
use crate::keys::Key;
use crate::types::MouseButton;

use super::{InputInjector, InputObserver, InputSink};

/// Observer that can never install a hook
///
/// Used when the crate is built without `native-input`; `start()` on a
/// controller using it fails with [`MacroError::HookRegistration`].
#[derive(Debug, Clone, Default)]
pub struct UnavailableObserver {
    reason: Option<String>,
}

impl UnavailableObserver {
    /// Create an observer that fails with a default reason
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an observer that fails with a specific reason
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }
}

impl InputObserver for UnavailableObserver {
    fn register(&mut self, _sink: Arc<dyn InputSink>) -> Result<()> {
        let reason = self.reason.clone().unwrap_or_else(|| {
            "no input hook available (built without the `native-input` feature)".to_string()
        });
        Err(MacroError::HookRegistration(reason))
    }

    fn unregister(&mut self) {}

    fn is_registered(&self) -> bool {
        false
    }
}

/// Injector that logs every call and injects nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInjector;

impl InputInjector for LoggingInjector {
    fn move_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        tracing::info!(x, y, "dry-run: move pointer");
        Ok(())
    }

    fn press_button(&mut self, button: MouseButton) -> Result<()> {
        tracing::info!(%button, "dry-run: press button");
        Ok(())
    }

    fn release_button(&mut self, button: MouseButton) -> Result<()> {
        tracing::info!(%button, "dry-run: release button");
        Ok(())
    }

    fn scroll(&mut self, dx: i32, dy: i32) -> Result<()> {
        tracing::info!(dx, dy, "dry-run: scroll");
        Ok(())
    }

    fn press_key(&mut self, key: Key) -> Result<()> {
        tracing::info!(%key, "dry-run: press key");
        Ok(())
    }

    fn release_key(&mut self, key: Key) -> Result<()> {
        tracing::info!(%key, "dry-run: release key");
        Ok(())
    }
}
