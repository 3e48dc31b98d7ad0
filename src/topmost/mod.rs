//! Always-on-top service
//!
//! Adds an "Always on top" entry to the system menu of whichever window gets
//! focus, keeps its check mark in line with the window's topmost bit and
//! toggles that bit when the entry is clicked.

pub mod hook_thread;
pub mod registry;
pub mod sync;
pub mod system;
pub mod types;

#[cfg(windows)]
pub mod win32;

#[cfg(test)]
pub mod fake;

use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use hook_thread::{HookDriver, HookThread};

use crate::config::SharedConfig;
use crate::error::OnTopResult;

/// Owns the hook thread for as long as the service is alive
pub struct AlwaysOnTopService {
    stopping: Arc<AtomicBool>,
    hook_thread: HookThread,
}

impl AlwaysOnTopService {
    /// Start the hook thread on `driver`
    pub fn start<D: HookDriver>(driver: D, config: SharedConfig) -> OnTopResult<Self> {
        let stopping = Arc::new(AtomicBool::new(false));
        let hook_thread = HookThread::spawn(driver, config, stopping.clone())?;

        if hook_thread.is_running() {
            info!("Always-on-top service started");
        } else {
            warn!("Always-on-top service is inactive");
        }

        Ok(Self {
            stopping,
            hook_thread,
        })
    }

    /// Start on the native Win32 hooks
    #[cfg(windows)]
    pub fn start_native(config: SharedConfig) -> OnTopResult<Self> {
        Self::start(win32::Win32Driver::new(), config)
    }

    /// Whether hooks are installed; false after a failed start or after `stop`
    pub fn is_active(&self) -> bool {
        self.hook_thread.is_running()
    }

    /// Remove every synthesized entry and hook, then join the hook thread
    pub fn stop(&mut self) {
        if self.stopping.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("Stopping always-on-top service");
        self.hook_thread.stop();
    }
}

impl Drop for AlwaysOnTopService {
    fn drop(&mut self) {
        self.stop();
    }
}
