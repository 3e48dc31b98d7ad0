//! Shutdown requests from the console
//!
//! Ctrl+C, closing the console window, logoff and system shutdown all end up
//! as a request on the process-wide [`ShutdownSignal`].

use once_cell::sync::Lazy;
use parking_lot::{Condvar, Mutex};
use std::time::Duration;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Phase {
    #[default]
    Running,
    Requested,
    Finished,
}

/// One-way Running -> Requested -> Finished latch
#[derive(Debug, Default)]
pub struct ShutdownSignal {
    phase: Mutex<Phase>,
    changed: Condvar,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the application to exit; later calls are ignored
    pub fn request(&self) {
        let mut phase = self.phase.lock();
        if *phase == Phase::Running {
            *phase = Phase::Requested;
            self.changed.notify_all();
        }
    }

    #[cfg(test)]
    pub fn is_requested(&self) -> bool {
        *self.phase.lock() != Phase::Running
    }

    /// Block until a shutdown is requested
    pub fn wait(&self) {
        let mut phase = self.phase.lock();
        while *phase == Phase::Running {
            self.changed.wait(&mut phase);
        }
    }

    /// Cleanup is done
    pub fn finish(&self) {
        *self.phase.lock() = Phase::Finished;
        self.changed.notify_all();
    }

    /// Wait up to `timeout` for cleanup; true if it finished in time
    pub fn wait_finished(&self, timeout: Duration) -> bool {
        let mut phase = self.phase.lock();
        if *phase != Phase::Finished {
            let _ = self.changed.wait_while_for(&mut phase, |p| *p != Phase::Finished, timeout);
        }
        *phase == Phase::Finished
    }
}

static SHUTDOWN: Lazy<ShutdownSignal> = Lazy::new(ShutdownSignal::new);

/// Process-wide signal driven by the console handler
pub fn global() -> &'static ShutdownSignal {
    &SHUTDOWN
}

#[cfg(windows)]
mod console {
    use std::time::Duration;
    use windows::Win32::Foundation::{BOOL, FALSE, TRUE};
    use windows::Win32::System::Console::{
        SetConsoleCtrlHandler, CTRL_BREAK_EVENT, CTRL_CLOSE_EVENT, CTRL_C_EVENT,
        CTRL_LOGOFF_EVENT, CTRL_SHUTDOWN_EVENT,
    };

    use crate::error::OnTopResult;

    /// Windows kills the process about five seconds after a close event
    const CLOSE_GRACE: Duration = Duration::from_millis(4500);

    unsafe extern "system" fn handle_ctrl(ctrl_type: u32) -> BOOL {
        match ctrl_type {
            CTRL_C_EVENT | CTRL_BREAK_EVENT => {
                super::global().request();
                TRUE
            }
            CTRL_CLOSE_EVENT | CTRL_LOGOFF_EVENT | CTRL_SHUTDOWN_EVENT => {
                // Returning lets the OS terminate us, so hold on until menus are cleaned up
                super::global().request();
                super::global().wait_finished(CLOSE_GRACE);
                TRUE
            }
            _ => FALSE,
        }
    }

    pub fn install() -> OnTopResult<()> {
        unsafe { SetConsoleCtrlHandler(Some(handle_ctrl), true)? };
        Ok(())
    }
}

/// Route console control events to [`global`]
#[cfg(windows)]
pub fn install_console_handler() -> crate::error::OnTopResult<()> {
    console::install()?;
    log::info!("Press Ctrl+C to exit");
    Ok(())
}
