//! Dedicated hook thread
//!
//! Event hooks are thread-affine: they must be installed, pumped and removed
//! from the thread that owns the message queue they report to. This module
//! owns that thread. The synchronizer is created on it and never leaves it.

use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use super::sync::MenuSynchronizer;
use super::system::WindowSystem;
use super::types::HookEvent;
use crate::config::SharedConfig;
use crate::error::{OnTopError, OnTopResult};

/// Name given to the hook thread
pub const HOOK_THREAD_NAME: &str = "ontop-hooks";

/// Wakes the hook thread's pump so it returns
pub trait QuitSignal: Send {
    /// Returns false if the request could not be delivered
    fn post_quit(&self) -> bool;
}

/// Thread-affine half of the hook machinery
pub trait HookDriver: Send + 'static {
    type System: WindowSystem + 'static;
    type Quit: QuitSignal + 'static;

    /// Install the service-lifetime hooks on the calling thread
    fn install(&mut self) -> OnTopResult<(Self::System, Self::Quit)>;

    /// Deliver hook notifications to `handler` until a quit is posted
    fn pump(&mut self, handler: Box<dyn FnMut(HookEvent)>);

    /// Remove the service-lifetime hooks
    fn uninstall(&mut self);
}

/// Handle to the running hook thread
pub struct HookThread {
    handle: Option<JoinHandle<()>>,
    quit: Option<Box<dyn QuitSignal>>,
}

impl HookThread {
    /// Spawn the thread and wait until its hooks are in place.
    ///
    /// A failed hook installation is not an error here: the thread logs it
    /// and exits, and the returned handle reports `is_running() == false`.
    pub fn spawn<D: HookDriver>(
        mut driver: D,
        config: SharedConfig,
        stopping: Arc<AtomicBool>,
    ) -> OnTopResult<Self> {
        let (ready_tx, ready_rx) = mpsc::channel::<Option<Box<dyn QuitSignal>>>();

        let handle = thread::Builder::new()
            .name(HOOK_THREAD_NAME.into())
            .spawn(move || {
                let (system, quit) = match driver.install() {
                    Ok(installed) => installed,
                    Err(e) => {
                        error!("Couldn't hook window events: {}", e);
                        let _ = ready_tx.send(None);
                        return;
                    }
                };
                let _ = ready_tx.send(Some(Box::new(quit)));
                run(driver, system, config, stopping);
            })
            .map_err(|e| OnTopError::HookThread(format!("Failed to spawn hook thread: {}", e)))?;

        let quit = ready_rx.recv().unwrap_or_else(|_| {
            error!("Hook thread exited before reporting readiness");
            None
        });

        Ok(Self {
            handle: Some(handle),
            quit,
        })
    }

    /// Whether the hooks are installed and the pump is running
    pub fn is_running(&self) -> bool {
        self.quit.is_some() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ask the thread to tear down and wait for it
    pub fn stop(&mut self) {
        if let Some(quit) = self.quit.take() {
            if !quit.post_quit() {
                warn!("Failed to post quit to the hook thread");
            }
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Hook thread panicked");
            }
        }
    }
}

impl Drop for HookThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run<D: HookDriver>(
    mut driver: D,
    system: D::System,
    config: SharedConfig,
    stopping: Arc<AtomicBool>,
) {
    info!("Hook thread started");
    let sync = Rc::new(RefCell::new(MenuSynchronizer::new(system, config, stopping)));

    let target = Rc::clone(&sync);
    driver.pump(Box::new(move |event| dispatch(&target, event)));

    sync.borrow_mut().teardown();
    driver.uninstall();
    info!("Hook thread finished");
}

/// Callback boundary: nothing raised while handling an event may escape into the hook chain
fn dispatch<S: WindowSystem>(sync: &RefCell<MenuSynchronizer<S>>, event: HookEvent) {
    let Ok(mut sync) = sync.try_borrow_mut() else {
        debug!("Dropping re-entrant {:?}", event);
        return;
    };

    match panic::catch_unwind(AssertUnwindSafe(|| sync.handle(event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Handling {:?} failed: {}", event, e),
        Err(_) => error!("Handling {:?} panicked", event),
    }
}
