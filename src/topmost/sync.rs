//! Menu synchronizer
//!
//! Keeps the synthesized "Always on top" entry of each touched window in line
//! with the window's real topmost bit, reacts to clicks on the entry and owns
//! the registry of per-window invocation hooks. Lives on the hook thread.

use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::registry::HookRegistry;
use super::system::WindowSystem;
use super::types::{
    HookEvent, HookHandle, InsertionPolicy, MenuHandle, MenuItemDescriptor, MenuItemLookup,
    WindowHandle, MENU_ITEM_ID,
};
use crate::config::SharedConfig;
use crate::error::OnTopResult;

/// Reconciles system menus with window topmost state
pub struct MenuSynchronizer<S: WindowSystem> {
    system: S,
    config: SharedConfig,
    stopping: Arc<AtomicBool>,
    registry: HookRegistry,
    policy: InsertionPolicy,
}

impl<S: WindowSystem> MenuSynchronizer<S> {
    pub fn new(system: S, config: SharedConfig, stopping: Arc<AtomicBool>) -> Self {
        Self {
            system,
            config,
            stopping,
            registry: HookRegistry::new(),
            policy: InsertionPolicy::default(),
        }
    }

    #[cfg(test)]
    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    fn is_enabled(&self) -> bool {
        // Read on every event so a config reload applies without a restart
        self.config.read().general.show_always_on_top_item
    }

    fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Route a hook notification to its watcher
    pub fn handle(&mut self, event: HookEvent) -> OnTopResult<()> {
        match event {
            HookEvent::Focus => self.on_focus(),
            HookEvent::Invoked { hook, item_id } => self.on_item_invoked(hook, item_id),
            HookEvent::Destroyed { window } => {
                self.on_window_destroyed(window);
                Ok(())
            }
        }
    }

    /// Focus moved somewhere on the desktop
    pub fn on_focus(&mut self) -> OnTopResult<()> {
        if self.is_stopping() {
            return Ok(());
        }
        match self.system.foreground_window() {
            Some(window) => self.process_sys_menu(window),
            None => Ok(()),
        }
    }

    /// Locate the synthesized entry in `menu`, or the position a new one should take
    pub fn find_menu_item(&self, menu: MenuHandle) -> MenuItemLookup {
        let count = self.system.menu_item_count(menu);

        for position in 0..count.max(0) as u32 {
            let Some(item) = self.system.menu_item(menu, position) else {
                continue;
            };
            if item.is_always_on_top() {
                return MenuItemLookup::Existing { position, item };
            }
        }

        MenuItemLookup::Missing {
            insert_at: self.policy.position(count),
        }
    }

    /// Make the window's entry exist and match its topmost bit, then watch it for clicks
    pub fn process_sys_menu(&mut self, window: WindowHandle) -> OnTopResult<()> {
        if !self.is_enabled() || window.is_null() || !self.system.is_window(window) {
            return Ok(());
        }
        let Some(menu) = self.system.system_menu(window, false) else {
            return Ok(());
        };

        let topmost = self.system.is_topmost(window);

        match self.find_menu_item(menu) {
            MenuItemLookup::Existing { item, .. } if item.checked == topmost => {
                debug!("{:?} state is good", window);
            }
            MenuItemLookup::Existing { position, .. } => {
                debug!("{:?} setting menu item checked={}", window, topmost);
                if let Err(e) = self.system.set_menu_item_checked(menu, position, topmost) {
                    debug!("{:?} menu item update failed: {}", window, e);
                }
            }
            MenuItemLookup::Missing { insert_at } => {
                debug!("{:?} inserting menu item at {}", window, insert_at);
                let item = MenuItemDescriptor::always_on_top(topmost);
                if let Err(e) = self.system.insert_menu_item(menu, insert_at, &item) {
                    debug!("{:?} menu item insert failed: {}", window, e);
                }
            }
        }

        self.ensure_invoke_hook(window)
    }

    fn ensure_invoke_hook(&mut self, window: WindowHandle) -> OnTopResult<()> {
        if self.registry.is_watching(window) || self.is_stopping() {
            return Ok(());
        }

        let hook = self.system.install_invoke_hook(window)?;
        self.registry.insert(hook, window);
        debug!(
            "{:?} set click hook {:?}, watching {} window(s)",
            window,
            hook,
            self.registry.len()
        );
        Ok(())
    }

    /// A menu item was activated in a window watched by `hook`
    pub fn on_item_invoked(&mut self, hook: HookHandle, item_id: u32) -> OnTopResult<()> {
        if self.is_stopping() || !self.is_enabled() || item_id != MENU_ITEM_ID {
            return Ok(());
        }
        let Some(window) = self.registry.window_for(hook) else {
            return Ok(());
        };
        if self.system.foreground_window() != Some(window) {
            debug!("{:?} ignoring click, window is not in the foreground", window);
            return Ok(());
        }

        let topmost = !self.system.is_topmost(window);
        info!("{:?} always on top -> {}", window, topmost);
        if let Err(e) = self.system.set_topmost(window, topmost) {
            debug!("{:?} topmost toggle failed: {}", window, e);
        }

        self.process_sys_menu(window)
    }

    /// Release the hook of a window that no longer exists
    pub fn on_window_destroyed(&mut self, window: WindowHandle) {
        if self.is_stopping() {
            return;
        }
        if let Some(hook) = self.registry.hook_for(window) {
            debug!("{:?} destroyed, removing click hook {:?}", window, hook);
            self.system.uninstall_hook(hook);
            self.registry.remove(hook);
        }
    }

    /// Strip the entry from every watched window and release all per-window hooks
    pub fn teardown(&mut self) {
        if !self.registry.is_empty() {
            info!(
                "Removing always-on-top item from {} window(s)",
                self.registry.len()
            );
        }

        for (hook, window) in self.registry.drain() {
            if let Some(menu) = self.system.system_menu(window, true) {
                if let MenuItemLookup::Existing { position, .. } = self.find_menu_item(menu) {
                    debug!("{:?} removing menu item at {}", window, position);
                    if let Err(e) = self.system.remove_menu_item(menu, position) {
                        warn!("{:?} menu item removal failed: {}", window, e);
                    }
                }
            }
            self.system.uninstall_hook(hook);
        }
    }
}
