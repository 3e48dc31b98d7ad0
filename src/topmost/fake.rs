//! In-memory desktop and event driver for exercising the service off Windows

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;

use super::hook_thread::{HookDriver, QuitSignal};
use super::system::WindowSystem;
use super::types::{HookEvent, HookHandle, MenuHandle, MenuItemDescriptor, WindowHandle};
use crate::error::{OnTopError, OnTopResult};

#[derive(Debug, Clone)]
pub struct FakeWindow {
    pub menu: Option<Vec<MenuItemDescriptor>>,
    pub default_menu: Vec<MenuItemDescriptor>,
    pub revert_restores_default: bool,
    pub topmost: bool,
    pub bounds: (i32, i32, i32, i32),
    pub alive: bool,
}

#[derive(Debug, Default)]
pub struct DesktopState {
    pub windows: HashMap<WindowHandle, FakeWindow>,
    pub foreground: Option<WindowHandle>,
    pub hooks: HashMap<HookHandle, WindowHandle>,
    pub next_hook: isize,
    pub global_hooks: usize,
    pub mutations: usize,
    pub unreadable_positions: Vec<u32>,
    pub fail_menu_mutations: bool,
    pub fail_hook_install: bool,
    pub panic_on_foreground: bool,
}

/// Shared handle to a scripted desktop
#[derive(Debug, Clone, Default)]
pub struct FakeDesktop {
    state: Arc<Mutex<DesktopState>>,
}

fn plain_item(label: &str) -> MenuItemDescriptor {
    MenuItemDescriptor {
        id: 0xF000 + label.len() as u32,
        label: label.to_string(),
        checked: false,
    }
}

impl FakeDesktop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut DesktopState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn add_window(&self, id: isize, labels: &[&str]) -> WindowHandle {
        let items: Vec<_> = labels.iter().map(|l| plain_item(l)).collect();
        self.insert_window(id, Some(items))
    }

    pub fn add_window_without_menu(&self, id: isize) -> WindowHandle {
        self.insert_window(id, None)
    }

    fn insert_window(&self, id: isize, menu: Option<Vec<MenuItemDescriptor>>) -> WindowHandle {
        let handle = WindowHandle(id);
        let window = FakeWindow {
            default_menu: menu.clone().unwrap_or_default(),
            menu,
            revert_restores_default: true,
            topmost: false,
            bounds: (10 * id as i32, 20, 640, 480),
            alive: true,
        };
        self.with(|s| s.windows.insert(handle, window));
        handle
    }

    /// Make reverting leave the menu as it is, so teardown has to remove the entry itself
    pub fn keep_menu_on_revert(&self, window: WindowHandle) {
        self.with(|s| {
            if let Some(w) = s.windows.get_mut(&window) {
                w.revert_restores_default = false;
            }
        });
    }

    pub fn set_foreground(&self, window: Option<WindowHandle>) {
        self.with(|s| s.foreground = window);
    }

    /// Another program changed the window's topmost bit
    pub fn set_topmost_externally(&self, window: WindowHandle, topmost: bool) {
        self.with(|s| {
            if let Some(w) = s.windows.get_mut(&window) {
                w.topmost = topmost;
            }
        });
    }

    pub fn push_menu_item(&self, window: WindowHandle, item: MenuItemDescriptor) {
        self.with(|s| {
            if let Some(menu) = s.windows.get_mut(&window).and_then(|w| w.menu.as_mut()) {
                menu.push(item);
            }
        });
    }

    pub fn destroy(&self, window: WindowHandle) {
        self.with(|s| {
            if let Some(w) = s.windows.get_mut(&window) {
                w.alive = false;
                w.menu = None;
            }
        });
    }

    pub fn menu(&self, window: WindowHandle) -> Vec<MenuItemDescriptor> {
        self.with(|s| {
            s.windows
                .get(&window)
                .and_then(|w| w.menu.clone())
                .unwrap_or_default()
        })
    }

    /// Number of synthesized entries in the window's menu
    pub fn entry_count(&self, window: WindowHandle) -> usize {
        self.menu(window)
            .iter()
            .filter(|i| i.is_always_on_top())
            .count()
    }

    /// Number of invocation hooks currently installed for the window
    pub fn hook_count(&self, window: WindowHandle) -> usize {
        self.with(|s| s.hooks.values().filter(|&&w| w == window).count())
    }

    pub fn installed_hooks(&self) -> usize {
        self.with(|s| s.hooks.len())
    }

    pub fn global_hooks(&self) -> usize {
        self.with(|s| s.global_hooks)
    }

    pub fn mutations(&self) -> usize {
        self.with(|s| s.mutations)
    }

    pub fn bounds(&self, window: WindowHandle) -> (i32, i32, i32, i32) {
        self.with(|s| s.windows[&window].bounds)
    }

    fn mutate_menu(
        &self,
        menu: MenuHandle,
        f: impl FnOnce(&mut Vec<MenuItemDescriptor>) -> bool,
    ) -> OnTopResult<()> {
        let mut s = self.state.lock();
        if s.fail_menu_mutations {
            return Err(OnTopError::Menu("mutation rejected".to_string()));
        }
        let items = s
            .windows
            .get_mut(&WindowHandle(menu.0))
            .and_then(|w| w.menu.as_mut())
            .ok_or_else(|| OnTopError::Menu(format!("no menu {:?}", menu)))?;
        if !f(items) {
            return Err(OnTopError::Menu(format!("bad position in {:?}", menu)));
        }
        s.mutations += 1;
        Ok(())
    }
}

impl WindowSystem for FakeDesktop {
    fn foreground_window(&self) -> Option<WindowHandle> {
        self.with(|s| {
            if s.panic_on_foreground {
                panic!("foreground query blew up");
            }
            s.foreground
        })
    }

    fn is_window(&self, window: WindowHandle) -> bool {
        self.with(|s| s.windows.get(&window).is_some_and(|w| w.alive))
    }

    fn system_menu(&self, window: WindowHandle, revert: bool) -> Option<MenuHandle> {
        self.with(|s| {
            let w = s.windows.get_mut(&window)?;
            if revert && w.revert_restores_default && w.menu.is_some() {
                w.menu = Some(w.default_menu.clone());
            }
            w.menu.as_ref().map(|_| MenuHandle(window.0))
        })
    }

    fn menu_item_count(&self, menu: MenuHandle) -> i32 {
        self.with(|s| {
            s.windows
                .get(&WindowHandle(menu.0))
                .and_then(|w| w.menu.as_ref())
                .map_or(-1, |items| items.len() as i32)
        })
    }

    fn menu_item(&self, menu: MenuHandle, position: u32) -> Option<MenuItemDescriptor> {
        self.with(|s| {
            if s.unreadable_positions.contains(&position) {
                return None;
            }
            s.windows
                .get(&WindowHandle(menu.0))?
                .menu
                .as_ref()?
                .get(position as usize)
                .cloned()
        })
    }

    fn insert_menu_item(
        &self,
        menu: MenuHandle,
        position: u32,
        item: &MenuItemDescriptor,
    ) -> OnTopResult<()> {
        self.mutate_menu(menu, |items| {
            let at = (position as usize).min(items.len());
            items.insert(at, item.clone());
            true
        })
    }

    fn set_menu_item_checked(
        &self,
        menu: MenuHandle,
        position: u32,
        checked: bool,
    ) -> OnTopResult<()> {
        self.mutate_menu(menu, |items| match items.get_mut(position as usize) {
            Some(item) => {
                item.checked = checked;
                true
            }
            None => false,
        })
    }

    fn remove_menu_item(&self, menu: MenuHandle, position: u32) -> OnTopResult<()> {
        self.mutate_menu(menu, |items| {
            if (position as usize) < items.len() {
                items.remove(position as usize);
                true
            } else {
                false
            }
        })
    }

    fn is_topmost(&self, window: WindowHandle) -> bool {
        self.with(|s| s.windows.get(&window).is_some_and(|w| w.topmost))
    }

    fn set_topmost(&self, window: WindowHandle, topmost: bool) -> OnTopResult<()> {
        self.with(|s| {
            let w = s
                .windows
                .get_mut(&window)
                .ok_or_else(|| OnTopError::Menu(format!("no window {:?}", window)))?;
            w.topmost = topmost;
            s.mutations += 1;
            Ok(())
        })
    }

    fn install_invoke_hook(&self, window: WindowHandle) -> OnTopResult<HookHandle> {
        self.with(|s| {
            if s.fail_hook_install {
                return Err(OnTopError::HookInstall(format!("refused for {:?}", window)));
            }
            s.next_hook += 1;
            let hook = HookHandle(1000 + s.next_hook);
            s.hooks.insert(hook, window);
            Ok(hook)
        })
    }

    fn uninstall_hook(&self, hook: HookHandle) {
        self.with(|s| s.hooks.remove(&hook));
    }
}

/// Messages understood by [`ChannelDriver`]'s pump
pub enum DriverMessage {
    Event(HookEvent),
    /// Reply once every earlier message has been handled
    Flush(Sender<()>),
    Quit,
}

/// Hook driver fed from a channel instead of the OS message queue
pub struct ChannelDriver {
    desktop: FakeDesktop,
    rx: Receiver<DriverMessage>,
    tx: Sender<DriverMessage>,
    fail_install: bool,
}

/// Test-side handle for pushing events into a running [`ChannelDriver`]
#[derive(Clone)]
pub struct EventInjector {
    tx: Sender<DriverMessage>,
}

impl EventInjector {
    pub fn send(&self, event: HookEvent) {
        let _ = self.tx.send(DriverMessage::Event(event));
    }

    /// Block until the hook thread has handled everything sent so far
    pub fn flush(&self) -> bool {
        let (ack_tx, ack_rx) = channel();
        if self.tx.send(DriverMessage::Flush(ack_tx)).is_err() {
            return false;
        }
        ack_rx.recv().is_ok()
    }
}

pub struct ChannelQuit {
    tx: Sender<DriverMessage>,
}

impl QuitSignal for ChannelQuit {
    fn post_quit(&self) -> bool {
        self.tx.send(DriverMessage::Quit).is_ok()
    }
}

impl ChannelDriver {
    pub fn new(desktop: FakeDesktop) -> (Self, EventInjector) {
        let (tx, rx) = channel();
        let injector = EventInjector { tx: tx.clone() };
        let driver = Self {
            desktop,
            rx,
            tx,
            fail_install: false,
        };
        (driver, injector)
    }

    /// Make the global hook installation fail
    pub fn failing(mut self) -> Self {
        self.fail_install = true;
        self
    }
}

impl HookDriver for ChannelDriver {
    type System = FakeDesktop;
    type Quit = ChannelQuit;

    fn install(&mut self) -> OnTopResult<(FakeDesktop, ChannelQuit)> {
        if self.fail_install {
            return Err(OnTopError::HookInstall("focus hook refused".to_string()));
        }
        self.desktop.with(|s| s.global_hooks += 2);
        let quit = ChannelQuit {
            tx: self.tx.clone(),
        };
        Ok((self.desktop.clone(), quit))
    }

    fn pump(&mut self, mut handler: Box<dyn FnMut(HookEvent)>) {
        while let Ok(message) = self.rx.recv() {
            match message {
                DriverMessage::Event(event) => handler(event),
                DriverMessage::Flush(ack) => {
                    let _ = ack.send(());
                }
                DriverMessage::Quit => break,
            }
        }
    }

    fn uninstall(&mut self) {
        self.desktop.with(|s| s.global_hooks = 0);
    }
}
