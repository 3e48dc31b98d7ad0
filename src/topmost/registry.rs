//! Tracks which window each per-window invocation hook watches

use std::collections::HashMap;

use super::types::{HookHandle, WindowHandle};

/// Map of installed invocation hook to the window it watches
#[derive(Debug, Default)]
pub struct HookRegistry {
    hooks: HashMap<HookHandle, WindowHandle>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, hook: HookHandle, window: WindowHandle) {
        self.hooks.insert(hook, window);
    }

    /// Whether some hook already watches `window`
    pub fn is_watching(&self, window: WindowHandle) -> bool {
        self.hooks.values().any(|&w| w == window)
    }

    /// Window watched by `hook`
    pub fn window_for(&self, hook: HookHandle) -> Option<WindowHandle> {
        self.hooks.get(&hook).copied()
    }

    /// Hook watching `window`
    pub fn hook_for(&self, window: WindowHandle) -> Option<HookHandle> {
        self.hooks
            .iter()
            .find_map(|(&hook, &w)| (w == window).then_some(hook))
    }

    pub fn remove(&mut self, hook: HookHandle) -> Option<WindowHandle> {
        self.hooks.remove(&hook)
    }

    /// Remove every entry, yielding them in hook order
    pub fn drain(&mut self) -> Vec<(HookHandle, WindowHandle)> {
        let mut entries: Vec<_> = self.hooks.drain().collect();
        entries.sort();
        entries
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}
