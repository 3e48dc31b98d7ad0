//! The OS surface the synchronizer works against
//!
//! Everything here is called on the hook thread only. Mutations report
//! failure through `OnTopResult` so callers can log them, but none of them is
//! fatal: the next focus event re-derives the real state.

use super::types::{HookHandle, MenuHandle, MenuItemDescriptor, WindowHandle};
use crate::error::OnTopResult;

/// Window, menu and hook primitives of the desktop window system
pub trait WindowSystem {
    /// Window that currently receives user input, if any
    fn foreground_window(&self) -> Option<WindowHandle>;

    /// Whether `window` still names a live window
    fn is_window(&self, window: WindowHandle) -> bool;

    /// The window's system menu. With `revert` set the menu is reset to the
    /// window's own copy, which is the form teardown works on.
    fn system_menu(&self, window: WindowHandle, revert: bool) -> Option<MenuHandle>;

    /// Number of entries, negative if the menu cannot be queried
    fn menu_item_count(&self, menu: MenuHandle) -> i32;

    /// Entry at `position`, `None` if it cannot be read
    fn menu_item(&self, menu: MenuHandle, position: u32) -> Option<MenuItemDescriptor>;

    fn insert_menu_item(
        &self,
        menu: MenuHandle,
        position: u32,
        item: &MenuItemDescriptor,
    ) -> OnTopResult<()>;

    /// Change only the checked bit of the entry at `position`
    fn set_menu_item_checked(&self, menu: MenuHandle, position: u32, checked: bool)
        -> OnTopResult<()>;

    fn remove_menu_item(&self, menu: MenuHandle, position: u32) -> OnTopResult<()>;

    /// Whether the window's extended style carries the topmost bit
    fn is_topmost(&self, window: WindowHandle) -> bool;

    /// Move the window into or out of the topmost band without moving or resizing it
    fn set_topmost(&self, window: WindowHandle, topmost: bool) -> OnTopResult<()>;

    /// Install a hook reporting menu-item invocations for `window`
    fn install_invoke_hook(&self, window: WindowHandle) -> OnTopResult<HookHandle>;

    fn uninstall_hook(&self, hook: HookHandle);
}
