//! Win32 backend: WinEvent hooks, system menus and window z-order
//!
//! Hook callbacks carry no user data, so the pump parks its handler in a
//! thread-local slot and the `extern "system"` callbacks reach it from there.
//! All of this runs on the hook thread only.

use log::{debug, error, info, warn};
use std::cell::RefCell;
use std::ffi::c_void;
use windows::core::PWSTR;
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::System::Threading::GetCurrentThreadId;
use windows::Win32::UI::Accessibility::{SetWinEventHook, UnhookWinEvent, HWINEVENTHOOK};
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetForegroundWindow, GetMenuItemCount, GetMenuItemInfoW, GetMessageW,
    GetSystemMenu, GetWindowInfo, GetWindowThreadProcessId, InsertMenuItemW, IsWindow,
    PeekMessageW, PostThreadMessageW, RemoveMenu, SetMenuItemInfoW, SetWindowPos,
    TranslateMessage, CHILDID_SELF, EVENT_OBJECT_DESTROY, EVENT_OBJECT_FOCUS,
    EVENT_OBJECT_INVOKED, HMENU, HWND_NOTOPMOST, HWND_TOPMOST, MENUITEMINFOW, MFS_CHECKED,
    MFS_UNCHECKED, MFT_STRING, MF_BYPOSITION, MIIM_FTYPE, MIIM_ID, MIIM_STATE, MIIM_STRING, MSG,
    OBJID_WINDOW, PM_NOREMOVE, SWP_NOMOVE, SWP_NOSIZE, WINDOWINFO, WINEVENT_OUTOFCONTEXT,
    WM_QUIT, WM_USER, WS_EX_TOPMOST,
};

use super::hook_thread::{HookDriver, QuitSignal};
use super::system::WindowSystem;
use super::types::{
    HookEvent, HookHandle, MenuHandle, MenuItemDescriptor, WindowHandle, LABEL_CAPACITY,
};
use crate::error::{OnTopError, OnTopResult};
use crate::utils::{from_wide_buffer, to_wide_string};

type WinEventProc = unsafe extern "system" fn(HWINEVENTHOOK, u32, HWND, i32, i32, u32, u32);

thread_local! {
    static HANDLER: RefCell<Option<Box<dyn FnMut(HookEvent)>>> = const { RefCell::new(None) };
}

fn deliver(event: HookEvent) {
    HANDLER.with(|slot| match slot.try_borrow_mut() {
        Ok(mut slot) => {
            if let Some(handler) = slot.as_mut() {
                handler(event);
            }
        }
        Err(_) => debug!("Dropping re-entrant {:?}", event),
    });
}

fn hwnd(window: WindowHandle) -> HWND {
    HWND(window.0 as *mut c_void)
}

fn hmenu(menu: MenuHandle) -> HMENU {
    HMENU(menu.0 as *mut c_void)
}

fn hook_handle(hook: HWINEVENTHOOK) -> HookHandle {
    HookHandle(hook.0 as isize)
}

unsafe extern "system" fn on_focus_event(
    _hook: HWINEVENTHOOK,
    _event: u32,
    _hwnd: HWND,
    _id_object: i32,
    _id_child: i32,
    _event_thread: u32,
    _event_time: u32,
) {
    deliver(HookEvent::Focus);
}

unsafe extern "system" fn on_invoke_event(
    hook: HWINEVENTHOOK,
    _event: u32,
    _hwnd: HWND,
    _id_object: i32,
    id_child: i32,
    _event_thread: u32,
    _event_time: u32,
) {
    // For menu items the child id is the command identifier
    if id_child > 0 {
        deliver(HookEvent::Invoked {
            hook: hook_handle(hook),
            item_id: id_child as u32,
        });
    }
}

unsafe extern "system" fn on_destroy_event(
    _hook: HWINEVENTHOOK,
    _event: u32,
    hwnd: HWND,
    id_object: i32,
    id_child: i32,
    _event_thread: u32,
    _event_time: u32,
) {
    // Only the window itself, not its child objects
    if id_object == OBJID_WINDOW.0 && id_child == CHILDID_SELF as i32 && !hwnd.0.is_null() {
        deliver(HookEvent::Destroyed {
            window: WindowHandle(hwnd.0 as isize),
        });
    }
}

/// Stateless access to user32
#[derive(Debug, Clone, Copy, Default)]
pub struct Win32System;

impl Win32System {
    fn item_state(menu: MenuHandle, position: u32) -> OnTopResult<MENUITEMINFOW> {
        let mut info = MENUITEMINFOW {
            cbSize: std::mem::size_of::<MENUITEMINFOW>() as u32,
            fMask: MIIM_STATE,
            ..Default::default()
        };
        unsafe { GetMenuItemInfoW(hmenu(menu), position, true, &mut info)? };
        Ok(info)
    }
}

impl WindowSystem for Win32System {
    fn foreground_window(&self) -> Option<WindowHandle> {
        let hwnd = unsafe { GetForegroundWindow() };
        (!hwnd.0.is_null()).then(|| WindowHandle(hwnd.0 as isize))
    }

    fn is_window(&self, window: WindowHandle) -> bool {
        unsafe { IsWindow(hwnd(window)) }.as_bool()
    }

    fn system_menu(&self, window: WindowHandle, revert: bool) -> Option<MenuHandle> {
        unsafe {
            if revert {
                // Resets the window to the default menu, dropping our entry with it
                let _ = GetSystemMenu(hwnd(window), true);
            }
            let menu = GetSystemMenu(hwnd(window), false);
            (!menu.0.is_null()).then(|| MenuHandle(menu.0 as isize))
        }
    }

    fn menu_item_count(&self, menu: MenuHandle) -> i32 {
        unsafe { GetMenuItemCount(hmenu(menu)) }
    }

    fn menu_item(&self, menu: MenuHandle, position: u32) -> Option<MenuItemDescriptor> {
        let mut label = [0u16; LABEL_CAPACITY];
        let mut info = MENUITEMINFOW {
            cbSize: std::mem::size_of::<MENUITEMINFOW>() as u32,
            fMask: MIIM_STATE | MIIM_FTYPE | MIIM_ID | MIIM_STRING,
            dwTypeData: PWSTR(label.as_mut_ptr()),
            cch: label.len() as u32,
            ..Default::default()
        };
        unsafe { GetMenuItemInfoW(hmenu(menu), position, true, &mut info) }.ok()?;

        Some(MenuItemDescriptor {
            id: info.wID,
            label: from_wide_buffer(&label),
            checked: (info.fState.0 & MFS_CHECKED.0) != 0,
        })
    }

    fn insert_menu_item(
        &self,
        menu: MenuHandle,
        position: u32,
        item: &MenuItemDescriptor,
    ) -> OnTopResult<()> {
        let mut label = to_wide_string(&item.label);
        let info = MENUITEMINFOW {
            cbSize: std::mem::size_of::<MENUITEMINFOW>() as u32,
            fMask: MIIM_STATE | MIIM_FTYPE | MIIM_ID | MIIM_STRING,
            fType: MFT_STRING,
            fState: if item.checked { MFS_CHECKED } else { MFS_UNCHECKED },
            wID: item.id,
            dwTypeData: PWSTR(label.as_mut_ptr()),
            cch: (label.len() - 1) as u32,
            ..Default::default()
        };
        unsafe { InsertMenuItemW(hmenu(menu), position, true, &info) }.map_err(|e| {
            OnTopError::Menu(format!("Couldn't insert item at {} in {:?}: {}", position, menu, e))
        })
    }

    fn set_menu_item_checked(
        &self,
        menu: MenuHandle,
        position: u32,
        checked: bool,
    ) -> OnTopResult<()> {
        let mut info = Self::item_state(menu, position)?;
        info.fState.0 &= !MFS_CHECKED.0;
        if checked {
            info.fState.0 |= MFS_CHECKED.0;
        }
        unsafe { SetMenuItemInfoW(hmenu(menu), position, true, &info) }.map_err(|e| {
            OnTopError::Menu(format!("Couldn't update item at {} in {:?}: {}", position, menu, e))
        })
    }

    fn remove_menu_item(&self, menu: MenuHandle, position: u32) -> OnTopResult<()> {
        unsafe { RemoveMenu(hmenu(menu), position, MF_BYPOSITION) }.map_err(|e| {
            OnTopError::Menu(format!("Couldn't remove item at {} in {:?}: {}", position, menu, e))
        })
    }

    fn is_topmost(&self, window: WindowHandle) -> bool {
        let mut info = WINDOWINFO {
            cbSize: std::mem::size_of::<WINDOWINFO>() as u32,
            ..Default::default()
        };
        unsafe { GetWindowInfo(hwnd(window), &mut info) }.is_ok()
            && (info.dwExStyle.0 & WS_EX_TOPMOST.0) != 0
    }

    fn set_topmost(&self, window: WindowHandle, topmost: bool) -> OnTopResult<()> {
        let insert_after = if topmost { HWND_TOPMOST } else { HWND_NOTOPMOST };
        unsafe {
            SetWindowPos(
                hwnd(window),
                insert_after,
                0,
                0,
                0,
                0,
                SWP_NOMOVE | SWP_NOSIZE,
            )?
        };
        Ok(())
    }

    fn install_invoke_hook(&self, window: WindowHandle) -> OnTopResult<HookHandle> {
        let mut process_id: u32 = 0;
        let thread_id = unsafe { GetWindowThreadProcessId(hwnd(window), Some(&mut process_id)) };
        if thread_id == 0 {
            return Err(OnTopError::HookInstall(format!(
                "{:?} has no owning thread",
                window
            )));
        }

        // Narrowest scope the OS offers is the window's thread
        let hook = unsafe {
            SetWinEventHook(
                EVENT_OBJECT_INVOKED,
                EVENT_OBJECT_INVOKED,
                None,
                Some(on_invoke_event),
                process_id,
                thread_id,
                WINEVENT_OUTOFCONTEXT,
            )
        };
        if hook.is_invalid() {
            return Err(OnTopError::HookInstall(format!(
                "Couldn't hook menu invocations of {:?}",
                window
            )));
        }
        Ok(hook_handle(hook))
    }

    fn uninstall_hook(&self, hook: HookHandle) {
        unsafe {
            let _ = UnhookWinEvent(HWINEVENTHOOK(hook.0 as *mut c_void));
        }
    }
}

/// `GetMessageW` returns 0 for `WM_QUIT` and -1 on failure
fn keep_pumping(status: i32) -> bool {
    match status {
        0 => {
            debug!("WM_QUIT received");
            false
        }
        s if s < 0 => {
            error!(
                "GetMessageW failed, leaving the message loop: {}",
                windows::core::Error::from_win32()
            );
            false
        }
        _ => true,
    }
}

/// Posts `WM_QUIT` to the hook thread's queue
pub struct ThreadQuit {
    thread_id: u32,
}

impl QuitSignal for ThreadQuit {
    fn post_quit(&self) -> bool {
        unsafe { PostThreadMessageW(self.thread_id, WM_QUIT, WPARAM(0), LPARAM(0)) }.is_ok()
    }
}

/// Global focus and destroy hooks plus the thread's message loop
#[derive(Debug, Default)]
pub struct Win32Driver {
    focus_hook: Option<HookHandle>,
    destroy_hook: Option<HookHandle>,
}

impl Win32Driver {
    pub fn new() -> Self {
        Self::default()
    }

    fn install_global(event: u32, callback: WinEventProc) -> Option<HookHandle> {
        let hook = unsafe {
            SetWinEventHook(event, event, None, Some(callback), 0, 0, WINEVENT_OUTOFCONTEXT)
        };
        (!hook.is_invalid()).then(|| hook_handle(hook))
    }
}

impl HookDriver for Win32Driver {
    type System = Win32System;
    type Quit = ThreadQuit;

    fn install(&mut self) -> OnTopResult<(Win32System, ThreadQuit)> {
        let focus = Self::install_global(EVENT_OBJECT_FOCUS, on_focus_event)
            .ok_or_else(|| OnTopError::HookInstall("Couldn't hook focus events".to_string()))?;
        self.focus_hook = Some(focus);

        self.destroy_hook = Self::install_global(EVENT_OBJECT_DESTROY, on_destroy_event);
        if self.destroy_hook.is_none() {
            warn!("Couldn't hook window destruction; click hooks are released on exit only");
        }

        // Make sure the thread has a queue before anyone posts WM_QUIT to it
        let mut msg = MSG::default();
        unsafe {
            let _ = PeekMessageW(&mut msg, None, WM_USER, WM_USER, PM_NOREMOVE);
        }

        let thread_id = unsafe { GetCurrentThreadId() };
        info!("Window event hooks installed on thread {}", thread_id);
        Ok((Win32System, ThreadQuit { thread_id }))
    }

    fn pump(&mut self, handler: Box<dyn FnMut(HookEvent)>) {
        HANDLER.with(|slot| *slot.borrow_mut() = Some(handler));

        let mut msg = MSG::default();
        unsafe {
            while keep_pumping(GetMessageW(&mut msg, None, 0, 0).0) {
                let _ = TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }

        HANDLER.with(|slot| slot.borrow_mut().take());
    }

    fn uninstall(&mut self) {
        for hook in [self.focus_hook.take(), self.destroy_hook.take()]
            .into_iter()
            .flatten()
        {
            Win32System.uninstall_hook(hook);
        }
        info!("Window event hooks removed");
    }
}
