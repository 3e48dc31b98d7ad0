//! Handles and menu item types shared by the synchronizer and its backends

use crate::utils::truncate_units;

/// Menu command identifier of the synthesized entry
pub const MENU_ITEM_ID: u32 = 45545;

/// Label of the synthesized entry
pub const MENU_ITEM_LABEL: &str = "Always on top";

/// Size, in UTF-16 units, of the buffer used to read menu labels back
pub const LABEL_CAPACITY: usize = 64;

/// Any top-level window on the desktop. The service never owns its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowHandle(pub isize);

impl WindowHandle {
    pub fn is_null(&self) -> bool {
        self.0 == 0
    }
}

/// A window's system menu, valid only for the query that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MenuHandle(pub isize);

/// An installed event hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookHandle(pub isize);

/// One entry of a system menu as read back from the OS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItemDescriptor {
    pub id: u32,
    pub label: String,
    pub checked: bool,
}

impl MenuItemDescriptor {
    /// The synthesized "Always on top" entry
    pub fn always_on_top(checked: bool) -> Self {
        Self {
            id: MENU_ITEM_ID,
            label: MENU_ITEM_LABEL.to_string(),
            checked,
        }
    }

    /// Whether this entry is the synthesized one.
    ///
    /// Labels are read through a [`LABEL_CAPACITY`]-sized buffer, so only that
    /// many leading units take part in the comparison.
    pub fn is_always_on_top(&self) -> bool {
        self.id == MENU_ITEM_ID
            && truncate_units(&self.label, LABEL_CAPACITY - 1)
                == truncate_units(MENU_ITEM_LABEL, LABEL_CAPACITY - 1)
    }
}

/// Where a new entry goes when the menu does not have one yet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertionPolicy {
    /// Second-to-last, keeping the trailing separator and "Close" last.
    /// Menus with two items or fewer get the entry at the top.
    #[default]
    AboveTrailingDefault,
}

impl InsertionPolicy {
    /// Position for the new entry; `item_count` is negative when the count query failed
    pub fn position(&self, item_count: i32) -> u32 {
        match self {
            InsertionPolicy::AboveTrailingDefault => (item_count - 2).max(0) as u32,
        }
    }
}

/// Location of the synthesized entry, or where it would be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuItemLookup {
    Existing {
        position: u32,
        item: MenuItemDescriptor,
    },
    Missing {
        insert_at: u32,
    },
}

/// Notification delivered by a hook on the hook thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    /// System-wide focus moved
    Focus,
    /// A menu item was activated in a window watched by `hook`
    Invoked { hook: HookHandle, item_id: u32 },
    /// A top-level window was destroyed
    Destroyed { window: WindowHandle },
}
