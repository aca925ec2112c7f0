//! Action vocabulary and the label/function-key dispatch tables
//!
//! Menu clicks arrive as labels and shortcuts as function-key numbers. Both
//! resolve to the same [`Action`], so the two input paths cannot diverge.

use crate::{ContainerKind, Status};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Help,
    Actions,
    View,
    Edit,
    Clone,
    Export,
    CreateSnapshot,
    Destroy,
    Exit,
    DestroySnapshot,
    StartStop,
}

pub const HELP: &str = "Help";
pub const START: &str = "Start";
pub const STOP: &str = "Stop";
pub const STARTSTOP: &str = "Start/Stop";
pub const CREATESNAP: &str = "Create Snap.";
pub const DELSNAP: &str = "Destroy Snap.";
pub const VIEW: &str = "View";
pub const EDIT: &str = "Edit";
pub const CLONE: &str = "Clone";
pub const EXPORT: &str = "Export";
pub const ACTIONS: &str = "Actions...";
pub const EXIT: &str = "Exit";
/// First actions-menu entry of a container that can be neither started nor stopped
pub const NOT_RUNNABLE: &str = "---";

impl Action {
    pub fn label(self, kind: ContainerKind) -> &'static str {
        match self {
            Action::Help => HELP,
            Action::Actions => ACTIONS,
            Action::View => VIEW,
            Action::Edit => EDIT,
            Action::Clone => CLONE,
            Action::Export => EXPORT,
            Action::CreateSnapshot => CREATESNAP,
            Action::Destroy => kind.destroy_label(),
            Action::Exit => EXIT,
            Action::DestroySnapshot => DELSNAP,
            Action::StartStop => STARTSTOP,
        }
    }
}

/// One line of the per-container actions menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuEntry {
    pub label: &'static str,
    /// `None` for the inert "---" entry
    pub action: Option<Action>,
}

/// A function-key shortcut in the bottom bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BottomMenuItem {
    /// Function key number, `3` for F3
    pub key: u8,
    pub action: Action,
}

impl BottomMenuItem {
    /// Key caption as drawn in the bar
    pub fn key_label(&self) -> String {
        format!(" {}", self.key)
    }

    pub fn label(&self, kind: ContainerKind) -> &'static str {
        self.action.label(kind)
    }
}

const fn item(key: u8, action: Action) -> BottomMenuItem {
    BottomMenuItem { key, action }
}

static BOTTOM_MENU: [BottomMenuItem; 11] = [
    item(1, Action::Help),
    item(2, Action::Actions),
    item(3, Action::View),
    item(4, Action::Edit),
    item(5, Action::Clone),
    item(6, Action::Export),
    item(7, Action::CreateSnapshot),
    item(8, Action::Destroy),
    item(10, Action::Exit),
    item(11, Action::DestroySnapshot),
    item(12, Action::StartStop),
];

const MENU_TAIL: [Action; 7] = [
    Action::CreateSnapshot,
    Action::DestroySnapshot,
    Action::View,
    Action::Edit,
    Action::Clone,
    Action::Export,
    Action::Destroy,
];

impl ContainerKind {
    pub fn bottom_menu(self) -> &'static [BottomMenuItem] {
        &BOTTOM_MENU
    }

    /// Actions menu for a container in `status`
    pub fn actions_menu(self, status: Status) -> Vec<MenuEntry> {
        let first = if status.is_running() {
            MenuEntry {
                label: STOP,
                action: Some(Action::StartStop),
            }
        } else if status.is_runnable() {
            MenuEntry {
                label: START,
                action: Some(Action::StartStop),
            }
        } else {
            MenuEntry {
                label: NOT_RUNNABLE,
                action: None,
            }
        };

        std::iter::once(first)
            .chain(MENU_TAIL.iter().map(|&action| MenuEntry {
                label: action.label(self),
                action: Some(action),
            }))
            .collect()
    }

    /// Resolve a menu label
    pub fn action_for_label(self, label: &str) -> Option<Action> {
        match label {
            START | STOP | STARTSTOP => Some(Action::StartStop),
            NOT_RUNNABLE => None,
            _ => self
                .bottom_menu()
                .iter()
                .map(|item| item.action)
                .find(|action| action.label(self) == label),
        }
    }

    /// Resolve a function-key number through the bottom menu table
    pub fn action_for_key(self, key: u8) -> Option<Action> {
        self.bottom_menu()
            .iter()
            .find(|item| item.key == key)
            .map(|item| item.action)
    }
}
