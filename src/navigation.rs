//! Display-side focus state driven by remote commands.

use crate::protocol::{CommandKind, RemoteMessage};

/// Column count assumed when the grid layout is unknown.
pub const DEFAULT_COLUMNS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEffect {
    Unchanged,
    Focused(usize),
    Opened(usize),
    Closed,
    /// Mute and volume commands, left to the player.
    Player(CommandKind),
}

/// Focus over a grid of `item_count` items laid out in `columns` columns.
///
/// Focus is clamped to `0..item_count` and never wraps.
#[derive(Debug, Clone)]
pub struct Navigator {
    focused: usize,
    item_count: usize,
    columns: usize,
    open: Option<usize>,
}

impl Navigator {
    pub fn new(item_count: usize, columns: usize) -> Self {
        Self {
            focused: 0,
            item_count,
            columns: columns.max(1),
            open: None,
        }
    }

    pub fn focused(&self) -> usize {
        self.focused
    }

    pub fn open_item(&self) -> Option<usize> {
        self.open
    }

    pub fn set_columns(&mut self, columns: usize) {
        self.columns = columns.max(1);
    }

    /// Update the number of items (e.g. after filtering), pulling focus back
    /// inside the new range.
    pub fn set_item_count(&mut self, item_count: usize) {
        self.item_count = item_count;
        self.focused = self.focused.min(self.last_index());
    }

    fn last_index(&self) -> usize {
        self.item_count.saturating_sub(1)
    }

    fn focus(&mut self, index: usize) -> NavEffect {
        let index = index.min(self.last_index());
        if index == self.focused {
            NavEffect::Unchanged
        } else {
            self.focused = index;
            NavEffect::Focused(index)
        }
    }

    pub fn apply_command(&mut self, command: CommandKind) -> NavEffect {
        match command {
            CommandKind::Up => self.focus(self.focused.saturating_sub(self.columns)),
            CommandKind::Down => self.focus(self.focused.saturating_add(self.columns)),
            CommandKind::Left => self.focus(self.focused.saturating_sub(1)),
            CommandKind::Right => self.focus(self.focused.saturating_add(1)),
            CommandKind::Select => {
                if self.open.is_none() && self.focused < self.item_count {
                    self.open = Some(self.focused);
                    NavEffect::Opened(self.focused)
                } else {
                    NavEffect::Unchanged
                }
            }
            CommandKind::Back | CommandKind::Home => match self.open.take() {
                Some(_) => NavEffect::Closed,
                None => NavEffect::Unchanged,
            },
            CommandKind::Mute | CommandKind::VolumeUp | CommandKind::VolumeDown => {
                NavEffect::Player(command)
            }
        }
    }

    /// Apply one inbound message. `connected` and `sync` do not change state.
    pub fn handle(&mut self, message: &RemoteMessage) -> NavEffect {
        match message {
            RemoteMessage::Command { command } => self.apply_command(*command),
            RemoteMessage::Navigate { index } => {
                let index = usize::try_from(*index).unwrap_or(0);
                self.focus(index)
            }
            RemoteMessage::Connected | RemoteMessage::Sync { .. } => NavEffect::Unchanged,
        }
    }

    /// Parse and apply a raw relay payload. Unparseable payloads are ignored.
    pub fn handle_raw(&mut self, payload: &str) -> NavEffect {
        match RemoteMessage::from_json(payload) {
            Ok(message) => self.handle(&message),
            Err(_) => NavEffect::Unchanged,
        }
    }

    pub fn sync_message(&self) -> RemoteMessage {
        RemoteMessage::Sync {
            focused_index: self.focused,
        }
    }
}
