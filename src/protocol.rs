//! Messages exchanged over the control channel.
//!
//! The relay forwards payloads verbatim and never parses them; these types
//! are for the peers on either end.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Up,
    Down,
    Left,
    Right,
    Select,
    Back,
    Home,
    Mute,
    VolumeUp,
    VolumeDown,
}

impl CommandKind {
    pub const ALL: [CommandKind; 10] = [
        CommandKind::Up,
        CommandKind::Down,
        CommandKind::Left,
        CommandKind::Right,
        CommandKind::Select,
        CommandKind::Back,
        CommandKind::Home,
        CommandKind::Mute,
        CommandKind::VolumeUp,
        CommandKind::VolumeDown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Up => "up",
            CommandKind::Down => "down",
            CommandKind::Left => "left",
            CommandKind::Right => "right",
            CommandKind::Select => "select",
            CommandKind::Back => "back",
            CommandKind::Home => "home",
            CommandKind::Mute => "mute",
            CommandKind::VolumeUp => "volume_up",
            CommandKind::VolumeDown => "volume_down",
        }
    }
}

impl std::str::FromStr for CommandKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandKind::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown command: {s}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteMessage {
    /// Sent by the relay to each peer right after it connects.
    Connected,
    Command {
        command: CommandKind,
    },
    /// Remote → display: jump focus to an index.
    Navigate {
        index: i64,
    },
    /// Display → remote: current focus, advisory.
    Sync {
        #[serde(rename = "focusedIndex")]
        focused_index: usize,
    },
}

impl RemoteMessage {
    pub fn to_json(&self) -> String {
        // Serializing a fieldless/simple enum cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shapes() {
        assert_eq!(RemoteMessage::Connected.to_json(), r#"{"type":"connected"}"#);
        assert_eq!(
            RemoteMessage::Command { command: CommandKind::VolumeUp }.to_json(),
            r#"{"type":"command","command":"volume_up"}"#
        );
        assert_eq!(
            RemoteMessage::Navigate { index: 7 }.to_json(),
            r#"{"type":"navigate","index":7}"#
        );
        assert_eq!(
            RemoteMessage::Sync { focused_index: 3 }.to_json(),
            r#"{"type":"sync","focusedIndex":3}"#
        );
    }

    #[test]
    fn test_parse_browser_payloads() {
        let msg = RemoteMessage::from_json(r#"{"command":"left","type":"command"}"#).unwrap();
        assert_eq!(msg, RemoteMessage::Command { command: CommandKind::Left });

        let msg = RemoteMessage::from_json(r#"{"type":"sync","focusedIndex":12}"#).unwrap();
        assert_eq!(msg, RemoteMessage::Sync { focused_index: 12 });

        assert!(RemoteMessage::from_json(r#"{"type":"command","command":"jump"}"#).is_err());
        assert!(RemoteMessage::from_json("not json").is_err());
    }

    #[test]
    fn test_command_from_str() {
        for command in CommandKind::ALL {
            assert_eq!(command.as_str().parse::<CommandKind>(), Ok(command));
        }
        assert!("sideways".parse::<CommandKind>().is_err());
    }
}
