//! Sync bus message model

use serde::{Deserialize, Serialize};

/// Commands a leader can broadcast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BusCommand {
    PlayByStableId,
    PlayCurrentOrFirst,
    PlayNext,
    PlayPrev,
    StopPlay,
}

impl BusCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusCommand::PlayByStableId => "PlayByStableId",
            BusCommand::PlayCurrentOrFirst => "PlayCurrentOrFirst",
            BusCommand::PlayNext => "PlayNext",
            BusCommand::PlayPrev => "PlayPrev",
            BusCommand::StopPlay => "StopPlay",
        }
    }
}

impl std::fmt::Display for BusCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One versioned command as stored in the bus file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusMessage {
    /// Sequence number, strictly increasing per broadcast
    pub v: i64,
    pub cmd: BusCommand,
    /// Stable id of the target entry
    #[serde(default)]
    pub sid: Option<String>,
    /// Title of the target entry, last-resort fallback
    #[serde(default)]
    pub title: Option<String>,
    /// Catalog index of the target entry, -1 when absent
    #[serde(default = "no_index")]
    pub index: i64,
    /// Epoch seconds at which every instance executes the command
    pub at_utc: f64,
    /// Epoch seconds at which the leader wrote the command
    #[serde(default)]
    pub write_utc: f64,
}

impl BusMessage {
    /// Target index, if the message carries one
    pub fn target_index(&self) -> Option<usize> {
        usize::try_from(self.index).ok()
    }

    /// Encode an optional index the way the bus file stores it
    pub fn encode_index(index: Option<usize>) -> i64 {
        index.map(|i| i as i64).unwrap_or(-1)
    }
}

fn no_index() -> i64 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let msg = BusMessage {
            v: 3,
            cmd: BusCommand::PlayByStableId,
            sid: Some("sha1:00".into()),
            title: None,
            index: 2,
            at_utc: 10.5,
            write_utc: 9.0,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["v"], 3);
        assert_eq!(json["cmd"], "PlayByStableId");
        assert_eq!(json["sid"], "sha1:00");
        assert!(json["title"].is_null());
        assert_eq!(json["atUtc"], 10.5);
        assert_eq!(json["writeUtc"], 9.0);
    }

    #[test]
    fn test_parse_stop_without_target() {
        let msg: BusMessage =
            serde_json::from_str(r#"{"v":7,"cmd":"StopPlay","atUtc":1.0}"#).unwrap();
        assert_eq!(msg.cmd, BusCommand::StopPlay);
        assert_eq!(msg.target_index(), None);
        assert_eq!(msg.sid, None);
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(serde_json::from_str::<BusMessage>(r#"{"v":1,"cmd":"Dance","atUtc":1.0}"#).is_err());
    }
}
