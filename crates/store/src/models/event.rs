//! Viewer interaction events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of viewer interaction
///
/// The stored `event_type` column is free text; kinds this pipeline does
/// not understand are carried as `Unknown` so callers can log-and-skip
/// them instead of silently dropping rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    View,
    Like,
    Comment,
    Report,
    Share,
    Unknown(String),
}

impl EventKind {
    /// Parse a stored event type (case-insensitive, never fails)
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "view" => Self::View,
            "like" => Self::Like,
            "comment" => Self::Comment,
            "report" => Self::Report,
            "share" => Self::Share,
            _ => Self::Unknown(s.to_string()),
        }
    }

    /// The canonical stored name
    pub fn as_str(&self) -> &str {
        match self {
            Self::View => "view",
            Self::Like => "like",
            Self::Comment => "comment",
            Self::Report => "report",
            Self::Share => "share",
            Self::Unknown(s) => s,
        }
    }

    /// Whether this is a kind the pipeline understands
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

/// A single viewer interaction event (append-only)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerEvent {
    pub id: i64,
    pub video_id: i64,
    pub user_id: i64,
    pub kind: EventKind,
    pub ts: DateTime<Utc>,
    pub device_id: Option<String>,
    pub ip_hash: Option<String>,
}

impl ViewerEvent {
    /// Create an event (id 0 until inserted)
    pub fn new(video_id: i64, user_id: i64, kind: EventKind, ts: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            video_id,
            user_id,
            kind,
            ts,
            device_id: None,
            ip_hash: None,
        }
    }

    /// Attach a device identifier
    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// Attach a hashed IP
    pub fn with_ip(mut self, ip_hash: impl Into<String>) -> Self {
        self.ip_hash = Some(ip_hash.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_kinds() {
        assert_eq!(EventKind::parse("view"), EventKind::View);
        assert_eq!(EventKind::parse("LIKE"), EventKind::Like);
        assert_eq!(EventKind::parse("Share"), EventKind::Share);
    }

    #[test]
    fn test_parse_unknown_kind_is_preserved() {
        let kind = EventKind::parse("superlike");
        assert!(!kind.is_known());
        assert_eq!(kind.as_str(), "superlike");
    }
}
