use serde::{Deserialize, Serialize};
use std::{
    fmt,
    time::{SystemTime, UNIX_EPOCH},
};

/// A point in time as whole seconds since the Unix epoch.
///
/// Token validity fields (`exp`, `nbf`, `iat`) carry second precision;
/// sub-second components are truncated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The current time, truncated to seconds.
    #[must_use]
    pub fn now() -> Self {
        let seconds = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);
        Timestamp(seconds)
    }

    /// Construct from seconds since the Unix epoch.
    #[must_use]
    pub const fn from_unix(seconds: u64) -> Self {
        Timestamp(seconds)
    }

    /// Seconds since the Unix epoch.
    #[must_use]
    pub const fn to_unix(self) -> u64 {
        self.0
    }

    /// This timestamp shifted `seconds` into the future, saturating.
    #[must_use]
    pub const fn add_seconds(self, seconds: u64) -> Self {
        Timestamp(self.0.saturating_add(seconds))
    }

    /// This timestamp shifted `seconds` into the past, saturating at zero.
    #[must_use]
    pub const fn sub_seconds(self, seconds: u64) -> Self {
        Timestamp(self.0.saturating_sub(seconds))
    }
}

impl From<u64> for Timestamp {
    fn from(seconds: u64) -> Self {
        Timestamp(seconds)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_seconds() {
        assert!(Timestamp::from_unix(10) < Timestamp::from_unix(11));
        assert_eq!(Timestamp::from_unix(10).add_seconds(5).to_unix(), 15);
        assert_eq!(Timestamp::from_unix(3).sub_seconds(10).to_unix(), 0);
    }

    #[test]
    fn serializes_as_bare_integer() {
        let json = serde_json::to_string(&Timestamp::from_unix(1700000000)).unwrap();
        assert_eq!(json, "1700000000");
        let decoded: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.to_unix(), 1700000000);
    }
}
