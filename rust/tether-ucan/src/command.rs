//! Command paths.

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// A slash-delimited action path, e.g. `/message/send`.
///
/// Stored as path segments; the empty segment list is the top command `/`,
/// which covers every other command. Commands compare by exact equality;
/// [`Command::starts_with`] gives the attenuation ordering used when
/// walking delegation chains.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Command(Vec<String>);

impl Command {
    /// Create a command from path segments.
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Command(segments)
    }

    /// The top command `/`, covering every command.
    #[must_use]
    pub const fn top() -> Self {
        Command(Vec::new())
    }

    /// The path segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether this command is covered by `prefix`: every segment of
    /// `prefix` matches the corresponding leading segment of `self`.
    ///
    /// `/message/send` starts with `/message` and with `/`, but not
    /// with `/message/send/x`.
    #[must_use]
    pub fn starts_with(&self, prefix: &Command) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl From<Vec<String>> for Command {
    fn from(segments: Vec<String>) -> Self {
        Command(segments)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.0 {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

/// Errors that can occur when parsing a [`Command`] from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandParseError {
    /// The command does not start with `/`.
    #[error("command must start with '/': {0:?}")]
    MissingLeadingSlash(String),

    /// The command contains an empty segment (`//`) or a trailing slash.
    #[error("command contains an empty segment: {0:?}")]
    EmptySegment(String),

    /// The command contains uppercase characters.
    #[error("command must be lowercase: {0:?}")]
    NotLowercase(String),
}

impl FromStr for Command {
    type Err = CommandParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s
            .strip_prefix('/')
            .ok_or_else(|| CommandParseError::MissingLeadingSlash(s.to_string()))?;
        if rest.is_empty() {
            return Ok(Command::top());
        }
        if s.chars().any(char::is_uppercase) {
            return Err(CommandParseError::NotLowercase(s.to_string()));
        }
        let segments: Vec<String> = rest.split('/').map(str::to_string).collect();
        if segments.iter().any(String::is_empty) {
            return Err(CommandParseError::EmptySegment(s.to_string()));
        }
        Ok(Command(segments))
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Command {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_command_displays_as_slash() {
        assert_eq!(Command::top().to_string(), "/");
        assert_eq!("/".parse::<Command>().unwrap(), Command::top());
    }

    #[test]
    fn display_round_trips() {
        let cmd: Command = "/message/send".parse().unwrap();
        assert_eq!(cmd.segments(), &["message", "send"]);
        assert_eq!(cmd.to_string(), "/message/send");
    }

    #[test]
    fn attenuation_ordering() {
        let send: Command = "/message/send".parse().unwrap();
        let message: Command = "/message".parse().unwrap();
        assert!(send.starts_with(&message));
        assert!(send.starts_with(&Command::top()));
        assert!(send.starts_with(&send));
        assert!(!message.starts_with(&send));
    }

    #[test]
    fn parse_rejects_malformed_commands() {
        assert!(matches!(
            "message/send".parse::<Command>(),
            Err(CommandParseError::MissingLeadingSlash(_))
        ));
        assert!(matches!(
            "/message//send".parse::<Command>(),
            Err(CommandParseError::EmptySegment(_))
        ));
        assert!(matches!(
            "/message/".parse::<Command>(),
            Err(CommandParseError::EmptySegment(_))
        ));
        assert!(matches!(
            "/Message".parse::<Command>(),
            Err(CommandParseError::NotLowercase(_))
        ));
    }

    #[test]
    fn serde_as_string() {
        let cmd: Command = "/storage/read".parse().unwrap();
        let json = serde_json::to_string(&cmd).unwrap();
        assert_eq!(json, "\"/storage/read\"");
        let decoded: Command = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, cmd);
    }
}
