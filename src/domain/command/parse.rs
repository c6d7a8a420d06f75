use serde::Deserialize;
use thiserror::Error;

use crate::domain::foundation::UserId;

/// A command a client may send over its connection.
///
/// Accepted forms are bare text (`ping`, `stats`, `help`, any case) or a
/// JSON object naming the command in `command` or `type`:
///
/// ```json
/// {"command": "identify", "userId": "u-17"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    Ping,
    Stats,
    Help,
    Identify { user_id: UserId },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,

    #[error("unknown command: {0}")]
    Unknown(String),

    #[error("identify requires a non-blank userId")]
    MissingUserId,

    #[error("malformed JSON command: {0}")]
    MalformedJson(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCommand {
    command: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    user_id: Option<String>,
}

impl ClientCommand {
    pub fn parse(raw: &str) -> Result<Self, CommandError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CommandError::Empty);
        }

        if trimmed.starts_with('{') {
            let parsed: RawCommand = serde_json::from_str(trimmed)
                .map_err(|e| CommandError::MalformedJson(e.to_string()))?;
            let name = parsed.command.or(parsed.kind).ok_or(CommandError::Empty)?;
            return Self::from_name(&name, parsed.user_id);
        }

        Self::from_name(trimmed, None)
    }

    fn from_name(name: &str, user_id: Option<String>) -> Result<Self, CommandError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ping" => Ok(ClientCommand::Ping),
            "stats" => Ok(ClientCommand::Stats),
            "help" => Ok(ClientCommand::Help),
            "identify" => {
                let user_id = user_id
                    .and_then(|id| UserId::new(id).ok())
                    .ok_or(CommandError::MissingUserId)?;
                Ok(ClientCommand::Identify { user_id })
            }
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::Ping => "ping",
            ClientCommand::Stats => "stats",
            ClientCommand::Help => "help",
            ClientCommand::Identify { .. } => "identify",
        }
    }
}
