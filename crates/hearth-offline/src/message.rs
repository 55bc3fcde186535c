//! Commands pages send to the worker

use std::fmt;
use std::str::FromStr;

/// A command accepted from a controlled page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerCommand {
    /// Activate now and take control of the open pages
    Claim,
    /// Delete the current cache
    Clear,
    /// Activate, take control, and reload every window
    Update,
}

impl WorkerCommand {
    /// Wire name of the command
    pub fn as_str(self) -> &'static str {
        match self {
            WorkerCommand::Claim => "claim",
            WorkerCommand::Clear => "clear",
            WorkerCommand::Update => "update",
        }
    }
}

impl FromStr for WorkerCommand {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claim" => Ok(WorkerCommand::Claim),
            "clear" => Ok(WorkerCommand::Clear),
            "update" => Ok(WorkerCommand::Update),
            other => Err(UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for WorkerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message that is not a known command
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown worker command: {0:?}")]
pub struct UnknownCommand(pub String);

/// A message posted to the worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    /// Serialized origin of the sender
    pub origin: String,
    /// Id of the sending client, if any
    pub source: Option<String>,
    /// Message payload
    pub data: String,
}

impl MessageEvent {
    /// Message from a client
    pub fn new(
        origin: impl Into<String>,
        source: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            source: Some(source.into()),
            data: data.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        for cmd in [WorkerCommand::Claim, WorkerCommand::Clear, WorkerCommand::Update] {
            assert_eq!(cmd.as_str().parse::<WorkerCommand>().unwrap(), cmd);
        }
        assert_eq!(
            "CLAIM".parse::<WorkerCommand>().unwrap_err(),
            UnknownCommand("CLAIM".into())
        );
        assert!("".parse::<WorkerCommand>().is_err());
    }
}
