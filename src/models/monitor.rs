//! Serial monitor data models and the client channel wire format

use serde::Deserialize;

/// Prefix of a client frame carrying text for the device
pub const SEND_PREFIX: &str = "SEND:";
/// Prefix of a client frame changing the baud rate
pub const BAUD_PREFIX: &str = "BAUD:";
/// Prefix of an outbound error-notice frame
pub const ERROR_PREFIX: &str = "ERROR:";

/// Inbound frame from the client channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    Close,
}

/// A parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// `SEND:<payload>`: write payload plus terminator to the port
    Send(String),
    /// `BAUD:<integer>`
    SetBaud(u32),
}

/// Why a client frame was not a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandParseError {
    /// Neither prefix matched
    Unrecognized,
    /// `BAUD:` with a value that is not a positive integer
    InvalidBaud(String),
}

impl ClientCommand {
    pub fn parse(frame: &str) -> Result<Self, CommandParseError> {
        if let Some(payload) = frame.strip_prefix(SEND_PREFIX) {
            return Ok(ClientCommand::Send(payload.to_string()));
        }
        if let Some(value) = frame.strip_prefix(BAUD_PREFIX) {
            return match value.trim().parse::<u32>() {
                Ok(rate) if rate > 0 => Ok(ClientCommand::SetBaud(rate)),
                _ => Err(CommandParseError::InvalidBaud(value.to_string())),
            };
        }
        Err(CommandParseError::Unrecognized)
    }
}

/// Outbound message to the client channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// One decoded line read from the port
    Line(String),
    /// Informational text, e.g. a baud change acknowledgement
    Notice(String),
    /// Error notice; the last message before a failed session is torn down
    Error(String),
}

impl OutboundMessage {
    /// Text frame sent over the WebSocket
    pub fn to_frame(&self) -> String {
        match self {
            OutboundMessage::Line(line) => line.clone(),
            OutboundMessage::Notice(text) => text.clone(),
            OutboundMessage::Error(message) => format!("{}{}", ERROR_PREFIX, message),
        }
    }
}

/// Event produced by a serial session's read loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LineReceived(String),
    /// Terminal: the loop has ended and the port is released
    Failed(String),
}

/// Query string of `WS /ws/serial/{port}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonitorQuery {
    pub baud: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_send_keeps_payload_verbatim() {
        assert_eq!(
            ClientCommand::parse("SEND:hello"),
            Ok(ClientCommand::Send("hello".to_string()))
        );
        assert_eq!(
            ClientCommand::parse("SEND: AT+RST "),
            Ok(ClientCommand::Send(" AT+RST ".to_string()))
        );
        assert_eq!(
            ClientCommand::parse("SEND:"),
            Ok(ClientCommand::Send(String::new()))
        );
    }

    #[test]
    fn test_parse_baud() {
        assert_eq!(
            ClientCommand::parse("BAUD:115200"),
            Ok(ClientCommand::SetBaud(115200))
        );
        assert_eq!(
            ClientCommand::parse("BAUD:fast"),
            Err(CommandParseError::InvalidBaud("fast".to_string()))
        );
        assert_eq!(
            ClientCommand::parse("BAUD:0"),
            Err(CommandParseError::InvalidBaud("0".to_string()))
        );
    }

    #[test]
    fn test_unrecognized_frames() {
        assert_eq!(
            ClientCommand::parse("send:lowercase"),
            Err(CommandParseError::Unrecognized)
        );
        assert_eq!(ClientCommand::parse(""), Err(CommandParseError::Unrecognized));
    }

    #[test]
    fn test_outbound_frames() {
        assert_eq!(OutboundMessage::Line("42".to_string()).to_frame(), "42");
        assert_eq!(
            OutboundMessage::Error("port gone".to_string()).to_frame(),
            "ERROR:port gone"
        );
    }
}
