//! Frame op codes

use serde::{Deserialize, Serialize};

/// Frame type, serialized as its number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum OpCode {
    /// Named application event, both directions
    Event = 0,
    Heartbeat = 1,
    /// Server reply to an event that carried an id
    Ack = 3,
    /// First frame on an authenticated socket
    Hello = 10,
    HeartbeatAck = 11,
}

impl TryFrom<u8> for OpCode {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Event),
            1 => Ok(Self::Heartbeat),
            3 => Ok(Self::Ack),
            10 => Ok(Self::Hello),
            11 => Ok(Self::HeartbeatAck),
            other => Err(format!("invalid op code: {other}")),
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> Self {
        op as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_round_trip() {
        for op in [
            OpCode::Event,
            OpCode::Heartbeat,
            OpCode::Ack,
            OpCode::Hello,
            OpCode::HeartbeatAck,
        ] {
            assert_eq!(OpCode::try_from(u8::from(op)), Ok(op));
        }
        assert!(OpCode::try_from(2).is_err());
    }

    #[test]
    fn test_serialized_as_number() {
        assert_eq!(serde_json::to_string(&OpCode::Hello).unwrap(), "10");
        assert_eq!(serde_json::from_str::<OpCode>("3").unwrap(), OpCode::Ack);
        assert!(serde_json::from_str::<OpCode>("7").is_err());
    }
}
