//! Gateway protocol definitions
//!
//! Defines the WebSocket protocol including op codes, frame format, and close codes.

mod close_codes;
mod frame;
mod opcodes;

pub use close_codes::{CloseAction, CloseCode};
pub use frame::{Frame, HelloPayload};
pub use opcodes::OpCode;
