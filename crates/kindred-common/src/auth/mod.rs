//! Bearer token helpers

mod token;

pub use token::{inspect_token, TokenClaims, TokenError};
