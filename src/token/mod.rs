//! Signed download-token codec.

pub mod codec;
pub mod payload;

pub use codec::{IssuedToken, TokenCodec};
pub use payload::TokenPayload;
