//! The tessera wire protocol.
//!
//! A connection is a stream of commands: a u16-length-prefixed UTF-8
//! command string followed by fixed-width big-endian scalars. The
//! framing is symmetrical in both directions; chunk payloads are the
//! opaque frames produced by the chunk codec.

pub mod error;
pub mod request;
pub mod response;

pub use error::ProtocolError;
pub use request::{Request, RequestDecoder};
pub use response::Response;
