//! Frame encoding for session payloads.
//!
//! Frames are `bincode` with a hard size limit, so a hostile peer cannot make
//! us allocate an arbitrarily large buffer while decoding.

use bincode::Options;
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::session::SessionError;
use crate::config;

fn options() -> impl Options {
    bincode::DefaultOptions::new().with_limit(config::MAX_FRAME_BYTES)
}

/// Encode `message` into a frame.
pub fn encode<T: Serialize>(message: &T) -> Result<Bytes, SessionError> {
    options()
        .serialize(message)
        .map(Bytes::from)
        .map_err(|e| SessionError::Codec(e.to_string()))
}

/// Decode a frame produced by [`encode`].
pub fn decode<T: DeserializeOwned>(frame: &[u8]) -> Result<T, SessionError> {
    options()
        .deserialize(frame)
        .map_err(|e| SessionError::Codec(e.to_string()))
}
