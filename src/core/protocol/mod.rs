// src/core/protocol/mod.rs

//! RESP (REdis Serialization Protocol) support for the administrative client.

pub mod resp_frame;

pub use resp_frame::{RespFrame, RespFrameCodec};
