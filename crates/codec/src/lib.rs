//! §4.2 Codec: optional zstd compression applied before local append and
//! fan-out, plus an optional compact binary framing for in-flight records.

pub mod compression;
pub mod framing;

pub use compression::{compress, decompress, CodecError};
pub use framing::{decode_framed, encode_framed, DecodedFrame, FramingError};
