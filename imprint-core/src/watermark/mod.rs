//! Invisible watermarks carrying ownership and licensing payloads.
//!
//! # Components
//!
//! - **Payload framing**: JSON payload with a length header and XOR checksum.
//! - **Repetition code**: majority vote over redundant samples per bit.
//! - **Codec**: quantization embedding over a collision-free slot layout.
//!
//! Watermarked images are emitted as PNG. Lossy re-encoding of a watermarked
//! image is not guaranteed to preserve the payload.

pub mod codec;
pub mod ecc;
pub mod payload;
pub mod verdict;

pub use codec::{
    embed_watermark, encode_png, extract_watermark, WatermarkCodec, WatermarkConfig,
    WatermarkExtraction,
};
pub use ecc::{RepetitionCode, Vote};
pub use payload::{WatermarkPayload, MAX_FRAME_LEN};
pub use verdict::WatermarkVerdict;
