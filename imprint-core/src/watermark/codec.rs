//! Embedding and extraction of framed payloads in pixel data.
//!
//! Only colour channels are addressable; alpha is carried through untouched.
//! The addressable slots are split into `redundancy` equal repeat blocks. Inside
//! each block, logical bit `i` owns a cell of `cell_width` consecutive slots
//! starting at `i * cell_width`, so no two bits ever share a slot.
//!
//! Within a cell the bit is written at a base offset and two spread offsets
//! derived from `seed + i`. Each location is moved to the nearest point of a
//! quantization lattice that encodes the bit, which keeps the change within
//! `strength` levels away from the ends of the 0..=255 range.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ecc::RepetitionCode;
use super::payload::{
    bits_to_bytes, bytes_to_bits, decode_frame_body, encode_frame, WatermarkPayload,
    LENGTH_HEADER_BITS, MIN_FRAME_LEN,
};
use crate::error::{ImprintError, Result};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_REDUNDANCY: usize = 8;
pub const DEFAULT_STRENGTH: u8 = 8;
pub const DEFAULT_CELL_WIDTH: usize = 7;

const SPREAD_A: u64 = 17;
const SPREAD_B: u64 = 37;
const COLOUR_CHANNELS: usize = 3;
/// Spread samples written per bit inside each cell.
const SAMPLES_PER_CELL: usize = 3;

/// Watermark layout parameters. Embedding and extraction must agree on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WatermarkConfig {
    pub seed: u64,
    /// Repeat blocks per bit (1..=64).
    pub redundancy: usize,
    /// Maximum per-sample change in intensity levels (2..=64).
    pub strength: u8,
    /// Slots per bit inside a repeat block.
    pub cell_width: usize,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            redundancy: DEFAULT_REDUNDANCY,
            strength: DEFAULT_STRENGTH,
            cell_width: DEFAULT_CELL_WIDTH,
        }
    }
}

impl WatermarkConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=64).contains(&self.redundancy) {
            return Err(ImprintError::InvalidConfig(format!(
                "redundancy must be between 1 and 64, got {}",
                self.redundancy
            )));
        }
        if !(2..=64).contains(&self.strength) {
            return Err(ImprintError::InvalidConfig(format!(
                "strength must be between 2 and 64, got {}",
                self.strength
            )));
        }
        if self.cell_width < SAMPLES_PER_CELL {
            return Err(ImprintError::InvalidConfig(format!(
                "cell_width must be at least {SAMPLES_PER_CELL}, got {}",
                self.cell_width
            )));
        }
        Ok(())
    }
}

/// Outcome of looking for a watermark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkExtraction {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<WatermarkPayload>,
    /// Mean fraction of samples agreeing with each decoded bit; 0 when not found.
    pub confidence: f64,
}

impl WatermarkExtraction {
    pub fn not_found() -> Self {
        Self {
            found: false,
            payload: None,
            confidence: 0.0,
        }
    }
}

/// Flat 8-bit pixel buffer, RGB or RGBA.
struct ChannelBuffer {
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<u8>,
}

impl ChannelBuffer {
    fn from_image(image: &DynamicImage) -> Self {
        let (width, height) = (image.width(), image.height());
        if image.color().has_alpha() {
            Self {
                width,
                height,
                channels: 4,
                data: image.to_rgba8().into_raw(),
            }
        } else {
            Self {
                width,
                height,
                channels: 3,
                data: image.to_rgb8().into_raw(),
            }
        }
    }

    fn slots(&self) -> usize {
        (self.data.len() / self.channels) * COLOUR_CHANNELS
    }

    fn index(&self, slot: usize) -> usize {
        (slot / COLOUR_CHANNELS) * self.channels + slot % COLOUR_CHANNELS
    }

    fn get(&self, slot: usize) -> u8 {
        self.data[self.index(slot)]
    }

    fn set(&mut self, slot: usize, value: u8) {
        let idx = self.index(slot);
        self.data[idx] = value;
    }

    fn into_image(self) -> Result<DynamicImage> {
        let image = if self.channels == 4 {
            RgbaImage::from_raw(self.width, self.height, self.data).map(DynamicImage::ImageRgba8)
        } else {
            RgbImage::from_raw(self.width, self.height, self.data).map(DynamicImage::ImageRgb8)
        };
        image.ok_or_else(|| ImprintError::EncodeError("pixel buffer size mismatch".into()))
    }
}

/// Slot addressing for a given image size.
struct Layout {
    seed: u64,
    redundancy: usize,
    cell_width: usize,
    block_len: usize,
}

impl Layout {
    fn new(config: &WatermarkConfig, slots: usize) -> Self {
        Self {
            seed: config.seed,
            redundancy: config.redundancy,
            cell_width: config.cell_width,
            block_len: slots / config.redundancy,
        }
    }

    fn capacity_bits(&self) -> usize {
        self.block_len / self.cell_width
    }

    /// Three distinct offsets inside the cell of logical bit `bit`.
    ///
    /// Both spread steps lie in `1..w` and differ from each other, so no
    /// offset can coincide with the base or with the other spread offset.
    fn cell_offsets(&self, bit: usize) -> [u64; SAMPLES_PER_CELL] {
        let w = self.cell_width as u64;
        let s = self.seed.wrapping_add(bit as u64);
        let base = s % w;

        let first = s.wrapping_mul(SPREAD_A) % (w - 1);
        let second = (first + 1 + s.wrapping_mul(SPREAD_B) % (w - 2)) % (w - 1);

        [base, (base + 1 + first) % w, (base + 1 + second) % w]
    }

    /// Slots holding every repeat of logical bit `bit`.
    fn locations(&self, bit: usize) -> Vec<usize> {
        let offsets = self.cell_offsets(bit);
        let cell_start = bit * self.cell_width;
        (0..self.redundancy)
            .flat_map(|r| {
                let start = r * self.block_len + cell_start;
                offsets.iter().map(move |&o| start + o as usize)
            })
            .collect()
    }
}

/// Move `value` to the nearest lattice point that reads back as `bit`.
fn quantize(value: u8, bit: bool, strength: u8) -> u8 {
    let period = 2 * i32::from(strength);
    let offset = if bit { 3 * period / 4 } else { period / 4 };
    let v = i32::from(value);

    let mut target = (v - offset + period / 2).div_euclid(period) * period + offset;
    if target > 255 {
        target -= period;
    }
    if target < 0 {
        target += period;
    }
    target as u8
}

/// A sample reads 1 when it sits in the upper half of its lattice cell.
fn read_sample(value: u8, strength: u8) -> bool {
    let period = 2 * u16::from(strength);
    u16::from(value) % period >= period / 2
}

/// Embeds and extracts watermarks with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct WatermarkCodec {
    config: WatermarkConfig,
}

impl WatermarkCodec {
    pub fn new(config: WatermarkConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &WatermarkConfig {
        &self.config
    }

    /// Number of frame bits an image of `width` x `height` pixels can carry.
    pub fn capacity_bits(&self, width: u32, height: u32) -> usize {
        let slots = width as usize * height as usize * COLOUR_CHANNELS;
        Layout::new(&self.config, slots).capacity_bits()
    }

    /// Embed `payload` into encoded image bytes, returning PNG bytes.
    pub fn embed(&self, image_data: &[u8], payload: &WatermarkPayload) -> Result<Vec<u8>> {
        let image = decode_image(image_data)?;
        let marked = self.embed_image(&image, payload)?;
        encode_png(&marked)
    }

    pub fn embed_image(
        &self,
        image: &DynamicImage,
        payload: &WatermarkPayload,
    ) -> Result<DynamicImage> {
        let frame = encode_frame(payload)?;
        let bits = bytes_to_bits(&frame);

        let mut buffer = ChannelBuffer::from_image(image);
        let layout = Layout::new(&self.config, buffer.slots());
        let capacity = layout.capacity_bits();
        if bits.len() > capacity {
            return Err(ImprintError::CapacityExceeded {
                needed: bits.len(),
                capacity,
            });
        }

        for (i, &bit) in bits.iter().enumerate() {
            for slot in layout.locations(i) {
                let value = buffer.get(slot);
                buffer.set(slot, quantize(value, bit, self.config.strength));
            }
        }

        debug!(
            bits = bits.len(),
            capacity,
            width = buffer.width,
            height = buffer.height,
            "Embedded watermark"
        );

        buffer.into_image()
    }

    /// Look for a watermark in encoded image bytes.
    ///
    /// Only an undecodable image is an error; every other failure is a
    /// `found = false` result.
    pub fn extract(&self, image_data: &[u8]) -> Result<WatermarkExtraction> {
        let image = decode_image(image_data)?;
        Ok(self.extract_image(&image))
    }

    pub fn extract_image(&self, image: &DynamicImage) -> WatermarkExtraction {
        let buffer = ChannelBuffer::from_image(image);
        let layout = Layout::new(&self.config, buffer.slots());
        let capacity = layout.capacity_bits();

        if capacity < LENGTH_HEADER_BITS + MIN_FRAME_LEN * 8 {
            return WatermarkExtraction::not_found();
        }

        let strength = self.config.strength;
        let read_bit = |i: usize| {
            let samples: Vec<bool> = layout
                .locations(i)
                .into_iter()
                .map(|slot| read_sample(buffer.get(slot), strength))
                .collect();
            RepetitionCode::new(samples.len()).decode(&samples)
        };

        let mut votes: Vec<_> = (0..LENGTH_HEADER_BITS).map(read_bit).collect();
        let header: Vec<bool> = votes.iter().map(|v| v.bit).collect();
        let header_bytes = bits_to_bytes(&header);
        let body_len = usize::from(u16::from_be_bytes([header_bytes[0], header_bytes[1]]));

        if body_len < MIN_FRAME_LEN || LENGTH_HEADER_BITS + body_len * 8 > capacity {
            debug!(body_len, capacity, "No watermark: implausible frame length");
            return WatermarkExtraction::not_found();
        }

        votes.extend((LENGTH_HEADER_BITS..LENGTH_HEADER_BITS + body_len * 8).map(read_bit));
        let body_bits: Vec<bool> = votes[LENGTH_HEADER_BITS..].iter().map(|v| v.bit).collect();

        match decode_frame_body(&bits_to_bytes(&body_bits)) {
            Some(payload) => {
                let confidence =
                    votes.iter().map(|v| v.agreement).sum::<f64>() / votes.len() as f64;
                WatermarkExtraction {
                    found: true,
                    payload: Some(payload),
                    confidence,
                }
            }
            None => {
                debug!(body_len, "No watermark: frame did not verify");
                WatermarkExtraction::not_found()
            }
        }
    }
}

/// Embed with the default configuration.
pub fn embed_watermark(image_data: &[u8], payload: &WatermarkPayload) -> Result<Vec<u8>> {
    WatermarkCodec::default().embed(image_data, payload)
}

/// Extract with the default configuration.
pub fn extract_watermark(image_data: &[u8]) -> Result<WatermarkExtraction> {
    WatermarkCodec::default().extract(image_data)
}

pub(crate) fn decode_image(image_data: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(image_data).map_err(|e| ImprintError::DecodeError(e.to_string()))
}

/// Lossless PNG encoding.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| ImprintError::EncodeError(e.to_string()))?;
    Ok(out.into_inner())
}
