//! Registration decisions derived from an extracted watermark.

use serde::{Deserialize, Serialize};

use super::codec::WatermarkExtraction;
use super::payload::WatermarkPayload;

/// Watermark inspection with a registration decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkVerdict {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<WatermarkPayload>,
    pub confidence: f64,
    /// The image carries someone else's watermark.
    pub block_registration: bool,
}

impl WatermarkVerdict {
    /// Block iff a watermark was found, a claimant was given, and the claimant
    /// is not the embedded owner.
    pub fn from_extraction(extraction: WatermarkExtraction, claimant: Option<&str>) -> Self {
        let claimant = claimant.map(str::trim).filter(|c| !c.is_empty());
        let block_registration = match (&extraction.payload, claimant) {
            (Some(payload), Some(claimant)) if extraction.found => {
                payload.owner_asset_id != claimant
            }
            _ => false,
        };

        Self {
            found: extraction.found,
            payload: extraction.payload,
            confidence: extraction.confidence,
            block_registration,
        }
    }
}
