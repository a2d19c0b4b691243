//! Matching orchestrator: the single "is this asset already registered?" decision.
//!
//! A candidate is first looked up by exact digest. Only when that misses is
//! the registry scanned for a perceptually similar fingerprint.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::error::{ImprintError, Result};
use crate::fingerprint::{
    digest_with, ContentDigest, DigestAlgorithm, PerceptualFingerprint, PerceptualHasher,
    NEAR_DUPLICATE_THRESHOLD,
};
use crate::registry::{MatchType, RecordMetadata, Registry, SimilarityMatch};
use crate::watermark::{WatermarkCodec, WatermarkConfig, WatermarkPayload, WatermarkVerdict};

/// Matcher settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatcherConfig {
    /// Minimum similarity percentage for a perceptual match.
    pub similarity_threshold: f64,
    pub digest_algorithm: DigestAlgorithm,
    /// Update `matchStats` on the matched entry.
    pub record_matches: bool,
    pub watermark: WatermarkConfig,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: NEAR_DUPLICATE_THRESHOLD,
            digest_algorithm: DigestAlgorithm::default(),
            record_matches: false,
            watermark: WatermarkConfig::default(),
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.similarity_threshold) {
            return Err(ImprintError::InvalidConfig(format!(
                "similarity threshold must be between 0 and 100, got {}",
                self.similarity_threshold
            )));
        }
        self.watermark.validate()
    }
}

/// Outcome of checking a candidate against the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateCheck {
    pub found: bool,
    pub match_type: MatchType,
    /// Digest of the candidate itself.
    pub candidate_digest: ContentDigest,
    /// Digest of the matched registry entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<ContentDigest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<RecordMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
    /// `None` when nothing matched or the matched entry does not say;
    /// the remix decision then needs review.
    pub derivatives_allowed: Option<bool>,
}

impl CandidateCheck {
    fn no_match(candidate_digest: ContentDigest) -> Self {
        Self {
            found: false,
            match_type: MatchType::None,
            candidate_digest,
            digest: None,
            metadata: None,
            distance: None,
            similarity: None,
            derivatives_allowed: None,
        }
    }

    fn exact(candidate_digest: ContentDigest, metadata: RecordMetadata) -> Self {
        Self {
            found: true,
            match_type: MatchType::Exact,
            digest: Some(candidate_digest.clone()),
            candidate_digest,
            derivatives_allowed: metadata.derivatives_allowed(),
            metadata: Some(metadata),
            distance: Some(0),
            similarity: Some(100.0),
        }
    }

    fn perceptual(candidate_digest: ContentDigest, hit: SimilarityMatch) -> Self {
        Self {
            found: true,
            match_type: MatchType::Perceptual,
            candidate_digest,
            digest: Some(hit.digest),
            derivatives_allowed: hit.metadata.derivatives_allowed(),
            metadata: Some(hit.metadata),
            distance: Some(hit.distance),
            similarity: Some(hit.similarity),
        }
    }
}

/// Result of registering an asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub digest: ContentDigest,
    pub perceptual_fingerprint: PerceptualFingerprint,
    /// `false` when the digest was already registered.
    pub inserted: bool,
    /// The PNG that should circulate, when a watermark was embedded.
    #[serde(skip)]
    pub watermarked_image: Option<Vec<u8>>,
}

/// Orchestrates digest, fingerprint, registry and watermark operations.
pub struct Matcher {
    registry: Arc<Registry>,
    config: MatcherConfig,
    codec: WatermarkCodec,
}

impl Matcher {
    pub fn new(registry: Arc<Registry>, config: MatcherConfig) -> Result<Self> {
        config.validate()?;
        let codec = WatermarkCodec::new(config.watermark)?;
        Ok(Self {
            registry,
            config,
            codec,
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Digest and fingerprint computed on two blocking tasks.
    ///
    /// The fingerprint result is returned unresolved so callers decide whether
    /// a decode failure matters.
    async fn analyze(
        &self,
        data: Arc<[u8]>,
    ) -> Result<(ContentDigest, Result<PerceptualFingerprint>)> {
        let algorithm = self.config.digest_algorithm;
        let for_digest = data.clone();

        let digest_task = tokio::task::spawn_blocking(move || digest_with(algorithm, &for_digest));
        let fingerprint_task =
            tokio::task::spawn_blocking(move || PerceptualHasher::default().hash_bytes(&data));

        let (digest, fingerprint) = tokio::join!(digest_task, fingerprint_task);
        let digest = digest.map_err(|e| ImprintError::TaskError(e.to_string()))?;
        let fingerprint = fingerprint.map_err(|e| ImprintError::TaskError(e.to_string()))?;
        Ok((digest, fingerprint))
    }

    /// Check raw candidate bytes.
    ///
    /// Non-image bytes can still match exactly; a decode error is returned only
    /// when the perceptual fallback is needed.
    #[instrument(level = "debug", skip_all)]
    pub async fn check_candidate(&self, bytes: impl Into<Arc<[u8]>>) -> Result<CandidateCheck> {
        let (digest, fingerprint) = self.analyze(bytes.into()).await?;

        if let Some(hit) = self.exact_match(&digest).await? {
            return Ok(hit);
        }

        let fingerprint = fingerprint?;
        self.similar_match(digest, &fingerprint).await
    }

    /// Same decision from precomputed values.
    pub async fn check_fingerprints(
        &self,
        digest: &ContentDigest,
        fingerprint: Option<&PerceptualFingerprint>,
    ) -> Result<CandidateCheck> {
        if let Some(hit) = self.exact_match(digest).await? {
            return Ok(hit);
        }

        match fingerprint {
            Some(fingerprint) => self.similar_match(digest.clone(), fingerprint).await,
            None => Ok(CandidateCheck::no_match(digest.clone())),
        }
    }

    async fn exact_match(&self, digest: &ContentDigest) -> Result<Option<CandidateCheck>> {
        let Some(metadata) = self.registry.check_by_digest(digest).await? else {
            return Ok(None);
        };

        info!(digest = %digest.short(), "Exact match");
        self.note_match(digest, MatchType::Exact, 100.0).await;
        Ok(Some(CandidateCheck::exact(digest.clone(), metadata)))
    }

    async fn similar_match(
        &self,
        digest: ContentDigest,
        fingerprint: &PerceptualFingerprint,
    ) -> Result<CandidateCheck> {
        let hit = self
            .registry
            .check_by_similarity(fingerprint, self.config.similarity_threshold)
            .await?;

        match hit {
            Some(hit) => {
                info!(
                    candidate = %digest.short(),
                    matched = %hit.digest.short(),
                    distance = hit.distance,
                    similarity = hit.similarity,
                    "Perceptual match"
                );
                self.note_match(&hit.digest, MatchType::Perceptual, hit.similarity)
                    .await;
                Ok(CandidateCheck::perceptual(digest, hit))
            }
            None => {
                debug!(candidate = %digest.short(), fingerprint = %fingerprint, "No match");
                Ok(CandidateCheck::no_match(digest))
            }
        }
    }

    /// Match statistics are bookkeeping; a failure to record them does not
    /// change the decision.
    async fn note_match(&self, digest: &ContentDigest, match_type: MatchType, similarity: f64) {
        if !self.config.record_matches {
            return;
        }
        if let Err(e) = self
            .registry
            .record_match(digest, match_type, similarity)
            .await
        {
            warn!(digest = %digest.short(), error = %e, "Failed to record match statistics");
        }
    }

    /// Register an asset, optionally embedding a watermark first.
    ///
    /// The digest and fingerprint are taken from the bytes that will
    /// circulate: the watermarked PNG when one is embedded.
    #[instrument(level = "debug", skip_all)]
    pub async fn register(
        &self,
        bytes: impl Into<Arc<[u8]>>,
        mut metadata: RecordMetadata,
        watermark: Option<&WatermarkPayload>,
    ) -> Result<Registration> {
        let mut data: Arc<[u8]> = bytes.into();
        let mut watermarked_image = None;

        if let Some(payload) = watermark {
            let png = self.embed_watermark(data.clone(), payload).await?;
            data = Arc::from(png.as_slice());
            watermarked_image = Some(png);

            if metadata.owner_asset_id.is_none() {
                metadata.owner_asset_id = Some(payload.owner_asset_id.clone());
            }
        }

        let (digest, fingerprint) = self.analyze(data).await?;
        let fingerprint = fingerprint?;

        metadata.perceptual_fingerprint = Some(fingerprint);
        if metadata.created_at.is_none() {
            metadata.created_at = Some(chrono::Utc::now().timestamp_millis());
        }

        let inserted = self.registry.add(&digest, metadata).await?;
        Ok(Registration {
            digest,
            perceptual_fingerprint: fingerprint,
            inserted,
            watermarked_image,
        })
    }

    /// Embed `payload` on a blocking task, returning PNG bytes.
    pub async fn embed_watermark(
        &self,
        bytes: impl Into<Arc<[u8]>>,
        payload: &WatermarkPayload,
    ) -> Result<Vec<u8>> {
        let data: Arc<[u8]> = bytes.into();
        let codec = self.codec.clone();
        let payload = payload.clone();
        tokio::task::spawn_blocking(move || codec.embed(&data, &payload))
            .await
            .map_err(|e| ImprintError::TaskError(e.to_string()))?
    }

    /// Extract a watermark and decide whether `claimant` may register the image.
    pub async fn inspect_watermark(
        &self,
        bytes: impl Into<Arc<[u8]>>,
        claimant: Option<&str>,
    ) -> Result<WatermarkVerdict> {
        let data: Arc<[u8]> = bytes.into();
        let codec = self.codec.clone();
        let extraction = tokio::task::spawn_blocking(move || codec.extract(&data))
            .await
            .map_err(|e| ImprintError::TaskError(e.to_string()))??;

        let verdict = WatermarkVerdict::from_extraction(extraction, claimant);
        if verdict.block_registration {
            warn!(
                claimant = claimant.unwrap_or_default(),
                "Registration blocked: image carries another owner's watermark"
            );
        }
        Ok(verdict)
    }
}
