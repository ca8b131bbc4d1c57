//! Adapter traits for the three external collaborators.
//!
//! Pipelines take these as explicitly injected instances so tests can swap
//! in in-memory doubles; the production implementations are
//! [`crate::images::DynamoMetadataStore`], [`crate::blobs::S3BlobStore`]
//! and the OpenAI-compatible inference client in the shared crate.

use async_trait::async_trait;

use crate::error::GalleryResult;
use crate::images::model::{AnalysisStatus, Image, NewImageRecord, SearchMatch, VisionAnalysis};

/// Row storage for image metadata and analysis results, including the
/// vector-similarity operation used by search.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Insert one metadata row; the store assigns the id and timestamp.
    async fn insert_image(&self, owner_id: &str, record: NewImageRecord) -> GalleryResult<Image>;

    async fn get_image(&self, owner_id: &str, image_id: &str) -> GalleryResult<Image>;

    /// All of the owner's images, newest upload first.
    async fn list_images(&self, owner_id: &str) -> GalleryResult<Vec<Image>>;

    async fn list_by_status(
        &self,
        owner_id: &str,
        statuses: &[AnalysisStatus],
    ) -> GalleryResult<Vec<Image>>;

    /// Conditionally move the image to `pending`. Fails with `Conflict` when
    /// another run already holds it, `NotFound` when the row is missing.
    /// This is the per-image concurrency token: at most one pipeline run
    /// can claim an image at a time.
    async fn claim_for_analysis(&self, owner_id: &str, image_id: &str) -> GalleryResult<()>;

    async fn set_status(
        &self,
        owner_id: &str,
        image_id: &str,
        status: AnalysisStatus,
    ) -> GalleryResult<()>;

    /// Persist one run's results in a single update: embedding, all
    /// structured fields, and the last-analyzed timestamp. Readers never see
    /// a partially written result.
    async fn save_analysis(
        &self,
        owner_id: &str,
        image_id: &str,
        analysis: &VisionAnalysis,
        embedding: &[f32],
    ) -> GalleryResult<()>;

    /// Remove the analysis fields and reset the image to `unprocessed`.
    async fn clear_analysis(&self, owner_id: &str, image_id: &str) -> GalleryResult<()>;

    /// Delete the row, returning it so the caller can remove the blobs.
    async fn delete_image(&self, owner_id: &str, image_id: &str) -> GalleryResult<Image>;

    /// Nearest neighbors by cosine similarity over the owner's embedded
    /// rows, highest first, filtered by `threshold` and capped at `count`.
    async fn similar_images(
        &self,
        owner_id: &str,
        query: &[f32],
        threshold: f32,
        count: usize,
    ) -> GalleryResult<Vec<SearchMatch>>;
}

/// Content storage for original/thumbnail bytes, addressed by bucket + key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> GalleryResult<()>;

    async fn get(&self, bucket: &str, key: &str) -> GalleryResult<Vec<u8>>;

    async fn delete(&self, bucket: &str, key: &str) -> GalleryResult<()>;

    /// Temporary signed GET URL for one object.
    async fn signed_url(&self, bucket: &str, key: &str, ttl_secs: u64) -> GalleryResult<String>;
}

/// Remote vision-language model: image -> structured JSON, text -> vector.
///
/// Analysis and search must use the same implementation; embeddings from
/// different models or dimensions are not comparable.
#[async_trait]
pub trait Inference: Send + Sync {
    /// Analyze a JPEG-encoded image against the fixed prompt + strict
    /// schema. A response that does not conform is an `Inference` error.
    async fn analyze_image(&self, jpeg_bytes: &[u8]) -> GalleryResult<VisionAnalysis>;

    /// Embed free text into a fixed-dimension vector.
    async fn embed_text(&self, text: &str) -> GalleryResult<Vec<f32>>;

    /// Dimension every returned embedding must have.
    fn embedding_dimensions(&self) -> usize;
}

/// Cosine similarity of two vectors. Zero when either has zero norm or the
/// lengths differ (incomparable embeddings never match).
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.5, -1.0, 2.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_opposite_vectors_is_negative_one() {
        assert!((cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn mismatched_lengths_and_zero_norms_never_match() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
