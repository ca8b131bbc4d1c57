//! Batch trigger: fan out analysis runs over every image still waiting.
//!
//! Selects both `unprocessed` and `failed` rows so failed runs are retried
//! without a manual reset. Concurrency is bounded by a semaphore sized to
//! the inference provider's tolerance; each run makes 2-4 sequential network
//! calls, so unbounded fan-out would stampede the provider.

use std::sync::Arc;

use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;
use tokio::sync::Semaphore;

use glimpse_atoms::error::{GalleryError, GalleryResult};
use glimpse_atoms::images::model::AnalysisStatus;

use crate::analysis::run_analysis;
use crate::{error_response, json_response, GalleryContext};

#[derive(Debug, Serialize)]
pub struct TriggerOutcome {
    pub image_id: String,
    pub status: AnalysisStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TriggerResult {
    pub triggered: usize,
    pub outcomes: Vec<TriggerOutcome>,
}

/// Run the analysis pipeline over every waiting image of one owner.
/// Individual failures are attached to the result by image id; only the
/// initial listing query fails the batch outright.
pub async fn trigger_batch(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
) -> GalleryResult<TriggerResult> {
    let waiting = ctx
        .metadata
        .list_by_status(
            owner_id,
            &[AnalysisStatus::Unprocessed, AnalysisStatus::Failed],
        )
        .await?;

    let semaphore = Arc::new(Semaphore::new(ctx.max_concurrent_analyses.max(1)));

    let tasks = waiting.iter().map(|image| {
        let semaphore = Arc::clone(&semaphore);
        let image_id = image.image_id.clone();
        async move {
            // The semaphore is never closed; acquire only fails then
            let _permit = semaphore.acquire().await;

            match run_analysis(ctx, owner_id, &image_id).await {
                Ok(done) => TriggerOutcome {
                    image_id,
                    status: done.analysis_status,
                    error: None,
                },
                Err(e) => {
                    // A claim conflict means another run holds the image, so
                    // the row is still `pending`, not `failed`
                    let status = match &e {
                        GalleryError::Conflict(_) => AnalysisStatus::Pending,
                        _ => AnalysisStatus::Failed,
                    };
                    TriggerOutcome {
                        image_id,
                        status,
                        error: Some(e.to_string()),
                    }
                }
            }
        }
    });

    let outcomes = futures::future::join_all(tasks).await;

    Ok(TriggerResult {
        triggered: outcomes.len(),
        outcomes,
    })
}

/// HTTP Handler: POST /analysis/trigger
pub async fn trigger_handler(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
) -> Result<Response<Body>, Error> {
    match trigger_batch(ctx, owner_id).await {
        Ok(result) => {
            let failed = result.outcomes.iter().filter(|o| o.error.is_some()).count();
            tracing::info!(
                "Batch trigger for {}: {} triggered, {} failed",
                owner_id,
                result.triggered,
                failed
            );
            json_response(
                StatusCode::OK,
                &serde_json::json!({
                    "message": format!("Analysis triggered for {} images", result.triggered),
                    "triggered": result.triggered,
                    "outcomes": result.outcomes,
                }),
            )
        }
        Err(e) => {
            tracing::error!("Batch trigger listing failed for {}: {}", owner_id, e);
            error_response(&e)
        }
    }
}
