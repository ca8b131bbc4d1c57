//! Free-text semantic search over the owner's collection.

use lambda_http::{http::StatusCode, Body, Error, Response};

use glimpse_atoms::error::{GalleryError, GalleryResult};
use glimpse_atoms::images::model::SearchMatch;

use crate::{error_response, json_response, GalleryContext};

/// Embed the query with the same model the analysis pipeline uses and ask
/// the metadata store for the owner's nearest neighbors above the
/// configured threshold, highest similarity first.
pub async fn search_images(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
    query: &str,
) -> GalleryResult<Vec<SearchMatch>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(GalleryError::Validation(
            "Query parameter is required".to_string(),
        ));
    }

    let embedding = ctx.inference.embed_text(query).await?;

    ctx.metadata
        .similar_images(owner_id, &embedding, ctx.match_threshold, ctx.match_count)
        .await
}

/// HTTP Handler: GET /search?q={text}
pub async fn search_handler(
    ctx: &GalleryContext<'_>,
    owner_id: &str,
    query: Option<&str>,
) -> Result<Response<Body>, Error> {
    match search_images(ctx, owner_id, query.unwrap_or_default()).await {
        Ok(matches) => {
            tracing::info!("Search for {} returned {} matches", owner_id, matches.len());
            json_response(StatusCode::OK, &matches)
        }
        Err(e) => error_response(&e),
    }
}
