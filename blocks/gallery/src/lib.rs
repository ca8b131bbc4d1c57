//! Gallery feature block: upload, analysis, batch trigger, search and the
//! /images handlers. Pipelines run against injected adapter instances
//! ([`GalleryContext`]) so the HTTP layer and the tests share one code path.

pub mod analysis;
pub mod images;
pub mod search;
pub mod trigger;
pub mod upload;

use glimpse_atoms::error::GalleryError;
use glimpse_atoms::store::{BlobStore, Inference, MetadataStore};
use lambda_http::{http::StatusCode, Body, Error, Response};
use serde::Serialize;

/// Adapter instances plus the configuration one request needs. Built from
/// `AppState` in the Lambda, from in-memory fakes in tests.
pub struct GalleryContext<'a> {
    pub metadata: &'a dyn MetadataStore,
    pub blobs: &'a dyn BlobStore,
    pub inference: &'a dyn Inference,

    pub images_bucket: &'a str,
    pub thumbnails_bucket: &'a str,

    pub thumbnail_bounding_box: u32,
    pub analysis_max_long_edge: u32,
    pub match_threshold: f32,
    pub match_count: usize,
    pub max_concurrent_analyses: usize,
    pub signed_url_ttl_secs: u64,
}

pub(crate) fn json_response<T: Serialize>(
    status: StatusCode,
    value: &T,
) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::to_string(value)?.into())
        .map_err(Box::new)?)
}

pub(crate) fn error_response(e: &GalleryError) -> Result<Response<Body>, Error> {
    let status =
        StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    Ok(Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({ "error": e.to_string() }).to_string().into())
        .map_err(Box::new)?)
}
