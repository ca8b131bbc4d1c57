use gallery_block::{analysis, images, search, trigger, upload, GalleryContext};
use glimpse_shared::{auth, AppState};
use lambda_http::{
    http::{Method, StatusCode},
    Body, Error, Request, RequestExt, Response,
};
use std::sync::Arc;

use lambda_http::http::header::HeaderValue;

fn with_cors_headers(mut resp: Response<Body>) -> Response<Body> {
    let headers = resp.headers_mut();
    headers.insert("Access-Control-Allow-Origin", HeaderValue::from_static("*"));
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET,POST,DELETE,OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type,Authorization"),
    );
    resp
}

fn finalize_response(resp: Result<Response<Body>, Error>) -> Result<Response<Body>, Error> {
    resp.map(with_cors_headers)
}

fn gallery_ctx(state: &AppState) -> GalleryContext<'_> {
    GalleryContext {
        metadata: &state.metadata,
        blobs: &state.blobs,
        inference: &state.inference,
        images_bucket: &state.config.images_bucket,
        thumbnails_bucket: &state.config.thumbnails_bucket,
        thumbnail_bounding_box: state.config.thumbnail_bounding_box,
        analysis_max_long_edge: state.config.analysis_max_long_edge,
        match_threshold: state.config.match_threshold,
        match_count: state.config.match_count,
        max_concurrent_analyses: state.config.max_concurrent_analyses,
        signed_url_ttl_secs: state.config.signed_url_ttl_secs,
    }
}

/// Main Lambda handler - routes requests to the gallery endpoints
pub(crate) async fn function_handler(
    event: Request,
    state: Arc<AppState>,
) -> Result<Response<Body>, Error> {
    let method = event.method();
    let path = event.uri().path();
    let body = event.body();
    tracing::info!("API Lambda invoked - Method: {} Path: {}", method, path);

    // Handle CORS preflight
    if method == "OPTIONS" {
        let resp = Response::builder()
            .status(StatusCode::OK)
            .body(Body::Empty)
            .map_err(Box::new)?;
        return Ok(with_cors_headers(resp));
    }

    // Every endpoint requires a bearer identity
    let auth_header = event
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok());

    let auth_ctx =
        match auth::authenticate_bearer_request(&state.cognito_client, auth_header).await {
            Ok(ctx) => ctx,
            Err(resp) => return Ok(with_cors_headers(resp)),
        };

    let user_id = auth_ctx.user_id.as_str();
    let ctx = gallery_ctx(&state);

    let query_param = |name: &str| -> Option<String> {
        event
            .query_string_parameters_ref()
            .and_then(|params| params.first(name))
            .map(|v| v.to_string())
    };

    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let resp = match (method, parts.as_slice()) {
        // --- IMAGES ---
        // GET /images - gallery listing; GET /images?id={id} - full row
        (&Method::GET, ["images"]) => match query_param("id") {
            Some(image_id) => images::get_image_handler(&ctx, user_id, &image_id).await,
            None => images::list_images_handler(&ctx, user_id).await,
        },
        // POST /images - insert one metadata row
        (&Method::POST, ["images"]) => images::create_image_handler(&ctx, user_id, body).await,
        // DELETE /images?id={id} - delete row + blobs
        (&Method::DELETE, ["images"]) => match query_param("id") {
            Some(image_id) => images::delete_image_handler(&ctx, user_id, &image_id).await,
            None => bad_request("Missing id query parameter"),
        },
        // POST /images/delete - bulk delete
        (&Method::POST, ["images", "delete"]) => {
            images::bulk_delete_handler(&ctx, user_id, body).await
        }

        // --- UPLOAD ---
        // POST /upload - run the upload pipeline
        (&Method::POST, ["upload"]) => upload::upload_handler(&ctx, user_id, body).await,

        // --- ANALYSIS ---
        // POST /analysis/trigger - batch trigger over waiting images
        (&Method::POST, ["analysis", "trigger"]) => {
            trigger::trigger_handler(&ctx, user_id).await
        }
        // POST /analysis - run the analysis pipeline once
        (&Method::POST, ["analysis"]) => {
            analysis::run_analysis_handler(&ctx, user_id, body).await
        }
        // GET /analysis?imageId={id} - persisted analysis rows
        (&Method::GET, ["analysis"]) => match query_param("imageId") {
            Some(image_id) => analysis::get_analysis_handler(&ctx, user_id, &image_id).await,
            None => bad_request("Missing imageId query parameter"),
        },
        // DELETE /analysis?id={id} - clear one image's analysis
        (&Method::DELETE, ["analysis"]) => match query_param("id") {
            Some(image_id) => analysis::delete_analysis_handler(&ctx, user_id, &image_id).await,
            None => bad_request("Missing id query parameter"),
        },

        // --- SEARCH ---
        // GET /search?q={text} - semantic search
        (&Method::GET, ["search"]) => {
            let q = query_param("q");
            search::search_handler(&ctx, user_id, q.as_deref()).await
        }

        _ => {
            tracing::warn!("No route matched - Method: {} Path: {}", method, path);
            not_found()
        }
    };

    finalize_response(resp)
}

fn bad_request(message: &str) -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::BAD_REQUEST)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": message}).to_string().into())
        .map_err(Box::new)?)
}

fn not_found() -> Result<Response<Body>, Error> {
    Ok(Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(serde_json::json!({"error": "Not found"}).to_string().into())
        .map_err(Box::new)?)
}
