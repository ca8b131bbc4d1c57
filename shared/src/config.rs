//! Environment-driven application configuration.
//!
//! Defaults match the original deployment: gpt-4o vision analysis over a
//! 1536-px long edge, 1536-dimension ada-002 embeddings, cosine threshold
//! 0.8 with a 20-result cap, 500-px thumbnails.

use std::env;
use std::fmt::Debug;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub table_name: String,
    pub images_bucket: String,
    pub thumbnails_bucket: String,

    pub openai_api_key: Option<String>,
    pub chat_endpoint: String,
    pub embeddings_endpoint: String,
    pub vision_model: String,
    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub analysis_max_tokens: u32,

    pub match_threshold: f32,
    pub match_count: usize,

    pub thumbnail_bounding_box: u32,
    pub analysis_max_long_edge: u32,

    pub max_concurrent_analyses: usize,
    pub signed_url_ttl_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            table_name: env_or("TABLE_NAME", "glimpse"),
            images_bucket: env_or("IMAGES_BUCKET", "glimpse-images"),
            thumbnails_bucket: env_or("THUMBNAILS_BUCKET", "glimpse-thumbnails"),

            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            chat_endpoint: env_or(
                "OPENAI_CHAT_ENDPOINT",
                "https://api.openai.com/v1/chat/completions",
            ),
            embeddings_endpoint: env_or(
                "OPENAI_EMBEDDINGS_ENDPOINT",
                "https://api.openai.com/v1/embeddings",
            ),
            vision_model: env_or("VISION_MODEL", "gpt-4o"),
            embedding_model: env_or("EMBEDDING_MODEL", "text-embedding-ada-002"),
            embedding_dimensions: env_parse("EMBEDDING_DIMENSIONS", 1536),
            analysis_max_tokens: env_parse("ANALYSIS_MAX_TOKENS", 500),

            match_threshold: env_parse("MATCH_THRESHOLD", 0.8),
            match_count: env_parse("MATCH_COUNT", 20),

            thumbnail_bounding_box: env_parse("THUMBNAIL_BOUNDING_BOX", 500),
            analysis_max_long_edge: env_parse("ANALYSIS_MAX_LONG_EDGE", 1536),

            max_concurrent_analyses: env_parse("MAX_CONCURRENT_ANALYSES", 4),
            signed_url_ttl_secs: env_parse("SIGNED_URL_TTL_SECS", 3600),
        }
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T>(name: &str, default: T) -> T
where
    T: FromStr + Copy,
    T::Err: Debug,
{
    match env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Invalid {} value {:?} ({:?}), using default", name, raw, e);
                default
            }
        },
        Err(_) => default,
    }
}
