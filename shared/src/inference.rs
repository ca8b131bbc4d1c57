//! OpenAI-compatible inference adapter.
//!
//! Two calls against any OpenAI-compatible API: a chat-completions vision
//! request with a fixed prompt and a strict JSON schema, and an embeddings
//! request. Analysis and search share this adapter so their vectors stay
//! comparable.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;

use glimpse_atoms::error::{GalleryError, GalleryResult};
use glimpse_atoms::images::model::VisionAnalysis;
use glimpse_atoms::store::Inference;

use crate::config::AppConfig;

/// Prompt sent with every analysis request
const ANALYSIS_PROMPT: &str = "\
Analyze this image and provide the following information:
1) Objects detected (including text, inanimate objects, people, landmarks),
2) Scene description,
3) Qualitative aspects (description of what the image is showing).
Does not use unnecessary words such as \"this image shows\" or \"the image is about\".
Use clauses instead of sentences.
";

pub struct OpenAiInference {
    client: reqwest::Client,
    chat_endpoint: String,
    embeddings_endpoint: String,
    vision_model: String,
    embedding_model: String,
    embedding_dimensions: usize,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiInference {
    pub fn new(config: &AppConfig) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let api_key = config
            .openai_api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok());

        if let Some(key) = &api_key {
            if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", key)) {
                headers.insert(AUTHORIZATION, value);
            }
        } else {
            tracing::warn!("No API key configured for {}", config.chat_endpoint);
        }

        let client = match reqwest::Client::builder().default_headers(headers).build() {
            Ok(client) => client,
            Err(e) => {
                tracing::error!("Failed to build inference HTTP client: {}", e);
                reqwest::Client::new()
            }
        };

        Self {
            client,
            chat_endpoint: config.chat_endpoint.clone(),
            embeddings_endpoint: config.embeddings_endpoint.clone(),
            vision_model: config.vision_model.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_dimensions: config.embedding_dimensions,
            max_tokens: config.analysis_max_tokens,
        }
    }
}

#[async_trait]
impl Inference for OpenAiInference {
    async fn analyze_image(&self, jpeg_bytes: &[u8]) -> GalleryResult<VisionAnalysis> {
        let image_base64 = BASE64.encode(jpeg_bytes);

        let body = serde_json::json!({
            "model": self.vision_model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": ANALYSIS_PROMPT },
                    { "type": "image_url", "image_url": {
                        "url": format!("data:image/jpeg;base64,{}", image_base64)
                    }},
                ],
            }],
            "max_tokens": self.max_tokens,
            "response_format": {
                "type": "json_schema",
                "json_schema": analysis_schema(),
            },
        });

        let response = self
            .client
            .post(&self.chat_endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| GalleryError::Inference(format!("Vision request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GalleryError::Inference(format!(
                "Vision API error ({}): {}",
                status, text
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| GalleryError::Inference(format!("Vision response parse error: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GalleryError::Inference("Vision response had no choices".to_string()))?;

        parse_analysis_content(&content)
    }

    async fn embed_text(&self, text: &str) -> GalleryResult<Vec<f32>> {
        let body = serde_json::json!({
            "model": self.embedding_model,
            "input": text,
        });

        let response = self
            .client
            .post(&self.embeddings_endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| GalleryError::Inference(format!("Embedding request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GalleryError::Inference(format!(
                "Embedding API error ({}): {}",
                status, text
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            GalleryError::Inference(format!("Embedding response parse error: {}", e))
        })?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| GalleryError::Inference("No embedding returned".to_string()))?;

        // Mismatched dimensions would poison the similarity index; treat as
        // deployment misconfiguration, never coerce.
        if embedding.len() != self.embedding_dimensions {
            return Err(GalleryError::Config(format!(
                "Embedding dimension mismatch: got {}, expected {}",
                embedding.len(),
                self.embedding_dimensions
            )));
        }

        Ok(embedding)
    }

    fn embedding_dimensions(&self) -> usize {
        self.embedding_dimensions
    }
}

/// Parse the model's message content against the strict schema types.
/// Nonconformant content is an inference failure.
fn parse_analysis_content(content: &str) -> GalleryResult<VisionAnalysis> {
    serde_json::from_str(content).map_err(|e| {
        GalleryError::Inference(format!("Response did not match analysis schema: {}", e))
    })
}

/// The strict response schema: object/text/people/landmark detection plus
/// scene and qualitative descriptions.
fn analysis_schema() -> serde_json::Value {
    serde_json::json!({
        "name": "image_analysis",
        "strict": true,
        "schema": {
            "type": "object",
            "properties": {
                "objects_detected": {
                    "type": "object",
                    "properties": {
                        "inanimate_objects": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Comprehensive list of noticeable inanimate objects detected in the image."
                        },
                        "text": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "List of text detected in the image."
                        },
                        "people": {
                            "type": "string",
                            "description": "Description of people detected in the image. If no people are detected, return an empty list."
                        },
                        "landmarks": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Keyword list of landmarks detected in the image."
                        }
                    },
                    "required": ["inanimate_objects", "text", "people", "landmarks"],
                    "additionalProperties": false
                },
                "scene_description": {
                    "type": "string",
                    "description": "A description of the scene in the image."
                },
                "qualitative_aspects": {
                    "type": "string",
                    "description": "A description of the qualitative aspects and overall impression of the image."
                }
            },
            "required": ["objects_detected", "scene_description", "qualitative_aspects"],
            "additionalProperties": false
        }
    })
}
