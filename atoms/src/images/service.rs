use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::{GalleryError, GalleryResult};
use crate::store::{cosine_similarity, MetadataStore};

use super::model::{
    AnalysisStatus, Image, NewImageRecord, ObjectsDetected, SearchMatch, VisionAnalysis,
};

/// DynamoDB-backed metadata store.
///
/// One row per image under `PK = USER#{user_id}`, `SK = IMAGE#{image_id}`.
/// Analysis results live as attributes on the image row so one `update_item`
/// commits the embedding and all structured fields together. The embedding
/// is a JSON-encoded string attribute; similarity search ranks the owner's
/// embedded rows by cosine in the adapter since DynamoDB has no native
/// nearest-neighbor query.
pub struct DynamoMetadataStore {
    client: DynamoClient,
    table_name: String,
}

impl DynamoMetadataStore {
    pub fn new(client: DynamoClient, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    async fn query_owner_images(&self, owner_id: &str) -> GalleryResult<Vec<Image>> {
        let pk = format!("USER#{}", owner_id);

        let result = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("PK = :pk AND begins_with(SK, :sk_prefix)")
            .expression_attribute_values(":pk", AttributeValue::S(pk))
            .expression_attribute_values(":sk_prefix", AttributeValue::S("IMAGE#".to_string()))
            .send()
            .await
            .map_err(|e| GalleryError::Metadata(format!("DynamoDB query error: {}", e)))?;

        let mut images = Vec::new();
        for item in result.items() {
            if let Some(image) = parse_image(owner_id, item) {
                images.push(image);
            }
        }
        Ok(images)
    }
}

#[async_trait]
impl MetadataStore for DynamoMetadataStore {
    async fn insert_image(&self, owner_id: &str, record: NewImageRecord) -> GalleryResult<Image> {
        let image_id = uuid::Uuid::new_v4().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let pk = format!("USER#{}", owner_id);
        let sk = format!("IMAGE#{}", image_id);

        self.client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(pk))
            .item("SK", AttributeValue::S(sk))
            .item("file_path", AttributeValue::S(record.file_path.clone()))
            .item("thumbnail_path", AttributeValue::S(record.thumbnail_path.clone()))
            .item("file_name", AttributeValue::S(record.file_name.clone()))
            .item("file_size", AttributeValue::N(record.file_size.to_string()))
            .item("mime_type", AttributeValue::S(record.mime_type.clone()))
            .item("uploaded_at", AttributeValue::S(now.clone()))
            .item("aspect_ratio", AttributeValue::N(record.aspect_ratio.to_string()))
            .item(
                "analysis_status",
                AttributeValue::S(AnalysisStatus::Unprocessed.as_str().to_string()),
            )
            .send()
            .await
            .map_err(|e| GalleryError::Metadata(format!("DynamoDB put_item error: {}", e)))?;

        Ok(Image {
            image_id,
            user_id: owner_id.to_string(),
            file_path: record.file_path,
            thumbnail_path: record.thumbnail_path,
            file_name: record.file_name,
            file_size: record.file_size,
            mime_type: record.mime_type,
            uploaded_at: now,
            aspect_ratio: record.aspect_ratio,
            analysis_status: AnalysisStatus::Unprocessed,
            last_analyzed: None,
            embedding: None,
            analysis: None,
        })
    }

    async fn get_image(&self, owner_id: &str, image_id: &str) -> GalleryResult<Image> {
        let pk = format!("USER#{}", owner_id);
        let sk = format!("IMAGE#{}", image_id);

        let result = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk))
            .key("SK", AttributeValue::S(sk))
            .send()
            .await
            .map_err(|e| GalleryError::Metadata(format!("DynamoDB get_item error: {}", e)))?;

        match result.item() {
            Some(item) => parse_image(owner_id, item)
                .ok_or_else(|| GalleryError::Metadata(format!("Malformed image row {}", image_id))),
            None => Err(GalleryError::NotFound(format!("Image {}", image_id))),
        }
    }

    async fn list_images(&self, owner_id: &str) -> GalleryResult<Vec<Image>> {
        let mut images = self.query_owner_images(owner_id).await?;
        // RFC 3339 timestamps sort lexicographically
        images.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(images)
    }

    async fn list_by_status(
        &self,
        owner_id: &str,
        statuses: &[AnalysisStatus],
    ) -> GalleryResult<Vec<Image>> {
        let images = self.query_owner_images(owner_id).await?;
        Ok(images
            .into_iter()
            .filter(|img| statuses.contains(&img.analysis_status))
            .collect())
    }

    async fn claim_for_analysis(&self, owner_id: &str, image_id: &str) -> GalleryResult<()> {
        let pk = format!("USER#{}", owner_id);
        let sk = format!("IMAGE#{}", image_id);

        let result = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk))
            .key("SK", AttributeValue::S(sk))
            .update_expression("SET analysis_status = :pending")
            .condition_expression("attribute_exists(SK) AND analysis_status <> :pending")
            .expression_attribute_values(
                ":pending",
                AttributeValue::S(AnalysisStatus::Pending.as_str().to_string()),
            )
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if e.as_service_error()
                    .map(|se| se.is_conditional_check_failed_exception())
                    .unwrap_or(false)
                {
                    // A missing row and a concurrently pending row both fail
                    // the condition; disambiguate with a read.
                    match self.get_image(owner_id, image_id).await {
                        Ok(_) => Err(GalleryError::Conflict(format!(
                            "Image {} is already being analyzed",
                            image_id
                        ))),
                        Err(GalleryError::NotFound(m)) => Err(GalleryError::NotFound(m)),
                        Err(other) => Err(other),
                    }
                } else {
                    Err(GalleryError::Metadata(format!(
                        "DynamoDB update_item error: {}",
                        e
                    )))
                }
            }
        }
    }

    async fn set_status(
        &self,
        owner_id: &str,
        image_id: &str,
        status: AnalysisStatus,
    ) -> GalleryResult<()> {
        let pk = format!("USER#{}", owner_id);
        let sk = format!("IMAGE#{}", image_id);

        self.client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk))
            .key("SK", AttributeValue::S(sk))
            .update_expression("SET analysis_status = :status")
            .condition_expression("attribute_exists(SK)")
            .expression_attribute_values(
                ":status",
                AttributeValue::S(status.as_str().to_string()),
            )
            .send()
            .await
            .map_err(|e| GalleryError::Metadata(format!("DynamoDB update_item error: {}", e)))?;

        Ok(())
    }

    async fn save_analysis(
        &self,
        owner_id: &str,
        image_id: &str,
        analysis: &VisionAnalysis,
        embedding: &[f32],
    ) -> GalleryResult<()> {
        let pk = format!("USER#{}", owner_id);
        let sk = format!("IMAGE#{}", image_id);
        let now = chrono::Utc::now().to_rfc3339();

        let embedding_json = serde_json::to_string(embedding)
            .map_err(|e| GalleryError::Metadata(format!("Embedding encode error: {}", e)))?;
        let objects_json = serde_json::to_string(&analysis.objects_detected)
            .map_err(|e| GalleryError::Metadata(format!("Objects encode error: {}", e)))?;

        self.client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk))
            .key("SK", AttributeValue::S(sk))
            .update_expression(
                "SET embedding = :embedding, objects = :objects, scene = :scene, \
                 description = :description, last_analyzed = :last_analyzed",
            )
            .condition_expression("attribute_exists(SK)")
            .expression_attribute_values(":embedding", AttributeValue::S(embedding_json))
            .expression_attribute_values(":objects", AttributeValue::S(objects_json))
            .expression_attribute_values(
                ":scene",
                AttributeValue::S(analysis.scene_description.clone()),
            )
            .expression_attribute_values(
                ":description",
                AttributeValue::S(analysis.qualitative_aspects.clone()),
            )
            .expression_attribute_values(":last_analyzed", AttributeValue::S(now))
            .send()
            .await
            .map_err(|e| GalleryError::Metadata(format!("DynamoDB update_item error: {}", e)))?;

        Ok(())
    }

    async fn clear_analysis(&self, owner_id: &str, image_id: &str) -> GalleryResult<()> {
        let pk = format!("USER#{}", owner_id);
        let sk = format!("IMAGE#{}", image_id);

        self.client
            .update_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk))
            .key("SK", AttributeValue::S(sk))
            .update_expression(
                "REMOVE embedding, objects, scene, description, last_analyzed \
                 SET analysis_status = :unprocessed",
            )
            .condition_expression("attribute_exists(SK)")
            .expression_attribute_values(
                ":unprocessed",
                AttributeValue::S(AnalysisStatus::Unprocessed.as_str().to_string()),
            )
            .send()
            .await
            .map_err(|e| GalleryError::Metadata(format!("DynamoDB update_item error: {}", e)))?;

        Ok(())
    }

    async fn delete_image(&self, owner_id: &str, image_id: &str) -> GalleryResult<Image> {
        let image = self.get_image(owner_id, image_id).await?;

        let pk = format!("USER#{}", owner_id);
        let sk = format!("IMAGE#{}", image_id);

        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key("PK", AttributeValue::S(pk))
            .key("SK", AttributeValue::S(sk))
            .send()
            .await
            .map_err(|e| GalleryError::Metadata(format!("DynamoDB delete_item error: {}", e)))?;

        Ok(image)
    }

    async fn similar_images(
        &self,
        owner_id: &str,
        query: &[f32],
        threshold: f32,
        count: usize,
    ) -> GalleryResult<Vec<SearchMatch>> {
        let images = self.query_owner_images(owner_id).await?;

        let mut matches: Vec<SearchMatch> = images
            .into_iter()
            .filter_map(|image| {
                let similarity = cosine_similarity(image.embedding.as_deref()?, query);
                (similarity >= threshold).then_some(SearchMatch { image, similarity })
            })
            .collect();

        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        matches.truncate(count);
        Ok(matches)
    }
}

fn parse_image(owner_id: &str, item: &HashMap<String, AttributeValue>) -> Option<Image> {
    let sk = item.get("SK").and_then(|v| v.as_s().ok())?;
    let image_id = sk.strip_prefix("IMAGE#")?;

    let analysis_status = item
        .get("analysis_status")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| AnalysisStatus::parse(s))
        .unwrap_or(AnalysisStatus::Unprocessed);

    let embedding: Option<Vec<f32>> = item
        .get("embedding")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| serde_json::from_str(s).ok());

    let objects: Option<ObjectsDetected> = item
        .get("objects")
        .and_then(|v| v.as_s().ok())
        .and_then(|s| serde_json::from_str(s).ok());

    // The structured fields are committed together, so an image either has a
    // full analysis or none.
    let analysis = objects.map(|objects_detected| VisionAnalysis {
        objects_detected,
        scene_description: item
            .get("scene")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        qualitative_aspects: item
            .get("description")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
    });

    Some(Image {
        image_id: image_id.to_string(),
        user_id: owner_id.to_string(),
        file_path: item
            .get("file_path")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        thumbnail_path: item
            .get("thumbnail_path")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        file_name: item
            .get("file_name")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        file_size: item
            .get("file_size")
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse().ok())
            .unwrap_or(0),
        mime_type: item
            .get("mime_type")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        uploaded_at: item
            .get("uploaded_at")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .unwrap_or_default(),
        aspect_ratio: item
            .get("aspect_ratio")
            .and_then(|v| v.as_n().ok())
            .and_then(|n| n.parse().ok())
            .unwrap_or(1.0),
        analysis_status,
        last_analyzed: item
            .get("last_analyzed")
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string()),
        embedding,
        analysis,
    })
}
