use serde::{Deserialize, Serialize};

/// Lifecycle of one image through the analysis pipeline.
///
/// `unprocessed`/`failed`/`complete` --claim--> `pending` --success--> `complete`;
/// `pending` --any error--> `failed`. Modeled as a closed enum so an invalid
/// status cannot be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Unprocessed,
    Pending,
    Complete,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStatus::Unprocessed => "unprocessed",
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Complete => "complete",
            AnalysisStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unprocessed" => Some(AnalysisStatus::Unprocessed),
            "pending" => Some(AnalysisStatus::Pending),
            "complete" => Some(AnalysisStatus::Complete),
            "failed" => Some(AnalysisStatus::Failed),
            _ => None,
        }
    }
}

/// Object-detection section of the vision model's structured response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectsDetected {
    pub inanimate_objects: Vec<String>,
    pub text: Vec<String>,
    pub people: String,
    pub landmarks: Vec<String>,
}

/// One successful analysis run's structured output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisionAnalysis {
    pub objects_detected: ObjectsDetected,
    pub scene_description: String,
    pub qualitative_aspects: String,
}

impl VisionAnalysis {
    /// Concatenate the non-empty structured fields in a fixed order. The
    /// result is what gets embedded, so the order must stay stable across
    /// runs for idempotent re-analysis.
    pub fn flattened_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();

        if !self.objects_detected.inanimate_objects.is_empty() {
            parts.push(self.objects_detected.inanimate_objects.join(", "));
        }
        if !self.objects_detected.text.is_empty() {
            parts.push(self.objects_detected.text.join(", "));
        }
        if !self.objects_detected.people.is_empty() {
            parts.push(self.objects_detected.people.clone());
        }
        if !self.objects_detected.landmarks.is_empty() {
            parts.push(self.objects_detected.landmarks.join(", "));
        }
        if !self.scene_description.is_empty() {
            parts.push(self.scene_description.clone());
        }
        if !self.qualitative_aspects.is_empty() {
            parts.push(self.qualitative_aspects.clone());
        }

        parts.join(". ")
    }
}

/// Image domain model - one uploaded photo and everything derived from it
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Image {
    pub image_id: String,
    pub user_id: String,
    pub file_path: String,
    pub thumbnail_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub uploaded_at: String,
    pub aspect_ratio: f64,
    pub analysis_status: AnalysisStatus,
    pub last_analyzed: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub analysis: Option<VisionAnalysis>,
}

/// Fields needed to insert a new image row; id and timestamp are assigned
/// by the metadata store.
#[derive(Debug, Clone)]
pub struct NewImageRecord {
    pub file_path: String,
    pub thumbnail_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    pub aspect_ratio: f64,
}

/// Payload for POST /images (metadata row insert split from the upload path)
#[derive(Debug, Deserialize)]
pub struct CreateImagePayload {
    pub file_path: String,
    #[serde(default)]
    pub thumbnail_path: String,
    pub file_name: String,
    pub file_size: i64,
    pub mime_type: String,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: f64,
}

fn default_aspect_ratio() -> f64 {
    1.0
}

/// One ranked result of the similarity search
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    #[serde(flatten)]
    pub image: Image,
    pub similarity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            AnalysisStatus::Unprocessed,
            AnalysisStatus::Pending,
            AnalysisStatus::Complete,
            AnalysisStatus::Failed,
        ] {
            assert_eq!(AnalysisStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(AnalysisStatus::parse("processing"), None);
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&AnalysisStatus::Unprocessed).unwrap();
        assert_eq!(json, "\"unprocessed\"");
        let back: AnalysisStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(back, AnalysisStatus::Failed);
    }

    #[test]
    fn flattened_text_keeps_field_order() {
        let analysis = VisionAnalysis {
            objects_detected: ObjectsDetected {
                inanimate_objects: vec!["bench".into(), "umbrella".into()],
                text: vec!["Cafe Roma".into()],
                people: "two people walking".into(),
                landmarks: vec!["Eiffel Tower".into()],
            },
            scene_description: "busy city square".into(),
            qualitative_aspects: "warm evening light".into(),
        };

        assert_eq!(
            analysis.flattened_text(),
            "bench, umbrella. Cafe Roma. two people walking. Eiffel Tower. \
             busy city square. warm evening light"
        );
    }

    #[test]
    fn flattened_text_skips_empty_parts() {
        let analysis = VisionAnalysis {
            objects_detected: ObjectsDetected {
                inanimate_objects: vec![],
                text: vec![],
                people: String::new(),
                landmarks: vec!["Golden Gate Bridge".into()],
            },
            scene_description: "fog over the bay".into(),
            qualitative_aspects: String::new(),
        };

        assert_eq!(analysis.flattened_text(), "Golden Gate Bridge. fog over the bay");
    }

    #[test]
    fn flattened_text_of_empty_analysis_is_empty() {
        assert_eq!(VisionAnalysis::default().flattened_text(), "");
    }
}
