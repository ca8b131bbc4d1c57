// Re-export model types and the DynamoDB-backed store
pub mod model;
pub mod service;

pub use model::{
    AnalysisStatus, CreateImagePayload, Image, NewImageRecord, ObjectsDetected, SearchMatch,
    VisionAnalysis,
};
pub use service::DynamoMetadataStore;
