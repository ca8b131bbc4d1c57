pub mod auth;
pub mod config;
pub mod inference;

pub use config::AppConfig;

use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_dynamodb::Client as DynamoClient;
use aws_sdk_s3::Client as S3Client;

use glimpse_atoms::blobs::S3BlobStore;
use glimpse_atoms::images::DynamoMetadataStore;
use inference::OpenAiInference;

/// Shared clients and adapters, built once at cold start and passed by
/// reference into every request.
pub struct AppState {
    pub metadata: DynamoMetadataStore,
    pub blobs: S3BlobStore,
    pub inference: OpenAiInference,
    pub cognito_client: CognitoClient,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(sdk_config: &aws_config::SdkConfig, config: AppConfig) -> Self {
        let dynamo_client = DynamoClient::new(sdk_config);
        let s3_client = S3Client::new(sdk_config);
        let cognito_client = CognitoClient::new(sdk_config);

        Self {
            metadata: DynamoMetadataStore::new(dynamo_client, config.table_name.clone()),
            blobs: S3BlobStore::new(s3_client),
            inference: OpenAiInference::new(&config),
            cognito_client,
            config,
        }
    }
}
