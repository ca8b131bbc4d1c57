mod http_handler;

use std::sync::Arc;

use aws_config::BehaviorVersion;
use glimpse_shared::{AppConfig, AppState};
use lambda_http::{run, service_fn, tracing, Error};

use http_handler::function_handler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = AppConfig::from_env();
    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let state = Arc::new(AppState::new(&sdk_config, config));

    run(service_fn(move |event| {
        let state = Arc::clone(&state);
        async move { function_handler(event, state).await }
    }))
    .await
}
