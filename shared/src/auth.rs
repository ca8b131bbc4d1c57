//! Bearer-token identity.
//!
//! The identity provider is opaque to the pipelines: a valid access token
//! resolves to an owner id, anything else is a 401. Cognito's `GetUser`
//! validates the token server-side, so there is no local JWT handling.

use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use lambda_http::{http::StatusCode, Body, Response};

/// Identity resolved for one request
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
}

/// Resolve the `Authorization: Bearer` header to an owner identity.
/// Returns a ready-to-send 401 response when the header is missing,
/// malformed, or the token is rejected.
pub async fn authenticate_bearer_request(
    cognito_client: &CognitoClient,
    auth_header: Option<&str>,
) -> Result<AuthContext, Response<Body>> {
    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) if !token.is_empty() => token,
        _ => return Err(unauthorized_response()),
    };

    match cognito_client.get_user().access_token(token).send().await {
        Ok(user) => {
            // Prefer the stable subject id over the username
            let user_id = user
                .user_attributes()
                .iter()
                .find(|attr| attr.name() == "sub")
                .and_then(|attr| attr.value())
                .map(|v| v.to_string())
                .unwrap_or_else(|| user.username().to_string());

            Ok(AuthContext { user_id })
        }
        Err(e) => {
            tracing::warn!("Bearer token rejected: {}", e);
            Err(unauthorized_response())
        }
    }
}

fn unauthorized_response() -> Response<Body> {
    Response::builder()
        .status(StatusCode::UNAUTHORIZED)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(
            serde_json::json!({"error": "Unauthorized"})
                .to_string()
                .into(),
        )
        .unwrap_or_default()
}
