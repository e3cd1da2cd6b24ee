use std::sync::Arc;

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::error::AppError;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Identity asserted by a verified Google ID token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    pub subject: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<String>,
}

#[derive(Clone)]
pub struct GoogleVerifier {
    client_id: Arc<String>,
    http: Client,
    endpoint: Arc<String>,
}

impl GoogleVerifier {
    pub fn new(client_id: String) -> Self {
        Self::with_endpoint(client_id, TOKENINFO_URL.to_string())
    }

    pub fn with_endpoint(client_id: String, endpoint: String) -> Self {
        Self {
            client_id: Arc::new(client_id),
            http: Client::new(),
            endpoint: Arc::new(endpoint),
        }
    }

    pub async fn verify(&self, credential: &str) -> Result<GoogleIdentity, AppError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(AppError::BadRequest("missing google credential".into()));
        }

        let resp = self
            .http
            .get(self.endpoint.as_str())
            .query(&[("id_token", credential)])
            .send()
            .await?;

        if !resp.status().is_success() {
            warn!("google tokeninfo rejected credential with status {}", resp.status());
            return Err(AppError::Unauthorized);
        }

        let info: TokenInfo = resp.json().await?;
        check_token_info(info, &self.client_id)
    }
}

fn check_token_info(info: TokenInfo, client_id: &str) -> Result<GoogleIdentity, AppError> {
    if info.aud != client_id {
        warn!("google credential issued for another client");
        return Err(AppError::Unauthorized);
    }
    if info.email_verified.as_deref() != Some("true") {
        return Err(AppError::Unauthorized);
    }
    let email = info
        .email
        .filter(|email| !email.trim().is_empty())
        .ok_or(AppError::Unauthorized)?;

    Ok(GoogleIdentity {
        subject: info.sub,
        email: email.trim().to_lowercase(),
    })
}
