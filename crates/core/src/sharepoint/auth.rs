//! Azure AD client-credentials token acquisition.
//!
//! One sync run needs two bearer tokens from the same app registration:
//! one scoped to Microsoft Graph (list item operations) and one scoped to
//! the SharePoint host itself (the REST attachment endpoint).

use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::config::AzureConfig;
use crate::errors::AuthError;

/// Graph API scope for list and item operations.
pub const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Token endpoint response. Error responses carry `error_description`
/// instead of a token.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error_description: Option<String>,
}

/// Confidential-client token acquirer.
#[derive(Clone)]
pub struct TokenClient {
    http: reqwest::Client,
    authority: String,
    client_id: String,
    client_secret: String,
}

impl TokenClient {
    pub fn new(config: &AzureConfig) -> Self {
        let authority = format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            config.tenant_id
        );
        let http = reqwest::Client::builder()
            .build()
            .expect("failed to build reqwest client");
        info!(tenant_id = %config.tenant_id, "created TokenClient");
        Self {
            http,
            authority,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone().unwrap_or_default(),
        }
    }

    /// Acquire a bearer token for the given scope.
    #[instrument(skip(self))]
    pub async fn acquire(&self, scope: &str) -> Result<String, AuthError> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", scope),
        ];

        let resp = self.http.post(&self.authority).form(&params).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::TokenRequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = resp.json().await?;
        match token.access_token {
            Some(t) => {
                debug!(scope, "acquired access token");
                Ok(t)
            }
            None => Err(AuthError::TokenMissing {
                scope: scope.to_string(),
                detail: token
                    .error_description
                    .unwrap_or_else(|| "no error description".into()),
            }),
        }
    }
}

/// SharePoint REST scope for a given SharePoint hostname.
pub fn sharepoint_rest_scope(hostname: &str) -> String {
    format!("https://{hostname}/.default")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_success() {
        let json = r#"{"token_type": "Bearer", "expires_in": 3599, "access_token": "eyJ0eXAi"}"#;
        let resp: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.access_token.as_deref(), Some("eyJ0eXAi"));
        assert!(resp.error_description.is_none());
    }

    #[test]
    fn test_token_response_error() {
        let json = r#"{"error": "invalid_client", "error_description": "AADSTS7000215: Invalid client secret provided."}"#;
        let resp: TokenResponse = serde_json::from_str(json).unwrap();
        assert!(resp.access_token.is_none());
        assert!(resp
            .error_description
            .unwrap()
            .contains("Invalid client secret"));
    }

    #[test]
    fn test_sharepoint_rest_scope() {
        assert_eq!(
            sharepoint_rest_scope("acme.sharepoint.com"),
            "https://acme.sharepoint.com/.default"
        );
    }
}
