//! Firebase Auth admin lookup via the Identity Toolkit v1 `accounts:lookup`
//! endpoint. With an admin bearer token a handle with no account comes back
//! as an empty user list (older deployments answer 400 EMAIL_NOT_FOUND);
//! both classify as `Lookup::NotFound` rather than an error.
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use super::gauth::TokenProvider;
use super::truncate_for_log;
use crate::store::{IdentityProvider, Lookup};

#[derive(Clone)]
pub struct FirebaseAuthClient {
    base_url: String,
    http: Client,
    tokens: Arc<TokenProvider>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
struct LookupUser {
    #[serde(rename = "localId")]
    local_id: String,
}

impl FirebaseAuthClient {
    pub fn new(
        tokens: Arc<TokenProvider>,
        base_url: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let base_url = base_url
            .unwrap_or("https://identitytoolkit.googleapis.com/v1")
            .trim_end_matches('/')
            .to_string();
        let http = Client::builder()
            .user_agent("fireseed/0.1")
            .timeout(Duration::from_secs(timeout_secs.unwrap_or(30)))
            .build()?;
        Ok(Self {
            base_url,
            http,
            tokens,
        })
    }
}

#[async_trait::async_trait]
impl IdentityProvider for FirebaseAuthClient {
    async fn lookup_by_email(&self, email: &str) -> Result<Lookup> {
        let url = format!("{}/accounts:lookup", self.base_url);
        let bearer = self.tokens.bearer().await?;

        let resp = self
            .http
            .post(&url)
            .bearer_auth(bearer)
            .json(&json!({ "email": [email] }))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            if is_email_not_found(&body) {
                return Ok(Lookup::NotFound);
            }
            let body = truncate_for_log(body, 2000);
            return Err(anyhow!(
                "identity lookup failed: {status} url={url} body={body}"
            ));
        }

        let body: LookupResponse = resp.json().await?;
        Ok(classify(body))
    }
}

fn classify(resp: LookupResponse) -> Lookup {
    match resp.users.into_iter().next() {
        Some(user) => Lookup::Resolved(user.local_id),
        None => Lookup::NotFound,
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: Option<String>,
}

fn is_email_not_found(body: &str) -> bool {
    let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) else {
        return false;
    };
    parsed
        .error
        .and_then(|e| e.message)
        // Messages arrive bare or with a suffix ("EMAIL_NOT_FOUND : ...").
        .is_some_and(|m| m.starts_with("EMAIL_NOT_FOUND"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_the_first_matching_account() {
        let resp: LookupResponse = serde_json::from_str(
            r#"{"kind":"identitytoolkit#GetAccountInfoResponse",
                "users":[{"localId":"uid123","email":"ana@example.com"}]}"#,
        )
        .unwrap();
        assert_eq!(classify(resp), Lookup::Resolved("uid123".into()));
    }

    #[test]
    fn empty_user_list_is_not_found() {
        let resp: LookupResponse =
            serde_json::from_str(r#"{"kind":"identitytoolkit#GetAccountInfoResponse"}"#).unwrap();
        assert_eq!(classify(resp), Lookup::NotFound);
    }

    #[test]
    fn email_not_found_error_bodies_are_recognized() {
        assert!(is_email_not_found(
            r#"{"error":{"code":400,"message":"EMAIL_NOT_FOUND"}}"#
        ));
        assert!(is_email_not_found(
            r#"{"error":{"message":"EMAIL_NOT_FOUND : no account"}}"#
        ));
        assert!(!is_email_not_found(
            r#"{"error":{"code":403,"message":"PERMISSION_DENIED"}}"#
        ));
        assert!(!is_email_not_found("not even json"));
    }

    #[tokio::test]
    #[ignore] // Requires a live service-account key in GOOGLE_APPLICATION_CREDENTIALS
    async fn looks_up_against_the_real_service() {
        use crate::remote::gauth::{ServiceAccountKey, TokenProvider, IDENTITY_SCOPE};
        use std::path::Path;

        let path = std::env::var("GOOGLE_APPLICATION_CREDENTIALS").unwrap();
        let key = ServiceAccountKey::from_path(Path::new(&path)).unwrap();
        let tokens = Arc::new(TokenProvider::new(key, &[IDENTITY_SCOPE]).unwrap());
        let client = FirebaseAuthClient::new(tokens, None, None).unwrap();
        let lookup = client
            .lookup_by_email("nobody@nowhere.invalid")
            .await
            .unwrap();
        assert_eq!(lookup, Lookup::NotFound);
    }
}
