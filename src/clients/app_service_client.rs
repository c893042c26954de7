use chrono::{Duration, Utc};
use futures_util::future::{BoxFuture, FutureExt};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::GridContent;
use super::{ClientError, ContentLoader, FilePersistence, PermissionDecision, PermissionOracle, UserDirectory};

/// HTTP client for the application backend that owns users, files and shares.
#[derive(Debug)]
pub struct AppServiceClient {
    client: Client,
    base_url: String,
    jwt_secret: Option<String>,
    service_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "type")]
    type_: String,
    exp: usize,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    username: String,
}

impl AppServiceClient {
    pub fn new(base_url: String, jwt_secret: Option<String>, service_name: String) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        info!("App service client targeting {}", base_url);
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            jwt_secret,
            service_name,
        })
    }

    fn generate_token(&self, secret: &str) -> Result<String, ClientError> {
        let expiration = (Utc::now() + Duration::seconds(60)).timestamp(); // 1 minute expiration

        let claims = Claims {
            sub: self.service_name.clone(),
            type_: "service".to_string(),
            exp: expiration as usize,
        };

        Ok(encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))?)
    }

    /// Attach a service token when a secret is configured.
    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, ClientError> {
        match &self.jwt_secret {
            Some(secret) => {
                let token = self.generate_token(secret)?;
                Ok(request.bearer_auth(token))
            }
            None => Ok(request),
        }
    }

    pub async fn get_permissions(
        &self,
        editor_id: &str,
        document_id: &str,
        share_token: Option<&str>,
    ) -> Result<PermissionDecision, ClientError> {
        let url = format!("{}/internal/files/{}/permissions", self.base_url, document_id);
        let mut query = vec![("userId", editor_id)];
        if let Some(token) = share_token {
            query.push(("shareCode", token));
        }

        let decision = self
            .authorized(self.client.get(&url).query(&query))?
            .send()
            .await?
            .error_for_status()?
            .json::<PermissionDecision>()
            .await?;
        debug!("Permissions of {} on {}: {:?}", editor_id, document_id, decision);
        Ok(decision)
    }

    pub async fn get_username(&self, editor_id: &str) -> Result<Option<String>, ClientError> {
        let url = format!("{}/internal/users/{}", self.base_url, editor_id);
        let response = self.authorized(self.client.get(&url))?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let user = response.error_for_status()?.json::<UserResponse>().await?;
        Ok(Some(user.username))
    }

    pub async fn get_cells(&self, document_id: &str) -> Result<Option<GridContent>, ClientError> {
        let url = format!("{}/internal/files/{}/cells", self.base_url, document_id);
        let response = self.authorized(self.client.get(&url))?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.json::<GridContent>().await?))
    }

    pub async fn put_cells(&self, document_id: &str, editor_id: &str, content: &GridContent) -> Result<(), ClientError> {
        let url = format!("{}/internal/files/{}/cells", self.base_url, document_id);
        self.authorized(self.client.put(&url).query(&[("userId", editor_id)]).json(content))?
            .send()
            .await?
            .error_for_status()?;
        info!("Saved {} cells of document {}", content.cell_count(), document_id);
        Ok(())
    }
}

impl PermissionOracle for AppServiceClient {
    fn check<'a>(
        &'a self,
        editor_id: &'a str,
        document_id: &'a str,
        share_token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<PermissionDecision, ClientError>> {
        self.get_permissions(editor_id, document_id, share_token).boxed()
    }
}

impl UserDirectory for AppServiceClient {
    fn username<'a>(&'a self, editor_id: &'a str) -> BoxFuture<'a, Result<Option<String>, ClientError>> {
        self.get_username(editor_id).boxed()
    }
}

impl ContentLoader for AppServiceClient {
    fn load_snapshot<'a>(&'a self, document_id: &'a str) -> BoxFuture<'a, Result<Option<GridContent>, ClientError>> {
        self.get_cells(document_id).boxed()
    }
}

impl FilePersistence for AppServiceClient {
    fn save<'a>(
        &'a self,
        document_id: &'a str,
        editor_id: &'a str,
        content: &'a GridContent,
    ) -> BoxFuture<'a, Result<(), ClientError>> {
        self.put_cells(document_id, editor_id, content).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    #[test]
    fn service_token_is_signed_with_configured_secret() {
        let client = AppServiceClient::new(
            "http://localhost:5000/api/".to_string(),
            Some("secret".to_string()),
            "colabri-grid".to_string(),
        )
        .unwrap();

        let token = client.generate_token("secret").unwrap();
        let data = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(b"secret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();

        assert_eq!(data.claims["sub"], "colabri-grid");
        assert_eq!(data.claims["type"], "service");
        assert_eq!(client.base_url, "http://localhost:5000/api");
    }
}
