pub mod app_service_client;
#[cfg(test)]
pub mod memory;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::GridContent;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request to app service failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not sign service token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("app service unavailable: {0}")]
    Unavailable(String),
}

/// Answer of the permission oracle for one (editor, document, share token).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionDecision {
    pub can_read: bool,
    pub can_write: bool,
}

/// Authority over read/write rights on a document.
pub trait PermissionOracle: Send + Sync {
    fn check<'a>(
        &'a self,
        editor_id: &'a str,
        document_id: &'a str,
        share_token: Option<&'a str>,
    ) -> BoxFuture<'a, Result<PermissionDecision, ClientError>>;
}

/// Editor id to display name. `None` for an unknown editor.
pub trait UserDirectory: Send + Sync {
    fn username<'a>(&'a self, editor_id: &'a str) -> BoxFuture<'a, Result<Option<String>, ClientError>>;
}

/// Initial grid snapshot for the first editor of a document.
pub trait ContentLoader: Send + Sync {
    fn load_snapshot<'a>(
        &'a self,
        document_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<GridContent>, ClientError>>;
}

/// Durable save of the buffered grid content.
pub trait FilePersistence: Send + Sync {
    fn save<'a>(
        &'a self,
        document_id: &'a str,
        editor_id: &'a str,
        content: &'a GridContent,
    ) -> BoxFuture<'a, Result<(), ClientError>>;
}

/// The four external services the collaboration engine talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub permissions: Arc<dyn PermissionOracle>,
    pub users: Arc<dyn UserDirectory>,
    pub loader: Arc<dyn ContentLoader>,
    pub persistence: Arc<dyn FilePersistence>,
}

impl Collaborators {
    /// Use one backend for every role.
    pub fn from_shared<T>(backend: Arc<T>) -> Self
    where
        T: PermissionOracle + UserDirectory + ContentLoader + FilePersistence + 'static,
    {
        Self {
            permissions: backend.clone(),
            users: backend.clone(),
            loader: backend.clone(),
            persistence: backend,
        }
    }
}
