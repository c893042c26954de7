use std::sync::Arc;
use tracing::{error, warn};

use crate::clients::PermissionOracle;

/// Asks the permission oracle on every call. Nothing is remembered between
/// calls, so a revocation applies to the very next operation.
#[derive(Clone)]
pub struct PermissionService {
    oracle: Arc<dyn PermissionOracle>,
}

impl PermissionService {
    pub fn new(oracle: Arc<dyn PermissionOracle>) -> Self {
        Self { oracle }
    }

    pub async fn can_read(&self, editor_id: &str, document_id: &str, share_token: Option<&str>) -> bool {
        match self.oracle.check(editor_id, document_id, share_token).await {
            Ok(decision) => decision.can_read,
            Err(e) => {
                error!("Error checking read permission for {} on {}: {}", editor_id, document_id, e);
                false
            }
        }
    }

    pub async fn can_write(&self, editor_id: &str, document_id: &str, share_token: Option<&str>) -> bool {
        match self.oracle.check(editor_id, document_id, share_token).await {
            Ok(decision) => {
                if !decision.can_write {
                    warn!("No write permission for editor {} on document {}", editor_id, document_id);
                }
                decision.can_write
            }
            Err(e) => {
                error!("Error checking write permission for {} on {}: {}", editor_id, document_id, e);
                false
            }
        }
    }
}
