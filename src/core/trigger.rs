use tracing::info;

use crate::api::RcaApi;
use crate::api::types::SessionRequest;
use crate::core::error::RcaError;

/// What to analyse. Built once from validated configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub namespace: String,
    pub resource_name: String,
    pub resource_kind: String,
    pub cluster_name: String,
}

/// Opaque session identifier returned by the trigger call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub session_id: String,
}

impl From<&JobRequest> for SessionRequest {
    fn from(req: &JobRequest) -> Self {
        SessionRequest {
            namespace: req.namespace.clone(),
            name: req.resource_name.clone(),
            kind: req.resource_kind.clone(),
            cluster_name: req.cluster_name.clone(),
        }
    }
}

/// Submits the RCA session once. An accepted response without a session id
/// is reported as [`RcaError::EmptySession`].
pub async fn trigger(api: &dyn RcaApi, request: &JobRequest) -> Result<JobHandle, RcaError> {
    info!(
        "Triggering RCA for {}: {} in namespace: {} on cluster: {}",
        request.resource_kind, request.resource_name, request.namespace, request.cluster_name
    );

    let response = api.trigger_session(&SessionRequest::from(request)).await?;
    if response.session_id.trim().is_empty() {
        return Err(RcaError::EmptySession);
    }

    info!(
        "RCA triggered successfully! Session ID: {} (status: {})",
        response.session_id, response.status
    );
    Ok(JobHandle {
        session_id: response.session_id,
    })
}
