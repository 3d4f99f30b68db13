//! Control protocol — typed request/response helpers over the suspension
//! channel, plus the sync-mode auto-resolution policy.
//!
//! Each primitive validates that it runs inside an active run, builds the
//! typed request, suspends, and extracts the typed value from the
//! response. An absent value reads as `None` at the call site (the nil
//! produced by `SyncBehavior::Skip`).

use crate::suspend::SuspensionPort;
use agentloom_core::control::{ControlRequest, ControlResponse, SyncBehavior};
use agentloom_core::error::{ControlFlowError, Error};
use tracing::debug;

impl SuspensionPort {
    /// Ask for free-form text. Returns the supplied string, or `None` when
    /// the response carried no usable value.
    pub async fn request_input(&self, request: ControlRequest) -> Result<Option<String>, Error> {
        let response = self.suspend(request).await?;
        Ok(response
            .value
            .and_then(|v| v.as_str().map(str::to_string)))
    }

    /// Ask for a yes/no approval. Returns the supplied boolean, or `None`
    /// when the response carried no usable value.
    pub async fn request_confirmation(
        &self,
        request: ControlRequest,
    ) -> Result<Option<bool>, Error> {
        let response = self.suspend(request).await?;
        Ok(response.value.as_ref().and_then(serde_json::Value::as_bool))
    }

    /// Escalate a query to a parent agent. Returns whatever value the
    /// parent supplied.
    pub async fn escalate_query(
        &self,
        request: ControlRequest,
    ) -> Result<Option<serde_json::Value>, Error> {
        let response = self.suspend(request).await?;
        Ok(response.value)
    }
}

/// Resolve a control request without an external party, per the request's
/// declared [`SyncBehavior`].
///
/// Fails with a [`ControlFlowError`] naming the request kind when no
/// usable policy is declared.
pub fn resolve_sync(request: &ControlRequest) -> Result<ControlResponse, ControlFlowError> {
    let response = match request.sync_behavior {
        Some(SyncBehavior::Default) => match &request.default {
            Some(value) => ControlResponse::answer(&request.id, value.clone()),
            None => {
                return Err(ControlFlowError::Unresolvable {
                    kind: request.kind,
                    request_id: request.id.clone(),
                    reason: "sync behavior is `default` but no default value is declared".into(),
                });
            }
        },
        // Approve never consults the declared default; only the `default`
        // policy does.
        Some(SyncBehavior::Approve) => ControlResponse::approve(&request.id),
        Some(SyncBehavior::Skip) => ControlResponse::skip(&request.id),
        None => {
            return Err(ControlFlowError::Unresolvable {
                kind: request.kind,
                request_id: request.id.clone(),
                reason: "request declares no sync behavior".into(),
            });
        }
    };
    debug!(request_id = %request.id, kind = %request.kind, "auto-resolved control request");
    Ok(response)
}
