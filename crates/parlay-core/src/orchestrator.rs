//! Chat orchestration: validate, route, reply, then fan out persistence
//!
//! The provider call is the only suspension point on the critical path.
//! Persistence happens on detached background tasks scheduled strictly
//! after the response value is assembled; their outcome is never visible
//! to the caller. Store or log trouble must not add latency or failure
//! modes to the user-facing reply.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use uuid::Uuid;

use parlay_store::{AuditEvent, AuditLog, InteractionRecord, InteractionStore};

use crate::error::ChatError;
use crate::providers::{ProviderGateway, ProviderKind};
use crate::types::{ChatRequest, ChatResponse};

/// Tunables for the request path and the background pipeline.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Upper bound on one provider call; exceeding it is a provider failure.
    pub provider_timeout: Duration,
    /// Upper bound on one background append; exceeding it drops the job.
    pub sink_timeout: Duration,
    /// Cap on concurrently outstanding background jobs.
    pub max_inflight_jobs: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            provider_timeout: Duration::from_secs(60),
            sink_timeout: Duration::from_secs(10),
            max_inflight_jobs: 64,
        }
    }
}

/// The request handler at the center of the system.
pub struct ChatOrchestrator {
    providers: ProviderGateway,
    interactions: Arc<dyn InteractionStore>,
    audit: Arc<dyn AuditLog>,
    config: OrchestratorConfig,
    job_permits: Arc<Semaphore>,
}

impl ChatOrchestrator {
    pub fn new(
        providers: ProviderGateway,
        interactions: Arc<dyn InteractionStore>,
        audit: Arc<dyn AuditLog>,
        config: OrchestratorConfig,
    ) -> Self {
        let job_permits = Arc::new(Semaphore::new(config.max_inflight_jobs));
        Self {
            providers,
            interactions,
            audit,
            config,
            job_permits,
        }
    }

    /// Process one chat request end to end.
    ///
    /// On success the returned [`ChatResponse`] is final before any
    /// background job is scheduled; nothing that happens afterwards can
    /// reopen it.
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let prompt = request.prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(ChatError::Validation("prompt must not be empty".to_string()));
        }

        let kind: ProviderKind = request
            .provider
            .parse()
            .map_err(|_| ChatError::UnknownProvider(request.provider.clone()))?;
        let provider = self
            .providers
            .get(kind)
            .ok_or_else(|| ChatError::UnknownProvider(request.provider.clone()))?;

        let session_id = Uuid::new_v4();
        debug!("Routing session {} to provider {}", session_id, kind);

        // The call runs on its own task: if the client disconnects and this
        // future is dropped, the call still runs to completion and its
        // result is discarded. No background jobs are scheduled for a
        // response that was never computed.
        let call = {
            let provider = Arc::clone(&provider);
            let prompt = prompt.clone();
            tokio::spawn(async move { provider.generate(&prompt).await })
        };

        let outcome = match tokio::time::timeout(self.config.provider_timeout, call).await {
            Err(_) => Err(format!(
                "provider '{}' timed out after {:?}",
                kind, self.config.provider_timeout
            )),
            Ok(Err(join_err)) => Err(format!("provider task for '{kind}' failed: {join_err}")),
            Ok(Ok(Err(e))) => Err(format!("{e:#}")),
            Ok(Ok(Ok(reply))) if reply.text.is_empty() => {
                Err(format!("provider '{kind}' returned an empty reply"))
            }
            Ok(Ok(Ok(reply))) => Ok(reply),
        };

        let reply = match outcome {
            Ok(reply) => reply,
            Err(detail) => {
                // Exactly one audit-error job; the detail never reaches the
                // interaction store.
                self.schedule_audit(AuditEvent::error(&detail));
                return Err(ChatError::ProviderCall(detail));
            }
        };

        // The response is final from here on.
        let response = ChatResponse {
            response: reply.text,
            session_id,
            provider: kind.to_string(),
            timestamp: Utc::now(),
        };

        self.schedule_interaction(InteractionRecord::new(
            session_id,
            &request.user_id,
            kind.to_string(),
            &prompt,
            &response.response,
        ));

        let mut message = format!("Session: {} | User: {}", session_id, request.user_id);
        if reply.degraded {
            message.push_str(" | degraded");
        }
        self.schedule_audit(AuditEvent::success(message));

        Ok(response)
    }

    /// Append an ad-hoc event to the audit log on the background pipeline.
    /// Collaborators use this for SYSTEM events.
    pub fn record_system_event(&self, message: impl Into<String>) {
        self.schedule_audit(AuditEvent::system(message));
    }

    /// Wait for every scheduled background job to finish. One-shot callers
    /// use this before process exit; the server never needs it.
    pub async fn drain(&self) {
        let _permits = self
            .job_permits
            .acquire_many(self.config.max_inflight_jobs as u32)
            .await;
    }

    fn schedule_interaction(&self, record: InteractionRecord) {
        let store = Arc::clone(&self.interactions);
        self.spawn_job("interaction store", async move { store.append(record).await });
    }

    fn schedule_audit(&self, event: AuditEvent) {
        let audit = Arc::clone(&self.audit);
        self.spawn_job("audit log", async move { audit.append(event).await });
    }

    /// Detach one background append, bounded by the permit pool and its
    /// own timeout. Failures are demoted to local diagnostics.
    fn spawn_job<F>(&self, sink: &'static str, work: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let permit = match Arc::clone(&self.job_permits).try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("Dropping {} job: background pipeline is saturated", sink);
                return;
            }
        };

        let timeout = self.config.sink_timeout;
        tokio::spawn(async move {
            let _permit = permit;
            match tokio::time::timeout(timeout, work).await {
                Ok(Ok(())) => debug!("{} append completed", sink),
                Ok(Err(e)) => warn!("{} append failed: {:#}", sink, e),
                Err(_) => warn!("{} append timed out after {:?}", sink, timeout),
            }
        });
    }
}
