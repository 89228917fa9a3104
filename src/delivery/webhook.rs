//! Outbound webhook delivery: allow-listing, request signing, and a bounded
//! retry loop.
//!
//! The retry loop is explicit rather than decorator-driven: the clock,
//! jitter source, and sleeper are injected through [`RuntimeContext`] so
//! tests can exercise the full retry schedule without waiting. Retries apply
//! only to transient conditions (transport errors and 5xx); any 4xx is
//! terminal on the first response.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

use crate::core::runtime_context::RuntimeContext;
use crate::security::allowlist::{AllowListError, HostAllowList};

pub const SIGNATURE_HEADER: &str = "X-Signature";
pub const SIGNATURE_TIMESTAMP_HEADER: &str = "X-Signature-Timestamp";

/// Default per-attempt timeout for the reqwest transport.
pub const DEFAULT_ATTEMPT_TIMEOUT_SECS: u64 = 15;

type HmacSha256 = Hmac<Sha256>;

/// Outbound notification body. `idempotency_key` lets a receiver that sees
/// the same delivery twice de-duplicate.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WebhookPayload {
    pub event: String,
    pub idempotency_key: String,
    pub instance_id: String,
    pub artifact_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,
    #[error("Connection error: {0}")]
    Connection(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("Delivery blocked by configuration: {0}")]
    Configuration(#[from] AllowListError),
    #[error("Payload serialization failed: {0}")]
    Serialization(String),
    #[error("Delivery rejected for instance '{instance_id}' with status {status}")]
    Rejected { instance_id: String, status: u16 },
    #[error(
        "Delivery failed for instance '{instance_id}' after {attempts} attempts (last status: {last_status:?})"
    )]
    RetriesExhausted {
        instance_id: String,
        attempts: u32,
        last_status: Option<u16>,
    },
}

/// One delivery attempt's bookkeeping. Recomputed every cycle, never part of
/// the durable business record once delivery succeeds.
#[derive(Debug, Clone, Default)]
pub struct DeliveryAttempt {
    pub attempt_number: u32,
    pub last_error: Option<String>,
    pub next_retry_at: Option<i64>,
}

/// How retries are scheduled: exponential backoff from `base_delay`, capped
/// at `max_delay`, plus jitter bounded by `jitter_cap`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub jitter_cap: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            jitter_cap: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt following `completed_attempts`.
    pub fn delay_after(
        &self,
        completed_attempts: u32,
        jitter: &dyn crate::core::runtime_context::JitterSource,
    ) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(1u32 << completed_attempts.saturating_sub(1).min(16));
        let capped = exp.min(self.max_delay);
        capped + Duration::from_millis(jitter.jitter_millis(self.jitter_cap.as_millis() as u64))
    }
}

/// HTTP seam for the dispatcher. Returns the response status code.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<u16, TransportError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(attempt_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(attempt_timeout)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &str,
    ) -> Result<u16, TransportError> {
        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .body(body.to_string());
        for (name, value) in headers {
            request = request.header(name, value);
        }
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::Connection(e.to_string())
            }
        })?;
        Ok(response.status().as_u16())
    }
}

/// Signs, sends, and retries one outbound notification.
pub struct WebhookDispatcher {
    target_url: String,
    secret: String,
    allow_list: HostAllowList,
    policy: RetryPolicy,
    transport: std::sync::Arc<dyn WebhookTransport>,
    context: RuntimeContext,
}

impl WebhookDispatcher {
    pub fn new(
        target_url: impl Into<String>,
        secret: impl Into<String>,
        allow_list: HostAllowList,
        policy: RetryPolicy,
        transport: std::sync::Arc<dyn WebhookTransport>,
        context: RuntimeContext,
    ) -> Self {
        Self {
            target_url: target_url.into(),
            secret: secret.into(),
            allow_list,
            policy,
            transport,
            context,
        }
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// `HMAC-SHA256(secret, "{timestamp}.{body}")`, hex-encoded.
    pub fn sign(&self, timestamp: i64, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(format!("{}.{}", timestamp, body).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Deliver the payload, retrying transient failures up to the policy
    /// bound. The allow-list check runs before any network attempt.
    pub async fn deliver(&self, payload: &WebhookPayload) -> Result<(), DeliveryError> {
        self.allow_list.check(&self.target_url)?;

        let body = serde_json::to_string(payload)
            .map_err(|e| DeliveryError::Serialization(e.to_string()))?;

        let mut attempt = DeliveryAttempt::default();
        let mut last_status: Option<u16> = None;

        loop {
            attempt.attempt_number += 1;
            let timestamp = self.context.time_provider.now_timestamp();
            let headers = vec![
                (SIGNATURE_TIMESTAMP_HEADER.to_string(), timestamp.to_string()),
                (SIGNATURE_HEADER.to_string(), self.sign(timestamp, &body)),
            ];

            match self.transport.post(&self.target_url, &headers, &body).await {
                Ok(status) if (200..300).contains(&status) => {
                    tracing::info!(
                        instance_id = %payload.instance_id,
                        event = %payload.event,
                        attempt = attempt.attempt_number,
                        "webhook delivered"
                    );
                    return Ok(());
                }
                Ok(status) if (400..500).contains(&status) => {
                    return Err(DeliveryError::Rejected {
                        instance_id: payload.instance_id.clone(),
                        status,
                    });
                }
                Ok(status) => {
                    last_status = Some(status);
                    attempt.last_error = Some(format!("HTTP {}", status));
                }
                Err(e) => {
                    attempt.last_error = Some(e.to_string());
                }
            }

            if attempt.attempt_number >= self.policy.max_attempts {
                return Err(DeliveryError::RetriesExhausted {
                    instance_id: payload.instance_id.clone(),
                    attempts: attempt.attempt_number,
                    last_status,
                });
            }

            let delay = self
                .policy
                .delay_after(attempt.attempt_number, self.context.jitter.as_ref());
            attempt.next_retry_at = Some(timestamp + delay.as_secs() as i64);
            tracing::warn!(
                instance_id = %payload.instance_id,
                attempt = attempt.attempt_number,
                error = attempt.last_error.as_deref().unwrap_or("unknown"),
                delay_millis = delay.as_millis() as u64,
                "webhook attempt failed, retrying"
            );
            self.context.sleeper.sleep(delay).await;
        }
    }
}
