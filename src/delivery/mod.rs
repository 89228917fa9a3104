//! Finalization side effects: durable artifact storage and outbound webhook
//! notification.

pub mod blob;
pub mod webhook;

pub use blob::{BlobError, BlobStore, FileBlobStore, MemoryBlobStore, SignedUrl, SIGNED_URL_TTL_SECS};
pub use webhook::{
    DeliveryAttempt, DeliveryError, ReqwestTransport, RetryPolicy, TransportError, WebhookDispatcher,
    WebhookPayload, WebhookTransport, DEFAULT_ATTEMPT_TIMEOUT_SECS, SIGNATURE_HEADER,
    SIGNATURE_TIMESTAMP_HEADER,
};
