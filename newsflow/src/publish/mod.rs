//! Publishing boundary: the adapter contract and the retry discipline
//! wrapped around it.

mod retry;

pub use retry::{publish_with_retry, JitterStrategy, RetryPolicy};

use async_trait::async_trait;

use crate::draft::Platform;
use crate::errors::PublishError;

/// Collaborator contract for publishing to one external platform.
///
/// Implementations classify their failures: `Transient` for timeouts and
/// rate limits, `Permanent` for auth and payload problems. Returns the URL
/// of the created post on success.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Attempts to publish `text` to `platform`.
    async fn publish(&self, platform: Platform, text: &str) -> Result<String, PublishError>;
}
