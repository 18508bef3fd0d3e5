use async_trait::async_trait;
use resumer_common::DispatchError;

/// Delivers a finished summary to a recipient on some channel.
///
/// Implementations classify failures as transient or permanent so the
/// caller can decide whether to retry.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Send `text` to `recipient` (a chat id for Telegram)
    async fn dispatch(&self, recipient: &str, text: &str) -> Result<(), DispatchError>;

    /// Human-readable channel name, used in logs
    fn channel_name(&self) -> &str;
}
