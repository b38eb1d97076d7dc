//! Provider Bridge: maintains the outbound streaming connection to the
//! selected STT provider.
//!
//! Provider-specific wire details are abstracted behind the
//! [`ProviderAdapter`]/[`ProviderSession`] capability set (§4.3). New
//! providers are added by implementing the capability, not by editing the
//! orchestrator or ingress.

mod adapter;
mod deepgram;
mod mock;

pub use adapter::{
    InitError, ProviderAdapter, ProviderError, ProviderSession, ProviderTranscript,
    SessionOptions, TransportError,
};
pub use deepgram::DeepgramAdapter;
pub use mock::MockAdapter;

use crate::error::MediatorError;

/// PCM encoding asserted to every provider; the core does not resample or
/// transcode (Non-goal, §1).
pub const ENCODING_PCM_S16LE: &str = "linear16";

/// Resolves a configured `provider_id` to a concrete adapter.
///
/// This is the provider registry: a minimal lookup, not a plugin system.
/// Extending it to a new provider means adding one match arm and one module.
pub fn create_adapter(provider_id: &str, api_key: Option<String>) -> Result<Box<dyn ProviderAdapter>, MediatorError> {
    match provider_id {
        "deepgram" => {
            let api_key = api_key.ok_or_else(|| {
                MediatorError::Configuration("deepgram provider requires an API key".into())
            })?;
            Ok(Box::new(DeepgramAdapter::new(api_key)))
        }
        "mock" => Ok(Box::new(MockAdapter::new())),
        other => Err(MediatorError::Configuration(format!(
            "unknown provider id: {other}"
        ))),
    }
}
