//! The orchestrator's bootstrap error (spec §7 "Kinds"): the subset that
//! can actually occur while `bootstrap()` wires collaborators together,
//! before the HTTP surface exists to recover the rest into responses.
//! In-request errors (`BadRequest`/`NotFound`/`Unauthorized`, and the
//! Kind → HTTP status mapping) are `nimbus_server::ServerError`'s job —
//! that crate owns the live request path and its own `IntoResponse` impl,
//! so this type only needs the Kinds that reach `main()` via `?`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NimbusError {
    #[error("missing configuration: {0}")]
    ConfigMissing(String),

    #[error(transparent)]
    Llm(#[from] nimbus_llm::LlmError),

    #[error(transparent)]
    Store(#[from] nimbus_store::StoreError),
}

impl From<nimbus_config::ConfigError> for NimbusError {
    fn from(e: nimbus_config::ConfigError) -> Self {
        NimbusError::ConfigMissing(e.to_string())
    }
}
