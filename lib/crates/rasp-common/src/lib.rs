pub mod config;
pub mod envelope;
pub mod status_keys;
pub mod types;

pub use config::{AgentConfig, ENV_PREFIX};
pub use envelope::{EnvelopeSerializer, EventEnvelope, RUNTIME_NAME};
pub use status_keys::{identity_value, keys, status};
pub use types::*;
