//! Application services: use-case orchestration.
//!
//! Services import only from `crate::domain` and `crate::application::ports`
//! and never from `crate::infra` or `crate::commands`.

pub mod guard;
pub mod lifecycle;

pub use lifecycle::{LifecycleManager, Transition};
