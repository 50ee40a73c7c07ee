//! Command implementations

pub mod envelope;
pub mod inspect;
pub mod pack;
pub mod status;
pub mod verify;
