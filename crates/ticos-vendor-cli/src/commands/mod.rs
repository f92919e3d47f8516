//! CLI commands.

pub(crate) mod config;
pub(crate) mod doctor;
pub(crate) mod sync;
