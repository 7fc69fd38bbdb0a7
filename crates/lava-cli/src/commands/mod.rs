//! CLI command implementations.

pub mod cluster;
pub mod common;
pub mod events;
pub mod hosts;
pub mod jobs;
pub mod peek;
pub mod queues;
pub mod submit;
pub mod users;
pub mod version;
