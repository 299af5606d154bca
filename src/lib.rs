// Library crate shared by both binaries and the integration tests.

pub mod client;
pub mod config;
pub mod error;
pub mod report;
pub mod settings;
