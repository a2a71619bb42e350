//! Shared library for the spolist console: wire model, configuration,
//! platform paths, the credential Session and the Web API client.

pub mod client;
pub mod config;
pub mod model;
pub mod platform;
pub mod session;
