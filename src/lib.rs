//! MindOS: onboarding wizard core.

pub mod config;
pub mod error;
pub mod onboarding;
pub mod session;
pub mod store;
