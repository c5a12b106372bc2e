//! Support Triage — email triage core.

pub mod config;
pub mod error;
pub mod library;
pub mod llm;
pub mod mail;
pub mod notify;
pub mod pipeline;
pub mod reporting;
pub mod scheduler;
pub mod store;
