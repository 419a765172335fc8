//! # Configuration Module
//!
//! Runtime configuration for the AI service, the catalog backend and upload
//! preprocessing.

pub mod config;

pub use config::ConsultConfig;
