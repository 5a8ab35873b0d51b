//! Travloger Scoring API Library
//!
//! Core functionality for the Travloger lead-scoring service: the condition
//! evaluator and score engine, the automation dispatcher, rule-management
//! storage, and the HTTP handlers (including ad-platform webhook ingestion).
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core business logic.
//! - `automation`: Priority-tier action plans and the dispatcher.
//! - `cache_validator`: Checksum validation for cached rule sets.
//! - `config`: Configuration management.
//! - `db`: Database connection, pool management and schema bootstrap.
//! - `errors`: Error handling types.
//! - `evaluator`: Pure condition evaluator.
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `scoring`: Score calculation engine.
//! - `store`: Capability traits and Postgres stores.
//! - `webhook_handler`: Ad-platform lead webhook handler.
//! - `webhook_models`: Ad-platform webhook payload models.

pub mod api;
pub mod core;

// Re-export primary modules for shared use in tests and other binaries
pub mod automation;
pub mod cache_validator;
pub mod config;
pub mod db;
pub mod errors;
pub mod evaluator;
pub mod handlers;
pub mod models;
pub mod scoring;
pub mod store;
pub mod webhook_handler;
pub mod webhook_models;
