//! imgscribe - describe and tag a folder of images with a vision model.
//!
//! Images are discovered under a root folder, sent one at a time to an
//! OpenAI-compatible vision endpoint, and the returned description and tags
//! are written to a CSV export and (optionally) a SQLite keyed store.

pub mod cli;
pub mod config;
pub mod discovery;
pub mod export;
pub mod llm;
pub mod models;
pub mod repository;
pub mod services;
