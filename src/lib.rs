//! Semantic note storage: short notes embedded as vectors, found by meaning.
//!
//! Quill stores `{title, content}` notes in named collections. Each note's
//! content is embedded once at ingest; queries are embedded the same way and
//! answered by exact cosine nearest-neighbour search.
//!
//! # Architecture
//!
//! - **Storage**: one SQLite file per collection (WAL mode), embeddings as
//!   little-endian `f32` BLOBs
//! - **Index**: an in-memory brute-force similarity index per collection,
//!   rebuilt from SQLite on open and kept in step with every write
//! - **Embeddings**: pluggable [`embedding::EmbeddingProvider`]; a local
//!   feature-hashing provider and an OpenAI-compatible HTTP provider
//! - **Transport**: HTTP JSON API (axum) or a stdio tool server (MCP)
//!
//! # Modules
//!
//! - [`config`]: configuration from TOML and environment variables
//! - [`db`]: SQLite open, schema, version check and health checks
//! - [`embedding`]: text-to-vector providers with bounded latency
//! - [`error`]: the error taxonomy shared by every operation
//! - [`notes`]: repository, similarity index, store and pipelines
//! - [`server`]: HTTP routes and server startup
//! - [`tools`]: stdio tool definitions

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod notes;
pub mod server;
pub mod tools;

pub use error::{Error, Result};
