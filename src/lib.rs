//! # docharbor
//!
//! A document ingestion and semantic retrieval service.
//!
//! docharbor accepts uploaded documents, hands their raw content to a
//! remote content-processing service that returns text chunks with
//! embedding vectors, persists documents and chunks in SQLite, and answers
//! semantic queries by similarity search over the stored vectors, returning
//! the filenames of matching documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────┐   ┌──────────────┐   ┌───────────────┐   ┌──────────┐
//! │ Intake │──▶│ Orchestrator │──▶│  Processing   │──▶│  SQLite   │
//! │ HTTP/  │   │ (one attempt │   │  service      │   │ documents │
//! │ CLI    │   │  per doc)    │   │ (chunks+vecs) │   │ + chunks  │
//! └────────┘   └──────────────┘   └───────────────┘   └────┬─────┘
//!                                                          │
//!                                       query ─▶ retrieval engine
//!                                                (threshold, dedup,
//!                                                 filename lookup)
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Classed pipeline errors |
//! | [`intake`] | Upload validation |
//! | [`registry`] | Document metadata records |
//! | [`chunk_store`] | Chunk generations with wholesale replace |
//! | [`index`] | Vector similarity execution |
//! | [`retrieval`] | Threshold, dedup, and name resolution |
//! | [`processor`] | Remote processing service client |
//! | [`ingest`] | Ingestion orchestrator |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chunk_store;
pub mod config;
pub mod db;
pub mod error;
pub mod index;
pub mod ingest;
pub mod intake;
pub mod migrate;
pub mod models;
pub mod processor;
pub mod registry;
pub mod retrieval;
pub mod server;
