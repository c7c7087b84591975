//! DBAL Core — multi-backend database abstraction layer
//!
//! This crate provides the storage core shared by a structured-record plane
//! and a blob plane behind one declarative schema:
//!
//! - **Structured records** — CRUD, listing, bulk mutation, and transactional
//!   access to entities whose shapes are defined by YAML schemas, executed
//!   against a pooled SQLite (libsql) connection with a dialect-aware query
//!   builder that also targets PostgreSQL/MySQL at the statement level.
//! - **Blobs** — content-addressed object storage with unified semantics
//!   across an in-memory map, a local filesystem tree, and S3-compatible
//!   HTTP endpoints signed with AWS Signature V4.
//!
//! # Modules
//!
//! - [`error`] — the typed, HTTP-aligned error taxonomy shared by every layer
//! - [`tenant`] — role/permission authorization and per-tenant quota checks
//! - [`schema`] — YAML schema discovery, parsing, validation, and caching
//! - [`prisma`] — Prisma schema fragment generation from a loaded schema set
//! - [`sql`] — dialect-aware query building, type conversion, connection
//!   management, result materialization, and transactions
//! - [`blob`] — the `BlobStorage` capability trait and its three backends
//! - [`config`] — environment-driven blob backend selection

pub mod blob;
pub mod config;
pub mod error;
pub mod prisma;
pub mod schema;
pub mod sql;
pub mod tenant;

pub use error::{DbalError, Result};
