//! certsmith - batch certificate tooling driven by a configuration file
//!
//! certsmith automates the generation of RSA keys, certificate signing
//! requests, self-signed CA certificates and CA-signed certificates for
//! groups of named users. Every cryptographic operation is delegated to the
//! OpenSSL command line; this crate only resolves the configuration and
//! sequences the invocations.
//!
//! # Pipeline
//!
//! ```text
//! config.json ──► Resolver ──► ResolvedGroup { ca, users }
//!                                   │
//!                                   ▼
//!                              Generator ──► openssl genrsa / req / x509
//! ```
//!
//! A configuration file declares groups; each group carries SSL defaults
//! (key size, digest, expiration, directories), distinguished-name defaults,
//! and its CA and user entries. Per-entity values override the group
//! defaults, and built-in defaults cover whatever neither specifies.
//!
//! # Guarantees
//!
//! - **Idempotent by default**: an output file that already exists is left
//!   alone unless `--overwrite` is given.
//! - **Dependency ordered**: a CA's key and certificate are generated before
//!   any user in its group is signed against them.
//! - **Failure tolerant**: a broken group or entity is logged and skipped;
//!   it never takes the rest of the run down with it.
//!
//! # Module Overview
//!
//! - [`cli`]: command line flags
//! - [`configs`]: configuration file loading
//! - [`distinguished_name`]: certificate subject fields and formatting
//! - [`entity`]: the user / certificate-authority model
//! - [`file_layout`]: per-entity output paths
//! - [`files`]: filesystem boundary
//! - [`generator`]: orchestration of the OpenSSL invocations
//! - [`logging`]: log file setup
//! - [`process`]: child process execution with secret redaction
//! - [`resolver`]: configuration resolution and defaulting

pub mod cli;
pub mod configs;
pub mod distinguished_name;
pub mod entity;
pub mod file_layout;
pub mod files;
pub mod generator;
pub mod logging;
pub mod process;
pub mod resolver;

pub use cli::Cli;
pub use distinguished_name::DistinguishedName;
pub use entity::{Entity, EntityBuilder, Role};
pub use file_layout::FileLayout;
pub use files::FileHandler;
pub use generator::{Actions, Generator};
pub use process::{CommandRunner, OpenSslRunner};
pub use resolver::{ResolvedGroup, Resolver};
