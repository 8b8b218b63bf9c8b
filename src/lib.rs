//! Hemmer provider for ReadMe documentation projects.
//!
//! Exposes docs, categories, versions, changelogs and custom pages of a
//! ReadMe project as Hemmer resources, plus read-only data sources for the
//! same entities, the project itself and its API specifications.
//!
//! # Front matter
//!
//! A document body may start with a YAML block:
//!
//! ```text
//! ---
//! title: Getting Started
//! categorySlug: guides
//! hidden: false
//! ---
//! Welcome!
//! ```
//!
//! Attributes left unset in configuration take their value from that block
//! during planning ([`plan::FrontMatterDefault`]). Attributes the API
//! derives, such as a doc's rendered HTML or revision, are marked unknown
//! whenever something they depend on changes ([`plan::ChangedIf`]).
//!
//! # Handshake
//!
//! The binary prints
//!
//! ```text
//! HEMMER_PROVIDER|1|127.0.0.1:50051
//! ```
//!
//! on stdout and then serves the `hemmer.provider.v1.Provider` gRPC service.
//! Logs go to stderr.
//!
//! # Layout
//!
//! - [`provider`]: configuration and dispatch ([`ReadmeProvider`])
//! - [`resources`] / [`data_sources`]: one module per ReadMe entity
//! - [`plan`] / [`frontmatter`]: plan modification
//! - [`client`]: the ReadMe API port, over HTTP or in memory
//! - [`server`]: the gRPC glue ([`serve`])
//! - [`testing`]: drive a provider without a server

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod data_sources;
pub mod error;
pub mod frontmatter;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod server;
pub mod testing;
pub mod types;
pub mod validation;

#[allow(missing_docs)]
#[allow(clippy::all)]
pub mod generated;

pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{ProviderConfig, ReadmeProvider};
pub use schema::ProviderSchema;
pub use server::{
    serve, serve_on, serve_on_with_options, serve_with_options, ProviderService, ServeOptions,
};
pub use types::{
    AttributeChange, ImportedResource, PlanResult, ProviderMetadata, ServerCapabilities,
    StateResult, HANDSHAKE_PREFIX, PROTOCOL_VERSION, UNKNOWN_VALUE,
};
pub use validation::{is_valid, validate};
