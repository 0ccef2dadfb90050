//! # verdex cloud
//!
//! HTTP client for a remote raster-analysis service.
//!
//! [`RemoteClient`] is an async client with one method per REST endpoint;
//! [`RemoteServiceBlocking`] wraps it as a [`verdex_engine::RasterService`]
//! so a [`verdex_engine::VegetationEngine`] can run against a live backend.
//!
//! ## Features
//!
//! - `native` (default): blocking wrapper via a Tokio runtime

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod models;

#[cfg(feature = "native")]
pub mod blocking;

pub use auth::{BearerToken, CloudAuth, NoAuth, TOKEN_ENV};
pub use client::{RemoteClient, RemoteClientOptions, ENDPOINT_ENV};
pub use error::{CloudError, Result};

#[cfg(feature = "native")]
pub use blocking::RemoteServiceBlocking;
