// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for mapstyle crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`backend`] - Recording mock [`StyleBackend`](mapstyle_port::StyleBackend) with failure injection
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`fixtures`] - Common specs, content trees and a ready-to-use reconciler

pub mod backend;
pub mod config;
pub mod fixtures;

pub use backend::MockStyleBackend;
pub use config::InMemoryConfigStore;
pub use fixtures::{
    init_tracing, line_layer, line_string, pixel_image, ready_config, ready_reconciler,
    route_tree, source_with_layers, vector_source,
};
