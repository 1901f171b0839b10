// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search backend abstraction.
//!
//! [`SearchTransport`] is the seam between querysets and a cluster client.
//! [`InMemoryTransport`] implements it over in-process documents for tests
//! and local development.

pub mod evaluator;
pub mod memory;
pub mod traits;

pub use memory::{InMemoryTransport, TransportStats, DEFAULT_PAGE_SIZE};
pub use traits::{SearchRequest, SearchTransport, TransportError};
