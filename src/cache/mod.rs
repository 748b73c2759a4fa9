//! The cache-control decision engine.
//!
//! Leaves first:
//! - `control`: `Cache-Control` directive parsing
//! - `headers`: hop-by-hop classification, multi-value headers, HTTP dates
//! - `vary`: Vary echo headers and matching
//! - `freshness`: fresh / stale / transparent evaluation
//! - `stale`: stale-if-error eligibility
//! - `revalidation`: conditional request planning
//! - `gate`: storage eligibility and request keys
//! - `entry`: the stored response and its codec
//! - `capture`: streaming body capture
//! - `client`: the request pipeline tying everything together

pub mod capture;
pub mod client;
pub mod control;
pub mod entry;
pub mod freshness;
pub mod gate;
pub mod headers;
pub mod revalidation;
pub mod stale;
pub mod vary;

pub use capture::CapturingBody;
pub use client::{CacheOptions, CachedClient};
pub use control::Directives;
pub use entry::CacheEntry;
pub use freshness::Freshness;

/// Marker header added to responses served from storage
pub const X_FROM_CACHE: &str = "x-from-cache";
