#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! The geocode and district resolution pipelines.
//!
//! Three layers, innermost first:
//! - [`geocode::GeocodeServiceProvider`] — cache-fronted, fallback-
//!   chained geocoding with bounded batch fan-out.
//! - [`assign::DistrictAssigner`] — parallel shapefile/street-file
//!   district assignment with result consolidation.
//! - [`resolve::DistrictResolver`] — the end-to-end flow: USPS
//!   correction, geocoding, assignment routing (standard vs
//!   multi-match), PO box handling, maps, and member metadata.

pub mod assign;
pub mod geocode;
pub mod parallel;
pub mod resolve;

pub use assign::{consolidate_fallback, DistrictAssigner, DEFAULT_PROXIMITY_THRESHOLD};
pub use geocode::{GeocodeServiceProvider, CACHE_SOURCE, DEFAULT_THREADS};
pub use parallel::ordered_fan_out;
pub use resolve::DistrictResolver;
