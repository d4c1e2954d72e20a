//! # Weighted Distributions
//!
//! Static value/weight tables that query templates draw from. Each table is
//! loaded once from a `.dst` resource (bundled into the crate, or overridden
//! from a directory), then shared read-only across every generation.
//!
//! A resource line looks like:
//!
//! ```text
//! -- values : weights
//! Women,1,1:1
//! Did not fit\, too small:4,4,4,1,1,1
//! ```

pub mod format;
pub mod registry;
pub mod table;

pub use registry::{DistributionRegistry, DistributionShape, WELL_KNOWN};
pub use table::DistributionTable;
