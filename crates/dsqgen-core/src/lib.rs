pub mod config;
pub mod distribution;
pub mod error;
pub mod generate;
pub mod output;
pub mod query;

// Re-export key types for convenience
pub use distribution::{DistributionRegistry, DistributionTable};
pub use error::{DsqgenError, Result};
pub use generate::QueryGenerator;
pub use output::GeneratedQuery;
pub use query::{Query, RowCounts, Substitution};
