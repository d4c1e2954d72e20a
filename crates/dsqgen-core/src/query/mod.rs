//! # Query Templates
//!
//! The macro language used by query template `define` lines, its evaluator,
//! and the template engine that expands `[NAME]` placeholders into SQL.
//!
//! ```text
//! define YEAR = random(1998, 2002, uniform);
//! define SDATE = date([YEAR]+"-01-01", [YEAR]+"-07-01", sales);
//! select * from date_dim where d_date = '[SDATE]';
//! ```
//!
//! Parsing resolves distribution names against a [`DistributionRegistry`]
//! once; expansion runs against a fresh [`GenerationContext`] per
//! `(query, seed)`.
//!
//! [`DistributionRegistry`]: crate::distribution::DistributionRegistry

pub mod catalog;
pub mod context;
pub mod parser;
pub mod rowcount;
pub mod source;
pub mod substitution;
pub mod template;

pub use catalog::{validate_query_id, QueryCatalog, QUERY_IDS};
pub use context::{CachedValue, GenerationContext};
pub use rowcount::RowCounts;
pub use source::{BundledTemplates, DirectoryTemplates, LayeredTemplates, MemoryTemplates, TemplateSource};
pub use substitution::{DateKind, Format, Substitution};
pub use template::Query;
