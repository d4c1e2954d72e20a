//! Writers for generated query batches.

pub mod json;
pub mod sql;

use serde::{Deserialize, Serialize};

pub use json::write_json;
pub use sql::write_sql;

/// One expanded query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuery {
    pub query: u8,
    pub seed: u64,
    pub sql: String,
}

/// Output format for a batch of queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Sql,
    Json,
}

impl OutputFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sql" => Some(OutputFormat::Sql),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }

    /// Write `queries` in this format.
    pub fn write<W: std::io::Write>(&self, writer: &mut W, queries: &[GeneratedQuery]) -> crate::Result<()> {
        match self {
            OutputFormat::Sql => write_sql(writer, queries),
            OutputFormat::Json => write_json(writer, queries),
        }
    }
}
