use std::io::Write;

use crate::error::{DsqgenError, Result};
use crate::output::GeneratedQuery;

/// Write queries as a SQL script.
///
/// Each query gets a `-- query<N> (seed <S>)` header and is terminated by
/// `;` followed by a blank line.
pub fn write_sql<W: Write>(writer: &mut W, queries: &[GeneratedQuery]) -> Result<()> {
    for generated in queries {
        writeln!(writer, "-- query{} (seed {})", generated.query, generated.seed).map_err(|e| {
            DsqgenError::Output {
                message: format!("writing header for query{}", generated.query),
                source: e,
            }
        })?;

        let body = generated.sql.trim_end();
        writeln!(writer, "{};", body).map_err(|e| DsqgenError::Output {
            message: format!("writing query{}", generated.query),
            source: e,
        })?;

        writeln!(writer).map_err(|e| DsqgenError::Output {
            message: "writing newline".to_string(),
            source: e,
        })?;
    }

    Ok(())
}
