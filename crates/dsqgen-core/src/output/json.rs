use std::io::Write;

use crate::error::{DsqgenError, Result};
use crate::output::GeneratedQuery;

/// Write queries as a JSON array of `{"query", "seed", "sql"}` objects.
///
/// Streams one object at a time rather than building the whole document.
pub fn write_json<W: Write>(writer: &mut W, queries: &[GeneratedQuery]) -> Result<()> {
    write_str(writer, "[")?;

    for (idx, generated) in queries.iter().enumerate() {
        let object = serde_json::to_string(generated).map_err(|e| DsqgenError::Output {
            message: format!("serializing query{}", generated.query),
            source: e.into(),
        })?;
        write_str(writer, "\n  ")?;
        write_str(writer, &object)?;
        if idx < queries.len() - 1 {
            write_str(writer, ",")?;
        }
    }

    if !queries.is_empty() {
        write_str(writer, "\n")?;
    }
    write_str(writer, "]\n")?;

    Ok(())
}

fn write_str<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    writer
        .write_all(s.as_bytes())
        .map_err(|e| DsqgenError::Output {
            message: "writing JSON".to_string(),
            source: e,
        })
}
