use anyhow::Result;
use comfy_table::{Cell, Table as ComfyTable};

use dsqgen_core::DistributionTable;

use crate::args::{DistArgs, DistFormat};
use crate::commands::load_registry;

pub fn run(args: &DistArgs) -> Result<()> {
    let registry = load_registry(args.distributions.as_deref())?;
    let table = match registry.get(&args.name) {
        Ok(table) => table,
        Err(err) => {
            anyhow::bail!("{}\n  Known distributions: {}", err, registry.names().join(", "));
        }
    };

    match args.format {
        DistFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&to_json(&table)?)?);
        }
        DistFormat::Table => {
            println!("Distribution: {} ({} rows)", table.name(), table.len());
            println!();
            println!("{}", render(&table)?);
        }
    }

    Ok(())
}

fn render(table: &DistributionTable) -> Result<ComfyTable> {
    let mut out = ComfyTable::new();
    let mut header = vec![Cell::new("#")];
    header.extend(table.field_names().iter().map(Cell::new));
    header.extend(table.weight_names().iter().map(|w| Cell::new(format!("w:{}", w))));
    out.set_header(header);

    for row in 0..table.len() {
        let mut cells = vec![Cell::new(row + 1)];
        for field in 0..table.field_names().len() {
            cells.push(Cell::new(table.cell(field, row)?));
        }
        for column in 0..table.weight_names().len() {
            cells.push(Cell::new(table.weight_at_index(column, row)?));
        }
        out.add_row(cells);
    }

    Ok(out)
}

fn to_json(table: &DistributionTable) -> Result<serde_json::Value> {
    let mut rows = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let mut values = serde_json::Map::new();
        for (field, name) in table.field_names().iter().enumerate() {
            values.insert(name.clone(), table.cell(field, row)?.into());
        }
        let mut weights = serde_json::Map::new();
        for (column, name) in table.weight_names().iter().enumerate() {
            weights.insert(name.clone(), table.weight_at_index(column, row)?.into());
        }
        rows.push(serde_json::json!({ "values": values, "weights": weights }));
    }

    Ok(serde_json::json!({
        "name": table.name(),
        "rows": rows,
    }))
}
