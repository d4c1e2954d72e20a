use std::path::Path;

use rand::Rng;

use crate::distribution::format::{decode_latin1, records, split_parts, split_values};
use crate::error::{DsqgenError, Result};

/// An immutable, named table of parallel value columns and cumulative
/// weight columns.
///
/// `values[field][row]` holds the cell text. `weights[column][row]` holds
/// the running sum of the raw weights of rows `0..=row`, so the last entry
/// of a column is its total weight.
#[derive(Clone, PartialEq)]
pub struct DistributionTable {
    name: String,
    field_names: Vec<String>,
    weight_names: Vec<String>,
    values: Vec<Vec<String>>,
    weights: Vec<Vec<u64>>,
}

impl DistributionTable {
    /// Parse a distribution from resource text.
    ///
    /// `field_names` and `weight_names` fix the number of value and weight
    /// sub-fields every record must carry.
    pub fn parse(
        name: &str,
        text: &str,
        field_names: &[&str],
        weight_names: &[&str],
    ) -> Result<Self> {
        let format_error = |line: usize, message: String| DsqgenError::DistributionFormat {
            distribution: name.to_string(),
            line,
            message,
        };

        let mut values: Vec<Vec<String>> = vec![Vec::new(); field_names.len()];
        let mut weights: Vec<Vec<u64>> = vec![Vec::new(); weight_names.len()];

        for (line_number, line) in records(text) {
            let parts = split_parts(line);
            if parts.len() != 2 {
                return Err(format_error(
                    line_number,
                    format!(
                        "expected 2 colon-separated parts but found {}: {}",
                        parts.len(),
                        line
                    ),
                ));
            }

            let row_values = split_values(parts[0]);
            if row_values.len() != field_names.len() {
                return Err(format_error(
                    line_number,
                    format!(
                        "expected {} values but found {}: {:?}",
                        field_names.len(),
                        row_values.len(),
                        row_values
                    ),
                ));
            }

            let row_weights = split_values(parts[1]);
            if row_weights.len() != weight_names.len() {
                return Err(format_error(
                    line_number,
                    format!(
                        "expected {} weights but found {}: {:?}",
                        weight_names.len(),
                        row_weights.len(),
                        row_weights
                    ),
                ));
            }

            for (column, value) in values.iter_mut().zip(row_values) {
                column.push(value);
            }

            for (column, raw) in weights.iter_mut().zip(&row_weights) {
                let weight: i64 = raw.parse().map_err(|_| {
                    format_error(line_number, format!("weight '{}' is not an integer", raw))
                })?;
                if weight < 0 {
                    return Err(format_error(
                        line_number,
                        format!("weight cannot be negative: {}", weight),
                    ));
                }
                let previous = column.last().copied().unwrap_or(0);
                let cumulative = previous.checked_add(weight as u64).ok_or_else(|| {
                    format_error(line_number, "cumulative weight overflows".to_string())
                })?;
                column.push(cumulative);
            }
        }

        if values.first().map_or(true, |column| column.is_empty()) {
            return Err(DsqgenError::EmptyDistribution {
                distribution: name.to_string(),
            });
        }

        Ok(Self {
            name: name.to_string(),
            field_names: field_names.iter().map(|s| s.to_string()).collect(),
            weight_names: weight_names.iter().map(|s| s.to_string()).collect(),
            values,
            weights,
        })
    }

    /// Load a distribution from an ISO-8859-1 encoded `.dst` file.
    pub fn load(
        name: &str,
        path: &Path,
        field_names: &[&str],
        weight_names: &[&str],
    ) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| DsqgenError::DistributionResource {
            resource: path.display().to_string(),
            source: e,
        })?;
        Self::parse(name, &decode_latin1(&bytes), field_names, weight_names)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.values[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn field_names(&self) -> &[String] {
        &self.field_names
    }

    pub fn weight_names(&self) -> &[String] {
        &self.weight_names
    }

    /// Value of `field` at `row`, both 0-based.
    pub fn cell(&self, field: usize, row: usize) -> Result<&str> {
        let column = self.value_column(field)?;
        column
            .get(row)
            .map(String::as_str)
            .ok_or_else(|| DsqgenError::RowOutOfRange {
                distribution: self.name.clone(),
                row: row as i64,
                rows: column.len(),
            })
    }

    /// Value of `field` at `index` wrapped into `[0, len)`.
    ///
    /// Used when a raw generator key rather than a uniform draw selects the row.
    pub fn value_at_index_mod_size(&self, field: usize, index: i64) -> Result<&str> {
        let column = self.value_column(field)?;
        let row = index.rem_euclid(column.len() as i64) as usize;
        Ok(&column[row])
    }

    /// Draw a row index with probability proportional to the raw weights of
    /// `column`.
    pub fn pick_weighted_index(&self, column: usize, rng: &mut impl Rng) -> Result<usize> {
        let total = self.total_weight(column)?;
        if total == 0 {
            return Err(DsqgenError::EmptyWeights {
                distribution: self.name.clone(),
                column,
            });
        }
        let weight = rng.random_range(1..=total);
        self.index_for_weight(column, weight)
    }

    /// Draw a row by weight and return the value of `field` in that row.
    pub fn pick_weighted_value(
        &self,
        field: usize,
        column: usize,
        rng: &mut impl Rng,
    ) -> Result<&str> {
        let row = self.pick_weighted_index(column, rng)?;
        self.cell(field, row)
    }

    /// Smallest row whose cumulative weight is at least `weight`.
    pub fn index_for_weight(&self, column: usize, weight: u64) -> Result<usize> {
        self.weight_column(column)?
            .iter()
            .position(|&cumulative| weight <= cumulative)
            .ok_or_else(|| DsqgenError::WeightOverflow {
                distribution: self.name.clone(),
                column,
                weight,
            })
    }

    /// Raw (non-cumulative) weight of `row` in `column`.
    pub fn weight_at_index(&self, column: usize, row: usize) -> Result<u64> {
        let weights = self.weight_column(column)?;
        if row >= weights.len() {
            return Err(DsqgenError::RowOutOfRange {
                distribution: self.name.clone(),
                row: row as i64,
                rows: weights.len(),
            });
        }
        Ok(if row == 0 {
            weights[0]
        } else {
            weights[row] - weights[row - 1]
        })
    }

    /// Cumulative weights of `column`.
    pub fn cumulative_weights(&self, column: usize) -> Result<&[u64]> {
        self.weight_column(column).map(Vec::as_slice)
    }

    pub fn total_weight(&self, column: usize) -> Result<u64> {
        Ok(self.weight_column(column)?.last().copied().unwrap_or(0))
    }

    /// Resolve a weight column reference from a macro.
    ///
    /// Names are matched first. A bare number is then taken as a 1-based
    /// column ordinal, the same convention as the generated names "1", "2", ...
    pub fn weight_column_index(&self, weight: &str) -> Result<usize> {
        if let Some(idx) = self.weight_names.iter().position(|name| name == weight) {
            return Ok(idx);
        }
        match weight.parse::<usize>() {
            Ok(ordinal) if ordinal >= 1 && ordinal <= self.weights.len() => Ok(ordinal - 1),
            _ => Err(DsqgenError::UnknownWeight {
                distribution: self.name.clone(),
                weight: weight.to_string(),
                known: self.weight_names.join(", "),
            }),
        }
    }

    fn value_column(&self, field: usize) -> Result<&Vec<String>> {
        self.values
            .get(field)
            .ok_or_else(|| DsqgenError::FieldOutOfRange {
                distribution: self.name.clone(),
                field,
                fields: self.values.len(),
            })
    }

    fn weight_column(&self, column: usize) -> Result<&Vec<u64>> {
        self.weights
            .get(column)
            .ok_or_else(|| DsqgenError::UnknownWeight {
                distribution: self.name.clone(),
                weight: (column + 1).to_string(),
                known: self.weight_names.join(", "),
            })
    }
}

impl std::fmt::Debug for DistributionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DistributionTable")
            .field("name", &self.name)
            .field("rows", &self.len())
            .field("fields", &self.field_names)
            .field("weights", &self.weight_names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SAMPLE: &str = "\
-- sample
Women,apparel:10,1
Men,apparel:5,0
Books,media:0,3
";

    fn sample() -> DistributionTable {
        DistributionTable::parse("sample", SAMPLE, &["name", "class"], &["uniform", "skewed"])
            .unwrap()
    }

    #[test]
    fn test_parse_accumulates_weights() {
        let table = sample();
        assert_eq!(table.len(), 3);
        assert_eq!(table.cumulative_weights(0).unwrap(), &[10, 15, 15]);
        assert_eq!(table.cumulative_weights(1).unwrap(), &[1, 1, 4]);
        assert_eq!(table.total_weight(0).unwrap(), 15);
    }

    #[test]
    fn test_cumulative_weights_are_monotonic_and_sum_raw() {
        let table = sample();
        for column in 0..table.weight_names().len() {
            let cumulative = table.cumulative_weights(column).unwrap();
            assert!(cumulative.windows(2).all(|w| w[0] <= w[1]));
            let raw_sum: u64 = (0..table.len())
                .map(|row| table.weight_at_index(column, row).unwrap())
                .sum();
            assert_eq!(*cumulative.last().unwrap(), raw_sum);
        }
    }

    #[test]
    fn test_index_for_weight_boundaries() {
        let text = "a:10\nb:5\n";
        let table = DistributionTable::parse("two", text, &["v"], &["1"]).unwrap();
        assert_eq!(table.index_for_weight(0, 1).unwrap(), 0);
        assert_eq!(table.index_for_weight(0, 10).unwrap(), 0);
        assert_eq!(table.index_for_weight(0, 11).unwrap(), 1);
        assert_eq!(table.index_for_weight(0, 15).unwrap(), 1);
    }

    #[test]
    fn test_index_for_weight_overflow_is_an_error() {
        let table = sample();
        let err = table.index_for_weight(0, 16).unwrap_err();
        assert!(matches!(err, DsqgenError::WeightOverflow { weight: 16, .. }));
    }

    #[test]
    fn test_zero_weight_rows_are_never_drawn() {
        let table = sample();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let idx = table.pick_weighted_index(0, &mut rng).unwrap();
            assert_ne!(idx, 2, "Books has weight 0 in column 0");
            let idx = table.pick_weighted_index(1, &mut rng).unwrap();
            assert_ne!(idx, 1, "Men has weight 0 in column 1");
        }
    }

    #[test]
    fn test_pick_weighted_index_is_reproducible() {
        let table = sample();
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..50)
                .map(|_| table.pick_weighted_index(0, &mut rng).unwrap())
                .collect::<Vec<_>>()
        };
        let first = draw(42);
        assert_eq!(first, draw(42));
        assert!(first.iter().all(|&idx| idx < table.len()));
    }

    #[test]
    fn test_pick_weighted_index_known_sequence() {
        let table = sample();
        let mut rng = StdRng::seed_from_u64(42);
        let indices: Vec<usize> = (0..12)
            .map(|_| table.pick_weighted_index(0, &mut rng).unwrap())
            .collect();
        assert_eq!(indices, vec![0, 0, 0, 0, 0, 0, 1, 1, 0, 0, 1, 0]);
    }

    #[test]
    fn test_all_zero_weights_cannot_be_drawn() {
        let table = DistributionTable::parse("zero", "a:0\nb:0\n", &["v"], &["1"]).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            table.pick_weighted_index(0, &mut rng),
            Err(DsqgenError::EmptyWeights { .. })
        ));
    }

    #[test]
    fn test_cell_and_mod_size_lookup() {
        let table = sample();
        assert_eq!(table.cell(1, 2).unwrap(), "media");
        assert_eq!(table.value_at_index_mod_size(0, 4).unwrap(), "Men");
        assert_eq!(table.value_at_index_mod_size(0, -1).unwrap(), "Books");
        assert!(matches!(
            table.cell(2, 0),
            Err(DsqgenError::FieldOutOfRange { field: 2, .. })
        ));
        assert!(matches!(
            table.cell(0, 3),
            Err(DsqgenError::RowOutOfRange { row: 3, .. })
        ));
    }

    #[test]
    fn test_weight_column_index_by_name_then_ordinal() {
        let table = sample();
        assert_eq!(table.weight_column_index("skewed").unwrap(), 1);
        assert_eq!(table.weight_column_index("1").unwrap(), 0);
        assert_eq!(table.weight_column_index("2").unwrap(), 1);
        assert!(table.weight_column_index("3").is_err());
        assert!(table.weight_column_index("heavy").is_err());
    }

    #[test]
    fn test_numeric_weight_names_match_by_name() {
        let table = DistributionTable::parse("n", "a:1,2\n", &["v"], &["2", "1"]).unwrap();
        assert_eq!(table.weight_column_index("1").unwrap(), 1);
    }

    #[test]
    fn test_parse_rejects_wrong_part_count() {
        let err = DistributionTable::parse("bad", "a,b\n", &["v"], &["1"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("bad"), "{}", msg);
        assert!(msg.contains("line 1"), "{}", msg);
    }

    #[test]
    fn test_parse_rejects_wrong_value_count() {
        let err = DistributionTable::parse("bad", "-- c\na,b:1\n", &["v"], &["1"]).unwrap_err();
        assert!(matches!(err, DsqgenError::DistributionFormat { line: 2, .. }));
    }

    #[test]
    fn test_parse_rejects_negative_weight() {
        let err = DistributionTable::parse("bad", "a:-1\n", &["v"], &["1"]).unwrap_err();
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn test_parse_rejects_empty_distribution() {
        let err = DistributionTable::parse("empty", "-- nothing\n", &["v"], &["1"]).unwrap_err();
        assert!(matches!(err, DsqgenError::EmptyDistribution { .. }));
        assert!(!err.to_string().contains("line"), "{}", err);
    }

    #[test]
    fn test_parse_rejects_cumulative_weight_overflow() {
        let text = "a:9223372036854775807\nb:9223372036854775807\nc:9223372036854775807\n";
        let err = DistributionTable::parse("big", text, &["v"], &["1"]).unwrap_err();
        assert!(matches!(err, DsqgenError::DistributionFormat { line: 3, .. }));
        assert!(err.to_string().contains("overflows"), "{}", err);
    }

    #[test]
    fn test_load_missing_file() {
        let err = DistributionTable::load(
            "ghost",
            Path::new("/nonexistent/ghost.dst"),
            &["v"],
            &["1"],
        )
        .unwrap_err();
        assert!(matches!(err, DsqgenError::DistributionResource { .. }));
    }

    #[test]
    fn test_load_decodes_latin1() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("painters.dst");
        std::fs::write(&path, [b'C', 0xE9, b'z', b'a', b'n', b'n', b'e', b':', b'1', b'\n']).unwrap();
        let table = DistributionTable::load("painters", &path, &["name"], &["1"]).unwrap();
        assert_eq!(table.cell(0, 0).unwrap(), "Cézanne");
    }
}
