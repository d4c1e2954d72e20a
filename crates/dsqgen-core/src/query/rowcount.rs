use std::collections::{BTreeMap, HashMap};

/// Table sizes for scale factor 1 ("Database Row Counts", 1GB).
const SF1_ROW_COUNTS: &[(&str, u64)] = &[
    ("CALL_CENTER", 8),
    ("CATALOG_PAGE", 11718),
    ("CATALOG_RETURNS", 144067),
    ("CATALOG_SALES", 1441548),
    ("CUSTOMER", 100000),
    ("CUSTOMER_ADDRESS", 50000),
    ("CUSTOMER_DEMOGRAPHICS", 1920800),
    ("DATE_DIM", 73049),
    ("DBGEN_VERSION", 1),
    ("HOUSEHOLD_DEMOGRAPHICS", 7200),
    ("INCOME_BAND", 20),
    ("INVENTORY", 11745000),
    ("ITEM", 18000),
    ("PROMOTION", 300),
    ("REASON", 35),
    ("SHIP_MODE", 20),
    ("STORE", 12),
    ("STORE_RETURNS", 287514),
    ("STORE_SALES", 2880404),
    ("TIME_DIM", 86400),
    ("WAREHOUSE", 5),
    ("WEB_PAGE", 60),
    ("WEB_RETURNS", 71763),
    ("WEB_SALES", 719384),
    ("WEB_SITE", 1),
];

/// Row counts answered by `rowcount(...)`, keyed by upper-cased relation name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowCounts {
    counts: HashMap<String, u64>,
}

impl RowCounts {
    /// The scale-factor-1 table sizes.
    pub fn sf1() -> Self {
        Self {
            counts: SF1_ROW_COUNTS
                .iter()
                .map(|(name, count)| (name.to_string(), *count))
                .collect(),
        }
    }

    /// Replace or add counts, e.g. from the `[row_counts]` config section.
    pub fn with_overrides(mut self, overrides: &BTreeMap<String, u64>) -> Self {
        for (name, count) in overrides {
            self.counts.insert(name.to_uppercase(), *count);
        }
        self
    }

    /// Row count of `relation`, case-insensitively.
    pub fn get(&self, relation: &str) -> Option<u64> {
        self.counts.get(&relation.to_uppercase()).copied()
    }
}

impl Default for RowCounts {
    fn default() -> Self {
        Self::sf1()
    }
}
