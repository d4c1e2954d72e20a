use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::distribution::format::decode_latin1;
use crate::distribution::table::DistributionTable;
use crate::error::{DsqgenError, Result};

/// Static description of a distribution the query templates may reference.
#[derive(Debug, Clone, Copy)]
pub struct DistributionShape {
    pub name: &'static str,
    pub field_names: &'static [&'static str],
    pub weight_names: &'static [&'static str],
    bundled: &'static [u8],
}

impl DistributionShape {
    /// File name used for directory overrides.
    pub fn file_name(&self) -> String {
        format!("{}.dst", self.name)
    }

    fn parse_bundled(&self) -> Result<DistributionTable> {
        DistributionTable::parse(
            self.name,
            &decode_latin1(self.bundled),
            self.field_names,
            self.weight_names,
        )
    }
}

macro_rules! bundled {
    ($file:literal) => {
        include_bytes!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/resources/distributions/",
            $file
        ))
    };
}

/// Every distribution name the macro language can resolve.
pub const WELL_KNOWN: &[DistributionShape] = &[
    DistributionShape {
        name: "fips_county",
        field_names: &["fips", "county", "st", "state", "zip_prefix", "gmt_offset"],
        weight_names: &[
            "uniform",
            "population",
            "timezone",
            "in_zone_1",
            "in_zone_2",
            "in_zone_3",
        ],
        bundled: bundled!("fips_county.dst"),
    },
    DistributionShape {
        name: "i_manager_id",
        field_names: &["index", "low", "high"],
        weight_names: &["1", "2"],
        bundled: bundled!("i_manager_id.dst"),
    },
    DistributionShape {
        name: "cities",
        field_names: &["city"],
        weight_names: &["usgs", "uniform", "large", "medium", "small", "unified"],
        bundled: bundled!("cities.dst"),
    },
    DistributionShape {
        name: "categories",
        field_names: &["name", "class", "has_size"],
        weight_names: &["uniform"],
        bundled: bundled!("categories.dst"),
    },
    DistributionShape {
        name: "gender",
        field_names: &["gender"],
        weight_names: &["1"],
        bundled: bundled!("gender.dst"),
    },
    DistributionShape {
        name: "marital_status",
        field_names: &["status"],
        weight_names: &["1"],
        bundled: bundled!("marital_status.dst"),
    },
    DistributionShape {
        name: "education",
        field_names: &["education"],
        weight_names: &["1"],
        bundled: bundled!("education.dst"),
    },
    DistributionShape {
        name: "colors",
        field_names: &["color"],
        weight_names: &["1", "2", "3"],
        bundled: bundled!("colors.dst"),
    },
    DistributionShape {
        name: "units",
        field_names: &["unit"],
        weight_names: &["1"],
        bundled: bundled!("units.dst"),
    },
    DistributionShape {
        name: "sizes",
        field_names: &["size"],
        weight_names: &["1", "2"],
        bundled: bundled!("sizes.dst"),
    },
    DistributionShape {
        name: "ship_mode_carrier",
        field_names: &["carrier"],
        weight_names: &["1"],
        bundled: bundled!("ship_mode_carrier.dst"),
    },
    DistributionShape {
        name: "return_reasons",
        field_names: &["reason"],
        weight_names: &["1", "2", "3", "4", "5", "6"],
        bundled: bundled!("return_reasons.dst"),
    },
];

/// Names that resolve to another distribution. `stores` has always been
/// served by the carrier table; templates depend on that.
const ALIASES: &[(&str, &str)] = &[("stores", "ship_mode_carrier")];

/// Look up the shape of a well-known distribution.
pub fn shape(name: &str) -> Option<&'static DistributionShape> {
    WELL_KNOWN.iter().find(|s| s.name == name)
}

/// Read-only lookup from distribution name to its loaded table.
///
/// Built once, then shared by reference (or `Arc`) with every query
/// generation. Tables are held behind `Arc` so parsed substitutions can keep
/// a handle to the table they draw from.
#[derive(Debug, Clone, Default)]
pub struct DistributionRegistry {
    tables: HashMap<String, Arc<DistributionTable>>,
}

impl DistributionRegistry {
    /// An empty registry. Mostly useful in tests together with [`Self::insert`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every well-known distribution from the copies compiled into the crate.
    pub fn bundled() -> Result<Self> {
        let mut registry = Self::new();
        for shape in WELL_KNOWN {
            registry.insert(shape.parse_bundled()?);
        }
        tracing::debug!("Loaded {} bundled distributions", registry.tables.len());
        Ok(registry)
    }

    /// Load the bundled distributions, replacing any that have a
    /// `<name>.dst` file in `dir`.
    pub fn with_overrides(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(DsqgenError::Config {
                message: format!("Distribution directory {} does not exist", dir.display()),
            });
        }

        let mut registry = Self::new();
        for shape in WELL_KNOWN {
            let path = dir.join(shape.file_name());
            let table = if path.is_file() {
                tracing::debug!("Loading distribution {} from {}", shape.name, path.display());
                DistributionTable::load(shape.name, &path, shape.field_names, shape.weight_names)?
            } else {
                shape.parse_bundled()?
            };
            registry.insert(table);
        }

        let entries = std::fs::read_dir(dir).map_err(|e| DsqgenError::DistributionResource {
            resource: dir.display().to_string(),
            source: e,
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("dst") {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if shape(stem).is_none() {
                tracing::warn!(
                    "Ignoring {}: '{}' is not a known distribution name",
                    path.display(),
                    stem
                );
            }
        }

        Ok(registry)
    }

    /// Register a table under its own name, replacing any previous table.
    pub fn insert(&mut self, table: DistributionTable) {
        self.tables
            .insert(table.name().to_string(), Arc::new(table));
    }

    /// Resolve a distribution by name (aliases included).
    pub fn get(&self, name: &str) -> Result<Arc<DistributionTable>> {
        self.lookup(name)
            .cloned()
            .ok_or_else(|| DsqgenError::UnknownDistribution {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Registered distribution names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn lookup(&self, name: &str) -> Option<&Arc<DistributionTable>> {
        let resolved = ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map(|(_, target)| *target)
            .unwrap_or(name);
        self.tables.get(resolved)
    }
}
