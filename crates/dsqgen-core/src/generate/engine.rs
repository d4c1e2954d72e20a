use crate::config::DsqgenConfig;
use crate::distribution::DistributionRegistry;
use crate::error::Result;
use crate::output::GeneratedQuery;
use crate::query::parser;
use crate::query::{
    validate_query_id, BundledTemplates, DirectoryTemplates, LayeredTemplates, Query, QueryCatalog,
    RowCounts, Substitution, TemplateSource,
};

/// Expands query templates into SQL.
///
/// Holds everything generation reads: the distribution registry, the row
/// count table and the parsed query catalog. All three are immutable after
/// construction, so one generator can serve any number of threads.
#[derive(Debug, Clone)]
pub struct QueryGenerator {
    registry: DistributionRegistry,
    row_counts: RowCounts,
    catalog: QueryCatalog,
}

impl QueryGenerator {
    /// Parse every template `source` provides. Template errors fail here.
    pub fn new(
        source: &dyn TemplateSource,
        registry: DistributionRegistry,
        row_counts: RowCounts,
    ) -> Result<Self> {
        let catalog = QueryCatalog::load(source, &registry)?;
        Ok(Self {
            registry,
            row_counts,
            catalog,
        })
    }

    /// Bundled distributions, bundled templates, scale-factor-1 row counts.
    pub fn bundled() -> Result<Self> {
        Self::new(
            &BundledTemplates,
            DistributionRegistry::bundled()?,
            RowCounts::sf1(),
        )
    }

    /// Build from a `dsqgen.toml`. Configured directories override the
    /// bundled resources; anything they lack falls back to the bundled copy.
    pub fn from_config(config: &DsqgenConfig) -> Result<Self> {
        let registry = match config.distributions_dir() {
            Some(dir) => DistributionRegistry::with_overrides(&dir)?,
            None => DistributionRegistry::bundled()?,
        };
        let row_counts = RowCounts::sf1().with_overrides(&config.row_counts);

        match config.templates_dir() {
            Some(dir) => {
                let source = LayeredTemplates::over_bundled(DirectoryTemplates::new(dir)?);
                Self::new(&source, registry, row_counts)
            }
            None => Self::new(&BundledTemplates, registry, row_counts),
        }
    }

    /// Expand query `id` with the random stream seeded by `seed`.
    ///
    /// Pure: the same `(id, seed)` always returns the same text.
    pub fn generate_sql(&self, id: u8, seed: u64) -> Result<String> {
        self.catalog
            .get(id)?
            .sql(seed, &self.registry, &self.row_counts)
    }

    /// Expand several queries, each with `seed`.
    ///
    /// `progress` is called after every query with `(id, done, total)`.
    pub fn generate(
        &self,
        ids: &[u8],
        seed: u64,
        progress: Option<&dyn Fn(u8, usize, usize)>,
    ) -> Result<Vec<GeneratedQuery>> {
        let mut generated = Vec::with_capacity(ids.len());
        for (done, &id) in ids.iter().enumerate() {
            let sql = self.generate_sql(id, seed)?;
            generated.push(GeneratedQuery {
                query: id,
                seed,
                sql,
            });
            if let Some(callback) = progress {
                callback(id, done + 1, ids.len());
            }
        }
        Ok(generated)
    }

    /// The parsed template for `id`.
    pub fn query(&self, id: u8) -> Result<&Query> {
        validate_query_id(id as u64)?;
        self.catalog.get(id)
    }

    /// Ids with a loaded template, ascending.
    pub fn query_ids(&self) -> Vec<u8> {
        self.catalog.ids().collect()
    }

    pub fn registry(&self) -> &DistributionRegistry {
        &self.registry
    }

    pub fn row_counts(&self) -> &RowCounts {
        &self.row_counts
    }

    /// Parse a standalone macro against this generator's distributions.
    pub fn parse_macro(&self, source: &str) -> Result<Substitution> {
        parser::parse(source, &self.registry)
    }
}
