use std::collections::BTreeMap;

use crate::distribution::DistributionRegistry;
use crate::error::{DsqgenError, Result};
use crate::query::source::TemplateSource;
use crate::query::template::Query;

/// Valid query ids.
pub const QUERY_IDS: std::ops::RangeInclusive<u8> = 1..=99;

/// Every query template a source provides, parsed once.
#[derive(Debug, Clone, Default)]
pub struct QueryCatalog {
    queries: BTreeMap<u8, Query>,
}

impl QueryCatalog {
    /// Parse every id in 1..=99 that `source` has a template for.
    pub fn load(source: &dyn TemplateSource, registry: &DistributionRegistry) -> Result<Self> {
        let mut queries = BTreeMap::new();
        for id in QUERY_IDS {
            if let Some(text) = source.load(id)? {
                queries.insert(id, Query::parse(id, &text, registry)?);
            }
        }
        tracing::debug!(
            "Loaded {} query templates from {}",
            queries.len(),
            source.describe()
        );
        Ok(Self { queries })
    }

    pub fn get(&self, id: u8) -> Result<&Query> {
        validate_query_id(id as u64)?;
        self.queries.get(&id).ok_or(DsqgenError::UnknownQuery { id })
    }

    pub fn ids(&self) -> impl Iterator<Item = u8> + '_ {
        self.queries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// Check that `id` names one of the 99 queries.
pub fn validate_query_id(id: u64) -> Result<u8> {
    match u8::try_from(id) {
        Ok(id) if QUERY_IDS.contains(&id) => Ok(id),
        _ => Err(DsqgenError::QueryIdOutOfRange { id }),
    }
}
