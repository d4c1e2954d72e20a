use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::distribution::DistributionRegistry;
use crate::error::{DsqgenError, Result};
use crate::query::rowcount::RowCounts;
use crate::query::substitution::{generate_list, render_list, Substitution};

/// A memoized evaluation result. `ulist` targets cache as lists, everything
/// else as scalars.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    Scalar(String),
    List(Vec<String>),
}

/// Per-instantiation evaluation state: the random stream, the query's
/// substitutions, shared lookup tables and the reference cache.
///
/// A context is built for one `(query, seed)` expansion and dropped
/// afterwards. Only the cache and the random source mutate.
pub struct GenerationContext<'a> {
    rng: StdRng,
    substitutions: &'a IndexMap<String, Substitution>,
    registry: &'a DistributionRegistry,
    row_counts: &'a RowCounts,
    cache: HashMap<String, CachedValue>,
    in_progress: HashSet<String>,
}

impl<'a> GenerationContext<'a> {
    pub fn new(
        seed: u64,
        substitutions: &'a IndexMap<String, Substitution>,
        registry: &'a DistributionRegistry,
        row_counts: &'a RowCounts,
    ) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            substitutions,
            registry,
            row_counts,
            cache: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// The substitution registered under `name` for this query.
    pub fn substitution(&self, name: &str) -> Result<&'a Substitution> {
        let substitutions = self.substitutions;
        substitutions
            .get(name)
            .ok_or_else(|| DsqgenError::UnknownSubstitution {
                name: name.to_string(),
            })
    }

    /// Row count for `relation`. Relations that are not tables fall back to
    /// the size of the distribution with that name (e.g. `categories`).
    pub fn row_count(&self, relation: &str) -> Result<u64> {
        if let Some(count) = self.row_counts.get(relation) {
            return Ok(count);
        }
        if self.registry.contains(relation) {
            return Ok(self.registry.get(relation)?.len() as u64);
        }
        Err(DsqgenError::UnknownRelation {
            relation: relation.to_string(),
        })
    }

    pub fn cached(&self, name: &str) -> Option<&CachedValue> {
        self.cache.get(name)
    }

    /// Scalar value of a named substitution, evaluating it on first use.
    pub fn resolve(&mut self, name: &str) -> Result<String> {
        match self.cache.get(name) {
            Some(CachedValue::Scalar(value)) => return Ok(value.clone()),
            Some(CachedValue::List(items)) => return Ok(render_list(items)),
            None => {}
        }

        let substitution = self.substitution(name)?;
        self.enter(name)?;
        let result = match substitution {
            Substitution::ListOf { inner, count } => {
                generate_list(inner, *count, self).map(CachedValue::List)
            }
            other => other.evaluate(self).map(CachedValue::Scalar),
        };
        self.in_progress.remove(name);

        let value = result?;
        let rendered = match &value {
            CachedValue::Scalar(value) => value.clone(),
            CachedValue::List(items) => render_list(items),
        };
        self.cache.insert(name.to_string(), value);
        Ok(rendered)
    }

    /// Item `index` (0-based) of the list substitution `name`.
    pub fn resolve_item(&mut self, name: &str, index: usize) -> Result<String> {
        if !self.cache.contains_key(name) {
            let (inner, count) = match self.substitution(name)? {
                Substitution::ListOf { inner, count } => (inner, *count),
                _ => {
                    return Err(DsqgenError::NotAList {
                        name: name.to_string(),
                    })
                }
            };
            self.enter(name)?;
            let items = generate_list(inner, count, self);
            self.in_progress.remove(name);
            self.cache
                .insert(name.to_string(), CachedValue::List(items?));
        }

        match self.cache.get(name) {
            Some(CachedValue::List(items)) => {
                items
                    .get(index)
                    .cloned()
                    .ok_or_else(|| DsqgenError::ListIndexOutOfRange {
                        name: name.to_string(),
                        index,
                        len: items.len(),
                    })
            }
            _ => Err(DsqgenError::CacheShape {
                name: name.to_string(),
            }),
        }
    }

    fn enter(&mut self, name: &str) -> Result<()> {
        if !self.in_progress.insert(name.to_string()) {
            return Err(DsqgenError::CyclicReference {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}
