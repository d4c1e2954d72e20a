use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{Duration as ChronoDuration, NaiveDate};
use indexmap::IndexMap;
use rand::Rng;

use crate::distribution::{DistributionRegistry, DistributionTable};
use crate::error::{DsqgenError, Result};
use crate::query::context::GenerationContext;
use crate::query::rowcount::RowCounts;

/// Date format used by `date(...)` bounds and results.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Extra attempts `ulist` makes to find distinct values before it accepts
/// duplicates. The total budget is `count * 2 + LIST_RETRY_BASE`.
pub const LIST_RETRY_BASE: usize = 10_000;

/// A parsed macro expression.
///
/// Every node is immutable once parsed and evaluates to a string against a
/// [`GenerationContext`]. Distribution nodes hold the table they draw from,
/// so evaluation never goes back to the registry by name.
#[derive(Debug, Clone, PartialEq)]
pub enum Substitution {
    /// A constant string.
    Fixed(String),
    /// Number of rows in a relation.
    RowCount(String),
    /// `inner` passed through a formatting function.
    Transform {
        inner: Box<Substitution>,
        format: Format,
    },
    /// Integer uniform over `[start, end]`.
    UniformRange {
        start: Box<Substitution>,
        end: Box<Substitution>,
    },
    /// `count` evaluations of `inner`, distinct where possible.
    ListOf {
        inner: Box<Substitution>,
        count: usize,
    },
    /// Calendar date uniform over `[min, max]`.
    DateBetween {
        min: Box<Substitution>,
        max: Box<Substitution>,
        kind: DateKind,
    },
    /// Integer floor division of `inner`.
    Divide {
        inner: Box<Substitution>,
        divisor: i64,
    },
    /// Cell of `field` (0-based) at the 1-based row produced by `index`.
    DistributionMember {
        index: Box<Substitution>,
        distribution: Arc<DistributionTable>,
        field: usize,
    },
    /// Weighted draw over `weight`, returning the cell of `field` (both 0-based).
    DistributionLookup {
        distribution: Arc<DistributionTable>,
        field: usize,
        weight: usize,
    },
    /// Another named substitution of the same query, evaluated at most once.
    Ref(String),
    /// Item `index` (0-based) of a named list substitution.
    ItemOf { name: String, index: usize },
    /// One of several texts, picked by integer weight.
    WeightedText(Vec<(String, u64)>),
    /// `left` followed by `right`.
    Concatenate(Box<Substitution>, Box<Substitution>),
}

/// Formatting applied by [`Substitution::Transform`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// printf-style: every `%d` becomes the bound integer.
    Integer(i64),
}

impl Format {
    pub fn apply(&self, input: &str) -> String {
        match self {
            Format::Integer(value) => input.replace("%d", &value.to_string()),
        }
    }
}

/// Classification tag of a `date(...)` macro. Every kind samples uniformly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    Sales,
    Returns,
    Exponential,
    Uniform,
}

impl DateKind {
    /// Parse a kind name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sales" => Some(DateKind::Sales),
            "returns" => Some(DateKind::Returns),
            "exponential" => Some(DateKind::Exponential),
            "uniform" => Some(DateKind::Uniform),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DateKind::Sales => "sales",
            DateKind::Returns => "returns",
            DateKind::Exponential => "exponential",
            DateKind::Uniform => "uniform",
        }
    }
}

impl Substitution {
    /// Shorthand for `Substitution::Fixed`.
    pub fn fixed(value: impl Into<String>) -> Self {
        Substitution::Fixed(value.into())
    }

    /// Evaluate this expression, consuming randomness from `ctx` in a fixed order.
    pub fn evaluate(&self, ctx: &mut GenerationContext<'_>) -> Result<String> {
        match self {
            Substitution::Fixed(value) => Ok(value.clone()),
            Substitution::RowCount(relation) => ctx.row_count(relation).map(|n| n.to_string()),
            Substitution::Transform { inner, format } => Ok(format.apply(&inner.evaluate(ctx)?)),
            Substitution::UniformRange { start, end } => {
                let start_value = start.evaluate(ctx)?;
                let low = parse_int(&start_value, "random() start")?;
                let end_value = end.evaluate(ctx)?;
                let high = parse_int(&end_value, "random() end")?;
                if high < low {
                    return Err(DsqgenError::EmptyRange {
                        start: start_value,
                        end: end_value,
                    });
                }
                Ok(ctx.rng().random_range(low..=high).to_string())
            }
            Substitution::ListOf { inner, count } => {
                Ok(render_list(&generate_list(inner, *count, ctx)?))
            }
            Substitution::DateBetween { min, max, .. } => {
                let min_value = min.evaluate(ctx)?;
                let low = parse_date(&min_value)?;
                let max_value = max.evaluate(ctx)?;
                let high = parse_date(&max_value)?;
                let span = (high - low).num_days();
                if span < 0 {
                    return Err(DsqgenError::EmptyRange {
                        start: min_value,
                        end: max_value,
                    });
                }
                let offset = ctx.rng().random_range(0..=span);
                Ok((low + ChronoDuration::days(offset))
                    .format(DATE_FORMAT)
                    .to_string())
            }
            Substitution::Divide { inner, divisor } => {
                let value = parse_int(&inner.evaluate(ctx)?, "division")?;
                Ok(value.div_euclid(*divisor).to_string())
            }
            Substitution::DistributionMember {
                index,
                distribution,
                field,
            } => {
                let ordinal = parse_int(&index.evaluate(ctx)?, "distmember() row")?;
                if ordinal < 1 || ordinal as usize > distribution.len() {
                    return Err(DsqgenError::RowOutOfRange {
                        distribution: distribution.name().to_string(),
                        row: ordinal,
                        rows: distribution.len(),
                    });
                }
                distribution
                    .cell(*field, (ordinal - 1) as usize)
                    .map(str::to_string)
            }
            Substitution::DistributionLookup {
                distribution,
                field,
                weight,
            } => distribution
                .pick_weighted_value(*field, *weight, ctx.rng())
                .map(str::to_string),
            Substitution::Ref(name) => ctx.resolve(name),
            Substitution::ItemOf { name, index } => ctx.resolve_item(name, *index),
            Substitution::WeightedText(choices) => {
                let total = choices
                    .iter()
                    .try_fold(0u64, |total, (_, weight)| total.checked_add(*weight))
                    .ok_or_else(|| DsqgenError::InvalidNumber {
                        value: self.to_string(),
                        context: "text() total weight".to_string(),
                    })?;
                if total == 0 {
                    return Err(DsqgenError::EmptyRange {
                        start: "0".to_string(),
                        end: "0".to_string(),
                    });
                }
                let draw = ctx.rng().random_range(0..total);
                let mut accumulated = 0;
                for (text, weight) in choices {
                    accumulated += weight;
                    if accumulated >= draw {
                        return Ok(text.clone());
                    }
                }
                unreachable!("accumulated weight reaches the total, which exceeds every draw")
            }
            Substitution::Concatenate(left, right) => {
                let mut value = left.evaluate(ctx)?;
                value.push_str(&right.evaluate(ctx)?);
                Ok(value)
            }
        }
    }

    /// Evaluate an expression that references no other substitutions, such
    /// as the value of `_LIMIT`. Uses a throwaway context seeded with 0.
    pub fn evaluate_constant(&self) -> Result<String> {
        let substitutions = IndexMap::new();
        let registry = DistributionRegistry::new();
        let row_counts = RowCounts::sf1();
        let mut ctx = GenerationContext::new(0, &substitutions, &registry, &row_counts);
        self.evaluate(&mut ctx)
    }
}

/// Evaluate `inner` until `count` distinct values are collected.
///
/// Once more than `count * 2 + LIST_RETRY_BASE` draws have come back as
/// duplicates, duplicates are accepted so the loop always terminates with
/// exactly `count` items.
pub(crate) fn generate_list(
    inner: &Substitution,
    count: usize,
    ctx: &mut GenerationContext<'_>,
) -> Result<Vec<String>> {
    let limit = count * 2 + LIST_RETRY_BASE;
    let mut seen = HashSet::with_capacity(count);
    let mut items = Vec::with_capacity(count);
    let mut duplicates = 0usize;

    while items.len() < count {
        let value = inner.evaluate(ctx)?;
        if seen.insert(value.clone()) {
            items.push(value);
            continue;
        }
        let exhausted = duplicates > limit;
        duplicates += 1;
        if exhausted {
            if duplicates == limit + 2 {
                tracing::debug!(
                    "ulist({}, {}) exhausted {} retries with {} distinct values; accepting duplicates",
                    inner,
                    count,
                    limit,
                    seen.len()
                );
            }
            items.push(value);
        }
    }

    Ok(items)
}

/// Scalar rendering of a list value: `[a, b, c]`.
pub(crate) fn render_list(items: &[String]) -> String {
    format!("[{}]", items.join(", "))
}

fn parse_int(value: &str, context: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| DsqgenError::InvalidNumber {
            value: value.to_string(),
            context: context.to_string(),
        })
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| DsqgenError::InvalidDate {
        value: value.to_string(),
    })
}

/// Renders the tree back in macro syntax. Field and row references are
/// shown 1-based, the way templates write them.
impl fmt::Display for Substitution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Substitution::Fixed(value) => write!(f, "\"{}\"", value),
            Substitution::RowCount(relation) => write!(f, "rowcount(\"{}\")", relation),
            Substitution::Transform { inner, format } => match format {
                Format::Integer(value) => write!(f, "format({}, %d={})", inner, value),
            },
            Substitution::UniformRange { start, end } => {
                write!(f, "random({}, {}, uniform)", start, end)
            }
            Substitution::ListOf { inner, count } => write!(f, "ulist({}, {})", inner, count),
            Substitution::DateBetween { min, max, kind } => {
                write!(f, "date({}, {}, {})", min, max, kind.as_str())
            }
            Substitution::Divide { inner, divisor } => write!(f, "{}/{}", inner, divisor),
            Substitution::DistributionMember {
                index,
                distribution,
                field,
            } => write!(
                f,
                "distmember({}, {}, {})",
                distribution.name(),
                index,
                field + 1
            ),
            Substitution::DistributionLookup {
                distribution,
                field,
                weight,
            } => {
                let weight_name = distribution
                    .weight_names()
                    .get(*weight)
                    .cloned()
                    .unwrap_or_else(|| (weight + 1).to_string());
                write!(
                    f,
                    "dist({}, {}, {})",
                    distribution.name(),
                    field + 1,
                    weight_name
                )
            }
            Substitution::Ref(name) => write!(f, "[{}]", name),
            Substitution::ItemOf { name, index } => write!(f, "[{}.{}]", name, index + 1),
            Substitution::WeightedText(choices) => {
                write!(f, "text(")?;
                for (i, (text, weight)) in choices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{{\"{}\", {}}}", text, weight)?;
                }
                write!(f, ")")
            }
            Substitution::Concatenate(left, right) => write!(f, "{}+{}", left, right),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluate_with(
        substitution: &Substitution,
        substitutions: &IndexMap<String, Substitution>,
        seed: u64,
    ) -> Result<String> {
        let registry = DistributionRegistry::bundled().unwrap();
        let row_counts = RowCounts::sf1();
        let mut ctx = GenerationContext::new(seed, substitutions, &registry, &row_counts);
        substitution.evaluate(&mut ctx)
    }

    fn boxed(value: &str) -> Box<Substitution> {
        Box::new(Substitution::fixed(value))
    }

    #[test]
    fn test_fixed_and_concatenate() {
        let sub = Substitution::Concatenate(boxed("2001"), boxed("-08-01"));
        assert_eq!(sub.evaluate_constant().unwrap(), "2001-08-01");
    }

    #[test]
    fn test_transform_formats_integer() {
        let sub = Substitution::Transform {
            inner: boxed("LIMIT %d"),
            format: Format::Integer(100),
        };
        assert_eq!(sub.evaluate_constant().unwrap(), "LIMIT 100");

        let empty = Substitution::Transform {
            inner: boxed(""),
            format: Format::Integer(100),
        };
        assert_eq!(empty.evaluate_constant().unwrap(), "");
    }

    #[test]
    fn test_rowcount_divide_floors() {
        let sub = Substitution::Divide {
            inner: Box::new(Substitution::RowCount("store_sales".to_string())),
            divisor: 5,
        };
        assert_eq!(sub.evaluate_constant().unwrap(), (2880404 / 5).to_string());
        assert_eq!(sub.evaluate_constant().unwrap(), "576080");
    }

    #[test]
    fn test_uniform_range_is_inclusive() {
        let sub = Substitution::UniformRange {
            start: boxed("1"),
            end: boxed("3"),
        };
        let map = IndexMap::new();
        let mut seen = HashSet::new();
        for seed in 0..200 {
            let value: i64 = evaluate_with(&sub, &map, seed).unwrap().parse().unwrap();
            assert!((1..=3).contains(&value));
            seen.insert(value);
        }
        assert_eq!(seen.len(), 3, "all of 1, 2 and 3 should appear");
    }

    #[test]
    fn test_uniform_range_single_value() {
        let sub = Substitution::UniformRange {
            start: boxed("7"),
            end: boxed("7"),
        };
        assert_eq!(sub.evaluate_constant().unwrap(), "7");
    }

    #[test]
    fn test_uniform_range_rejects_inverted_bounds() {
        let sub = Substitution::UniformRange {
            start: boxed("9"),
            end: boxed("3"),
        };
        assert!(matches!(
            sub.evaluate_constant(),
            Err(DsqgenError::EmptyRange { .. })
        ));
    }

    #[test]
    fn test_uniform_range_rejects_non_integer() {
        let sub = Substitution::UniformRange {
            start: boxed("one"),
            end: boxed("3"),
        };
        let err = sub.evaluate_constant().unwrap_err();
        assert!(err.to_string().contains("one"));
    }

    #[test]
    fn test_list_of_returns_exact_count_even_with_small_domain() {
        let sub = Substitution::ListOf {
            inner: Box::new(Substitution::UniformRange {
                start: boxed("1"),
                end: boxed("5"),
            }),
            count: 4,
        };
        let map = IndexMap::new();
        let registry = DistributionRegistry::new();
        let row_counts = RowCounts::sf1();
        let mut ctx = GenerationContext::new(11, &map, &registry, &row_counts);
        let items = generate_list(&sub_inner(&sub), 4, &mut ctx).unwrap();
        assert_eq!(items.len(), 4);
        let distinct: HashSet<&String> = items.iter().collect();
        assert_eq!(distinct.len(), 4, "5 values leave room for 4 distinct items");
    }

    #[test]
    fn test_list_of_accepts_duplicates_after_retry_budget() {
        // Only two possible values but six items requested.
        let inner = Substitution::UniformRange {
            start: boxed("1"),
            end: boxed("2"),
        };
        let map = IndexMap::new();
        let registry = DistributionRegistry::new();
        let row_counts = RowCounts::sf1();
        let mut ctx = GenerationContext::new(3, &map, &registry, &row_counts);
        let items = generate_list(&inner, 6, &mut ctx).unwrap();
        assert_eq!(items.len(), 6);
        let distinct: HashSet<&String> = items.iter().collect();
        assert_eq!(distinct.len(), 2);
    }

    #[test]
    fn test_list_of_renders_as_bracketed_scalar() {
        let sub = Substitution::ListOf {
            inner: boxed("x"),
            count: 1,
        };
        assert_eq!(sub.evaluate_constant().unwrap(), "[x]");
    }

    #[test]
    fn test_date_between_stays_in_range() {
        let sub = Substitution::DateBetween {
            min: boxed("2001-08-01"),
            max: boxed("2001-08-30"),
            kind: DateKind::Sales,
        };
        let map = IndexMap::new();
        let low = NaiveDate::from_ymd_opt(2001, 8, 1).unwrap();
        let high = NaiveDate::from_ymd_opt(2001, 8, 30).unwrap();
        for seed in 0..100 {
            let value = evaluate_with(&sub, &map, seed).unwrap();
            let date = NaiveDate::parse_from_str(&value, DATE_FORMAT).unwrap();
            assert!(date >= low && date <= high, "{} out of range", value);
            assert_eq!(value.len(), 10);
        }
    }

    #[test]
    fn test_date_between_rejects_bad_date() {
        let sub = Substitution::DateBetween {
            min: boxed("2001-13-01"),
            max: boxed("2001-08-30"),
            kind: DateKind::Uniform,
        };
        assert!(matches!(
            sub.evaluate_constant(),
            Err(DsqgenError::InvalidDate { .. })
        ));
    }

    #[test]
    fn test_weighted_text_never_picks_zero_weight_tail() {
        let sub = Substitution::WeightedText(vec![
            ("a".to_string(), 1),
            ("b".to_string(), 1),
            ("c".to_string(), 0),
        ]);
        let map = IndexMap::new();
        for seed in 0..100 {
            let value = evaluate_with(&sub, &map, seed).unwrap();
            assert!(value == "a" || value == "b");
        }
    }

    #[test]
    fn test_weighted_text_overflowing_total_is_an_error() {
        let sub = Substitution::WeightedText(vec![
            ("a".to_string(), u64::MAX),
            ("b".to_string(), 1),
        ]);
        assert!(matches!(
            sub.evaluate_constant(),
            Err(DsqgenError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_weighted_text_single_choice() {
        let sub = Substitution::WeightedText(vec![("only".to_string(), 3)]);
        assert_eq!(sub.evaluate_constant().unwrap(), "only");
    }

    #[test]
    fn test_distribution_member_is_one_based() {
        let registry = DistributionRegistry::bundled().unwrap();
        let categories = registry.get("categories").unwrap();
        let sub = Substitution::DistributionMember {
            index: boxed("1"),
            distribution: categories.clone(),
            field: 0,
        };
        assert_eq!(sub.evaluate_constant().unwrap(), categories.cell(0, 0).unwrap());

        let out_of_range = Substitution::DistributionMember {
            index: boxed("0"),
            distribution: categories,
            field: 0,
        };
        assert!(matches!(
            out_of_range.evaluate_constant(),
            Err(DsqgenError::RowOutOfRange { row: 0, .. })
        ));
    }

    #[test]
    fn test_distribution_lookup_returns_a_cell() {
        let registry = DistributionRegistry::bundled().unwrap();
        let gender = registry.get("gender").unwrap();
        let sub = Substitution::DistributionLookup {
            distribution: gender,
            field: 0,
            weight: 0,
        };
        let map = IndexMap::new();
        for seed in 0..20 {
            let value = evaluate_with(&sub, &map, seed).unwrap();
            assert!(value == "M" || value == "F");
        }
    }

    #[test]
    fn test_display_renders_macro_syntax() {
        let sub = Substitution::Divide {
            inner: Box::new(Substitution::RowCount("store_sales".to_string())),
            divisor: 5,
        };
        assert_eq!(sub.to_string(), "rowcount(\"store_sales\")/5");

        let item = Substitution::ItemOf {
            name: "STATE".to_string(),
            index: 0,
        };
        assert_eq!(item.to_string(), "[STATE.1]");
    }

    fn sub_inner(sub: &Substitution) -> Substitution {
        match sub {
            Substitution::ListOf { inner, .. } => (**inner).clone(),
            other => other.clone(),
        }
    }
}
