use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::distribution::DistributionRegistry;
use crate::error::{DsqgenError, Result};
use crate::query::context::GenerationContext;
use crate::query::parser;
use crate::query::rowcount::RowCounts;
use crate::query::substitution::{Format, Substitution};

static DEFINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*define\s+").unwrap());

/// Statement terminator at the end of the template body, before an optional final newline.
static TERMINATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" *; *(\n?)\z").unwrap());

/// Name of the define that sizes the `_LIMITA`/`_LIMITB`/`_LIMITC` helpers.
pub const LIMIT: &str = "_LIMIT";

/// Helper placeholders synthesized from `_LIMIT`, with their format strings.
const LIMIT_HELPERS: &[(&str, &str)] = &[("_LIMITA", ""), ("_LIMITB", ""), ("_LIMITC", "LIMIT %d")];

/// A parsed query template: SQL text with `[NAME]` placeholders plus the
/// substitutions that fill them, in expansion order.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    id: u8,
    template: String,
    defines: IndexMap<String, Substitution>,
    substitutions: IndexMap<String, Substitution>,
}

impl Query {
    /// Parse template text. Every `define` is parsed eagerly, so macro errors
    /// surface here and not at generation time.
    pub fn parse(id: u8, text: &str, registry: &DistributionRegistry) -> Result<Self> {
        let mut template = String::new();
        let mut defines = IndexMap::new();

        for (idx, line) in text.lines().enumerate() {
            if line.starts_with("--") || line.trim().is_empty() {
                continue;
            }
            match DEFINE.find(line) {
                Some(keyword) => {
                    let (name, value) = split_define(id, idx + 1, &line[keyword.end()..])?;
                    let substitution = parser::parse(&value, registry)?;
                    defines.insert(name, substitution);
                }
                None => {
                    template.push_str(line);
                    template.push('\n');
                }
            }
        }

        let template = TERMINATOR.replace(&template, "$1").into_owned();
        let substitutions = expand_defines(&defines)?;

        Ok(Self {
            id,
            template,
            defines,
            substitutions,
        })
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    /// The SQL body with placeholders still in place.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// Defines as written in the template, keyed by upper-cased name.
    pub fn defines(&self) -> &IndexMap<String, Substitution> {
        &self.defines
    }

    /// Defines plus the synthesized `_LIMIT*` helpers and list items.
    pub fn substitutions(&self) -> &IndexMap<String, Substitution> {
        &self.substitutions
    }

    /// Expand every placeholder with values drawn from a stream seeded by `seed`.
    ///
    /// Substitutions are visited in order; each one whose `[NAME]` token is
    /// present is evaluated once and every occurrence replaced.
    pub fn sql(&self, seed: u64, registry: &DistributionRegistry, row_counts: &RowCounts) -> Result<String> {
        let mut ctx = GenerationContext::new(seed, &self.substitutions, registry, row_counts);
        let mut sql = self.template.clone();

        for name in self.substitutions.keys() {
            let token = format!("[{}]", name);
            if sql.contains(&token) {
                let value = ctx.resolve(name)?;
                sql = sql.replace(&token, &value);
            }
        }

        Ok(sql)
    }
}

/// Split `NAME = VALUE;  -- comment` into the upper-cased name and the
/// macro source.
fn split_define(query: u8, line: usize, rest: &str) -> Result<(String, String)> {
    let eq = rest.find('=').ok_or_else(|| DsqgenError::TemplateSyntax {
        query,
        line,
        message: "define without '='".to_string(),
    })?;

    let name = rest[..eq].trim().to_uppercase();
    if name.is_empty() {
        return Err(DsqgenError::TemplateSyntax {
            query,
            line,
            message: "define without a name".to_string(),
        });
    }

    let mut value = &rest[eq + 1..];
    if let Some(comment) = value.find("--") {
        value = &value[..comment];
    }
    let value = value.trim_end();
    let value = value.strip_suffix(';').unwrap_or(value).trim();

    Ok((name, value.to_string()))
}

/// Build the expansion-ordered substitution map from the raw defines.
fn expand_defines(defines: &IndexMap<String, Substitution>) -> Result<IndexMap<String, Substitution>> {
    let mut substitutions = IndexMap::new();

    if let Some(limit) = defines.get(LIMIT) {
        let value = limit.evaluate_constant()?;
        let limit = value
            .trim()
            .parse::<i64>()
            .map_err(|_| DsqgenError::InvalidNumber {
                value: value.clone(),
                context: LIMIT.to_string(),
            })?;
        for (name, format) in LIMIT_HELPERS {
            substitutions.insert(
                name.to_string(),
                Substitution::Transform {
                    inner: Box::new(Substitution::fixed(*format)),
                    format: Format::Integer(limit),
                },
            );
        }
    }

    for (name, substitution) in defines {
        substitutions.insert(name.clone(), substitution.clone());
        if let Substitution::ListOf { count, .. } = substitution {
            for i in 0..*count {
                substitutions.insert(
                    format!("{}.{}", name, i + 1),
                    Substitution::ItemOf {
                        name: name.clone(),
                        index: i,
                    },
                );
            }
        }
    }

    Ok(substitutions)
}
