//! Recursive-descent parser for the template macro language.
//!
//! Forms are recognised by prefix, in a fixed order: `text(`, quoted
//! literal, `ulist(`, `date(`, `rowcount(`, `distmember(`, `dist(`/`DIST(`,
//! `random(`, `[NAME]`, bare integer. Anything else is a parse error.

use std::sync::Arc;
use std::sync::LazyLock;

use regex::Regex;

use crate::distribution::{DistributionRegistry, DistributionTable};
use crate::error::{DsqgenError, Result};
use crate::query::substitution::{DateKind, Substitution};

/// `rowcount(...)/N` divisor suffix.
static DIVISOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/([0-9]+)$").unwrap());

/// Distribution-name argument that one upstream template passes to `dist(...)`.
/// It is read as the plain `categories` distribution.
const CATEGORIES_MEMBER_ARG: &str = "distmember(categories,[CINDX],2)";

/// Largest item count `ulist(...)` accepts. Each item becomes its own
/// `[NAME.k]` placeholder.
pub const MAX_LIST_COUNT: usize = 10_000;

/// Parse a macro expression into a substitution tree.
///
/// Distribution names are resolved against `registry` immediately, so a
/// successfully parsed tree never fails with an unknown distribution.
pub fn parse(source: &str, registry: &DistributionRegistry) -> Result<Substitution> {
    Parser { source, registry }.expression(source.trim())
}

struct Parser<'a> {
    source: &'a str,
    registry: &'a DistributionRegistry,
}

impl Parser<'_> {
    fn expression(&self, s: &str) -> Result<Substitution> {
        if s.starts_with("text(") {
            return self.text(s);
        }
        if s.len() >= 2 && s.starts_with('"') && s.ends_with('"') {
            return Ok(Substitution::fixed(&s[1..s.len() - 1]));
        }
        if s.starts_with("ulist(") {
            let args = self.args(s, "ulist(", ")", 2)?;
            let count = parse_number::<usize>(&args[1], "ulist() count")?;
            if count > MAX_LIST_COUNT {
                return Err(self.error(s));
            }
            return Ok(Substitution::ListOf {
                inner: Box::new(self.expression(&args[0])?),
                count,
            });
        }
        if s.starts_with("date(") {
            let args = self.args(s, "date(", ")", 3)?;
            let kind = DateKind::from_name(&args[2]).ok_or_else(|| self.error(s))?;
            return Ok(Substitution::DateBetween {
                min: Box::new(self.expression(&args[0])?),
                max: Box::new(self.expression(&args[1])?),
                kind,
            });
        }
        if s.starts_with("rowcount(") {
            return self.rowcount(s);
        }
        if s.starts_with("distmember(") {
            let args = self.args(s, "distmember(", ")", 3)?;
            let distribution = self.registry.get(&args[0])?;
            let field = value_field(&distribution, &args[2])?;
            return Ok(Substitution::DistributionMember {
                index: Box::new(self.expression(&args[1])?),
                distribution,
                field,
            });
        }
        if let Some(rest) = s.strip_prefix("DIST(") {
            return self.dist(&format!("dist({}", rest));
        }
        if s.starts_with("dist(") {
            return self.dist(s);
        }
        if s.starts_with("random(") {
            let args = self.args(s, "random(", ")", 3)?;
            if !args[2].eq_ignore_ascii_case("uniform") {
                return Err(self.error(s));
            }
            return Ok(Substitution::UniformRange {
                start: Box::new(self.expression(&args[0])?),
                end: Box::new(self.expression(&args[1])?),
            });
        }
        if s.starts_with('[') {
            if let Some(close) = s.find(']') {
                let reference = Substitution::Ref(s[1..close].to_string());
                let rest = &s[close + 1..];
                if rest.is_empty() {
                    return Ok(reference);
                }
                if let Some(tail) = rest.strip_prefix('+') {
                    let next = self.expression(tail.trim())?;
                    return Ok(Substitution::Concatenate(Box::new(reference), Box::new(next)));
                }
                return Err(self.error(s));
            }
        }
        if s.parse::<i64>().is_ok() {
            return Ok(Substitution::fixed(s));
        }
        Err(self.error(s))
    }

    /// `text(ARG)` or `text({"a", 3}, {"b", 1}, ...)`.
    fn text(&self, s: &str) -> Result<Substitution> {
        let args = self.args(s, "text(", ")", 0)?;
        if args.len() == 1 {
            return Ok(Substitution::Fixed(args[0].clone()));
        }

        let mut choices = Vec::with_capacity(args.len());
        for arg in &args {
            let pair = self.args(arg, "{", "}", 2)?;
            let text = unquote(&pair[0]).to_string();
            let weight = parse_number::<u64>(&pair[1], "text() weight")?;
            choices.push((text, weight));
        }
        let total = choices
            .iter()
            .try_fold(0u64, |total, (_, weight)| total.checked_add(*weight));
        if matches!(total, None | Some(0)) {
            return Err(self.error(s));
        }
        Ok(Substitution::WeightedText(choices))
    }

    /// `rowcount(... , RELATION)` with an optional `/N` divisor.
    fn rowcount(&self, s: &str) -> Result<Substitution> {
        let (call, divisor) = match DIVISOR.captures(s) {
            Some(caps) => {
                let whole = caps.get(0).map_or(0, |m| m.start());
                let divisor = parse_number::<i64>(&caps[1], "rowcount() divisor")?;
                (&s[..whole], divisor)
            }
            None => (s, 1),
        };

        let args = self.args(call, "rowcount(", ")", 0)?;
        let relation = args
            .last()
            .map(|arg| unquote(arg).to_string())
            .ok_or_else(|| self.error(s))?;

        let count = Substitution::RowCount(relation);
        if divisor > 1 {
            return Ok(Substitution::Divide {
                inner: Box::new(count),
                divisor,
            });
        }
        Ok(count)
    }

    /// `dist(DISTNAME, FIELD, WEIGHT)`.
    fn dist(&self, s: &str) -> Result<Substitution> {
        let args = self.args(s, "dist(", ")", 3)?;
        let name = if args[0] == CATEGORIES_MEMBER_ARG {
            "categories"
        } else {
            args[0].as_str()
        };
        let distribution = self.registry.get(name)?;
        let field = value_field(&distribution, &args[1])?;
        let weight = distribution.weight_column_index(&args[2])?;
        Ok(Substitution::DistributionLookup {
            distribution,
            field,
            weight,
        })
    }

    /// Strip `prefix`/`suffix` and split the arguments. `expected == 0`
    /// accepts any non-empty argument list.
    fn args(&self, s: &str, prefix: &str, suffix: &str, expected: usize) -> Result<Vec<String>> {
        let inner = s
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_suffix(suffix))
            .ok_or_else(|| self.error(s))?;
        let args: Vec<String> = split_args(inner)
            .into_iter()
            .map(|arg| arg.trim().to_string())
            .collect();
        if args.is_empty() || (expected > 0 && args.len() != expected) {
            return Err(self.error(s));
        }
        Ok(args)
    }

    fn error(&self, text: &str) -> DsqgenError {
        DsqgenError::Parse {
            text: text.to_string(),
            original: self.source.to_string(),
        }
    }
}

/// Split an argument list on top-level commas.
///
/// Commas nested in `()`/`{}` or inside double quotes do not separate.
/// Spaces right after a separating comma are skipped; an empty trailing
/// remainder is dropped.
pub fn split_args(inner: &str) -> Vec<&str> {
    let bytes = inner.as_bytes();
    let mut args = Vec::new();
    let mut depth = 0i32;
    let mut in_quote = false;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'{' => depth += 1,
            b')' | b'}' => depth -= 1,
            b'"' => in_quote = !in_quote,
            b',' if depth == 0 && !in_quote => {
                args.push(&inner[start..i]);
                while i + 1 < bytes.len() && bytes[i + 1] == b' ' {
                    i += 1;
                }
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if bytes.len() > start {
        args.push(&inner[start..]);
    }
    args
}

/// 1-based value field ordinal → 0-based column index.
fn value_field(distribution: &Arc<DistributionTable>, text: &str) -> Result<usize> {
    let field = parse_number::<usize>(text, "distribution field")?;
    let fields = distribution.field_names().len();
    if field == 0 || field > fields {
        return Err(DsqgenError::FieldOutOfRange {
            distribution: distribution.name().to_string(),
            field,
            fields,
        });
    }
    Ok(field - 1)
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(s)
}

fn parse_number<T: std::str::FromStr>(text: &str, context: &str) -> Result<T> {
    text.trim()
        .parse::<T>()
        .map_err(|_| DsqgenError::InvalidNumber {
            value: text.to_string(),
            context: context.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DistributionRegistry {
        DistributionRegistry::bundled().unwrap()
    }

    #[test]
    fn test_split_args_respects_nesting_and_quotes() {
        assert_eq!(split_args("a, b,c"), vec!["a", "b", "c"]);
        assert_eq!(
            split_args("random(1,5,uniform), 4"),
            vec!["random(1,5,uniform)", "4"]
        );
        assert_eq!(
            split_args("{\"x, y\",1},{\"z\",2}"),
            vec!["{\"x, y\",1}", "{\"z\",2}"]
        );
        assert_eq!(split_args("\"a,b\""), vec!["\"a,b\""]);
        assert_eq!(split_args("a,"), vec!["a"]);
        assert!(split_args("").is_empty());
    }

    #[test]
    fn test_literals() {
        let reg = registry();
        assert_eq!(parse("\"abc\"", &reg).unwrap(), Substitution::fixed("abc"));
        assert_eq!(parse("42", &reg).unwrap(), Substitution::fixed("42"));
        assert_eq!(parse("-3", &reg).unwrap(), Substitution::fixed("-3"));
        assert_eq!(parse("text(Men)", &reg).unwrap(), Substitution::fixed("Men"));
    }

    #[test]
    fn test_unknown_form_is_parse_error() {
        let reg = registry();
        let err = parse("bogus(1,2)", &reg).unwrap_err();
        match err {
            DsqgenError::Parse { text, original } => {
                assert_eq!(text, "bogus(1,2)");
                assert_eq!(original, "bogus(1,2)");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_nested_parse_error_keeps_original() {
        let reg = registry();
        let err = parse("ulist(bogus, 3)", &reg).unwrap_err();
        assert!(err.to_string().contains("bogus"));
        assert!(err.to_string().contains("original=ulist(bogus, 3)"));
    }

    #[test]
    fn test_weighted_text() {
        let reg = registry();
        let sub = parse("text({\"Women\",1},{\"Men\",1},{\"Unknown\",0})", &reg).unwrap();
        assert_eq!(
            sub,
            Substitution::WeightedText(vec![
                ("Women".to_string(), 1),
                ("Men".to_string(), 1),
                ("Unknown".to_string(), 0),
            ])
        );
        assert!(parse("text({\"a\",0},{\"b\",0})", &reg).is_err());
        assert!(parse("text({\"a\",1},plain)", &reg).is_err());
    }

    #[test]
    fn test_weighted_text_total_must_fit() {
        let reg = registry();
        let err = parse("text({\"a\",18446744073709551615},{\"b\",1})", &reg).unwrap_err();
        assert!(matches!(err, DsqgenError::Parse { .. }));
        assert!(parse("text({\"a\",18446744073709551614},{\"b\",1})", &reg).is_ok());
    }

    #[test]
    fn test_rowcount_with_divisor() {
        let reg = registry();
        let sub = parse("rowcount(\"store_sales\")/5", &reg).unwrap();
        assert_eq!(
            sub,
            Substitution::Divide {
                inner: Box::new(Substitution::RowCount("store_sales".to_string())),
                divisor: 5,
            }
        );
        assert_eq!(sub.evaluate_constant().unwrap(), "576080");
    }

    #[test]
    fn test_rowcount_uses_last_argument() {
        let reg = registry();
        let sub = parse("rowcount(\"active_counties\", \"store\")", &reg).unwrap();
        assert_eq!(sub, Substitution::RowCount("store".to_string()));
        assert_eq!(
            parse("rowcount(\"item\")/1", &reg).unwrap(),
            Substitution::RowCount("item".to_string())
        );
    }

    #[test]
    fn test_ulist_and_random() {
        let reg = registry();
        let sub = parse("ulist(random(10000,99999,uniform),400)", &reg).unwrap();
        match sub {
            Substitution::ListOf { inner, count } => {
                assert_eq!(count, 400);
                assert!(matches!(*inner, Substitution::UniformRange { .. }));
            }
            other => panic!("expected list, got {other:?}"),
        }
        assert!(parse("random(1, 5, normal)", &reg).is_err());
        assert!(parse("random(1, 5)", &reg).is_err());
    }

    #[test]
    fn test_ulist_count_is_capped() {
        let reg = registry();
        let limit = format!("ulist(random(1,5,uniform),{})", MAX_LIST_COUNT);
        assert!(parse(&limit, &reg).is_ok());
        assert!(matches!(
            parse("ulist(random(1,5,uniform),4000000000)", &reg),
            Err(DsqgenError::Parse { .. })
        ));
    }

    #[test]
    fn test_date_with_concatenated_bounds() {
        let reg = registry();
        let sub = parse("date([YEAR]+\"-08-01\",[YEAR]+\"-08-30\",sales)", &reg).unwrap();
        match sub {
            Substitution::DateBetween { min, max, kind } => {
                assert_eq!(kind, DateKind::Sales);
                assert_eq!(
                    *min,
                    Substitution::Concatenate(
                        Box::new(Substitution::Ref("YEAR".to_string())),
                        Box::new(Substitution::fixed("-08-01")),
                    )
                );
                assert_eq!(max.to_string(), "[YEAR]+\"-08-30\"");
            }
            other => panic!("expected date, got {other:?}"),
        }
        assert!(parse("date(\"2001-01-01\",\"2001-02-01\",weekly)", &reg).is_err());
    }

    #[test]
    fn test_dist_resolves_weight_by_name_or_ordinal() {
        let reg = registry();
        match parse("dist(fips_county, 3, population)", &reg).unwrap() {
            Substitution::DistributionLookup {
                distribution,
                field,
                weight,
            } => {
                assert_eq!(distribution.name(), "fips_county");
                assert_eq!(field, 2);
                assert_eq!(weight, 1);
            }
            other => panic!("expected dist, got {other:?}"),
        }
        match parse("DIST(colors, 1, 2)", &reg).unwrap() {
            Substitution::DistributionLookup { field, weight, .. } => {
                assert_eq!(field, 0);
                assert_eq!(weight, 1);
            }
            other => panic!("expected dist, got {other:?}"),
        }
        assert!(matches!(
            parse("dist(colors, 1, heavy)", &reg),
            Err(DsqgenError::UnknownWeight { .. })
        ));
    }

    #[test]
    fn test_dist_categories_member_argument_reads_categories() {
        let reg = registry();
        match parse("dist(distmember(categories,[CINDX],2),1,1)", &reg).unwrap() {
            Substitution::DistributionLookup { distribution, .. } => {
                assert_eq!(distribution.name(), "categories");
            }
            other => panic!("expected dist, got {other:?}"),
        }
    }

    #[test]
    fn test_distmember() {
        let reg = registry();
        match parse("distmember(fips_county, [COUNTY], 3)", &reg).unwrap() {
            Substitution::DistributionMember {
                index,
                distribution,
                field,
            } => {
                assert_eq!(*index, Substitution::Ref("COUNTY".to_string()));
                assert_eq!(distribution.name(), "fips_county");
                assert_eq!(field, 2);
            }
            other => panic!("expected distmember, got {other:?}"),
        }
        assert!(matches!(
            parse("distmember(gender, 1, 5)", &reg),
            Err(DsqgenError::FieldOutOfRange { field: 5, .. })
        ));
        assert!(matches!(
            parse("distmember(planets, 1, 1)", &reg),
            Err(DsqgenError::UnknownDistribution { .. })
        ));
    }

    #[test]
    fn test_reference_forms() {
        let reg = registry();
        assert_eq!(
            parse("[STATE.2]", &reg).unwrap(),
            Substitution::Ref("STATE.2".to_string())
        );
        assert!(parse("[YEAR]-1", &reg).is_err());
        assert!(parse("[UNCLOSED", &reg).is_err());
    }

    #[test]
    fn test_display_round_trips_through_parser() {
        let reg = registry();
        for source in [
            "rowcount(\"store_sales\")/5",
            "ulist(random(1, 5, uniform), 4)",
            "date([YEAR]+\"-01-01\", [YEAR]+\"-12-31\", returns)",
            "dist(gender, 1, 1)",
            "distmember(i_manager_id, [MGR], 2)",
            "text({\"a\", 2}, {\"b\", 1})",
        ] {
            let parsed = parse(source, &reg).unwrap();
            let reparsed = parse(&parsed.to_string(), &reg).unwrap();
            assert_eq!(parsed, reparsed, "{source}");
        }
    }
}
