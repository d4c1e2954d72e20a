//! # Error Types
//!
//! Defines `DsqgenError`, the unified error enum for every failure mode in
//! dsqgen: distribution loading, macro parsing, template loading and query
//! evaluation. Every variant carries enough context (distribution name,
//! file and line, macro text, query id) to find the offending resource
//! without re-running under a debugger.

use thiserror::Error;

/// All errors that can occur in dsqgen operations.
#[derive(Error, Debug)]
pub enum DsqgenError {
    #[error("Failed to read distribution resource '{resource}': {source}")]
    DistributionResource {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed distribution '{distribution}' at line {line}: {message}")]
    DistributionFormat {
        distribution: String,
        line: usize,
        message: String,
    },

    #[error("Distribution '{distribution}' has no rows")]
    EmptyDistribution { distribution: String },

    #[error("Unknown distribution '{name}'")]
    UnknownDistribution { name: String },

    #[error("Unknown weight '{weight}' for distribution '{distribution}'\n  Known weights: {known}")]
    UnknownWeight {
        distribution: String,
        weight: String,
        known: String,
    },

    #[error("Field {field} is out of range for distribution '{distribution}' ({fields} value fields)")]
    FieldOutOfRange {
        distribution: String,
        field: usize,
        fields: usize,
    },

    #[error("Row {row} is out of range for distribution '{distribution}' ({rows} rows)")]
    RowOutOfRange {
        distribution: String,
        row: i64,
        rows: usize,
    },

    #[error("Weight column {column} of distribution '{distribution}' has a total weight of 0 and cannot be drawn from")]
    EmptyWeights { distribution: String, column: usize },

    #[error("Random weight {weight} exceeds the maximum cumulative weight of column {column} in distribution '{distribution}'")]
    WeightOverflow {
        distribution: String,
        column: usize,
        weight: u64,
    },

    #[error("Unknown substitution: {text} (original={original})")]
    Parse { text: String, original: String },

    #[error("Unknown substitution '{name}'\n  Add a `define {name} = ...;` line to the template")]
    UnknownSubstitution { name: String },

    #[error("Substitution '{name}' refers to itself while being evaluated")]
    CyclicReference { name: String },

    #[error("Substitution '{name}' is not a list; only ulist(...) defines can be indexed")]
    NotAList { name: String },

    #[error("Cached value for '{name}' is a scalar but was read as a list")]
    CacheShape { name: String },

    #[error("Index {index} is out of range for list '{name}' ({len} items)")]
    ListIndexOutOfRange {
        name: String,
        index: usize,
        len: usize,
    },

    #[error("Unknown relation '{relation}' in rowcount()")]
    UnknownRelation { relation: String },

    #[error("Expected an integer for {context}, got '{value}'")]
    InvalidNumber { value: String, context: String },

    #[error("Bad date '{value}': expected YYYY-MM-DD")]
    InvalidDate { value: String },

    #[error("Empty range: end {end} is before start {start}")]
    EmptyRange { start: String, end: String },

    #[error("Template syntax error in query {query} at line {line}: {message}")]
    TemplateSyntax {
        query: u8,
        line: usize,
        message: String,
    },

    #[error("Failed to read template for query {query} from {path}: {source}")]
    TemplateSource {
        query: u8,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Query {id} has no template loaded\n  Point [resources] templates in dsqgen.toml (or --templates) at a directory containing query{id}.tpl")]
    UnknownQuery { id: u8 },

    #[error("Query id {id} is out of range; valid ids are 1 through 99")]
    QueryIdOutOfRange { id: u64 },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Output error: {message}: {source}")]
    Output {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, DsqgenError>;
