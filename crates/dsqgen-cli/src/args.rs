use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "dsqgen",
    about = "Expand benchmark query templates into reproducible SQL",
    version,
    after_help = "Examples:\n  dsqgen generate --query 3,7 --seed 42\n  dsqgen generate --templates ./query_templates --output queries.sql\n  dsqgen parse 'date([YEAR]+\"-01-01\",[YEAR]+\"-07-01\",sales)'\n  dsqgen dist fips_county"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Expand query templates into SQL
    Generate(GenerateArgs),

    /// Parse a macro expression and print its substitution tree
    Parse(ParseArgs),

    /// Print a distribution with its raw weights
    Dist(DistArgs),
}

#[derive(Parser, Debug)]
pub struct GenerateArgs {
    /// Query ids to generate (e.g., 3,7,52). Defaults to every loaded template
    #[arg(short, long, value_delimiter = ',')]
    pub query: Vec<u64>,

    /// Random seed for deterministic generation
    #[arg(long)]
    pub seed: Option<u64>,

    /// Directory of query<N>.tpl templates
    #[arg(long, env = "DSQGEN_TEMPLATES")]
    pub templates: Option<PathBuf>,

    /// Directory of <name>.dst distribution overrides
    #[arg(long, env = "DSQGEN_DISTRIBUTIONS")]
    pub distributions: Option<PathBuf>,

    /// Output file path (.sql, .json). Writes to stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (auto-detected from file extension if not specified)
    #[arg(long)]
    pub format: Option<OutputFormat>,
}

#[derive(Parser, Debug)]
pub struct ParseArgs {
    /// Macro expression, e.g. 'dist(gender, 1, 1)'
    pub source: String,

    /// Directory of <name>.dst distribution overrides
    #[arg(long, env = "DSQGEN_DISTRIBUTIONS")]
    pub distributions: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct DistArgs {
    /// Distribution name (e.g., fips_county)
    pub name: String,

    /// Directory of <name>.dst distribution overrides
    #[arg(long, env = "DSQGEN_DISTRIBUTIONS")]
    pub distributions: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table")]
    pub format: DistFormat,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Sql,
    Json,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum DistFormat {
    Table,
    Json,
}

impl GenerateArgs {
    /// Determine output format from the explicit flag or the file extension.
    pub fn output_format(&self) -> dsqgen_core::output::OutputFormat {
        use dsqgen_core::output::OutputFormat as Core;

        match self.format {
            Some(OutputFormat::Sql) => Core::Sql,
            Some(OutputFormat::Json) => Core::Json,
            None => self
                .output
                .as_ref()
                .and_then(|path| path.extension())
                .and_then(|ext| ext.to_str())
                .and_then(Core::from_name)
                .unwrap_or_default(),
        }
    }
}
