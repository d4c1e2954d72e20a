use anyhow::Result;

use dsqgen_core::query::parser;

use crate::args::ParseArgs;
use crate::commands::load_registry;

pub fn run(args: &ParseArgs) -> Result<()> {
    let registry = load_registry(args.distributions.as_deref())?;
    let substitution = parser::parse(&args.source, &registry)?;

    println!("{}", substitution);
    println!();
    println!("{:#?}", substitution);

    Ok(())
}
