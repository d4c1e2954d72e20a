use dsqgen_core::distribution::DistributionTable;
use dsqgen_core::query::{MemoryTemplates, RowCounts};
use dsqgen_core::{DistributionRegistry, QueryGenerator};

/// A two-row distribution with raw weights `[10, 5]` (cumulative `[10, 15]`)
/// in its first weight column and `[0, 1]` in its second.
pub fn two_tier_distribution() -> DistributionTable {
    DistributionTable::parse(
        "tiers",
        "-- tiers\ngold,1:10,0\nsilver,2:5,1\n",
        &["name", "rank"],
        &["common", "rare"],
    )
    .expect("fixture distribution parses")
}

/// The bundled registry plus the `tiers` fixture.
pub fn registry_with_tiers() -> DistributionRegistry {
    let mut registry = DistributionRegistry::bundled().expect("bundled distributions load");
    registry.insert(two_tier_distribution());
    registry
}

/// Small templates covering each macro form.
pub fn sample_templates() -> MemoryTemplates {
    MemoryTemplates::new()
        .with(
            1,
            "define NAME = \"X\";\nselect [NAME] from t where c = '[NAME]';\n",
        )
        .with(
            2,
            "define YEAR = 2001;\n\
             define SDATE = date([YEAR]+\"-08-01\",[YEAR]+\"-08-30\",sales);\n\
             select d_date from date_dim where d_date = '[SDATE]';\n",
        )
        .with(
            3,
            "define L = ulist(random(1,5,uniform),4);\n\
             select [L.1], [L.2], [L.3], [L.4];\n",
        )
        .with(
            4,
            "define TICKETS = rowcount(\"store_sales\")/5;\n\
             define _LIMIT = 10;\n\
             [_LIMITA] select [_LIMITB] count(*) from store_sales where ss_ticket_number <= [TICKETS] [_LIMITC];\n",
        )
        .with(
            5,
            "define TIER = dist(tiers, 1, common);\n\
             define GEN = text({\"M\",1},{\"F\",1});\n\
             select '[TIER]', '[GEN]';\n",
        )
}

/// A generator over [`sample_templates`] and [`registry_with_tiers`].
pub fn sample_generator() -> QueryGenerator {
    QueryGenerator::new(&sample_templates(), registry_with_tiers(), RowCounts::sf1())
        .expect("sample templates parse")
}
