use std::collections::BTreeSet;

use nkit_core::model::{CategoryMap, RemoteSchema, SelectOption, TagDelta};
use nkit_core::rate_limit::RateLimiter;
use nkit_core::reconcile::{ReconcileOptions, Reconciler, plan_schema};
use proptest::prelude::*;

#[path = "fake_remote.rs"]
mod fake_remote;
use fake_remote::{COLUMN, DB, FakeRemote};

const CATEGORY_NAMES: [&str; 4] = ["A", "B", "C", "D"];
const GENES: [&str; 5] = ["g1", "g2", "g3", "g4", "g5"];
const FREE_TAGS: [&str; 3] = ["X", "Y", "Z"];

fn arb_categories() -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
    prop::collection::vec(
        (
            prop::sample::select(CATEGORY_NAMES.to_vec()),
            prop::collection::vec(prop::sample::select(GENES.to_vec()), 0..4),
        ),
        0..5,
    )
    .prop_map(|pairs| {
        pairs
            .into_iter()
            .map(|(name, genes)| {
                (
                    name.to_string(),
                    genes.into_iter().map(str::to_string).collect(),
                )
            })
            .collect()
    })
}

fn arb_tags() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(
        prop::sample::select(
            CATEGORY_NAMES
                .iter()
                .chain(FREE_TAGS.iter())
                .copied()
                .collect::<Vec<_>>(),
        ),
        0..5,
    )
}

fn arb_records() -> impl Strategy<Value = Vec<(&'static str, Vec<&'static str>)>> {
    prop::collection::vec((prop::sample::select(GENES.to_vec()), arb_tags()), 0..8)
}

fn options() -> ReconcileOptions {
    ReconcileOptions {
        database_id: DB.to_string(),
        column: COLUMN.to_string(),
        page_size: 3,
        identifier_fields: vec!["gene_name".to_string()],
        dry_run: false,
    }
}

fn fake(records: &[(&'static str, Vec<&'static str>)], schema: &[&str]) -> FakeRemote {
    let ids: Vec<String> = (0..records.len()).map(|i| format!("p{i}")).collect();
    let pages: Vec<(&str, &str, &[&str])> = records
        .iter()
        .zip(&ids)
        .map(|((gene, tags), id)| (id.as_str(), *gene, tags.as_slice()))
        .collect();
    FakeRemote::new(&pages, schema, 3)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn resulting_tags_are_preserved_plus_membership(
        pairs in arb_categories(),
        current in arb_tags(),
        gene in prop::sample::select(GENES.to_vec()),
    ) {
        let map = CategoryMap::from_pairs(pairs);
        let index = map.membership();
        let current: Vec<String> = current.into_iter().map(str::to_string).collect();

        let delta = TagDelta::compute(current.clone(), gene, &index);

        let expected: BTreeSet<&str> = current
            .iter()
            .map(String::as_str)
            .filter(|t| !map.contains(t))
            .chain(
                map.categories()
                    .iter()
                    .filter(|c| c.members.iter().any(|m| m == gene))
                    .map(|c| c.name.as_str()),
            )
            .collect();
        let actual: BTreeSet<&str> = delta.resulting.iter().map(String::as_str).collect();
        prop_assert_eq!(actual, expected);
        prop_assert_eq!(delta.resulting.len(), expected_len(&delta.resulting));
    }

    #[test]
    fn reconciliation_is_idempotent(
        pairs in arb_categories(),
        records in arb_records(),
    ) {
        let map = CategoryMap::from_pairs(pairs);
        let remote = fake(&records, &[]);

        Reconciler::new(&remote, RateLimiter::new(0.0), options())
            .run(&map)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        remote.clear_calls();
        let second = Reconciler::new(&remote, RateLimiter::new(0.0), options())
            .run(&map)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;

        prop_assert_eq!(second.updated, 0);
        prop_assert_eq!(remote.page_writes(), 0);
        prop_assert_eq!(remote.schema_writes(), 0);
    }

    #[test]
    fn schema_only_grows(
        pairs in arb_categories(),
        existing in prop::collection::btree_set(
            prop::sample::select(vec!["A", "X", "Y", "C"]),
            0..4,
        ),
    ) {
        let map = CategoryMap::from_pairs(pairs);
        let schema = RemoteSchema {
            column: COLUMN.to_string(),
            exists: true,
            options: existing
                .iter()
                .map(|name| SelectOption {
                    id: Some(format!("id-{name}")),
                    name: (*name).to_string(),
                    color: Some("default".to_string()),
                })
                .collect(),
        };

        let plan = plan_schema(&schema, &map);

        prop_assert!(plan.options.starts_with(&schema.options));
        for name in map.names() {
            prop_assert!(plan.options.iter().any(|o| o.name == name));
        }
        let unique: BTreeSet<&str> = plan.options.iter().map(|o| o.name.as_str()).collect();
        prop_assert_eq!(unique.len(), plan.options.len());
    }
}

fn expected_len(tags: &[String]) -> usize {
    tags.iter().collect::<BTreeSet<_>>().len()
}
