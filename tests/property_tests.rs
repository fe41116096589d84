//! Property-based tests for trueno-metrics
//!
//! Following ruchy/trueno/aprender pattern:
//! - Test mathematical invariants (interval law, codec round trip)
//! - Test key/path integrity properties
//! - Run with ProptestConfig::with_cases(100)
//! - Must complete in <30 seconds for pre-commit hook

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use std::path::Path;
use trueno_metrics::engine::{evaluate, lifetime_intersects};
use trueno_metrics::event::Event;
use trueno_metrics::metric::{
    format_date, MetricParameter, MetricRegistry, ACTIVE_TENANT_COUNT, MAX_COUNT,
};
use trueno_metrics::store::{path, MemoryResultStore, ResultStore};
use trueno_metrics::value::{ListOfStringList, ResultValue};

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

fn base_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 1, 1).unwrap()
}

/// Generate a day within a few years of 2010-01-01
fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0u64..3000).prop_map(|offset| base_day() + Days::new(offset))
}

/// Generate an ordered (from, to) range
fn arb_range() -> impl Strategy<Value = (NaiveDate, NaiveDate)> {
    (arb_date(), 0u64..400).prop_map(|(from, len)| (from, from + Days::new(len)))
}

/// Generate strings that need JSON escaping now and then
fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z0-9_-]{0,12}",
        "[ -~]{0,12}",
        "\\PC{0,8}",
    ]
}

fn arb_result_value() -> impl Strategy<Value = ResultValue> {
    prop_oneof![
        any::<i64>().prop_map(ResultValue::Scalar),
        proptest::collection::vec(arb_text(), 0..8).prop_map(ResultValue::StringList),
        proptest::collection::vec(proptest::collection::vec(arb_text(), 0..4), 0..6)
            .prop_map(|lists| ResultValue::ListOfStringList(lists.into_iter().collect())),
    ]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // ========================================================================
    // Value codec
    // ========================================================================

    /// Property: decode(shape, encode(v)) == v
    #[test]
    fn prop_value_roundtrip(value in arb_result_value()) {
        let text = value.encode();
        let decoded = ResultValue::decode(value.shape(), &text).unwrap();
        prop_assert_eq!(decoded, value);
    }

    /// Property: ListOfStringList equality ignores outer order
    #[test]
    fn prop_outer_order_ignored(
        lists in proptest::collection::vec(proptest::collection::vec(arb_text(), 1..3), 0..6)
    ) {
        let forward: ListOfStringList = lists.iter().cloned().collect();
        let backward: ListOfStringList = lists.iter().rev().cloned().collect();
        prop_assert_eq!(forward, backward);
    }

    // ========================================================================
    // Storage paths
    // ========================================================================

    /// Property: path derivation is deterministic and separates TO_DATE
    #[test]
    fn prop_path_determinism((from, to) in arb_range(), extra in 1u64..30) {
        let registry = MetricRegistry::builtin();
        let kind = registry.lookup(ACTIVE_TENANT_COUNT).unwrap();
        let base = Path::new("target");

        let a = kind.make_key(&[format_date(from), format_date(to)]).unwrap();
        let b = registry
            .make_key_named(
                ACTIVE_TENANT_COUNT,
                [(MetricParameter::ToDate, format_date(to)), (MetricParameter::FromDate, format_date(from))],
            )
            .unwrap();
        prop_assert_eq!(path(base, kind, &a).unwrap(), path(base, kind, &b).unwrap());

        let later = kind
            .make_key(&[format_date(from), format_date(to + Days::new(extra))])
            .unwrap();
        prop_assert_ne!(path(base, kind, &a).unwrap(), path(base, kind, &later).unwrap());
    }

    /// Property: LIMIT accepts exactly 0..=MAX_COUNT
    #[test]
    fn prop_limit_bounds(limit in 0u32..20_000) {
        let coerced = MetricParameter::Limit.coerce(&limit.to_string());
        prop_assert_eq!(coerced.is_ok(), limit <= MAX_COUNT);
    }

    // ========================================================================
    // Interval semantics
    // ========================================================================

    /// Property: created D1, destroyed D2 (D1 < D2) is active for [F, T]
    /// iff F < D2 and T >= D1
    #[test]
    fn prop_interval_law(
        created in arb_date(),
        lifetime in 1u64..400,
        (from, to) in arb_range(),
    ) {
        let destroyed = created + Days::new(lifetime);
        prop_assert_eq!(
            lifetime_intersects(created, Some(destroyed), from, to),
            from < destroyed && to >= created
        );

        let events = vec![
            Event::tenant_created("ws", "u").date(created).build(),
            Event::tenant_destroyed("ws").date(destroyed).build(),
        ];
        let registry = MetricRegistry::builtin();
        let kind = registry.lookup(ACTIVE_TENANT_COUNT).unwrap();
        let key = kind.make_key(&[format_date(from), format_date(to)]).unwrap();
        let expected = i64::from(from < destroyed && to >= created);
        prop_assert_eq!(evaluate(kind, &events, &key).unwrap(), ResultValue::Scalar(expected));
    }

    /// Property: empty-range evaluate == default == load on an unstored key
    #[test]
    fn prop_empty_evaluate_matches_miss((from, to) in arb_range(), limit in 0u32..50) {
        let registry = MetricRegistry::builtin();
        let store = MemoryResultStore::new();

        for kind in registry.kinds() {
            let values: Vec<String> = kind
                .parameters()
                .iter()
                .map(|p| match p {
                    MetricParameter::ToDate => format_date(to),
                    MetricParameter::Limit => limit.to_string(),
                    MetricParameter::Date | MetricParameter::FromDate => format_date(from),
                })
                .collect();
            let key = kind.make_key(&values).unwrap();

            let computed = evaluate(kind, &[], &key).unwrap();
            prop_assert_eq!(&computed, &kind.default_value());
            prop_assert_eq!(store.load(kind, &key).unwrap(), computed);
            prop_assert!(!store.exists(kind, &key).unwrap());
        }
    }
}
