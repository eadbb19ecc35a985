//! Property tests for matching, coercion and batch atomicity.

use paramkit::{
    AttributeAddress, AttributeOwner, BatchMode, BatchOutcome, DocumentGraph, FuzzyMatcher, InMemoryGraph,
    InputUnit, MutationRequest, NamePattern, NativeValue, Outcome, ParamConfig, RawValue, StorageKind,
    TransactionCoordinator, UnitRule, ValueCoercer,
};
use proptest::prelude::*;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

fn arb_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z _()-]{0,14}"
}

fn arb_raw() -> impl Strategy<Value = RawValue> {
    prop_oneof![
        (-1.0e6..1.0e6f64).prop_map(RawValue::Number),
        "[0-9a-z. ]{0,8}".prop_map(RawValue::Text),
    ]
}

fn mm_coercer() -> ValueCoercer {
    ValueCoercer::new(
        InputUnit::Millimeters,
        &[UnitRule::new(
            "Spacing",
            NamePattern::contains("Spacing"),
            InputUnit::Millimeters,
            304.8,
        )],
        &[],
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn matcher_ignores_candidate_order(
        query in arb_name(),
        candidates in prop::collection::vec(arb_name(), 0..8),
    ) {
        let matcher = FuzzyMatcher::default();
        let forward = matcher.find_match(&query, &candidates);
        let reversed: Vec<&String> = candidates.iter().rev().collect();
        prop_assert_eq!(&forward, &matcher.find_match(&query, reversed));
        prop_assert_eq!(&forward, &matcher.find_match(&query, &candidates));
        if let Some(m) = forward {
            prop_assert!(candidates.contains(&m.candidate));
            prop_assert!(m.score > 0.0 && m.score <= 1.0);
        }
    }

    #[test]
    fn read_only_attribute_never_changes(raw in arb_raw(), strict in any::<bool>()) {
        let graph = Arc::new(InMemoryGraph::new());
        let e = graph.add_entity("E", None).unwrap();
        let owner = AttributeOwner::Entity(e);
        graph.define_attribute(owner, "Area", 12.5.into(), false).unwrap();

        let mode = if strict { BatchMode::Strict } else { BatchMode::Lenient };
        let c = TransactionCoordinator::new(graph.clone(), ParamConfig::default()).unwrap();
        let r = c.run_batch(vec![MutationRequest::new(e, "Area", raw)], mode);

        prop_assert!(matches!(r.items[0].outcome, Outcome::ReadOnly | Outcome::InvalidValue));
        prop_assert_eq!(graph.read(&AttributeAddress::new(owner, "Area")).unwrap(), NativeValue::Number(12.5));
        prop_assert_eq!(graph.write_count().unwrap(), 0);
    }

    #[test]
    fn unit_conversion_round_trips(tenths in 1i64..1_000_000) {
        #[allow(clippy::cast_precision_loss)]
        let mm = tenths as f64 / 10.0;
        let text = format!("{mm}");
        let coercer = mm_coercer();
        let envelope = coercer
            .coerce(&RawValue::Text(text.clone()), StorageKind::Number, "Bar Spacing")
            .unwrap();
        let feet = envelope.native.as_number().unwrap();
        prop_assert!((feet * 304.8 - mm).abs() < 1e-6);
        prop_assert_eq!(coercer.present(&envelope.native, "Bar Spacing"), text);
    }

    #[test]
    fn strict_batches_are_all_or_nothing(valid in prop::collection::vec(any::<bool>(), 1..6)) {
        let graph = Arc::new(InMemoryGraph::new());
        let e = graph.add_entity("E", None).unwrap();
        let mut requests = Vec::new();
        for (i, ok) in valid.iter().enumerate() {
            let name = format!("Value {i}");
            graph
                .define_attribute(AttributeOwner::Entity(e), name.clone(), NativeValue::Integer(0), true)
                .unwrap();
            requests.push(MutationRequest::new(e, name, if *ok { "7" } else { "seven" }));
        }
        let before = graph.snapshot().unwrap();

        let c = TransactionCoordinator::new(graph.clone(), ParamConfig::default()).unwrap();
        let strict = c.run_batch(requests.clone(), BatchMode::Strict);
        if valid.iter().all(|ok| *ok) {
            prop_assert_eq!(strict.outcome, BatchOutcome::Committed);
            prop_assert_eq!(strict.summary().applied, valid.len());
        } else {
            prop_assert_eq!(strict.outcome, BatchOutcome::Aborted);
            prop_assert_eq!(graph.snapshot().unwrap(), before);
        }

        let lenient = c.run_batch(requests, BatchMode::Lenient);
        prop_assert!(lenient.is_committed());
        prop_assert_eq!(lenient.summary().applied, valid.iter().filter(|ok| **ok).count());
    }
}

#[test]
fn bar_spacing_example() {
    let coercer = mm_coercer();
    let envelope = coercer
        .coerce(&"150".into(), StorageKind::Number, "Bar Spacing")
        .unwrap();
    let feet = envelope.native.as_number().unwrap();
    assert!((feet - 0.492_13).abs() < 1e-5);
    assert_eq!(coercer.present(&envelope.native, "Bar Spacing"), "150");
}
