use paramkit::{
    AcceptedNames, AttributeAddress, AttributeOwner, BatchMode, CodeTable, DocumentGraph, EntityId,
    HeaderMapping, ImportRow, InMemoryGraph, MatchStrategy, NamePattern, NativeValue, Outcome, ParamConfig,
    TransactionCoordinator, UnresolvedReason,
};
use std::sync::Arc;

const FOOTINGS: &str = r#"{
  "templates": [
    {
      "id": "7f0e5c1a-0000-4000-8000-000000000001",
      "name": "Footing 600",
      "attributes": [
        { "name": "Foundation Thickness", "value": { "type": "number", "value": 1.0 } },
        { "name": "Top Cover", "value": { "type": "number", "value": 0.164 } },
        { "name": "Bottom Cover", "value": { "type": "number", "value": 0.246 } }
      ]
    }
  ],
  "entities": [
    {
      "id": "7f0e5c1a-0000-4000-8000-00000000000a",
      "name": "F1",
      "template": "7f0e5c1a-0000-4000-8000-000000000001",
      "attributes": [
        { "name": "Mark", "value": { "type": "text", "value": "F1" } },
        { "name": "Area", "value": { "type": "number", "value": 4.0 }, "mutable": false }
      ]
    },
    {
      "id": "7f0e5c1a-0000-4000-8000-00000000000b",
      "name": "F2",
      "template": "7f0e5c1a-0000-4000-8000-000000000001",
      "attributes": [
        { "name": "Mark", "value": { "type": "text", "value": "F2" } },
        { "name": "Area", "value": { "type": "number", "value": 4.0 }, "mutable": false }
      ]
    }
  ],
  "shared": [
    { "name": "Bar Spacing", "value": { "type": "number", "value": 0.5 } },
    { "name": "Hook Orientation", "value": { "type": "integer", "value": 0 } }
  ]
}"#;

fn entity(last: &str) -> EntityId {
    EntityId::from_uuid(format!("7f0e5c1a-0000-4000-8000-00000000000{last}").parse().unwrap())
}

fn row(cells: &[(&str, &str)]) -> ImportRow {
    cells.iter().map(|(h, v)| ((*h).to_string(), (*v).into())).collect()
}

#[test]
fn spreadsheet_import_maps_headers_and_applies_rows() {
    let graph = Arc::new(InMemoryGraph::from_json(FOOTINGS).unwrap());
    let config = ParamConfig::millimeter_preset().with_code_table(
        CodeTable::new("Hook Orientation", NamePattern::contains("Hook"))
            .code("Left", 0)
            .code("Right", 1),
    );
    let coordinator = TransactionCoordinator::new(graph.clone(), config).unwrap();
    let (f1, f2) = (entity("a"), entity("b"));

    let headers = ["MARK", "Bar Spacing (mm)", "hook orientation", "Cover", "Colour"];
    let mapping = HeaderMapping::build(coordinator.resolver(), f1, headers, &AcceptedNames::All).unwrap();

    assert_eq!(mapping.attribute_for("MARK"), Some("Mark"));
    assert_eq!(mapping.attribute_for("Bar Spacing (mm)"), Some("Bar Spacing"));
    assert_eq!(mapping.columns()[1].strategy, Some(MatchStrategy::Cleaned));
    assert_eq!(mapping.attribute_for("hook orientation"), Some("Hook Orientation"));

    // "Cover" is contained in both cover attributes, so it is left to the caller.
    assert_eq!(mapping.attribute_for("Cover"), None);
    assert_eq!(mapping.unresolved().len(), 2);
    assert_eq!(mapping.unresolved()[0].header, "Cover");
    assert_eq!(
        mapping.unresolved()[0].reason,
        UnresolvedReason::Ambiguous {
            chosen: "Bottom Cover".into(),
            tied_with: vec!["Top Cover".into()],
        }
    );
    assert_eq!(mapping.unresolved()[1].header, "Colour");
    assert_eq!(mapping.unresolved()[1].reason, UnresolvedReason::NoMatch);

    let mut requests = Vec::new();
    let mut leftovers = Vec::new();
    for (id, cells) in [
        (f1, row(&[("MARK", "F-101"), ("Bar Spacing (mm)", "150"), ("hook orientation", "Right"), ("Colour", "grey")])),
        (f2, row(&[("MARK", "F-102"), ("Cover", ""), ("Colour", "grey")])),
    ] {
        let out = mapping.requests_for_row(id, &cells);
        requests.extend(out.requests);
        leftovers.extend(out.unmapped);
    }
    assert_eq!(requests.len(), 4);
    assert_eq!(leftovers.len(), 3);

    let result = coordinator.run_batch(requests, BatchMode::Strict);
    assert!(result.is_committed());
    assert!(result.outcomes().iter().all(|o| *o == Outcome::Applied));

    let read = |owner, name: &str| graph.read(&AttributeAddress::new(owner, name)).unwrap();
    assert_eq!(read(AttributeOwner::Entity(f2), "Mark"), "F-102".into());
    assert_eq!(read(AttributeOwner::SharedPool, "Hook Orientation"), NativeValue::Integer(1));
    let spacing = read(AttributeOwner::SharedPool, "Bar Spacing").as_number().unwrap();
    assert!((spacing - 150.0 / 304.8).abs() < 1e-9);
}

#[test]
fn accepted_names_restrict_mapping() {
    let graph = Arc::new(InMemoryGraph::from_json(FOOTINGS).unwrap());
    let coordinator = TransactionCoordinator::new(graph, ParamConfig::default()).unwrap();

    let mapping = HeaderMapping::build(
        coordinator.resolver(),
        entity("a"),
        ["Mark", "Area"],
        &AcceptedNames::only(["Mark"]),
    )
    .unwrap();
    assert_eq!(mapping.columns().len(), 1);
    assert_eq!(mapping.unresolved()[0].header, "Area");
}

#[test]
fn read_only_column_reports_per_row() {
    let graph = Arc::new(InMemoryGraph::from_json(FOOTINGS).unwrap());
    let coordinator = TransactionCoordinator::new(graph, ParamConfig::default()).unwrap();
    let mapping = HeaderMapping::build(coordinator.resolver(), entity("a"), ["Mark", "Area"], &AcceptedNames::All).unwrap();

    let out = mapping.requests_for_row(entity("b"), &row(&[("Mark", "F-9"), ("Area", "5")]));
    let result = coordinator.run_batch(out.requests, BatchMode::Lenient);
    assert_eq!(result.outcomes(), vec![Outcome::Applied, Outcome::ReadOnly]);
}
