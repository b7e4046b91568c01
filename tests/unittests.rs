use cypher_lens::db::value::{DbValue, NodeValue, RawRecord, RelationshipValue};
use cypher_lens::gql::normalize::{normalize, normalize_record};
use cypher_lens::graph_utils::graph::{
    project_records, project_records_with_report, EdgeElement, GraphElement, NodeElement, ProjectionFields,
    SkipReason, FALLBACK_EDGE_LABEL, FALLBACK_NODE_LABEL,
};
use cypher_lens::graph_utils::table::{ResultTable, EMPTY_MESSAGE};
use cypher_lens::persistence::settings::AppSettings;
use serde_json::{json, Value};

fn person(id: i64, name: &str) -> DbValue {
    DbValue::Node(NodeValue {
        identity: id,
        labels: vec!["Person".into()],
        properties: vec![("name".into(), DbValue::text(name)), ("age".into(), DbValue::Int(36))],
    })
}

fn knows(id: i64, start: i64, end: i64) -> DbValue {
    DbValue::Relationship(RelationshipValue {
        identity: id,
        start,
        end,
        rel_type: "KNOWS".into(),
        properties: vec![("since".into(), DbValue::Int(2021))],
    })
}

fn node_json(id: &str, labels: Value) -> Value {
    json!({ "identity": id, "labels": labels, "properties": {} })
}

fn rel_json(id: &str, typ: &str, start: &str, end: &str) -> Value {
    json!({ "identity": id, "type": typ, "start": start, "end": end, "properties": {} })
}

fn path_record(n: Value, r: Value, m: Value) -> Value {
    json!({ "n": n, "r": r, "m": m })
}

fn node(id: &str, label: &str) -> GraphElement {
    GraphElement::Node(NodeElement { id: id.into(), label: label.into() })
}

fn edge(id: &str, source: &str, target: &str, label: &str) -> GraphElement {
    GraphElement::Edge(EdgeElement { id: id.into(), source: source.into(), target: target.into(), label: label.into() })
}

// ---- normalizer ----

#[test]
fn normalize_integers_become_exact_decimal_strings() {
    assert_eq!(normalize(DbValue::Int(0)), json!("0"));
    assert_eq!(normalize(DbValue::Int(-42)), json!("-42"));
    assert_eq!(normalize(DbValue::Int(i64::MAX)), json!("9223372036854775807"));
    assert_eq!(normalize(DbValue::Int(i64::MIN)), json!("-9223372036854775808"));
    // beyond 2^53: would lose precision as a JSON number
    assert_eq!(normalize(DbValue::Int(9_007_199_254_740_993)), json!("9007199254740993"));
}

#[test]
fn normalize_leaves_plain_scalars_unchanged() {
    assert_eq!(normalize(DbValue::Null), Value::Null);
    assert_eq!(normalize(DbValue::Bool(true)), json!(true));
    assert_eq!(normalize(DbValue::text("hello")), json!("hello"));
    assert_eq!(normalize(DbValue::float(1.5)), json!(1.5));
}

#[test]
fn normalize_non_finite_floats_become_null() {
    assert_eq!(normalize(DbValue::float(f64::NAN)), Value::Null);
    assert_eq!(normalize(DbValue::float(f64::INFINITY)), Value::Null);
}

#[test]
fn normalize_walks_nested_lists_and_maps_preserving_shape() {
    let raw = DbValue::map([
        ("z", DbValue::List(vec![DbValue::Int(1), DbValue::Null, DbValue::List(vec![DbValue::Int(2)])])),
        ("a", DbValue::map([("deep", DbValue::Int(3)), ("none", DbValue::Null)])),
        ("m", DbValue::List(vec![])),
    ]);
    let out = normalize(raw);
    assert_eq!(out, json!({ "z": ["1", null, ["2"]], "a": { "deep": "3", "none": null }, "m": [] }));
    // insertion order is kept, not sorted
    let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["z", "a", "m"]);
}

#[test]
fn normalize_graph_entities_become_plain_objects() {
    assert_eq!(
        normalize(person(1, "Ada")),
        json!({ "identity": "1", "labels": ["Person"], "properties": { "name": "Ada", "age": "36" } })
    );
    assert_eq!(
        normalize(knows(10, 1, 2)),
        json!({ "identity": "10", "start": "1", "end": "2", "type": "KNOWS", "properties": { "since": "2021" } })
    );
}

#[test]
fn normalize_record_keeps_column_order() {
    let record = RawRecord::new().with("n", person(1, "Ada")).with("r", knows(10, 1, 2)).with("m", person(2, "Bob"));
    let out = normalize_record(record);
    assert_eq!(out.keys().collect::<Vec<_>>(), vec!["n", "r", "m"]);
    assert_eq!(out["r"]["type"], json!("KNOWS"));
    assert_eq!(out["m"]["identity"], json!("2"));
}

#[test]
fn normalize_is_idempotent() {
    let samples = vec![
        DbValue::Int(i64::MAX),
        DbValue::float(2.25),
        DbValue::List(vec![person(1, "Ada"), DbValue::Null, knows(3, 1, 2)]),
        DbValue::map([("n", person(7, "Cy")), ("count", DbValue::Int(-1)), ("flag", DbValue::Bool(false))]),
    ];
    for raw in samples {
        let once = normalize(raw);
        let twice = normalize(DbValue::from(once.clone()));
        assert_eq!(once, twice);
    }
}

// ---- projection ----

#[test]
fn projection_builds_nodes_then_edge_for_single_path() {
    let records = vec![path_record(
        node_json("1", json!(["Person"])),
        rel_json("10", "KNOWS", "1", "2"),
        node_json("2", json!(["Person"])),
    )];
    let elements = project_records(&records, &ProjectionFields::default());
    assert_eq!(elements, vec![node("1", "Person"), node("2", "Person"), edge("1-KNOWS-2", "1", "2", "KNOWS")]);

    let wire = serde_json::to_value(&elements).unwrap();
    assert_eq!(
        wire,
        json!([
            { "id": "1", "label": "Person" },
            { "id": "2", "label": "Person" },
            { "id": "1-KNOWS-2", "source": "1", "target": "2", "label": "KNOWS" }
        ])
    );
}

#[test]
fn projection_deduplicates_nodes_and_edges() {
    let records = vec![
        path_record(node_json("1", json!(["Person"])), rel_json("10", "KNOWS", "1", "2"), node_json("2", json!(["Person"]))),
        path_record(node_json("1", json!(["Person"])), rel_json("11", "KNOWS", "1", "3"), node_json("3", json!(["Company"]))),
        // distinct relationship, same endpoints and type: collapses into the existing edge
        path_record(node_json("1", json!(["Person"])), rel_json("12", "KNOWS", "1", "2"), node_json("2", json!(["Person"]))),
    ];
    let elements = project_records(&records, &ProjectionFields::default());
    assert_eq!(
        elements,
        vec![
            node("1", "Person"),
            node("2", "Person"),
            edge("1-KNOWS-2", "1", "2", "KNOWS"),
            node("3", "Company"),
            edge("1-KNOWS-3", "1", "3", "KNOWS"),
        ]
    );
    assert_eq!(elements.iter().filter(|e| e.id() == "1").count(), 1);
}

#[test]
fn projection_skips_record_missing_relationship_and_continues() {
    let records = vec![
        json!({ "n": node_json("1", json!(["Person"])), "m": node_json("2", json!(["Person"])) }),
        path_record(node_json("3", json!(["Person"])), rel_json("10", "LIKES", "3", "4"), node_json("4", json!(["Movie"]))),
    ];
    let report = project_records_with_report(&records, &ProjectionFields::default());
    assert_eq!(report.elements, vec![node("3", "Person"), node("4", "Movie"), edge("3-LIKES-4", "3", "4", "LIKES")]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].index, 0);
    assert_eq!(report.skipped[0].reason, SkipReason::MissingField("r".into()));
}

#[test]
fn projection_treats_null_fields_as_absent() {
    let records = vec![path_record(node_json("1", json!(["Person"])), Value::Null, node_json("2", json!(["Person"])))];
    let report = project_records_with_report(&records, &ProjectionFields::default());
    assert!(report.elements.is_empty());
    assert_eq!(report.skipped[0].reason, SkipReason::MissingField("r".into()));
}

#[test]
fn projection_rejects_invalid_node_identities_before_emitting() {
    let records = vec![
        path_record(json!({ "identity": "", "labels": [] }), rel_json("10", "KNOWS", "", "2"), node_json("2", json!(["Person"]))),
        path_record(node_json("1", json!(["Person"])), rel_json("10", "KNOWS", "1", "2"), json!({ "identity": 2, "labels": [] })),
    ];
    let report = project_records_with_report(&records, &ProjectionFields::default());
    assert!(report.elements.is_empty());
    let reasons: Vec<SkipReason> = report.skipped.into_iter().map(|s| s.reason).collect();
    assert_eq!(reasons, vec![SkipReason::InvalidStartId, SkipReason::InvalidEndId]);
}

#[test]
fn projection_keeps_nodes_when_relationship_identity_is_invalid() {
    let records = vec![path_record(
        node_json("1", json!(["Person"])),
        json!({ "type": "KNOWS", "start": "1", "end": "2" }),
        node_json("2", json!(["Person"])),
    )];
    let report = project_records_with_report(&records, &ProjectionFields::default());
    assert_eq!(report.elements, vec![node("1", "Person"), node("2", "Person")]);
    assert_eq!(report.skipped[0].reason, SkipReason::InvalidRelationshipId);
}

#[test]
fn projection_uses_fallback_labels() {
    let records = vec![path_record(
        node_json("1", json!([])),
        json!({ "identity": "10", "start": "1", "end": "2", "properties": {} }),
        json!({ "identity": "2", "properties": {} }),
    )];
    let elements = project_records(&records, &ProjectionFields::default());
    let edge_id = format!("1-{}-2", FALLBACK_EDGE_LABEL);
    assert_eq!(
        elements,
        vec![
            node("1", FALLBACK_NODE_LABEL),
            node("2", FALLBACK_NODE_LABEL),
            edge(&edge_id, "1", "2", FALLBACK_EDGE_LABEL),
        ]
    );
}

#[test]
fn projection_is_deterministic() {
    let records: Vec<Value> = (0..20)
        .map(|i| {
            let a = (i % 5).to_string();
            let b = ((i * 3) % 7).to_string();
            path_record(node_json(&a, json!(["A"])), rel_json(&i.to_string(), "LINK", &a, &b), node_json(&b, json!(["B"])))
        })
        .collect();
    let fields = ProjectionFields::default();
    let first = serde_json::to_string(&project_records(&records, &fields)).unwrap();
    let second = serde_json::to_string(&project_records(&records, &fields)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn projection_honours_custom_field_names() {
    let records = vec![json!({
        "a": node_json("1", json!(["City"])),
        "road": rel_json("5", "ROAD", "1", "2"),
        "b": node_json("2", json!(["City"])),
    })];
    let fields = ProjectionFields { start: "a".into(), relationship: "road".into(), end: "b".into() };
    assert_eq!(project_records(&records, &fields).len(), 3);
    assert!(project_records(&records, &ProjectionFields::default()).is_empty());
}

#[test]
fn projection_reads_normalized_records_directly() {
    let record = normalize_record(RawRecord::new().with("n", person(1, "Ada")).with("r", knows(10, 1, 2)).with("m", person(2, "Bob")));
    let elements = project_records(&[record], &ProjectionFields::default());
    assert_eq!(elements, vec![node("1", "Person"), node("2", "Person"), edge("1-KNOWS-2", "1", "2", "KNOWS")]);
}

#[test]
fn graph_elements_deserialize_by_shape() {
    let parsed: Vec<GraphElement> = serde_json::from_value(json!([
        { "id": "1", "label": "Person" },
        { "id": "1-KNOWS-2", "source": "1", "target": "2", "label": "KNOWS" }
    ]))
    .unwrap();
    assert_eq!(parsed, vec![node("1", "Person"), edge("1-KNOWS-2", "1", "2", "KNOWS")]);
}

// ---- table ----

#[test]
fn table_columns_come_from_first_record() {
    let records = vec![
        json!({ "name": "Ada", "age": "36", "nick": null }),
        json!({ "name": "Bob", "age": "41" }),
    ];
    let table = ResultTable::from_records(&records);
    assert_eq!(table.columns, vec!["name", "age", "nick"]);
    assert_eq!(table.rows[0], vec!["\"Ada\"", "\"36\"", "null"]);
    assert_eq!(table.rows[1], vec!["\"Bob\"", "\"41\"", "null"]);
}

#[test]
fn table_renders_falsy_values_literally() {
    let records = vec![json!({ "flag": false, "count": 0.0, "text": "" })];
    let table = ResultTable::from_records(&records);
    assert_eq!(table.rows[0], vec!["false", "0.0", "\"\""]);
}

#[test]
fn table_renders_nested_values_as_json() {
    let records = vec![json!({ "n": { "identity": "1", "labels": ["Person"] } })];
    let table = ResultTable::from_records(&records);
    assert_eq!(table.rows[0][0], r#"{"identity":"1","labels":["Person"]}"#);
}

#[test]
fn table_text_rendering() {
    assert_eq!(ResultTable::from_records(&[]).render_text(), EMPTY_MESSAGE);

    let records = vec![json!({ "id": "1", "name": "Ada" }), json!({ "id": "22", "name": null })];
    let text = ResultTable::from_records(&records).render_text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "id   | name");
    assert_eq!(lines[1], "-----+------");
    assert_eq!(lines[2], "\"1\"  | \"Ada\"");
    assert_eq!(lines[3], "\"22\" | null");
}

// ---- settings ----

#[test]
fn settings_fill_missing_fields_with_defaults() {
    let s = AppSettings::from_json(r#"{ "api_port": 9000 }"#).unwrap();
    assert_eq!(s.api_port, 9000);
    assert_eq!(s.api_bind_addr, "127.0.0.1");
    assert_eq!(s.api_endpoint(), "127.0.0.1:9000");
    assert!(s.api_log_enabled);
    assert_eq!(s.projection, ProjectionFields::default());
}

#[test]
fn settings_api_log_dir_respects_switch_and_override() {
    let mut s = AppSettings::default();
    assert_eq!(s.api_log_dir(), Some(AppSettings::api_log_default_dir()));
    s.api_log_override = Some("/var/log/lens".into());
    assert_eq!(s.api_log_dir(), Some("/var/log/lens".into()));
    s.api_log_enabled = false;
    assert_eq!(s.api_log_dir(), None);
}

// ---- neo4j adapter ----

mod bolt {
    use std::collections::HashMap;

    use cypher_lens::db::neo4j::{from_bolt, record_from_row, DbSettings};
    use cypher_lens::db::value::{DbValue, NodeValue, RelationshipValue};
    use neo4rs::{
        BoltBoolean, BoltFloat, BoltInteger, BoltList, BoltMap, BoltNode, BoltPath, BoltRelation, BoltString,
        BoltType, BoltUnboundedRelation, Row,
    };

    fn int(v: i64) -> BoltType {
        BoltType::Integer(BoltInteger::new(v))
    }

    fn text(v: &str) -> BoltType {
        BoltType::String(BoltString::new(v))
    }

    fn list(items: Vec<BoltType>) -> BoltList {
        BoltList::from(items)
    }

    fn map(entries: &[(&str, BoltType)]) -> BoltMap {
        let mut m = BoltMap::new();
        for (k, v) in entries {
            m.put(BoltString::new(k), v.clone());
        }
        m
    }

    fn bolt_person(id: i64) -> BoltNode {
        BoltNode::new(BoltInteger::new(id), list(vec![text("Person")]), map(&[("name", text("Ada"))]))
    }

    fn row(columns: &[(&str, BoltType)]) -> Row {
        let fields = list(columns.iter().map(|(k, _)| text(k)).collect());
        let data = list(columns.iter().map(|(_, v)| v.clone()).collect());
        Row::new(fields, data)
    }

    #[test]
    fn node_keeps_identity_labels_and_properties() {
        let v = from_bolt(BoltType::Node(bolt_person(1)));
        assert_eq!(
            v,
            DbValue::Node(NodeValue {
                identity: 1,
                labels: vec!["Person".into()],
                properties: vec![("name".into(), DbValue::text("Ada"))],
            })
        );
    }

    #[test]
    fn relationship_keeps_endpoints_and_type() {
        let rel = BoltRelation {
            id: BoltInteger::new(10),
            start_node_id: BoltInteger::new(1),
            end_node_id: BoltInteger::new(2),
            typ: BoltString::new("KNOWS"),
            properties: map(&[("since", int(9_007_199_254_740_993))]),
        };
        assert_eq!(
            from_bolt(BoltType::Relation(rel)),
            DbValue::Relationship(RelationshipValue {
                identity: 10,
                start: 1,
                end: 2,
                rel_type: "KNOWS".into(),
                properties: vec![("since".into(), DbValue::Int(9_007_199_254_740_993))],
            })
        );
    }

    #[test]
    fn path_becomes_nodes_and_relationships_lists() {
        let hop = BoltUnboundedRelation::new(BoltInteger::new(10), BoltString::new("KNOWS"), BoltMap::new());
        let path = BoltPath {
            nodes: list(vec![BoltType::Node(bolt_person(1)), BoltType::Node(bolt_person(2))]),
            rels: list(vec![BoltType::UnboundedRelation(hop)]),
            indices: list(vec![int(1), int(1)]),
        };
        let v = from_bolt(BoltType::Path(path));
        let DbValue::Map(entries) = v else { panic!("path should become a map") };
        assert_eq!(entries[0].0, "nodes");
        assert!(matches!(&entries[0].1, DbValue::List(nodes) if nodes.len() == 2));
        assert_eq!(entries[1].0, "relationships");
        let DbValue::List(rels) = &entries[1].1 else { panic!("relationships should be a list") };
        assert_eq!(
            rels[0],
            DbValue::map([
                ("identity", DbValue::Int(10)),
                ("type", DbValue::text("KNOWS")),
                ("properties", DbValue::Map(vec![])),
            ])
        );
    }

    #[test]
    fn non_finite_float_becomes_null_and_finite_stays_a_number() {
        assert_eq!(from_bolt(BoltType::Float(BoltFloat::new(f64::NAN))), DbValue::Null);
        assert_eq!(from_bolt(BoltType::Float(BoltFloat::new(f64::INFINITY))), DbValue::Null);
        assert_eq!(from_bolt(BoltType::Float(BoltFloat::new(1.5))), DbValue::float(1.5));
    }

    #[test]
    fn map_entries_are_sorted_by_key() {
        let m = map(&[("zeta", int(1)), ("alpha", int(2)), ("mid", int(3))]);
        let DbValue::Map(entries) = from_bolt(BoltType::Map(m)) else { panic!("expected a map") };
        let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["alpha", "mid", "zeta"]);
    }

    #[test]
    fn multi_column_row_converts_every_column_in_sorted_order() {
        let r = row(&[
            ("n", BoltType::Node(bolt_person(1))),
            ("x", BoltType::Boolean(BoltBoolean::new(false))),
            ("big", int(9_007_199_254_740_993)),
        ]);
        let record = record_from_row(&r).unwrap();
        assert_eq!(record.keys().collect::<Vec<_>>(), ["big", "n", "x"]);
        assert_eq!(record.get("x"), Some(&DbValue::Bool(false)));
        assert_eq!(record.get("big"), Some(&DbValue::Int(9_007_199_254_740_993)));
        assert!(matches!(record.get("n"), Some(DbValue::Node(n)) if n.identity == 1 && n.labels == ["Person"]));
    }

    #[test]
    fn row_column_order_is_stable_across_conversions() {
        let r = row(&[("n", int(1)), ("x", int(2)), ("m", int(3)), ("a", int(4))]);
        let first: Vec<String> = record_from_row(&r).unwrap().keys().map(String::from).collect();
        for _ in 0..10 {
            let again: Vec<String> = record_from_row(&r).unwrap().keys().map(String::from).collect();
            assert_eq!(again, first);
        }
        assert_eq!(first, ["a", "m", "n", "x"]);
    }

    #[test]
    fn db_settings_use_defaults_when_unset_or_empty() {
        let s = DbSettings::from_lookup(|_| None);
        assert_eq!(s.uri, "bolt://localhost:7687");
        assert_eq!(s.user, "neo4j");
        assert_eq!(s.password, "password");

        let s = DbSettings::from_lookup(|_| Some(String::new()));
        assert_eq!(s.uri, DbSettings::DEFAULT_URI);
        assert_eq!(s.user, DbSettings::DEFAULT_USER);
        assert_eq!(s.password, DbSettings::DEFAULT_PASSWORD);
    }

    #[test]
    fn db_settings_take_overrides_from_the_environment() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("NEO4J_URI", "neo4j://db.internal:7687"),
            ("NEO4J_USER", "reader"),
            ("NEO4J_PASSWORD", "s3cret"),
        ]);
        let s = DbSettings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.uri, "neo4j://db.internal:7687");
        assert_eq!(s.user, "reader");
        assert_eq!(s.password, "s3cret");
        assert!(!format!("{:?}", s).contains("s3cret"));
    }
}
