//! On-demand schema evolution driven through the graph surface.

use sqlgraph::{GraphConfig, PropertyValue, SqlGraph, SqlGraphError};

fn graph() -> SqlGraph {
    let _ = env_logger::builder().is_test(true).try_init();
    SqlGraph::open_in_memory().unwrap()
}

fn table_exists(graph: &SqlGraph, name: &str) -> bool {
    let count: i64 = graph
        .connection()
        .query_row(
            "SELECT count(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |r| r.get(0),
        )
        .unwrap();
    count == 1
}

#[test]
fn test_first_use_creates_table_and_columns() {
    let graph = graph();
    assert!(!table_exists(&graph, "public.V_Person"));

    graph
        .add_vertex("Person", &[("name", "alice".into())])
        .unwrap();
    assert!(table_exists(&graph, "public.V_Person"));

    let decl: String = graph
        .connection()
        .query_row(
            "SELECT type FROM pragma_table_info('public.V_Person') WHERE name = 'name'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(decl, "TEXT");
}

#[test]
fn test_new_property_on_existing_kind_adds_a_column() {
    let graph = graph();
    let v = graph.add_vertex("Person", &[]).unwrap();
    v.set_property("nickname", "al").unwrap();

    let count: i64 = graph
        .connection()
        .query_row(
            "SELECT count(*) FROM pragma_table_info('public.V_Person') WHERE name = 'nickname'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_type_conflict_fails_repeatably_and_leaves_data_intact() {
    let graph = graph();
    let v = graph
        .add_vertex("Person", &[("age", 30i64.into())])
        .unwrap();

    // The conflict is not auto-resolved: every attempt fails the same way.
    for _ in 0..2 {
        let err = v.set_property("age", "thirty").unwrap_err();
        assert!(matches!(err, SqlGraphError::SchemaConflict { .. }));
    }
    let stub = graph.vertex(v.id()).unwrap().unwrap();
    assert_eq!(
        stub.property("age").unwrap(),
        Some(PropertyValue::Long(30))
    );
}

#[test]
fn test_edge_table_grows_columns_for_new_endpoint_kinds() {
    let graph = graph();
    let p1 = graph.add_vertex("Person", &[]).unwrap();
    let p2 = graph.add_vertex("Person", &[]).unwrap();
    p1.add_edge("Owns", &p2, &[]).unwrap();

    let c = graph.add_vertex("Company", &[]).unwrap();
    let d = graph.add_vertex("Dog", &[]).unwrap();
    c.add_edge("Owns", &d, &[]).unwrap();

    let columns: i64 = graph
        .connection()
        .query_row(
            "SELECT count(*) FROM pragma_table_info('public.E_Owns') \
             WHERE name IN ('public.Person_IN_ID', 'public.Person_OUT_ID', \
                            'public.Dog_IN_ID', 'public.Company_OUT_ID')",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(columns, 4);
}

#[test]
fn test_narrow_widths_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = GraphConfig {
        database_path: Some(dir.path().join("graph.db")),
        ..Default::default()
    };

    let id = {
        let graph = SqlGraph::open(config.clone()).unwrap();
        let v = graph
            .add_vertex("Sensor", &[("level", 7i16.into()), ("gain", 0.5f32.into())])
            .unwrap();
        graph.tx().commit().unwrap();
        v.id()
    };

    // A fresh process rebuilds its catalog cache from the declared column
    // types, so narrow numerics come back at their declared width.
    let graph = SqlGraph::open(config).unwrap();
    let v = graph.vertex(id).unwrap().unwrap();
    assert_eq!(
        v.property("level").unwrap(),
        Some(PropertyValue::Short(7))
    );
    assert_eq!(
        v.property("gain").unwrap(),
        Some(PropertyValue::Float(0.5))
    );
}

#[test]
fn test_schemas_isolate_same_named_kinds() {
    let graph = graph();
    graph.add_vertex("hr.Person", &[]).unwrap();
    graph.add_vertex("crm.Person", &[]).unwrap();
    assert!(table_exists(&graph, "hr.V_Person"));
    assert!(table_exists(&graph, "crm.V_Person"));
    assert!(!table_exists(&graph, "public.V_Person"));
}
