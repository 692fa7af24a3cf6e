//! Element lifecycle tests: fresh vs stub loading, property access, removal,
//! endpoint resolution, and traversal.

use sqlgraph::{Direction, PropertyValue, SqlGraph, SqlGraphError};

fn graph() -> SqlGraph {
    let _ = env_logger::builder().is_test(true).try_init();
    SqlGraph::open_in_memory().unwrap()
}

#[test]
fn test_fresh_element_reads_without_a_round_trip() {
    let graph = graph();
    let v = graph
        .add_vertex("Person", &[("name", "alice".into())])
        .unwrap();
    assert!(v.is_loaded());

    // Deleting the row under the fresh handle proves reads come from the
    // cache, not the database.
    graph
        .connection()
        .execute("DELETE FROM \"public.V_Person\"", [])
        .unwrap();
    assert_eq!(
        v.property("name").unwrap(),
        Some(PropertyValue::String("alice".to_string()))
    );
}

#[test]
fn test_stub_loads_lazily_on_first_access() {
    let graph = graph();
    let created = graph
        .add_vertex("Person", &[("name", "bob".into()), ("age", 40i64.into())])
        .unwrap();

    let stub = graph.vertex(created.id()).unwrap().unwrap();
    assert!(!stub.is_loaded());
    assert_eq!(
        stub.property("age").unwrap(),
        Some(PropertyValue::Long(40))
    );
    assert!(stub.is_loaded());
    assert_eq!(stub.keys().unwrap(), vec!["age", "name"]);
}

#[test]
fn test_stale_stub_is_element_not_found() {
    let graph = graph();
    let v = graph.add_vertex("Person", &[]).unwrap();
    let stub = graph.vertex(v.id()).unwrap().unwrap();

    // Row gone, registry entry still present: the stub fails on load.
    graph
        .connection()
        .execute("DELETE FROM \"public.V_Person\"", [])
        .unwrap();
    let err = stub.property("name").unwrap_err();
    assert!(matches!(err, SqlGraphError::ElementNotFound { .. }));
}

#[test]
fn test_remove_vertex_releases_its_id() {
    let graph = graph();
    let v = graph.add_vertex("Person", &[("name", "eve".into())]).unwrap();
    let id = v.id();
    v.remove().unwrap();

    assert!(graph.vertex(id).unwrap().is_none());
    let rows: i64 = graph
        .connection()
        .query_row("SELECT count(*) FROM \"public.V_Person\"", [], |r| r.get(0))
        .unwrap();
    assert_eq!(rows, 0);

    // The handle refuses further mutation.
    assert!(matches!(
        v.remove().unwrap_err(),
        SqlGraphError::ElementRemoved { .. }
    ));
    assert!(matches!(
        v.set_property("name", "zombie").unwrap_err(),
        SqlGraphError::ElementRemoved { .. }
    ));
}

#[test]
fn test_edge_row_carries_endpoint_columns() {
    let graph = graph();
    let a = graph.add_vertex("Person", &[]).unwrap();
    let b = graph.add_vertex("Person", &[]).unwrap();
    let e = a.add_edge("Knows", &b, &[]).unwrap();

    let (in_id, out_id): (i64, i64) = graph
        .connection()
        .query_row(
            "SELECT \"public.Person_IN_ID\", \"public.Person_OUT_ID\" \
             FROM \"public.E_Knows\" WHERE \"ID\" = ?1",
            [e.id()],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .unwrap();
    assert_eq!(in_id, b.id());
    assert_eq!(out_id, a.id());
}

#[test]
fn test_edge_stub_resolves_endpoints_from_columns() {
    let graph = graph();
    let a = graph.add_vertex("Person", &[("name", "a".into())]).unwrap();
    let b = graph.add_vertex("Person", &[("name", "b".into())]).unwrap();
    let e = a.add_edge("Knows", &b, &[("since", 2019i64.into())]).unwrap();

    let stub = graph.edge(e.id()).unwrap().unwrap();
    assert!(!stub.is_loaded());
    assert_eq!(stub.out_vertex().unwrap().id(), a.id());
    assert_eq!(stub.in_vertex().unwrap().id(), b.id());
    assert_eq!(
        stub.property("since").unwrap(),
        Some(PropertyValue::Long(2019))
    );
    // Endpoint stubs load their own rows independently.
    assert_eq!(
        stub.in_vertex().unwrap().property("name").unwrap(),
        Some(PropertyValue::String("b".to_string()))
    );
}

#[test]
fn test_edge_removal_leaves_endpoints_alive() {
    let graph = graph();
    let a = graph.add_vertex("Person", &[]).unwrap();
    let b = graph.add_vertex("Person", &[]).unwrap();
    let e = a.add_edge("Knows", &b, &[]).unwrap();

    e.remove().unwrap();
    assert!(graph.edge(e.id()).unwrap().is_none());
    assert!(graph.vertex(a.id()).unwrap().is_some());
    assert!(graph.vertex(b.id()).unwrap().is_some());
}

#[test]
fn test_nulled_endpoint_is_a_corrupt_edge() {
    let graph = graph();
    let a = graph.add_vertex("Person", &[]).unwrap();
    let b = graph.add_vertex("Person", &[]).unwrap();
    let e = a.add_edge("Knows", &b, &[]).unwrap();

    graph
        .connection()
        .execute(
            "UPDATE \"public.E_Knows\" SET \"public.Person_OUT_ID\" = NULL",
            [],
        )
        .unwrap();
    let stub = graph.edge(e.id()).unwrap().unwrap();
    let err = stub.out_vertex().unwrap_err();
    assert!(matches!(err, SqlGraphError::CorruptEdge { .. }));
}

#[test]
fn test_ids_are_unique_across_kinds() {
    let graph = graph();
    let mut ids = Vec::new();
    let a = graph.add_vertex("Person", &[]).unwrap();
    let b = graph.add_vertex("Company", &[]).unwrap();
    ids.push(a.id());
    ids.push(b.id());
    ids.push(a.add_edge("WorksAt", &b, &[]).unwrap().id());
    ids.push(graph.add_vertex("Person", &[]).unwrap().id());

    let mut deduped = ids.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), ids.len());
}

#[test]
fn test_traversal_by_direction_and_label() {
    let graph = graph();
    let a = graph.add_vertex("Person", &[]).unwrap();
    let b = graph.add_vertex("Person", &[]).unwrap();
    let c = graph.add_vertex("Company", &[]).unwrap();
    let knows = a.add_edge("Knows", &b, &[]).unwrap();
    let works = a.add_edge("WorksAt", &c, &[]).unwrap();
    let incoming = b.add_edge("Knows", &a, &[]).unwrap();

    let out_ids: Vec<i64> = a.edges(Direction::Out, &[]).unwrap().iter().map(|e| e.id()).collect();
    assert!(out_ids.contains(&knows.id()));
    assert!(out_ids.contains(&works.id()));
    assert!(!out_ids.contains(&incoming.id()));

    let in_knows: Vec<i64> = a
        .edges(Direction::In, &["Knows"])
        .unwrap()
        .iter()
        .map(|e| e.id())
        .collect();
    assert_eq!(in_knows, vec![incoming.id()]);

    let both: Vec<i64> = a.edges(Direction::Both, &[]).unwrap().iter().map(|e| e.id()).collect();
    assert_eq!(both.len(), 3);
}

#[test]
fn test_array_properties_round_trip() {
    let graph = graph();
    let v = graph
        .add_vertex(
            "Sensor",
            &[
                ("readings", vec![1i32, 2, 3].into()),
                ("payload", vec![0u8, 128, 255].into()),
                ("tags", vec!["hot".to_string(), "dusty".to_string()].into()),
            ],
        )
        .unwrap();

    let stub = graph.vertex(v.id()).unwrap().unwrap();
    assert_eq!(
        stub.property("readings").unwrap(),
        Some(PropertyValue::IntegerArray(vec![1, 2, 3]))
    );
    assert_eq!(
        stub.property("payload").unwrap(),
        Some(PropertyValue::ByteArray(vec![0, 128, 255]))
    );
    assert_eq!(
        stub.property("tags").unwrap(),
        Some(PropertyValue::StringArray(vec![
            "hot".to_string(),
            "dusty".to_string()
        ]))
    );
}

#[test]
fn test_handles_format_for_diagnostics() {
    let graph = graph();
    let v = graph.add_vertex("Person", &[]).unwrap();
    let e = v.add_edge("Knows", &v, &[]).unwrap();
    // assert!/unwrap_err diagnostics need the Debug rendering.
    assert!(format!("{:?}", v).contains("Person"));
    assert!(format!("{:?}", e).contains("Knows"));
}

#[test]
fn test_self_loop_reported_once_per_side() {
    let graph = graph();
    let a = graph.add_vertex("Person", &[]).unwrap();
    let e = a.add_edge("Knows", &a, &[]).unwrap();

    let both = a.edges(Direction::Both, &[]).unwrap();
    assert_eq!(both.len(), 2);
    assert!(both.iter().all(|edge| edge.id() == e.id()));

    let vertices = e.vertices(Direction::Both).unwrap();
    assert_eq!(vertices.len(), 2);
    assert!(vertices.iter().all(|v| v.id() == a.id()));
}
