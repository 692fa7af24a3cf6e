//! Implicit-transaction fencing and commit/rollback semantics.

use sqlgraph::{GraphConfig, PropertyValue, SqlGraph};

fn graph() -> SqlGraph {
    let _ = env_logger::builder().is_test(true).try_init();
    SqlGraph::open_in_memory().unwrap()
}

#[test]
fn test_transaction_opens_on_first_access() {
    let graph = graph();
    assert!(!graph.tx().is_open());
    graph.add_vertex("Person", &[]).unwrap();
    assert!(graph.tx().is_open());
    graph.tx().commit().unwrap();
    assert!(!graph.tx().is_open());
}

#[test]
fn test_reads_open_a_transaction_too() {
    let graph = graph();
    graph.add_vertex("Person", &[]).unwrap();
    graph.tx().commit().unwrap();

    // A lookup is fenced the same way as a write.
    let _ = graph.vertex(1).unwrap();
    assert!(graph.tx().is_open());
    graph.tx().rollback().unwrap();
}

#[test]
fn test_rollback_undoes_immediate_writes() {
    let graph = graph();
    let v = graph.add_vertex("Person", &[("name", "gone".into())]).unwrap();
    graph.tx().rollback().unwrap();

    // The row and the registry entry both rolled back; the table itself
    // survives because SQLite DDL is transactional but a fresh transaction
    // sees it rolled back too.
    assert!(graph.vertex(v.id()).unwrap().is_none());
}

#[test]
fn test_commit_then_rollback_keeps_committed_state() {
    let graph = graph();
    let kept = graph.add_vertex("Person", &[("name", "kept".into())]).unwrap();
    graph.tx().commit().unwrap();

    let discarded = graph.add_vertex("Person", &[]).unwrap();
    graph.tx().rollback().unwrap();

    assert!(graph.vertex(discarded.id()).unwrap().is_none());
    let stub = graph.vertex(kept.id()).unwrap().unwrap();
    assert_eq!(
        stub.property("name").unwrap(),
        Some(PropertyValue::String("kept".to_string()))
    );
}

#[test]
fn test_commit_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = GraphConfig {
        database_path: Some(dir.path().join("graph.db")),
        ..Default::default()
    };

    let id = {
        let graph = SqlGraph::open(config.clone()).unwrap();
        let v = graph.add_vertex("Person", &[("name", "durable".into())]).unwrap();
        graph.tx().commit().unwrap();
        v.id()
    };

    let graph = SqlGraph::open(config).unwrap();
    let v = graph.vertex(id).unwrap().unwrap();
    assert_eq!(
        v.property("name").unwrap(),
        Some(PropertyValue::String("durable".to_string()))
    );
}

#[test]
fn test_commit_with_nothing_pending_is_a_no_op() {
    let graph = graph();
    graph.tx().commit().unwrap();
    graph.tx().rollback().unwrap();
}

#[test]
fn test_two_graphs_over_one_file_coordinate_through_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let config = GraphConfig {
        database_path: Some(dir.path().join("graph.db")),
        ..Default::default()
    };

    let writer = SqlGraph::open(config.clone()).unwrap();
    let v = writer.add_vertex("Person", &[("name", "shared".into())]).unwrap();
    writer.tx().commit().unwrap();

    // A second handle observes the committed element, including its
    // first-use schema, with no in-memory sharing.
    let reader = SqlGraph::open(config).unwrap();
    let found = reader.vertex(v.id()).unwrap().unwrap();
    assert_eq!(
        found.property("name").unwrap(),
        Some(PropertyValue::String("shared".to_string()))
    );
    reader.tx().rollback().unwrap();
}

#[test]
fn test_reader_observes_columns_added_by_another_handle() {
    let dir = tempfile::tempdir().unwrap();
    let config = GraphConfig {
        database_path: Some(dir.path().join("graph.db")),
        ..Default::default()
    };

    let writer = SqlGraph::open(config.clone()).unwrap();
    let v = writer.add_vertex("Person", &[]).unwrap();
    writer.tx().commit().unwrap();

    // This reader's catalog cache predates the column added next.
    let reader = SqlGraph::open(config).unwrap();
    let on_writer = writer.vertex(v.id()).unwrap().unwrap();
    on_writer.set_property("name", "alice").unwrap();
    writer.tx().commit().unwrap();

    let stub = reader.vertex(v.id()).unwrap().unwrap();
    assert_eq!(
        stub.property("name").unwrap(),
        Some(PropertyValue::String("alice".to_string()))
    );
    reader.tx().rollback().unwrap();
}

#[test]
fn test_traversal_observes_edge_tables_created_by_another_handle() {
    let dir = tempfile::tempdir().unwrap();
    let config = GraphConfig {
        database_path: Some(dir.path().join("graph.db")),
        ..Default::default()
    };

    let writer = SqlGraph::open(config.clone()).unwrap();
    let a = writer.add_vertex("Person", &[]).unwrap();
    let b = writer.add_vertex("Person", &[]).unwrap();
    writer.tx().commit().unwrap();

    // No edge table exists yet from this reader's point of view.
    let reader = SqlGraph::open(config).unwrap();
    let e = a.add_edge("Knows", &b, &[]).unwrap();
    writer.tx().commit().unwrap();

    let from_reader = reader.vertex(a.id()).unwrap().unwrap();
    let out: Vec<i64> = from_reader
        .edges(sqlgraph::Direction::Out, &[])
        .unwrap()
        .iter()
        .map(|edge| edge.id())
        .collect();
    assert_eq!(out, vec![e.id()]);
    reader.tx().rollback().unwrap();
}
