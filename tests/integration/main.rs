//! Integration tests for Thicket
//!
//! These tests exercise views across threads, snapshot files and the CLI.

use std::process::Command;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tempfile::TempDir;
use thicket_core::{Direction, GraphStore, GraphView, NodeId};
use thicket_snapshot::{ExportMode, GraphSnapshot, load_snapshot, load_store, save_snapshot, to_dot};

fn populated() -> (GraphStore, Vec<NodeId>) {
    let store = GraphStore::default();
    let view = store.main_view();
    let ids: Vec<NodeId> = (0..5).map(|_| view.add_node(None).unwrap()).collect();
    for pair in ids.windows(2) {
        view.add_edge(pair[0], pair[1], 1.0, true).unwrap();
    }
    (store, ids)
}

/// Spawn a writer on another thread; returns whether it finished within `wait`.
fn writer_finishes(view: &GraphView, wait: Duration) -> (bool, thread::JoinHandle<()>) {
    let (tx, rx) = mpsc::channel();
    let writer = view.clone();
    let handle = thread::spawn(move || {
        writer.add_node(None).unwrap();
        let _ = tx.send(());
    });
    (rx.recv_timeout(wait).is_ok(), handle)
}

#[test]
fn test_exhaustion_releases_lock_for_writer_thread() {
    let (store, ids) = populated();
    let view = store.main_view();

    let mut nodes = view.nodes().unwrap();
    let mut seen = 0;
    while nodes.has_next() {
        nodes.next();
        seen += 1;
    }
    assert_eq!(seen, ids.len());
    assert!(nodes.is_released());

    // No do_break: exhaustion alone must have released the read lock.
    let (finished, handle) = writer_finishes(&view, Duration::from_secs(5));
    assert!(finished);
    handle.join().unwrap();
    assert_eq!(view.node_count(), ids.len() + 1);
}

#[test]
fn test_open_iterable_blocks_writer_until_break() {
    let (store, _) = populated();
    let view = store.main_view();

    let mut edges = view.edges().unwrap();
    assert!(edges.next().is_some());

    let (finished, handle) = writer_finishes(&view, Duration::from_millis(100));
    assert!(!finished);

    edges.do_break();
    handle.join().unwrap();
    assert_eq!(view.node_count(), 6);
}

#[test]
fn test_concurrent_readers() {
    let (store, ids) = populated();
    let view = store.main_view();
    let ids = &ids;

    thread::scope(|scope| {
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let view = view.clone();
                scope.spawn(move || view.neighbors(ids[2], Direction::Both).unwrap().to_vec().unwrap())
            })
            .collect();
        for reader in readers {
            let mut neighbours = reader.join().unwrap();
            neighbours.sort();
            assert_eq!(neighbours, vec![ids[1], ids[3]]);
        }
    });
}

#[test]
fn test_views_share_identifier_space_across_threads() {
    let store = GraphStore::default();
    let fork = store.fork_view(thicket_core::ViewId::MAIN).unwrap();
    let main = store.main_view();

    let (a, b) = thread::scope(|scope| {
        let left = scope.spawn(|| (0..50).map(|_| main.add_node(None).unwrap()).collect::<Vec<_>>());
        let right = scope.spawn(|| (0..50).map(|_| fork.add_node(None).unwrap()).collect::<Vec<_>>());
        (left.join().unwrap(), right.join().unwrap())
    });
    assert!(a.iter().all(|id| !b.contains(id)));
    assert_eq!(main.node_count(), 50);
    assert_eq!(fork.node_count(), 50);
}

#[test]
fn test_snapshot_file_round_trip_and_export() {
    let temp_dir = TempDir::new().unwrap();
    let (store, ids) = populated();
    let view = store.main_view();
    let cluster = view.group(&ids[1..3]).unwrap();
    assert_eq!(view.meta_edges().unwrap().to_vec().unwrap().len(), 2);

    let path = temp_dir.path().join("graph.bin");
    save_snapshot(&GraphSnapshot::capture(&view.read()).unwrap(), &path).unwrap();
    assert_eq!(load_snapshot(&path).unwrap().nodes.len(), 6);

    let restored = load_store(&path, Default::default()).unwrap();
    let restored_view = restored.main_view();
    restored_view.validate().unwrap();
    assert_eq!(restored_view.node_count(), 6);
    assert_eq!(restored_view.meta_edges().unwrap().to_vec().unwrap().len(), 2);

    let dot = to_dot(&restored_view.read(), ExportMode::Collapsed).unwrap();
    assert!(dot.contains("[+2]"));
    assert!(view.node(cluster).unwrap().is_enabled());
}

#[test]
fn test_cli_demo_then_check() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot = temp_dir.path().join("demo.json");
    let config = temp_dir.path().join("absent.toml");
    let thicket = env!("CARGO_BIN_EXE_thicket");

    let demo = Command::new(thicket)
        .arg("--config")
        .arg(&config)
        .arg("demo")
        .arg(&snapshot)
        .output()
        .unwrap();
    assert!(demo.status.success(), "{}", String::from_utf8_lossy(&demo.stderr));
    assert!(snapshot.exists());

    let check = Command::new(thicket)
        .arg("--config")
        .arg(&config)
        .arg("check")
        .arg(&snapshot)
        .output()
        .unwrap();
    assert!(check.status.success());
    assert!(String::from_utf8_lossy(&check.stdout).contains("ok"));

    let export = Command::new(thicket)
        .arg("--config")
        .arg(&config)
        .args(["export", "--collapsed"])
        .arg(&snapshot)
        .output()
        .unwrap();
    assert!(export.status.success());
    assert!(String::from_utf8_lossy(&export.stdout).starts_with("digraph"));
}
