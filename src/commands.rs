//! CLI command implementations

use std::path::Path;

use thicket_core::{GraphStore, GraphView, StoreConfig};
use thicket_snapshot::{ExportMode, GraphSnapshot, load_store, render_outline, save_snapshot, to_dot};

pub fn demo(output: &Path, config: StoreConfig) -> anyhow::Result<()> {
    let store = GraphStore::new(config);
    let view = store.main_view();
    build_demo(&view)?;
    view.validate()?;

    let snapshot = GraphSnapshot::capture(&view.read())?;
    save_snapshot(&snapshot, output)?;

    tracing::info!(
        "Wrote {} nodes, {} edges to {}",
        view.node_count(),
        view.edge_count(),
        output.display()
    );
    Ok(())
}

/// Two services talking to a storage layer, with the storage cluster
/// collapsed and the api cluster expanded.
fn build_demo(view: &GraphView) -> anyhow::Result<()> {
    let gateway = view.add_node(None)?;
    let auth = view.add_node(None)?;
    let orders = view.add_node(None)?;
    let postgres = view.add_node(None)?;
    let redis = view.add_node(None)?;
    let sessions = view.add_node(Some(redis))?;

    view.add_edge(gateway, auth, 3.0, true)?;
    view.add_edge(gateway, orders, 5.0, true)?;
    view.add_edge(auth, redis, 2.0, true)?;
    view.add_edge(orders, postgres, 4.0, true)?;
    view.add_edge(orders, sessions, 1.0, true)?;
    view.add_edge(auth, orders, 1.0, false)?;

    let api = view.group(&[auth, orders])?;
    view.group(&[postgres, redis])?;
    view.expand(api)?;
    tracing::debug!("Demo graph built with api cluster {}", api);
    Ok(())
}

pub fn inspect(file: &Path, config: StoreConfig) -> anyhow::Result<()> {
    let store = load_store(file, config)?;
    let view = store.main_view();
    let visible = view.visible_nodes()?.to_vec()?.len();
    let meta_edges = view.meta_edges()?.to_vec()?.len();
    let s = view.read();

    println!("File:        {}", file.display());
    println!("Nodes:       {} ({} visible)", s.node_count(), visible);
    println!("Edges:       {}", s.edge_count());
    println!("Meta-edges:  {}", meta_edges);
    println!("Height:      {}", s.height());
    println!("Generation:  {}", s.generation());
    println!("Directed:    {}", s.config().directed);
    Ok(())
}

pub fn outline(file: &Path, config: StoreConfig) -> anyhow::Result<()> {
    let store = load_store(file, config)?;
    println!("{}", render_outline(&store.main_view().read())?);
    Ok(())
}

pub fn check(file: &Path, config: StoreConfig) -> anyhow::Result<()> {
    let store = load_store(file, config)?;
    store.main_view().validate()?;
    println!("{}: ok", file.display());
    Ok(())
}

pub fn export(file: &Path, config: StoreConfig, collapsed: bool, output: Option<&Path>) -> anyhow::Result<()> {
    let store = load_store(file, config)?;
    let mode = if collapsed { ExportMode::Collapsed } else { ExportMode::Full };
    let dot = to_dot(&store.main_view().read(), mode)?;

    match output {
        Some(path) => {
            std::fs::write(path, dot)?;
            tracing::info!("DOT written to {}", path.display());
        }
        None => print!("{}", dot),
    }
    Ok(())
}
