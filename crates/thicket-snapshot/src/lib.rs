//! Thicket Snapshot: persistence, file cache and export for graph views

pub mod cache;
pub mod error;
pub mod export;
pub mod snapshot;

pub use cache::{SnapshotFormat, load_snapshot, load_store, save_snapshot};
pub use error::{Result, SnapshotError};
pub use export::{ExportEdge, ExportMode, ExportNode, render_outline, to_dot, to_petgraph};
pub use snapshot::{EdgeRecord, FORMAT_VERSION, GraphSnapshot, NodeRecord};
