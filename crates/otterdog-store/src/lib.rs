//! Persistence for both halves of the workspace: versioned filesystem
//! snapshots for the CLI's `local-plan`/`fetch`/`import`, and an in-process
//! paged document store for the webhook service's collections.

pub mod collection;
pub mod snapshot;

pub use collection::{Collection, Page, PageRequest, SortOrder};
pub use snapshot::{Snapshot, SnapshotStore, CURRENT_SNAPSHOT_VERSION};
