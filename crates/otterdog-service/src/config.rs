//! Re-exports the declarative-config rendering the CLI and the task
//! handlers both need; the rendering logic itself lives next to the
//! Loader it inverts.

pub use otterdog_model::{parse_declarative_config, render_organization, render_plan};
