//! tabtidy-host: the IO boundary to a live tab/window/group system.
//! `TabHost` is the only way the rest of the workspace touches live state;
//! `MemoryHost` implements it in-process for tests and file-backed runs.

pub mod error;
pub mod host;
pub mod memory;
pub mod model;
pub mod snapshot;

pub use error::HostError;
pub use host::TabHost;
pub use memory::{HostOp, HostState, MemoryHost};
pub use model::{
    GroupTarget, GroupUpdate, HostGroup, HostTab, MoveProperties, TAB_ID_NONE, TabQuery,
};
pub use snapshot::{to_tab_record, to_tab_records};
