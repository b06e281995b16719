//! Error types for host operations.

use tabtidy_core::{GroupId, TabId, WindowId};
use thiserror::Error;

use crate::memory::HostOp;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("no tab with id {0}")]
    NoSuchTab(TabId),

    #[error("no group with id {0}")]
    NoSuchGroup(GroupId),

    #[error("no window with id {0}")]
    NoSuchWindow(WindowId),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("host rejected {op}: {detail}")]
    Rejected { op: &'static str, detail: String },

    #[error("injected failure in {0:?}")]
    Injected(HostOp),
}
