//! tabtidy-apply: everything that turns classification into host calls.
//! Planning (snapshot → buckets), the group reconciler, in-window
//! arrangement, and selection actions, all over a `TabHost`.

pub mod arrange;
pub mod enrich;
pub mod plan;
pub mod reconcile;
pub mod selection;

pub use arrange::{ArrangeReport, apply_tab_sorting};
pub use enrich::{ContextEnricher, HeuristicEnricher, NoEnrichment};
pub use plan::{GroupingSelection, calculate_tab_groups, fetch_current_tab_groups};
pub use reconcile::{ReconcileReport, ReconcileSession, Step, StepFailure, apply_tab_groups};
pub use selection::{close_bucket, merge_tabs, split_tabs};
