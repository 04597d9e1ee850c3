// ── Registry storage ──
//
// In-memory entity storage with snapshot change notification, plus the
// bookkeeping types for refresh cycles.

mod collection;
mod refresh;

pub use collection::{RegistryContainer, Upsert};
pub use refresh::{ClientOutcome, CycleReport, RefreshOutcome};

pub(crate) use refresh::MergeBatch;
