pub mod orchestrator;
pub mod selection;

pub use orchestrator::{EditPhase, SegmentEditor, SegmentFeatures};
pub use selection::EditSelection;
