pub mod manual;
pub mod session;

pub use manual::{ControlLimits, ControlMode, DriveCommand, ManualControlMapper};
pub use session::{ControlPhase, ControlScreen};
