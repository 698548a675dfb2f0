pub mod client;
pub mod error;
pub mod http;
pub mod request;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use client::{RobotApi, SharedRobot};
pub use error::{ClientError, Result};
pub use request::{Applied, Completion, RobotRequest, RobotResponse, SessionToken, Ticket};
