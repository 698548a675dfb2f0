use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use super::error::Result;
use super::types::{CapabilitySet, DriveAction, MapPayload, MapPoint, MaterialProperties, Segment};

/// Boxed future returned by every robot call, so the trait stays object safe
/// and the futures can be spawned on the shared runtime.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Transport-level contract for talking to one robot.
pub trait RobotApi: Send + Sync {
    fn get_capabilities(&self) -> ApiFuture<'_, CapabilitySet>;
    fn get_map(&self) -> ApiFuture<'_, MapPayload>;
    fn get_segments(&self) -> ApiFuture<'_, Vec<Segment>>;

    fn rename_segment<'a>(&'a self, id: &'a str, name: &'a str) -> ApiFuture<'a, ()>;
    fn join_segments<'a>(&'a self, id_a: &'a str, id_b: &'a str) -> ApiFuture<'a, ()>;
    fn split_segment<'a>(
        &'a self,
        segment_id: &'a str,
        point_a: MapPoint,
        point_b: MapPoint,
    ) -> ApiFuture<'a, ()>;

    fn get_segment_material_properties(&self) -> ApiFuture<'_, MaterialProperties>;
    fn set_segment_material<'a>(&'a self, segment_id: &'a str, material: &'a str)
    -> ApiFuture<'a, ()>;

    fn enable_high_res_manual_control(&self) -> ApiFuture<'_, ()>;
    fn disable_high_res_manual_control(&self) -> ApiFuture<'_, ()>;
    fn high_res_manual_control(&self, velocity: i32, angle: i32) -> ApiFuture<'_, ()>;
    fn manual_control(&self, action: DriveAction, movement_speed: Option<i32>)
    -> ApiFuture<'_, ()>;
}

/// Shared handle to the robot the current screens talk to.
pub type SharedRobot = Arc<dyn RobotApi>;
