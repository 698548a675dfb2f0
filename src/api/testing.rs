//! In-memory robot used by unit tests.

use std::collections::HashSet;
use std::sync::Mutex;

use super::client::{ApiFuture, RobotApi};
use super::error::{ClientError, Result};
use super::types::*;

#[derive(Default)]
pub struct FakeRobot {
    pub capabilities: Mutex<CapabilitySet>,
    pub segments: Mutex<Vec<Segment>>,
    pub materials: Mutex<Vec<String>>,
    pub map: Mutex<MapPayload>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl FakeRobot {
    pub fn with_capabilities(names: &[&str]) -> Self {
        let robot = Self::default();
        *robot.capabilities.lock().unwrap() = names.iter().copied().collect();
        robot
    }

    pub fn set_segments(&self, segments: Vec<Segment>) {
        *self.segments.lock().unwrap() = segments;
    }

    /// Make the next call whose log line starts with `prefix` fail with a 500.
    pub fn fail_next(&self, prefix: &'static str) {
        self.failing.lock().unwrap().insert(prefix);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) -> Result<()> {
        let failing = {
            let mut failing = self.failing.lock().unwrap();
            let hit = failing.iter().copied().find(|prefix| call.starts_with(prefix));
            if let Some(prefix) = hit {
                failing.remove(prefix);
            }
            hit
        };
        self.calls.lock().unwrap().push(call);
        match failing {
            Some(prefix) => Err(ClientError::status(prefix, 500)),
            None => Ok(()),
        }
    }

    fn ready<T: Send + 'static>(&self, call: String, value: impl FnOnce() -> T) -> ApiFuture<'_, T> {
        let result = self.record(call).map(|()| value());
        Box::pin(async move { result })
    }
}

impl RobotApi for FakeRobot {
    fn get_capabilities(&self) -> ApiFuture<'_, CapabilitySet> {
        self.ready("capabilities".into(), || self.capabilities.lock().unwrap().clone())
    }

    fn get_map(&self) -> ApiFuture<'_, MapPayload> {
        self.ready("map".into(), || self.map.lock().unwrap().clone())
    }

    fn get_segments(&self) -> ApiFuture<'_, Vec<Segment>> {
        self.ready("segments".into(), || self.segments.lock().unwrap().clone())
    }

    fn rename_segment<'a>(&'a self, id: &'a str, name: &'a str) -> ApiFuture<'a, ()> {
        self.ready(format!("rename {id} {name}"), || ())
    }

    fn join_segments<'a>(&'a self, id_a: &'a str, id_b: &'a str) -> ApiFuture<'a, ()> {
        self.ready(format!("join {id_a} {id_b}"), || ())
    }

    fn split_segment<'a>(
        &'a self,
        segment_id: &'a str,
        point_a: MapPoint,
        point_b: MapPoint,
    ) -> ApiFuture<'a, ()> {
        self.ready(
            format!(
                "split {segment_id} {},{} {},{}",
                point_a.x, point_a.y, point_b.x, point_b.y
            ),
            || (),
        )
    }

    fn get_segment_material_properties(&self) -> ApiFuture<'_, MaterialProperties> {
        self.ready("materials".into(), || MaterialProperties {
            supported_materials: self.materials.lock().unwrap().clone(),
        })
    }

    fn set_segment_material<'a>(
        &'a self,
        segment_id: &'a str,
        material: &'a str,
    ) -> ApiFuture<'a, ()> {
        self.ready(format!("material {segment_id} {material}"), || ())
    }

    fn enable_high_res_manual_control(&self) -> ApiFuture<'_, ()> {
        self.ready("highres enable".into(), || ())
    }

    fn disable_high_res_manual_control(&self) -> ApiFuture<'_, ()> {
        self.ready("highres disable".into(), || ())
    }

    fn high_res_manual_control(&self, velocity: i32, angle: i32) -> ApiFuture<'_, ()> {
        self.ready(format!("highres move {velocity} {angle}"), || ())
    }

    fn manual_control(
        &self,
        action: DriveAction,
        movement_speed: Option<i32>,
    ) -> ApiFuture<'_, ()> {
        let call = match movement_speed {
            Some(speed) => format!("manual {} {speed}", action.as_str()),
            None => format!("manual {}", action.as_str()),
        };
        self.ready(call, || ())
    }
}
