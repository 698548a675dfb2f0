use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use super::client::{ApiFuture, RobotApi};
use super::error::{ClientError, Result};
use super::types::*;

/// `RobotApi` over the robot's REST interface.
pub struct HttpRobotApi {
    client: Client,
    base: String,
}

impl HttpRobotApi {
    pub fn new(robot_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| ClientError::Transport {
                endpoint: robot_url.to_string(),
                source,
            })?;
        Ok(Self {
            client,
            base: format!("{}/api/v2/robot", robot_url.trim_end_matches('/')),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn request(&self, method: Method, path: &str) -> (String, RequestBuilder) {
        let url = format!("{}/{}", self.base, path);
        let builder = self.client.request(method, &url);
        (path.to_string(), builder)
    }

    async fn send(endpoint: &str, builder: RequestBuilder) -> Result<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;
        if !response.status().is_success() {
            return Err(ClientError::status(endpoint, response.status().as_u16()));
        }
        Ok(response)
    }

    async fn get_body(&self, path: &str) -> Result<(String, Vec<u8>)> {
        let (endpoint, builder) = self.request(Method::GET, path);
        let response = Self::send(&endpoint, builder).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        Ok((endpoint, bytes.to_vec()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (endpoint, body) = self.get_body(path).await?;
        serde_json::from_slice(&body).map_err(|source| ClientError::Decode { endpoint, source })
    }

    async fn put_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let (endpoint, builder) = self.request(Method::PUT, path);
        Self::send(&endpoint, builder.json(body)).await?;
        Ok(())
    }
}

fn capability_path(capability: &str) -> String {
    format!("capabilities/{capability}")
}

impl RobotApi for HttpRobotApi {
    fn get_capabilities(&self) -> ApiFuture<'_, CapabilitySet> {
        Box::pin(self.get_json("capabilities"))
    }

    fn get_map(&self) -> ApiFuture<'_, MapPayload> {
        Box::pin(async move {
            let (endpoint, body) = self.get_body("state/map").await?;
            MapPayload::from_body(&body).map_err(|source| ClientError::Decode { endpoint, source })
        })
    }

    fn get_segments(&self) -> ApiFuture<'_, Vec<Segment>> {
        Box::pin(async move { self.get_json(&capability_path(CAP_SEGMENTATION)).await })
    }

    fn rename_segment<'a>(&'a self, id: &'a str, name: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let body = json!({ "action": "rename_segment", "segment_id": id, "name": name });
            self.put_json(&capability_path(CAP_SEGMENT_RENAME), &body).await
        })
    }

    fn join_segments<'a>(&'a self, id_a: &'a str, id_b: &'a str) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let body = json!({
                "action": "join_segments",
                "segment_a_id": id_a,
                "segment_b_id": id_b,
            });
            self.put_json(&capability_path(CAP_SEGMENT_EDIT), &body).await
        })
    }

    fn split_segment<'a>(
        &'a self,
        segment_id: &'a str,
        point_a: MapPoint,
        point_b: MapPoint,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let body = json!({
                "action": "split_segment",
                "segment_id": segment_id,
                "pA": point_a,
                "pB": point_b,
            });
            self.put_json(&capability_path(CAP_SEGMENT_EDIT), &body).await
        })
    }

    fn get_segment_material_properties(&self) -> ApiFuture<'_, MaterialProperties> {
        Box::pin(async move {
            let path = format!("{}/properties", capability_path(CAP_SEGMENT_MATERIAL));
            self.get_json(&path).await
        })
    }

    fn set_segment_material<'a>(
        &'a self,
        segment_id: &'a str,
        material: &'a str,
    ) -> ApiFuture<'a, ()> {
        Box::pin(async move {
            let body = json!({
                "action": "set_material",
                "segment_id": segment_id,
                "material": material,
            });
            self.put_json(&capability_path(CAP_SEGMENT_MATERIAL), &body).await
        })
    }

    fn enable_high_res_manual_control(&self) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            let body = json!({ "action": "enable" });
            self.put_json(&capability_path(CAP_HIGH_RES_MANUAL_CONTROL), &body)
                .await
        })
    }

    fn disable_high_res_manual_control(&self) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            let body = json!({ "action": "disable" });
            self.put_json(&capability_path(CAP_HIGH_RES_MANUAL_CONTROL), &body)
                .await
        })
    }

    fn high_res_manual_control(&self, velocity: i32, angle: i32) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            let body = json!({
                "action": "move",
                "vector": { "velocity": velocity, "angle": angle },
            });
            self.put_json(&capability_path(CAP_HIGH_RES_MANUAL_CONTROL), &body)
                .await
        })
    }

    fn manual_control(
        &self,
        action: DriveAction,
        movement_speed: Option<i32>,
    ) -> ApiFuture<'_, ()> {
        Box::pin(async move {
            let body = manual_control_body(action, movement_speed);
            self.put_json(&capability_path(CAP_MANUAL_CONTROL), &body).await
        })
    }
}

fn manual_control_body(action: DriveAction, movement_speed: Option<i32>) -> serde_json::Value {
    match movement_speed {
        Some(speed) => json!({ "action": action.as_str(), "movementSpeed": speed }),
        None => json!({ "action": action.as_str() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_strips_trailing_slash() {
        let api = HttpRobotApi::new("http://robot.local/", Duration::from_secs(1)).unwrap();
        assert_eq!(api.base_url(), "http://robot.local/api/v2/robot");
    }

    #[test]
    fn manual_control_body_omits_absent_speed() {
        let body = manual_control_body(DriveAction::RotateLeft, None);
        assert_eq!(body, json!({ "action": "rotate_counterclockwise" }));

        let body = manual_control_body(DriveAction::Forward, Some(2));
        assert_eq!(body, json!({ "action": "forward", "movementSpeed": 2 }));
    }
}
