use super::client::RobotApi;
use super::error::{ClientError, Result};
use super::types::{CapabilitySet, DriveAction, MapPayload, MapPoint, MaterialProperties, Segment};

/// Identity of one screen visit or gesture. Completions carrying an older
/// token than the owner's current one are stale and must be dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionToken(u64);

impl SessionToken {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

/// One call against the robot, described as data so the screen that wants it
/// can hand it to whatever runs the network round-trip.
#[derive(Debug, Clone, PartialEq)]
pub enum RobotRequest {
    Capabilities,
    Map,
    Segments,
    MaterialProperties,
    Rename {
        segment_id: String,
        name: String,
    },
    Join {
        id_a: String,
        id_b: String,
    },
    Split {
        segment_id: String,
        point_a: MapPoint,
        point_b: MapPoint,
    },
    SetMaterial {
        segment_id: String,
        material: String,
    },
    EnableHighRes,
    DisableHighRes,
    HighRes {
        velocity: i32,
        angle: i32,
    },
    Manual {
        action: DriveAction,
        movement_speed: Option<i32>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RobotResponse {
    Capabilities(CapabilitySet),
    Map(MapPayload),
    Segments(Vec<Segment>),
    MaterialProperties(MaterialProperties),
    Done,
}

impl RobotRequest {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Capabilities => "capabilities",
            Self::Map => "map",
            Self::Segments => "segments",
            Self::MaterialProperties => "material properties",
            Self::Rename { .. } => "rename",
            Self::Join { .. } => "join",
            Self::Split { .. } => "split",
            Self::SetMaterial { .. } => "set material",
            Self::EnableHighRes => "enable high-res control",
            Self::DisableHighRes => "disable high-res control",
            Self::HighRes { .. } => "high-res move",
            Self::Manual { .. } => "manual control",
        }
    }

    /// Segment edits that put a screen into its in-flight state.
    pub fn is_segment_edit(&self) -> bool {
        matches!(
            self,
            Self::Rename { .. } | Self::Join { .. } | Self::Split { .. } | Self::SetMaterial { .. }
        )
    }

    pub async fn execute(&self, api: &dyn RobotApi) -> Result<RobotResponse> {
        match self {
            Self::Capabilities => api.get_capabilities().await.map(RobotResponse::Capabilities),
            Self::Map => api.get_map().await.map(RobotResponse::Map),
            Self::Segments => api.get_segments().await.map(RobotResponse::Segments),
            Self::MaterialProperties => api
                .get_segment_material_properties()
                .await
                .map(RobotResponse::MaterialProperties),
            Self::Rename { segment_id, name } => {
                api.rename_segment(segment_id, name).await?;
                Ok(RobotResponse::Done)
            }
            Self::Join { id_a, id_b } => {
                api.join_segments(id_a, id_b).await?;
                Ok(RobotResponse::Done)
            }
            Self::Split {
                segment_id,
                point_a,
                point_b,
            } => {
                api.split_segment(segment_id, *point_a, *point_b).await?;
                Ok(RobotResponse::Done)
            }
            Self::SetMaterial {
                segment_id,
                material,
            } => {
                api.set_segment_material(segment_id, material).await?;
                Ok(RobotResponse::Done)
            }
            Self::EnableHighRes => {
                api.enable_high_res_manual_control().await?;
                Ok(RobotResponse::Done)
            }
            Self::DisableHighRes => {
                api.disable_high_res_manual_control().await?;
                Ok(RobotResponse::Done)
            }
            Self::HighRes { velocity, angle } => {
                api.high_res_manual_control(*velocity, *angle).await?;
                Ok(RobotResponse::Done)
            }
            Self::Manual {
                action,
                movement_speed,
            } => {
                api.manual_control(*action, *movement_speed).await?;
                Ok(RobotResponse::Done)
            }
        }
    }
}

/// A request bound to the session that asked for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub session: SessionToken,
    pub request: RobotRequest,
}

/// A finished round-trip, routed back to the session that issued it.
#[derive(Debug)]
pub struct Completion {
    pub session: SessionToken,
    pub request: RobotRequest,
    pub result: Result<RobotResponse>,
}

/// What applying a completion asks of the caller: more requests to issue,
/// and an error to report if the completion was a failure it must hear about.
#[derive(Debug, Default)]
pub struct Applied {
    pub follow_ups: Vec<Ticket>,
    pub error: Option<ClientError>,
}

impl Applied {
    pub fn follow_up(session: SessionToken, requests: impl IntoIterator<Item = RobotRequest>) -> Self {
        Self {
            follow_ups: requests
                .into_iter()
                .map(|request| Ticket { session, request })
                .collect(),
            error: None,
        }
    }

    pub fn failed(error: ClientError) -> Self {
        Self {
            follow_ups: Vec::new(),
            error: Some(error),
        }
    }
}

impl Ticket {
    pub async fn run(self, api: &dyn RobotApi) -> Completion {
        let result = self.request.execute(api).await;
        Completion {
            session: self.session,
            request: self.request,
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeRobot;

    #[test]
    fn tokens_advance_monotonically() {
        let first = SessionToken::default();
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.value(), 1);
    }

    #[tokio::test]
    async fn ticket_run_carries_session_and_request_back() {
        let robot = FakeRobot::default();
        let ticket = Ticket {
            session: SessionToken::default().next(),
            request: RobotRequest::Join {
                id_a: "1".into(),
                id_b: "2".into(),
            },
        };
        let completion = ticket.clone().run(&robot).await;
        assert_eq!(completion.session, ticket.session);
        assert_eq!(completion.request, ticket.request);
        assert!(matches!(completion.result, Ok(RobotResponse::Done)));
        assert_eq!(robot.calls(), vec!["join 1 2".to_string()]);
    }

    #[tokio::test]
    async fn failed_calls_surface_as_transport_errors() {
        let robot = FakeRobot::default();
        robot.fail_next("split");
        let ticket = Ticket {
            session: SessionToken::default(),
            request: RobotRequest::Split {
                segment_id: "4".into(),
                point_a: MapPoint::new(0, 0),
                point_b: MapPoint::new(10, 10),
            },
        };
        let completion = ticket.run(&robot).await;
        assert!(completion.result.unwrap_err().is_transport());
    }
}
