use std::sync::Arc;

use bevy::prelude::*;
use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::api::http::HttpRobotApi;
use crate::api::{ClientError, Completion, SharedRobot, Ticket};
use crate::config::settings::ClientSettings;

/// Runtime that carries every robot round-trip off the frame loop.
#[derive(Resource)]
pub struct TokioRuntime(pub tokio::runtime::Runtime);

/// The robot this client drives, handed to screens explicitly.
#[derive(Resource, Clone)]
pub struct RobotHandle {
    pub api: SharedRobot,
    pub url: String,
}

/// Where a screen's finished requests land. Drained once per frame.
pub struct Inbox {
    tx: Sender<Completion>,
    rx: Receiver<Completion>,
}

impl Default for Inbox {
    fn default() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }
}

impl Inbox {
    /// Run `ticket` in the background; its completion shows up in [`Inbox::drain`].
    /// Without a runtime or robot the ticket fails right away, so the screen
    /// that issued it still hears back.
    pub fn spawn(&self, runtime: Option<&TokioRuntime>, robot: Option<&RobotHandle>, ticket: Ticket) {
        let (Some(runtime), Some(robot)) = (runtime, robot) else {
            warn!("No robot connection, failing {}", ticket.request.label());
            let _ = self.tx.send(Completion {
                session: ticket.session,
                request: ticket.request,
                result: Err(ClientError::validation("no robot connection")),
            });
            return;
        };
        let api = Arc::clone(&robot.api);
        let tx = self.tx.clone();
        runtime.0.spawn(async move {
            let completion = ticket.run(api.as_ref()).await;
            // receiver only goes away with the app
            let _ = tx.send(completion);
        });
    }

    pub fn drain(&self) -> Vec<Completion> {
        self.rx.try_iter().collect()
    }
}

pub struct ApiPlugin;

impl Plugin for ApiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, init_api);
    }
}

/// Build a client for the configured robot. `None` (logged) when the URL is unusable.
pub fn connect(settings: &ClientSettings) -> Option<RobotHandle> {
    info!("Connecting to robot at {}", settings.robot_url);
    match HttpRobotApi::new(&settings.robot_url, settings.request_timeout()) {
        Ok(api) => Some(RobotHandle {
            api: Arc::new(api),
            url: settings.robot_url.clone(),
        }),
        Err(e) => {
            error!("Failed to build robot client: {e}");
            None
        }
    }
}

fn init_api(mut commands: Commands, settings: Res<ClientSettings>) {
    let rt = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
    commands.insert_resource(TokioRuntime(rt));

    if let Some(robot) = connect(&settings) {
        commands.insert_resource(robot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeRobot;
    use crate::api::types::CAP_MANUAL_CONTROL;
    use crate::api::{RobotRequest, RobotResponse, SessionToken};

    fn ticket(request: RobotRequest) -> Ticket {
        Ticket {
            session: SessionToken::default().next(),
            request,
        }
    }

    #[test]
    fn missing_connection_fails_the_ticket() {
        let inbox = Inbox::default();
        inbox.spawn(None, None, ticket(RobotRequest::Segments));

        let completions = inbox.drain();
        assert_eq!(completions.len(), 1);
        assert_eq!(completions[0].request, RobotRequest::Segments);
        assert!(matches!(
            completions[0].result,
            Err(ClientError::Validation { .. })
        ));
        assert!(inbox.drain().is_empty());
    }

    #[test]
    fn completions_come_back_through_the_inbox() {
        let runtime = TokioRuntime(tokio::runtime::Runtime::new().unwrap());
        let robot = RobotHandle {
            api: Arc::new(FakeRobot::with_capabilities(&[CAP_MANUAL_CONTROL])),
            url: "http://fake".into(),
        };
        let inbox = Inbox::default();
        inbox.spawn(Some(&runtime), Some(&robot), ticket(RobotRequest::Capabilities));

        let completion = inbox.rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap();
        match completion.result {
            Ok(RobotResponse::Capabilities(caps)) => assert!(caps.has(CAP_MANUAL_CONTROL)),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
