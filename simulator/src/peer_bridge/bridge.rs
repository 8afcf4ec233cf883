use crate::peer_bridge::model::{ActionReply, StatusModel};
use crate::workflow::runner::Session;
use shotcore::link::{Payload, PeerControl, PeerInbox};
use shotcore::{MonitorError, MonitorHandle, MonitorResult};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use warp::reply::Json;
use warp::{Filter, Rejection};

const OUTBOX_RETAINED: usize = 256;

fn bridge_bind_address(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

#[derive(Debug)]
struct ControllerGone;

impl warp::reject::Reject for ControllerGone {}

/// Everything the peer has received, newest last.
struct Outbox {
    inbox: PeerInbox,
    retained: VecDeque<Payload>,
}

impl Outbox {
    fn refresh(&mut self) -> Vec<Payload> {
        for message in self.inbox.drain() {
            self.retained.push_back(message);
            if self.retained.len() > OUTBOX_RETAINED {
                self.retained.pop_front();
            }
        }
        self.retained.iter().cloned().collect()
    }
}

/// HTTP front for the presentation contract: observable state plus the
/// start/stop/simulate actions, and the peer's view of the link.
#[derive(Clone)]
pub struct PeerBridge {
    handle: MonitorHandle,
    control: PeerControl,
    outbox: Arc<Mutex<Outbox>>,
}

impl PeerBridge {
    pub fn new(session: Session) -> Self {
        Self {
            handle: session.handle,
            control: session.control,
            outbox: Arc::new(Mutex::new(Outbox {
                inbox: session.inbox,
                retained: VecDeque::new(),
            })),
        }
    }

    pub fn routes(&self) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
        let bridge = self.clone();
        let with_bridge = warp::any().map(move || bridge.clone());

        let state_route = warp::path("state")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_bridge.clone())
            .and_then(|bridge: PeerBridge| async move {
                let state = bridge
                    .handle
                    .state()
                    .await
                    .map_err(|_| warp::reject::custom(ControllerGone))?;
                let model = StatusModel::new(state, bridge.handle.metrics());
                Ok::<_, Rejection>(warp::reply::json(&model))
            });

        let outbox_route = warp::path("outbox")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_bridge.clone())
            .and_then(|bridge: PeerBridge| async move {
                let messages = bridge.outbox.lock().await.refresh();
                Ok::<_, Rejection>(warp::reply::json(&messages))
            });

        let command_route = warp::path("command")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(with_bridge.clone())
            .and_then(|command: Payload, bridge: PeerBridge| async move {
                if bridge.control.send_command(command) {
                    Ok::<_, Rejection>(warp::reply::json(&ActionReply::ok()))
                } else {
                    Err(warp::reject::custom(ControllerGone))
                }
            });

        let start_route = warp::path("start")
            .and(warp::path::end())
            .and(warp::post())
            .and(with_bridge.clone())
            .and_then(|bridge: PeerBridge| async move {
                action_reply(bridge.handle.start().await)
            });

        let stop_route = warp::path("stop")
            .and(warp::path::end())
            .and(warp::post())
            .and(with_bridge.clone())
            .and_then(|bridge: PeerBridge| async move {
                action_reply(bridge.handle.stop().await)
            });

        let simulate_route = warp::path("simulate")
            .and(warp::path::end())
            .and(warp::post())
            .and(with_bridge)
            .and_then(|bridge: PeerBridge| async move {
                action_reply(bridge.handle.simulate_shot().await.map(|_| ()))
            });

        state_route
            .or(outbox_route)
            .or(command_route)
            .or(start_route)
            .or(stop_route)
            .or(simulate_route)
    }

    pub async fn serve(self, port: u16) {
        let address = bridge_bind_address(port);
        log::info!("peer bridge listening on http://{}", address);
        warp::serve(self.routes()).run(address).await;
    }
}

fn action_reply(result: MonitorResult<()>) -> Result<Json, Rejection> {
    let reply = match result {
        Ok(()) => ActionReply::ok(),
        Err(MonitorError::ControllerStopped) => return Err(warp::reject::custom(ControllerGone)),
        Err(err) => ActionReply::ignored(err),
    };
    Ok(warp::reply::json(&reply))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::config::SessionConfig;
    use crate::workflow::runner::Runner;
    use serde_json::{json, Value};

    fn bridge() -> PeerBridge {
        let mut config = SessionConfig::from_args(0, 0, Vec::new());
        config.steps.clear();
        let session = Runner::new(config).launch();
        session.control.set_reachable(true);
        PeerBridge::new(session)
    }

    async fn get_json<F>(routes: &F, path: &str) -> Value
    where
        F: Filter + 'static,
        F::Extract: warp::Reply + Send,
    {
        let response = warp::test::request()
            .method("GET")
            .path(path)
            .reply(routes)
            .await;
        assert_eq!(response.status(), 200);
        serde_json::from_slice(response.body()).unwrap()
    }

    #[tokio::test]
    async fn simulate_shows_up_in_state() {
        let bridge = bridge();
        let routes = bridge.routes();

        let response = warp::test::request()
            .method("POST")
            .path("/simulate")
            .reply(&routes)
            .await;
        assert_eq!(response.status(), 200);

        let state = get_json(&routes, "/state").await;
        assert_eq!(state["shot_detected"], json!(true));
        assert!(state["last_shot_time"].is_number());
        assert_eq!(state["connection_status"], json!("Connected"));
    }

    #[tokio::test]
    async fn ping_command_reaches_outbox() {
        let bridge = bridge();
        let routes = bridge.routes();

        let response = warp::test::request()
            .method("POST")
            .path("/command")
            .json(&json!({"action": "ping"}))
            .reply(&routes)
            .await;
        assert_eq!(response.status(), 200);

        get_json(&routes, "/state").await;
        let outbox = get_json(&routes, "/outbox").await;
        assert_eq!(outbox, json!([{"pong": true, "status": "ok"}]));
    }

    #[tokio::test]
    async fn second_start_is_ignored() {
        let bridge = bridge();
        let routes = bridge.routes();

        let first = warp::test::request()
            .method("POST")
            .path("/start")
            .reply(&routes)
            .await;
        let first: Value = serde_json::from_slice(first.body()).unwrap();
        assert_eq!(first["status"], json!("ok"));

        let second = warp::test::request()
            .method("POST")
            .path("/start")
            .reply(&routes)
            .await;
        let second: Value = serde_json::from_slice(second.body()).unwrap();
        assert_eq!(second["status"], json!("ignored"));
        assert_eq!(second["reason"], json!("monitoring already active"));

        let state = get_json(&routes, "/state").await;
        assert_eq!(state["is_monitoring"], json!(true));
    }
}
