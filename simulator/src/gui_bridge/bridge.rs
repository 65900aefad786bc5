use crate::gui_bridge::model::{ClickRequest, VisualizationModel};
use anyhow::{anyhow, Context, Result};
use log::{error, info};
use probecore::{DisplayParams, InMemorySettings, ProbeView, SortingStatus, ToggleOutcome};
use serde_json::json;
use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard},
    thread,
};
use tokio::runtime::Builder;
use warp::{http::StatusCode, Filter};

pub fn gui_bind_address(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

#[derive(Debug)]
struct WarpError;

impl warp::reject::Reject for WarpError {}

/// Shares a probe view with the HTTP front end.
#[derive(Clone)]
pub struct GuiBridge {
    view: Arc<Mutex<ProbeView<InMemorySettings>>>,
}

impl GuiBridge {
    pub fn new(view: ProbeView<InMemorySettings>) -> Self {
        Self {
            view: Arc::new(Mutex::new(view)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProbeView<InMemorySettings>>> {
        self.view
            .lock()
            .map_err(|_| anyhow!("probe view lock poisoned"))
    }

    pub fn snapshot(&self) -> Result<VisualizationModel> {
        Ok(VisualizationModel::from_view(&*self.lock()?))
    }

    pub fn handle_click(&self, click: ClickRequest) -> Result<ToggleOutcome> {
        let mut view = self.lock()?;
        view.toggle_channel_at(click.x, click.y)
            .with_context(|| format!("toggling channel at ({}, {})", click.x, click.y))
    }

    pub fn handle_display(&self, display: DisplayParams) -> Result<VisualizationModel> {
        let mut view = self.lock()?;
        view.set_display(display).context("applying display parameters")?;
        Ok(VisualizationModel::from_view(&*view))
    }

    pub fn handle_status(&self, status: SortingStatus) -> Result<()> {
        self.lock()?.change_sorting_status(status);
        Ok(())
    }

    /// Clears the view, then reloads it from its settings.
    pub fn handle_reset(&self) -> Result<VisualizationModel> {
        let mut view = self.lock()?;
        view.prepare_for_new_context();
        view.refresh().context("reloading probe view")?;
        Ok(VisualizationModel::from_view(&*view))
    }

    pub fn publish_status(&self, message: &str) {
        println!("[GUI] {}", message);
    }

    /// Hosts the HTTP routes on a background thread.
    pub fn spawn_server(&self, address: SocketAddr) {
        let bridge = self.clone();
        let bridge_filter = warp::any().map(move || bridge.clone());

        let scene_route = warp::path("scene")
            .and(warp::get())
            .and(bridge_filter.clone())
            .and_then(|bridge: GuiBridge| async move {
                match bridge.snapshot() {
                    Ok(model) => Ok(warp::reply::json(&model)),
                    Err(err) => {
                        error!("scene error: {:#}", err);
                        Err(warp::reject::custom(WarpError))
                    }
                }
            });

        let click_route = warp::path("click")
            .and(warp::post())
            .and(warp::body::json())
            .and(bridge_filter.clone())
            .and_then(|click: ClickRequest, bridge: GuiBridge| async move {
                match bridge.handle_click(click) {
                    Ok(outcome) => Ok::<_, warp::Rejection>(warp::reply::with_status(
                        warp::reply::json(&json!({"status": "ok", "result": outcome})),
                        StatusCode::OK,
                    )),
                    Err(err) => {
                        error!("click error: {:#}", err);
                        Err(warp::reject::custom(WarpError))
                    }
                }
            });

        let display_route = warp::path("display")
            .and(warp::post())
            .and(warp::body::json())
            .and(bridge_filter.clone())
            .and_then(|display: DisplayParams, bridge: GuiBridge| async move {
                match bridge.handle_display(display) {
                    Ok(model) => Ok(warp::reply::json(&model)),
                    Err(err) => {
                        error!("display error: {:#}", err);
                        Err(warp::reject::custom(WarpError))
                    }
                }
            });

        let status_route = warp::path("status")
            .and(warp::post())
            .and(warp::body::json())
            .and(bridge_filter.clone())
            .and_then(|status: SortingStatus, bridge: GuiBridge| async move {
                match bridge.handle_status(status) {
                    Ok(()) => Ok(warp::reply::json(&json!({"status": "ok"}))),
                    Err(err) => {
                        error!("status error: {:#}", err);
                        Err(warp::reject::custom(WarpError))
                    }
                }
            });

        let reset_route = warp::path("reset")
            .and(warp::post())
            .and(bridge_filter)
            .and_then(|bridge: GuiBridge| async move {
                match bridge.handle_reset() {
                    Ok(model) => Ok(warp::reply::json(&model)),
                    Err(err) => {
                        error!("reset error: {:#}", err);
                        Err(warp::reject::custom(WarpError))
                    }
                }
            });

        thread::spawn(move || {
            let routes = scene_route
                .or(click_route)
                .or(display_route)
                .or(status_route)
                .or(reset_route);
            let runtime = match Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("failed to build bridge runtime: {}", err);
                    return;
                }
            };
            info!("bridge listening on {}", address);
            runtime.block_on(async move {
                warp::serve(routes).run(address).await;
            });
        });
    }
}
