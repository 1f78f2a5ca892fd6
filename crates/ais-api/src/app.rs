use std::sync::Arc;

use ais_clustersm::ClusterStateMachine;
use ais_dispatcher::InstallerImages;
use ais_hostsm::HostStateMachine;
use ais_store::StateStore;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer_token;
use crate::handlers;
use crate::state::AppState;

pub fn build_app(
    store: Arc<dyn StateStore>,
    auth_token: Arc<String>,
    images: Arc<InstallerImages>,
) -> Router {
    let hostsm = Arc::new(HostStateMachine::new(store.clone()));
    let clustersm = Arc::new(ClusterStateMachine::new(store.clone()));
    let state = AppState { store, hostsm, clustersm, auth_token, images };

    Router::new()
        // Health
        .route("/health", get(handlers::health))
        .route("/ready", get(handlers::ready))
        // Agent wire protocol (§6)
        .route(
            "/v2/infra-envs/:infra_env_id/hosts/:host_id",
            post(handlers::register_host),
        )
        .route(
            "/v2/infra-envs/:infra_env_id/hosts/:host_id/inventory",
            post(handlers::update_inventory),
        )
        .route(
            "/v2/infra-envs/:infra_env_id/hosts/:host_id/connectivity",
            post(handlers::update_connectivity),
        )
        .route(
            "/v2/infra-envs/:infra_env_id/hosts/:host_id/next-steps",
            get(handlers::get_next_steps),
        )
        .route("/v2/hosts/:host_id/step-replies", post(handlers::post_step_reply))
        .route("/v2/hosts/:host_id/progress", post(handlers::update_progress))
        .route("/v2/hosts/:host_id/logs", post(handlers::upload_logs))
        // Cluster / host admin surface
        .route("/v2/clusters", get(handlers::list_clusters).post(handlers::create_cluster))
        .route("/v2/clusters/:cluster_id", get(handlers::get_cluster))
        .route(
            "/v2/clusters/:cluster_id/hosts/:host_id/bind",
            post(handlers::bind_host),
        )
        .route(
            "/v2/clusters/:cluster_id/hosts/:host_id/unbind",
            post(handlers::unbind_host),
        )
        .route(
            "/v2/clusters/:cluster_id/actions/install",
            post(handlers::start_installation),
        )
        .route(
            "/v2/clusters/:cluster_id/actions/cancel",
            post(handlers::cancel_cluster),
        )
        .route(
            "/v2/clusters/:cluster_id/actions/hold-installation",
            post(handlers::set_hold_installation),
        )
        // Events / status
        .route("/events", get(handlers::list_events))
        .route("/status", get(handlers::status))
        // Auth middleware applies to every route above except /health
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer_token))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
