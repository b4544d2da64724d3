use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};
use shared::{
    domain::{Truck, TruckId},
    error::{ApiError, ErrorCode},
    protocol::TRUCKS_ENDPOINT,
};
use tracing::{error, info};
use uuid::Uuid;

mod api;
mod app_state;
mod config;
mod fleet;

use api::{add_truck, list_trucks, put_truck, remove_truck};
use app_state::AppState;
use config::{load_seed, load_settings};
use fleet::{Fleet, Upsert};

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let seed = match &settings.seed_file {
        Some(path) => load_seed(path).map_err(|error| {
            error!(path = %path.display(), %error, "failed to load seed trucks");
            error
        })?,
        None => Vec::new(),
    };
    info!(trucks = seed.len(), "fleet seeded");

    let fleet = Fleet::new(seed)?;
    let app = build_router(Arc::new(AppState {
        fleet: Arc::new(fleet),
    }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "truck feed listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route(api::trucks_route(), get(http_list_trucks).post(http_add_truck))
        .route(
            api::truck_route(),
            get(http_get_truck).put(http_put_truck).delete(http_delete_truck),
        )
        .route(api::stream_route(), get(ws_handler))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_list_trucks(State(state): State<Arc<AppState>>) -> Json<Vec<Truck>> {
    Json(list_trucks(&state.fleet).await)
}

async fn http_get_truck(
    State(state): State<Arc<AppState>>,
    Path(truck_id): Path<String>,
) -> ApiResult<Json<Truck>> {
    list_trucks(&state.fleet)
        .await
        .into_iter()
        .find(|truck| truck.id.as_str() == truck_id)
        .map(Json)
        .ok_or_else(|| {
            map_api_error(ApiError::new(
                ErrorCode::NotFound,
                format!("unknown truck {truck_id}"),
            ))
        })
}

async fn http_add_truck(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<(StatusCode, Json<Truck>)> {
    let truck = add_truck(&state.fleet, body).await.map_err(map_api_error)?;
    Ok((StatusCode::CREATED, Json(truck)))
}

async fn http_put_truck(
    State(state): State<Arc<AppState>>,
    Path(truck_id): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<(StatusCode, Json<Truck>)> {
    let (truck, outcome) = put_truck(&state.fleet, TruckId(truck_id), body)
        .await
        .map_err(map_api_error)?;
    let status = match outcome {
        Upsert::Inserted => StatusCode::CREATED,
        Upsert::Replaced | Upsert::Unchanged => StatusCode::OK,
    };
    Ok((status, Json(truck)))
}

async fn http_delete_truck(
    State(state): State<Arc<AppState>>,
    Path(truck_id): Path<String>,
) -> ApiResult<StatusCode> {
    remove_truck(&state.fleet, &TruckId(truck_id))
        .await
        .map_err(map_api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn ws_handler(
    State(state): State<Arc<AppState>>,
    Path(endpoint): Path<String>,
    ws: Option<WebSocketUpgrade>,
) -> Response {
    if endpoint != TRUCKS_ENDPOINT {
        return map_api_error(ApiError::new(
            ErrorCode::NotFound,
            format!("unknown endpoint {endpoint}"),
        ))
        .into_response();
    }
    let Some(ws) = ws else {
        return (StatusCode::UPGRADE_REQUIRED, "websocket upgrade required").into_response();
    };
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

/// Sends the current snapshot right away and then every newer one. Inbound
/// frames are only read to notice the client going away.
async fn ws_connection(state: Arc<AppState>, socket: WebSocket) {
    use futures::{SinkExt, StreamExt};

    let session = Uuid::new_v4();
    info!(%session, "trucks subscriber connected");

    let (mut sender, mut receiver) = socket.split();
    let mut snapshots = state.fleet.watch();

    let send_task = tokio::spawn(async move {
        loop {
            let frame = snapshots.borrow_and_update().to_string();
            if sender.send(Message::Text(frame)).await.is_err() {
                break;
            }
            if snapshots.changed().await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = receiver.next().await {
        if let Message::Close(_) = message {
            break;
        }
    }

    send_task.abort();
    info!(%session, "trucks subscriber disconnected");
}

fn map_api_error(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
