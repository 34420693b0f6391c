use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde::Serialize;
use sgrid::domain::constants::{LIFECYCLE_TAG, ROUTING_TAG, SESSIONS_TAG, SOCKETS_TAG};
use sgrid::kernel::server::GridState;
use sgrid_lifecycle::{Host, LifecycleError, Operation};
use sgrid_routing::{Routing, RoutingError};
use sgrid_sessions::{Sessions, SessionsError};
use sgrid_sockets::Sockets;
use sgrid_sso::{Sso, SsoError};
use std::str::FromStr;
use tower_http::trace::TraceLayer;
use utoipa::{OpenApi, ToSchema};
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
struct ApiDoc;

#[allow(unreachable_pub)]
pub fn init(state: GridState) -> Router {
    let api = ApiDoc::openapi();

    // Separate the OpenAPI routes and the API documentation object
    let (openapi_routes, api_doc) = OpenApiRouter::with_openapi(api)
        .merge(sgrid::server::router::system_router())
        .routes(routes!(sockets_handler))
        .routes(routes!(session_stats_handler))
        .routes(routes!(create_session_handler))
        .routes(routes!(route_handler))
        .routes(routes!(server_statuses_handler))
        .routes(routes!(server_operation_handler))
        .routes(routes!(sso_register_handler))
        .routes(routes!(sso_associate_handler))
        .routes(routes!(sso_logout_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .split_for_parts();

    // Create the Scalar UI routes
    let scalar_routes = Scalar::with_url("/api", api_doc);

    // Merge all routes and then apply the state to the final router
    Router::new().merge(openapi_routes).merge(scalar_routes)
}

/// JSON error envelope returned by every endpoint.
#[derive(Debug, Serialize, ToSchema)]
struct ErrorBody {
    error: String,
}

struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorBody { error: self.1 })).into_response()
    }
}

impl From<sgrid::kernel::server::GridStateError> for ApiError {
    fn from(e: sgrid::kernel::server::GridStateError) -> Self {
        Self(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }
}

impl From<SessionsError> for ApiError {
    fn from(e: SessionsError) -> Self {
        match e {
            SessionsError::NotFound { .. } => Self(StatusCode::NOT_FOUND, e.to_string()),
            _ => Self(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

impl From<RoutingError> for ApiError {
    fn from(e: RoutingError) -> Self {
        match e {
            RoutingError::UnknownManager { .. } => Self(StatusCode::NOT_FOUND, e.to_string()),
            _ => Self(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        match e {
            LifecycleError::UnknownServer { .. } => Self(StatusCode::NOT_FOUND, e.to_string()),
            LifecycleError::OperationFailed { .. } => Self(StatusCode::CONFLICT, e.to_string()),
            LifecycleError::Internal { .. } => {
                Self(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            },
        }
    }
}

impl From<SsoError> for ApiError {
    fn from(e: SsoError) -> Self {
        match e {
            SsoError::NotFound { .. } => Self(StatusCode::NOT_FOUND, e.to_string()),
            SsoError::Disabled { .. } => Self(StatusCode::CONFLICT, e.to_string()),
            SsoError::Internal { .. } => Self(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        }
    }
}

// --- Sockets ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct InterfaceView {
    name: String,
    nic: String,
    addr: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct BindingView {
    name: String,
    interface: String,
    addr: String,
    multicast: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct SocketsView {
    interfaces: Vec<InterfaceView>,
    bindings: Vec<BindingView>,
}

#[utoipa::path(
    get,
    path = "/sockets",
    responses((status = OK, description = "Resolved interfaces and socket bindings", body = SocketsView)),
    tag = SOCKETS_TAG,
)]
async fn sockets_handler(State(state): State<GridState>) -> Result<Json<SocketsView>, ApiError> {
    let sockets = state.try_get_slice::<Sockets>()?;

    let interfaces = sockets
        .interfaces
        .iter()
        .map(|i| InterfaceView {
            name: i.name.clone(),
            nic: i.nic.clone(),
            addr: i.addr.to_string(),
        })
        .collect();
    let bindings = sockets
        .bindings
        .iter()
        .map(|b| BindingView {
            name: b.name.clone(),
            interface: b.interface.clone(),
            addr: b.addr.to_string(),
            multicast: b.multicast.map(|m| m.to_string()),
        })
        .collect();

    Ok(Json(SocketsView { interfaces, bindings }))
}

// --- Sessions ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct ManagerStatsView {
    name: String,
    active: u64,
    created: u64,
    expired: u64,
    passivated: u64,
    activated: u64,
    invalidated: u64,
    max_concurrent: u64,
}

#[utoipa::path(
    get,
    path = "/sessions/stats",
    responses((status = OK, description = "Statistics per session-management instance", body = [ManagerStatsView])),
    tag = SESSIONS_TAG,
)]
async fn session_stats_handler(
    State(state): State<GridState>,
) -> Result<Json<Vec<ManagerStatsView>>, ApiError> {
    let sessions = state.try_get_slice::<Sessions>()?;
    let stats = sessions
        .stats()
        .into_iter()
        .map(|s| ManagerStatsView {
            name: s.name,
            active: s.active,
            created: s.created,
            expired: s.expired,
            passivated: s.passivated,
            activated: s.activated,
            invalidated: s.invalidated,
            max_concurrent: s.max_concurrent,
        })
        .collect();
    Ok(Json(stats))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct SessionCreatedView {
    id: String,
    /// Affinity route token clients should pin to, if any.
    route: Option<String>,
}

#[utoipa::path(
    post,
    path = "/sessions/{manager}",
    params(("manager" = String, Path, description = "Session-management instance")),
    responses(
        (status = CREATED, description = "Session created", body = SessionCreatedView),
        (status = NOT_FOUND, description = "Unknown instance", body = ErrorBody),
    ),
    tag = SESSIONS_TAG,
)]
async fn create_session_handler(
    State(state): State<GridState>,
    Path(manager): Path<String>,
) -> Result<(StatusCode, Json<SessionCreatedView>), ApiError> {
    let sessions = state.try_get_slice::<Sessions>()?;
    let instance = sessions.manager(&manager).ok_or_else(|| {
        ApiError(StatusCode::NOT_FOUND, format!("unknown session manager '{manager}'"))
    })?;

    let id = instance.create();

    let routing = state.try_get_slice::<Routing>()?;
    let route = routing.locate(&manager, &id)?;

    Ok((StatusCode::CREATED, Json(SessionCreatedView { id, route })))
}

// --- Routing ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct RouteView {
    manager: String,
    session: String,
    /// Route token for the session, if the affinity policy yields one.
    route: Option<String>,
}

#[utoipa::path(
    get,
    path = "/routes/{manager}/{session}",
    params(
        ("manager" = String, Path, description = "Session-management instance"),
        ("session" = String, Path, description = "Session id"),
    ),
    responses(
        (status = OK, description = "Route token for the session", body = RouteView),
        (status = NOT_FOUND, description = "Unknown instance", body = ErrorBody),
    ),
    tag = ROUTING_TAG,
)]
async fn route_handler(
    State(state): State<GridState>,
    Path((manager, session)): Path<(String, String)>,
) -> Result<Json<RouteView>, ApiError> {
    let routing = state.try_get_slice::<Routing>()?;
    let route = routing.locate(&manager, &session)?;
    Ok(Json(RouteView { manager, session, route }))
}

// --- Lifecycle ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct ServerStatusView {
    name: String,
    state: String,
    restart_required: bool,
    reload_required: bool,
}

#[utoipa::path(
    get,
    path = "/servers",
    responses((status = OK, description = "Status of every managed server", body = [ServerStatusView])),
    tag = LIFECYCLE_TAG,
)]
async fn server_statuses_handler(
    State(state): State<GridState>,
) -> Result<Json<Vec<ServerStatusView>>, ApiError> {
    let host = state.try_get_slice::<Host>()?;
    let statuses = host
        .registry
        .statuses()
        .into_iter()
        .map(|s| ServerStatusView {
            name: s.name,
            state: s.state.to_string(),
            restart_required: s.restart_required,
            reload_required: s.reload_required,
        })
        .collect();
    Ok(Json(statuses))
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct OperationOutcomeView {
    server: String,
    operation: String,
    from: String,
    to: String,
}

#[utoipa::path(
    post,
    path = "/servers/{name}/{operation}",
    params(
        ("name" = String, Path, description = "Managed server name"),
        ("operation" = String, Path, description = "start|stop|restart|reload|suspend|resume"),
    ),
    responses(
        (status = OK, description = "Operation applied", body = OperationOutcomeView),
        (status = NOT_FOUND, description = "Unknown server", body = ErrorBody),
        (status = CONFLICT, description = "Illegal transition", body = ErrorBody),
    ),
    tag = LIFECYCLE_TAG,
)]
async fn server_operation_handler(
    State(state): State<GridState>,
    Path((name, operation)): Path<(String, String)>,
) -> Result<Json<OperationOutcomeView>, ApiError> {
    let operation = Operation::from_str(&operation).map_err(|_| {
        ApiError(StatusCode::BAD_REQUEST, format!("unknown operation '{operation}'"))
    })?;

    let host = state.try_get_slice::<Host>()?;
    let outcome = host.registry.apply(&name, operation)?;

    Ok(Json(OperationOutcomeView {
        server: name,
        operation: operation.to_string(),
        from: outcome.from.to_string(),
        to: outcome.to.to_string(),
    }))
}

// --- Single sign-on ---

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct SsoRegisteredView {
    id: String,
}

#[utoipa::path(
    post,
    path = "/sso",
    responses(
        (status = CREATED, description = "SSO entry registered", body = SsoRegisteredView),
        (status = CONFLICT, description = "SSO disabled", body = ErrorBody),
    ),
    tag = SESSIONS_TAG,
)]
async fn sso_register_handler(
    State(state): State<GridState>,
) -> Result<(StatusCode, Json<SsoRegisteredView>), ApiError> {
    let sso = state.try_get_slice::<Sso>()?;
    let id = sso.manager()?.register(None);
    Ok((StatusCode::CREATED, Json(SsoRegisteredView { id })))
}

#[utoipa::path(
    post,
    path = "/sso/{id}/sessions/{manager}/{session}",
    params(
        ("id" = String, Path, description = "SSO entry id"),
        ("manager" = String, Path, description = "Session-management instance"),
        ("session" = String, Path, description = "Session id"),
    ),
    responses(
        (status = NO_CONTENT, description = "Session associated"),
        (status = NOT_FOUND, description = "Unknown SSO entry", body = ErrorBody),
    ),
    tag = SESSIONS_TAG,
)]
async fn sso_associate_handler(
    State(state): State<GridState>,
    Path((id, manager, session)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let sso = state.try_get_slice::<Sso>()?;
    sso.manager()?.associate(&id, manager, session)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
struct LogoutView {
    /// Number of sessions invalidated by the cascading logout.
    invalidated: usize,
}

#[utoipa::path(
    delete,
    path = "/sso/{id}",
    params(("id" = String, Path, description = "SSO entry id")),
    responses(
        (status = OK, description = "Entry deregistered, sessions invalidated", body = LogoutView),
        (status = NOT_FOUND, description = "Unknown SSO entry", body = ErrorBody),
    ),
    tag = SESSIONS_TAG,
)]
async fn sso_logout_handler(
    State(state): State<GridState>,
    Path(id): Path<String>,
) -> Result<Json<LogoutView>, ApiError> {
    let sso = state.try_get_slice::<Sso>()?;
    let session_refs = sso.manager()?.deregister(&id)?;

    let sessions = state.try_get_slice::<Sessions>()?;
    let mut invalidated = 0;
    for (manager, session) in session_refs {
        if let Some(instance) = sessions.manager(&manager) {
            // A session may already be gone; the logout proceeds regardless.
            if instance.invalidate(&session).await.is_ok() {
                invalidated += 1;
            }
        }
    }

    Ok(Json(LogoutView { invalidated }))
}
