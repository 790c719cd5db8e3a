use std::{
    net::{IpAddr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{self, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::{Local, NaiveDate};
use platform_api::{ApiError, ApiResult, DataResponse};
use products_crm::{
    Bucket, ClientId, Counts, CrmStore, LeadRef, ManagementBucket, ManagementEvent, MarketingBucket,
    MarketingEvent,
    input::{AppendFollowup, AppendManagementFollowup, LeadTransfer, NewClient},
    legacy::ExportedContact,
    view::{ClientDetails, ManagementLead, MarketingLead},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::{config::AppConfig, graphql::SchemaType};

#[derive(Clone)]
pub struct AppState {
    pub store: CrmStore,
    pub schema: SchemaType,
    pub config: Arc<AppConfig>,
}

#[derive(Clone, Debug)]
pub struct ServeConfig {
    addr: SocketAddr,
}

impl ServeConfig {
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self {
            addr: SocketAddr::from((host, port)),
        }
    }
}

pub async fn serve(config: ServeConfig, state: AppState) -> anyhow::Result<()> {
    let router = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    info!(%config.addr, "lead tracker listening");
    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;
    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();
    let allow_origin = if allowed.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(allowed)
    };
    CorsLayer::new()
        .allow_headers([http::header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH])
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let request_id = MakeRequestUuid;
    let header_name = HeaderName::from_static("x-request-id");
    let marketing = Router::new()
        .route("/clients", post(create_client).get(list_clients))
        .route("/clients/import", post(import_clients))
        .route("/clients/{id}", get(get_client))
        .route("/clients/{id}/active", patch(set_client_active))
        .route("/clients/{id}/followups", get(client_followups))
        .route("/followups", post(append_followup).get(list_followups))
        .route("/followups/counts", get(marketing_counts));
    let management = Router::new()
        .route("/clients", post(create_management_client))
        .route("/clients/{id}", get(get_management_client))
        .route("/clients/{id}/active", patch(set_management_client_active))
        .route(
            "/clients/{id}/contacts/legacy",
            get(export_legacy_contacts).post(import_legacy_contacts),
        )
        .route(
            "/followups",
            post(append_management_followup).get(list_management_followups),
        )
        .route("/followups/counts", get(management_counts))
        .route("/followups/history", get(management_history))
        .route("/handover", post(hand_over))
        .route("/return", post(return_to_marketing));

    Router::new()
        .route("/health", get(health_handler))
        .route("/graphql", post(graphql_handler))
        .nest("/api/marketing", marketing)
        .nest("/api/management", management)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(header_name.clone(), request_id))
                .layer(PropagateRequestIdLayer::new(header_name))
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config.cors_allowed_origins)),
        )
        .with_state(state)
}

// Extractor rejections are reported in the same envelope as every other
// failure.

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

fn query<T>(params: Result<Query<T>, QueryRejection>) -> ApiResult<T> {
    params
        .map(|Query(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

fn path_id(id: Result<Path<ClientId>, PathRejection>) -> ApiResult<ClientId> {
    id.map(|Path(value)| value)
        .map_err(|rejection| ApiError::validation(rejection.body_text()))
}

fn parse_bucket<B: Bucket>(raw: Option<&str>) -> ApiResult<B> {
    let raw = raw
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| ApiError::validation("status is required"))?;
    B::parse(raw).ok_or_else(|| {
        let allowed: Vec<_> = B::ALL.iter().map(|bucket| bucket.key()).collect();
        ApiError::validation(format!(
            "invalid status '{raw}'; expected one of: {}",
            allowed.join(", ")
        ))
    })
}

/// The as-of date is read from the wall clock only here, at the edge.
fn as_of_or_today(as_of: Option<NaiveDate>) -> NaiveDate {
    as_of.unwrap_or_else(|| Local::now().date_naive())
}

#[derive(Debug, Serialize)]
struct AppendResponse {
    success: bool,
    #[serde(rename = "followupId")]
    followup_id: i32,
}

impl AppendResponse {
    fn created(followup_id: i32) -> (StatusCode, Json<Self>) {
        (
            StatusCode::CREATED,
            Json(Self {
                success: true,
                followup_id,
            }),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
struct ScopeQuery {
    #[serde(default)]
    status: Option<String>,
    #[serde(rename = "employeeID", default)]
    employee_id: Option<i32>,
    #[serde(rename = "asOf", default)]
    as_of: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize)]
struct ClientsQuery {
    #[serde(rename = "employeeID", default)]
    employee_id: Option<i32>,
    #[serde(rename = "includeInactive", default)]
    include_inactive: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ActiveBody {
    active: bool,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(rename = "clientID")]
    client_id: ClientId,
    #[serde(rename = "isMarketing", default)]
    is_marketing: bool,
}

#[derive(Debug, Deserialize)]
struct ImportBody {
    clients: Vec<NewClient>,
}

async fn create_client(
    State(state): State<AppState>,
    payload: Result<Json<NewClient>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DataResponse<ClientDetails>>)> {
    let client = state.store.create_client(body(payload)?).await?;
    Ok((StatusCode::CREATED, DataResponse::new(client)))
}

async fn import_clients(
    State(state): State<AppState>,
    payload: Result<Json<ImportBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DataResponse<Vec<ClientId>>>)> {
    let ids = state.store.import_clients(body(payload)?.clients).await?;
    Ok((StatusCode::CREATED, DataResponse::new(ids)))
}

async fn list_clients(
    State(state): State<AppState>,
    params: Result<Query<ClientsQuery>, QueryRejection>,
) -> ApiResult<Json<DataResponse<Vec<ClientDetails>>>> {
    let params = query(params)?;
    let clients = state
        .store
        .list_clients(params.employee_id, params.include_inactive.unwrap_or(false))
        .await?;
    Ok(DataResponse::new(clients))
}

async fn get_client(
    State(state): State<AppState>,
    id: Result<Path<ClientId>, PathRejection>,
) -> ApiResult<Json<DataResponse<ClientDetails>>> {
    let client = state.store.get_client(path_id(id)?).await?;
    Ok(DataResponse::new(client))
}

async fn set_client_active(
    State(state): State<AppState>,
    id: Result<Path<ClientId>, PathRejection>,
    payload: Result<Json<ActiveBody>, JsonRejection>,
) -> ApiResult<Json<DataResponse<ClientDetails>>> {
    let id = path_id(id)?;
    let client = state.store.set_client_active(id, body(payload)?.active).await?;
    Ok(DataResponse::new(client))
}

async fn client_followups(
    State(state): State<AppState>,
    id: Result<Path<ClientId>, PathRejection>,
) -> ApiResult<Json<DataResponse<Vec<MarketingEvent>>>> {
    let events = state.store.client_followups(path_id(id)?).await?;
    Ok(DataResponse::new(events))
}

async fn append_followup(
    State(state): State<AppState>,
    payload: Result<Json<AppendFollowup>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let event = state.store.append_followup(body(payload)?).await?;
    Ok(AppendResponse::created(event.id))
}

async fn list_followups(
    State(state): State<AppState>,
    params: Result<Query<ScopeQuery>, QueryRejection>,
) -> ApiResult<Json<DataResponse<Vec<MarketingLead>>>> {
    let params = query(params)?;
    let bucket: MarketingBucket = parse_bucket(params.status.as_deref())?;
    let leads = state
        .store
        .list_followups(bucket, params.employee_id, as_of_or_today(params.as_of))
        .await?;
    Ok(DataResponse::new(leads))
}

async fn marketing_counts(
    State(state): State<AppState>,
    params: Result<Query<ScopeQuery>, QueryRejection>,
) -> ApiResult<Json<DataResponse<Counts>>> {
    let params = query(params)?;
    let counts = state
        .store
        .marketing_counts(params.employee_id, as_of_or_today(params.as_of))
        .await?;
    Ok(DataResponse::new(counts))
}

async fn create_management_client(
    State(state): State<AppState>,
    payload: Result<Json<NewClient>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DataResponse<ClientDetails>>)> {
    let client = state.store.create_management_client(body(payload)?).await?;
    Ok((StatusCode::CREATED, DataResponse::new(client)))
}

async fn get_management_client(
    State(state): State<AppState>,
    id: Result<Path<ClientId>, PathRejection>,
) -> ApiResult<Json<DataResponse<ClientDetails>>> {
    let client = state.store.get_management_client(path_id(id)?).await?;
    Ok(DataResponse::new(client))
}

async fn set_management_client_active(
    State(state): State<AppState>,
    id: Result<Path<ClientId>, PathRejection>,
    payload: Result<Json<ActiveBody>, JsonRejection>,
) -> ApiResult<Json<DataResponse<ClientDetails>>> {
    let id = path_id(id)?;
    let client = state
        .store
        .set_management_client_active(id, body(payload)?.active)
        .await?;
    Ok(DataResponse::new(client))
}

async fn export_legacy_contacts(
    State(state): State<AppState>,
    id: Result<Path<ClientId>, PathRejection>,
) -> ApiResult<Json<DataResponse<Vec<ExportedContact>>>> {
    let contacts = state.store.export_legacy_contacts(path_id(id)?).await?;
    Ok(DataResponse::new(contacts))
}

async fn import_legacy_contacts(
    State(state): State<AppState>,
    id: Result<Path<ClientId>, PathRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<DataResponse<Vec<ExportedContact>>>)> {
    let id = path_id(id)?;
    let contacts = state.store.import_legacy_contacts(id, body(payload)?).await?;
    Ok((StatusCode::CREATED, DataResponse::new(contacts)))
}

async fn append_management_followup(
    State(state): State<AppState>,
    payload: Result<Json<AppendManagementFollowup>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let event = state.store.append_management_followup(body(payload)?).await?;
    Ok(AppendResponse::created(event.id))
}

async fn list_management_followups(
    State(state): State<AppState>,
    params: Result<Query<ScopeQuery>, QueryRejection>,
) -> ApiResult<Json<DataResponse<Vec<ManagementLead>>>> {
    let params = query(params)?;
    let bucket: ManagementBucket = parse_bucket(params.status.as_deref())?;
    let leads = state
        .store
        .list_management_followups(bucket, params.employee_id, as_of_or_today(params.as_of))
        .await?;
    Ok(DataResponse::new(leads))
}

async fn management_counts(
    State(state): State<AppState>,
    params: Result<Query<ScopeQuery>, QueryRejection>,
) -> ApiResult<Json<DataResponse<Counts>>> {
    let params = query(params)?;
    let counts = state
        .store
        .management_counts(params.employee_id, as_of_or_today(params.as_of))
        .await?;
    Ok(DataResponse::new(counts))
}

async fn management_history(
    State(state): State<AppState>,
    params: Result<Query<HistoryQuery>, QueryRejection>,
) -> ApiResult<Json<DataResponse<Vec<ManagementEvent>>>> {
    let params = query(params)?;
    let target = LeadRef::from_target(params.client_id, params.is_marketing);
    let events = state.store.management_history(target).await?;
    Ok(DataResponse::new(events))
}

async fn hand_over(
    State(state): State<AppState>,
    payload: Result<Json<LeadTransfer>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let event = state.store.hand_over_to_management(body(payload)?).await?;
    Ok(AppendResponse::created(event.id))
}

async fn return_to_marketing(
    State(state): State<AppState>,
    payload: Result<Json<LeadTransfer>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let event = state.store.return_to_marketing(body(payload)?).await?;
    Ok(AppendResponse::created(event.id))
}

async fn graphql_handler(State(state): State<AppState>, request: GraphQLRequest) -> GraphQLResponse {
    state.schema.execute(request.into_inner()).await.into()
}

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let db_ok = state.store.db().ping().await.is_ok();
    Json(HealthResponse {
        ok: db_ok,
        db_ok,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    db_ok: bool,
    version: &'static str,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for CTRL+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    ctrl_c.await;

    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    };
}
