//! REST Handlers
//!
//! Host zone registration and inspection, account acknowledgements,
//! validator admin operations, epoch records and recent events.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::server::SharedAppState;
use crate::common::ControllerError;
use crate::records::LedgerError;
use crate::stakeibc::{RegistrationError, RegistryError};
use crate::types::{
    AddValidatorMsg, DeleteValidatorMsg, IcaAccountType, RegisterHostZoneMsg, Validator,
};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatorRequest {
    pub creator: String,
}

#[derive(Debug, Deserialize)]
pub struct AccountOpenedRequest {
    pub address: String,
}

#[derive(Debug, Deserialize)]
pub struct AddValidatorRequest {
    pub creator: String,
    pub validator: Validator,
}

#[derive(Debug, Deserialize)]
pub struct StartEpochRequest {
    pub epoch_id: u64,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReconcileResponse {
    pub chain_id: String,
    pub requested: Vec<IcaAccountType>,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Controller error rendered as `{ error, code }` with a mapped status
#[derive(Debug)]
pub struct ApiError(pub ControllerError);

impl<E: Into<ControllerError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        ApiError(err.into())
    }
}

fn registration_status(err: &RegistrationError) -> StatusCode {
    match err {
        RegistrationError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        RegistrationError::Unauthorized(_) => StatusCode::FORBIDDEN,
        RegistrationError::HostZoneNotFound(_) | RegistrationError::ValidatorNotFound { .. } => {
            StatusCode::NOT_FOUND
        }
        RegistrationError::DuplicateHostZone(_) | RegistrationError::ValidatorExists { .. } => {
            StatusCode::CONFLICT
        }
        RegistrationError::ChainResolution { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RegistrationError::AccountProvisioning { .. } => StatusCode::BAD_GATEWAY,
        RegistrationError::NoActiveEpoch => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ControllerError::Registration(e) => registration_status(e),
            ControllerError::Registry(RegistryError::NotFound(_)) => StatusCode::NOT_FOUND,
            ControllerError::Ledger(LedgerError::EpochNotAdvancing { .. }) => {
                StatusCode::CONFLICT
            }
            ControllerError::Ledger(LedgerError::EpochIdOutOfRange { .. }) => {
                StatusCode::BAD_REQUEST
            }
            ControllerError::Api(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn not_found(what: impl Into<String>) -> Self {
        ApiError(ControllerError::Registration(
            RegistrationError::HostZoneNotFound(what.into()),
        ))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.0.to_string(),
            code: self.0.error_code().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Host Zones
// =============================================================================

/// GET /api/health
pub async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "stakeibc-controller",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// POST /api/host-zones
pub async fn handle_register_host_zone(
    State(app): State<SharedAppState>,
    Json(msg): Json<RegisterHostZoneMsg>,
) -> ApiResult<impl IntoResponse> {
    let response = app.orchestrator().register_host_zone(msg).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/host-zones
pub async fn handle_list_host_zones(
    State(app): State<SharedAppState>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(app.registry().all_zones().await?))
}

/// GET /api/host-zones/:chain_id
pub async fn handle_get_host_zone(
    State(app): State<SharedAppState>,
    Path(chain_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    match app.registry().lookup(&chain_id).await? {
        Some(zone) => Ok(Json(zone)),
        None => Err(ApiError::not_found(chain_id)),
    }
}

/// POST /api/host-zones/:chain_id/reconcile
pub async fn handle_reconcile(
    State(app): State<SharedAppState>,
    Path(chain_id): Path<String>,
    Json(req): Json<CreatorRequest>,
) -> ApiResult<impl IntoResponse> {
    let requested = app
        .orchestrator()
        .reconcile_accounts(&req.creator, &chain_id)
        .await?;
    Ok(Json(ReconcileResponse { chain_id, requested }))
}

/// POST /api/host-zones/:chain_id/accounts/:role
///
/// Acknowledgement that the account for `role` opened on the host chain.
pub async fn handle_account_opened(
    State(app): State<SharedAppState>,
    Path((chain_id, role)): Path<(String, String)>,
    Json(req): Json<AccountOpenedRequest>,
) -> ApiResult<impl IntoResponse> {
    let role: IcaAccountType = role.parse().map_err(ControllerError::api)?;
    if req.address.trim().is_empty() {
        return Err(ControllerError::api("address must not be empty").into());
    }

    let zone = app
        .orchestrator()
        .acknowledge_account(&chain_id, role, &req.address)
        .await?;
    Ok(Json(zone))
}

/// POST /api/host-zones/:chain_id/validators
pub async fn handle_add_validator(
    State(app): State<SharedAppState>,
    Path(chain_id): Path<String>,
    Json(req): Json<AddValidatorRequest>,
) -> ApiResult<impl IntoResponse> {
    let zone = app
        .orchestrator()
        .add_validator(AddValidatorMsg {
            creator: req.creator,
            host_zone: chain_id,
            validator: req.validator,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(zone)))
}

/// DELETE /api/host-zones/:chain_id/validators/:address?creator=
pub async fn handle_delete_validator(
    State(app): State<SharedAppState>,
    Path((chain_id, address)): Path<(String, String)>,
    Query(req): Query<CreatorRequest>,
) -> ApiResult<impl IntoResponse> {
    let removed = app
        .orchestrator()
        .delete_validator(DeleteValidatorMsg {
            creator: req.creator,
            host_zone: chain_id,
            validator_address: address,
        })
        .await?;
    Ok(Json(removed))
}

// =============================================================================
// Epoch Unbonding Records
// =============================================================================

/// GET /api/epoch-unbonding-records
pub async fn handle_list_epochs(
    State(app): State<SharedAppState>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(app.ledger().all_records().await?))
}

/// GET /api/epoch-unbonding-records/latest
pub async fn handle_latest_epoch(
    State(app): State<SharedAppState>,
) -> ApiResult<impl IntoResponse> {
    match app.ledger().latest_record().await? {
        Some(record) => Ok(Json(record)),
        None => Err(RegistrationError::NoActiveEpoch.into()),
    }
}

/// POST /api/epoch-unbonding-records
pub async fn handle_start_epoch(
    State(app): State<SharedAppState>,
    Json(req): Json<StartEpochRequest>,
) -> ApiResult<impl IntoResponse> {
    let record = app.start_epoch(req.epoch_id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

// =============================================================================
// Account Requests
// =============================================================================

/// GET /api/account-requests
///
/// Requests waiting in the local queue; always empty with a relayer.
pub async fn handle_pending_account_requests(
    State(app): State<SharedAppState>,
) -> impl IntoResponse {
    Json(app.queued_requests().await)
}

/// POST /api/account-requests/drain
///
/// Removes and returns the queued requests so an operator can relay them.
pub async fn handle_drain_account_requests(
    State(app): State<SharedAppState>,
    Json(req): Json<CreatorRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(Json(app.drain_account_requests(&req.creator).await?))
}

// =============================================================================
// Events
// =============================================================================

/// GET /api/events?limit=&category=
pub async fn handle_recent_events(
    State(app): State<SharedAppState>,
    Query(query): Query<EventsQuery>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(50);
    let events = match query.category {
        Some(category) => {
            let mut events = app.events().recent_in_category(&category).await;
            let skip = events.len().saturating_sub(limit);
            events.drain(..skip);
            events
        }
        None => app.events().recent(limit).await,
    };
    Json(events)
}
