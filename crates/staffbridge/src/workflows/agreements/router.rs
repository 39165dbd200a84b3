use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::authority::{AgreementAuthority, AuthorityError, ContractDirectory};
use super::domain::{
    AgreementId, AgreementKind, AgreementStatus, ApplicationId, ContractId, SignatureRequest,
    UserId,
};
use super::fees::FeeSubmission;
use super::service::{AgreementLifecycleService, AgreementServiceError, DEFAULT_LIST_LIMIT};
use super::views::{AgreementDetailView, AgreementListView};

/// Router builder exposing the agreement lifecycle over HTTP.
///
/// The current user is always an explicit parameter (query string on reads,
/// request body on commands), so the engine stays session-free.
pub fn agreement_router<A, C>(service: Arc<AgreementLifecycleService<A, C>>) -> Router
where
    A: AgreementAuthority + 'static,
    C: ContractDirectory + 'static,
{
    Router::new()
        .route("/api/v1/agreements", get(list_handler::<A, C>))
        .route(
            "/api/v1/agreements/pending/count",
            get(pending_count_handler::<A, C>),
        )
        .route(
            "/api/v1/agreements/contract/:contract_id",
            get(by_contract_handler::<A, C>),
        )
        .route(
            "/api/v1/agreements/:agreement_id",
            get(detail_handler::<A, C>),
        )
        .route(
            "/api/v1/agreements/:agreement_id/fees",
            post(fees_handler::<A, C>),
        )
        .route(
            "/api/v1/agreements/:agreement_id/sign",
            post(sign_handler::<A, C>),
        )
        .route(
            "/api/v1/agreements/:agreement_id/choose-type",
            post(choose_type_handler::<A, C>),
        )
        .route(
            "/api/v1/applications/:application_id/withdrawal-fee",
            get(withdrawal_fee_handler::<A, C>),
        )
        .route(
            "/api/v1/applications/:application_id/withdraw",
            post(withdraw_handler::<A, C>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserQuery {
    user_id: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    user_id: u64,
    #[serde(default)]
    status: Option<AgreementStatus>,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FeesBody {
    user_id: u64,
    fees: FeeSubmission,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignBody {
    user_id: u64,
    signature: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChooseTypeBody {
    user_id: u64,
    agreement_type: AgreementKind,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WithdrawBody {
    user_id: u64,
    #[serde(default)]
    reason: Option<String>,
}

pub(crate) async fn list_handler<A, C>(
    State(service): State<Arc<AgreementLifecycleService<A, C>>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    A: AgreementAuthority + 'static,
    C: ContractDirectory + 'static,
{
    let user = UserId(query.user_id);
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    let snapshots = match service.my_agreements(user, query.status, limit) {
        Ok(snapshots) => snapshots,
        Err(error) => return error_response(error),
    };

    let mut rows = Vec::with_capacity(snapshots.len());
    for snapshot in &snapshots {
        match service.eligibility(snapshot, user) {
            Ok(eligibility) => rows.push(AgreementListView::from_snapshot(snapshot, &eligibility)),
            Err(error) => return error_response(error),
        }
    }

    (StatusCode::OK, axum::Json(rows)).into_response()
}

pub(crate) async fn by_contract_handler<A, C>(
    State(service): State<Arc<AgreementLifecycleService<A, C>>>,
    Path(contract_id): Path<u64>,
    Query(query): Query<UserQuery>,
) -> Response
where
    A: AgreementAuthority + 'static,
    C: ContractDirectory + 'static,
{
    let user = UserId(query.user_id);
    let snapshots = match service.by_contract(ContractId(contract_id)) {
        Ok(snapshots) => snapshots,
        Err(error) => return error_response(error),
    };

    let mut rows = Vec::with_capacity(snapshots.len());
    for snapshot in &snapshots {
        match service.eligibility(snapshot, user) {
            Ok(eligibility) => rows.push(AgreementListView::from_snapshot(snapshot, &eligibility)),
            Err(error) => return error_response(error),
        }
    }

    (StatusCode::OK, axum::Json(rows)).into_response()
}

pub(crate) async fn pending_count_handler<A, C>(
    State(service): State<Arc<AgreementLifecycleService<A, C>>>,
    Query(query): Query<UserQuery>,
) -> Response
where
    A: AgreementAuthority + 'static,
    C: ContractDirectory + 'static,
{
    match service.pending_count(UserId(query.user_id)) {
        Ok(count) => (StatusCode::OK, axum::Json(json!({ "count": count }))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn detail_handler<A, C>(
    State(service): State<Arc<AgreementLifecycleService<A, C>>>,
    Path(agreement_id): Path<u64>,
    Query(query): Query<UserQuery>,
) -> Response
where
    A: AgreementAuthority + 'static,
    C: ContractDirectory + 'static,
{
    let user = UserId(query.user_id);
    let snapshot = match service.agreement(AgreementId(agreement_id)) {
        Ok(snapshot) => snapshot,
        Err(error) => return error_response(error),
    };
    match service.eligibility(&snapshot, user) {
        Ok(eligibility) => {
            let view = AgreementDetailView::new(snapshot, eligibility);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn fees_handler<A, C>(
    State(service): State<Arc<AgreementLifecycleService<A, C>>>,
    Path(agreement_id): Path<u64>,
    axum::Json(body): axum::Json<FeesBody>,
) -> Response
where
    A: AgreementAuthority + 'static,
    C: ContractDirectory + 'static,
{
    match service.submit_fees(AgreementId(agreement_id), UserId(body.user_id), body.fees) {
        Ok(snapshot) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn sign_handler<A, C>(
    State(service): State<Arc<AgreementLifecycleService<A, C>>>,
    Path(agreement_id): Path<u64>,
    axum::Json(body): axum::Json<SignBody>,
) -> Response
where
    A: AgreementAuthority + 'static,
    C: ContractDirectory + 'static,
{
    let request = SignatureRequest {
        signature: body.signature,
    };
    match service.sign(AgreementId(agreement_id), UserId(body.user_id), &request) {
        Ok(snapshot) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn choose_type_handler<A, C>(
    State(service): State<Arc<AgreementLifecycleService<A, C>>>,
    Path(agreement_id): Path<u64>,
    axum::Json(body): axum::Json<ChooseTypeBody>,
) -> Response
where
    A: AgreementAuthority + 'static,
    C: ContractDirectory + 'static,
{
    // Custom documents arrive through the upload boundary, not this route.
    if body.agreement_type != AgreementKind::Platform {
        let payload = json!({
            "error": "only the platform agreement can be chosen here; custom documents go through upload",
        });
        return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
    }

    match service.choose_platform(AgreementId(agreement_id), UserId(body.user_id)) {
        Ok(snapshot) => (StatusCode::OK, axum::Json(snapshot)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn withdrawal_fee_handler<A, C>(
    State(service): State<Arc<AgreementLifecycleService<A, C>>>,
    Path(application_id): Path<u64>,
) -> Response
where
    A: AgreementAuthority + 'static,
    C: ContractDirectory + 'static,
{
    match service.withdrawal_quote(ApplicationId(application_id), Utc::now()) {
        Ok(quote) => (StatusCode::OK, axum::Json(quote)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn withdraw_handler<A, C>(
    State(service): State<Arc<AgreementLifecycleService<A, C>>>,
    Path(application_id): Path<u64>,
    axum::Json(body): axum::Json<WithdrawBody>,
) -> Response
where
    A: AgreementAuthority + 'static,
    C: ContractDirectory + 'static,
{
    match service.withdraw(
        ApplicationId(application_id),
        UserId(body.user_id),
        body.reason.as_deref(),
    ) {
        Ok(outcome) => (StatusCode::OK, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Map orchestrator errors onto wire responses. Conflict and fee-required
/// payloads keep the shape older portal clients already parse.
fn error_response(error: AgreementServiceError) -> Response {
    let message = error.to_string();
    match error {
        AgreementServiceError::Validation(_) => {
            let payload = json!({ "error": message });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        AgreementServiceError::Integrity(_) | AgreementServiceError::Role(_) => {
            let payload = json!({
                "error": message,
                "error_code": "DATA_INTEGRITY",
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        AgreementServiceError::NotAParty { .. }
        | AgreementServiceError::RoleNotPermitted { .. } => {
            let payload = json!({ "error": message });
            (StatusCode::FORBIDDEN, axum::Json(payload)).into_response()
        }
        AgreementServiceError::FeesOutstanding { .. } => {
            let payload = json!({
                "error": message,
                "pending_action": "enter_fees",
            });
            (StatusCode::PRECONDITION_FAILED, axum::Json(payload)).into_response()
        }
        AgreementServiceError::SignatureNotAllowed { .. }
        | AgreementServiceError::DocumentLocked { .. }
        | AgreementServiceError::DocumentAlreadyChosen { .. } => {
            let payload = json!({ "error": message });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        AgreementServiceError::BookingConflict(report) => {
            let payload = json!({
                "error_code": "CONTRACT_OVERLAP",
                "detail": message,
                "conflicting_contracts": report.conflicts(),
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        AgreementServiceError::WithdrawalBlocked { quote } => {
            let payload = json!({
                "error": message,
                "fee_required": true,
                "fee_info": quote,
            });
            (StatusCode::PAYMENT_REQUIRED, axum::Json(payload)).into_response()
        }
        AgreementServiceError::Authority(AuthorityError::NotFound) => {
            let payload = json!({ "error": message });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        AgreementServiceError::Authority(AuthorityError::Unavailable(_)) => {
            let payload = json!({ "error": message });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
        AgreementServiceError::Authority(_) => {
            let payload = json!({ "error": message });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
