use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;

use super::domain::{ApplicationSubmission, MembershipId};
use super::repository::{
    AuditLog, BillFilter, BillMailer, MembershipFilter, MembershipRepository, RepositoryError,
};
use super::service::{JsonRequest, MembershipService, MembershipServiceError, MembershipUpdate};

/// Header carrying the signed-in staff member's username.
pub const STAFF_USER_HEADER: &str = "x-staff-user";

/// Staff username taken from the request; requests without one are rejected with 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffUser(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for StaffUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts
            .headers
            .get(STAFF_USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty());

        match user {
            Some(user) => Ok(StaffUser(user.to_string())),
            None => {
                let payload = json!({ "error": "staff login required" });
                Err((StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response())
            }
        }
    }
}

type SharedService<R, L, M> = Arc<MembershipService<R, L, M>>;

/// Router builder exposing intake, review and billing endpoints.
pub fn membership_router<R, L, M>(service: SharedService<R, L, M>) -> Router
where
    R: MembershipRepository + 'static,
    L: AuditLog + 'static,
    M: BillMailer + 'static,
{
    Router::new()
        .route("/api/v1/applications", post(submit_handler::<R, L, M>))
        .route("/api/v1/memberships", get(list_handler::<R, L, M>))
        .route("/api/v1/memberships/new", get(list_new_handler::<R, L, M>))
        .route(
            "/api/v1/memberships/:membership_id",
            get(detail_handler::<R, L, M>).post(edit_handler::<R, L, M>),
        )
        .route(
            "/api/v1/memberships/:membership_id/preapprove",
            post(preapprove_handler::<R, L, M>),
        )
        .route(
            "/api/v1/memberships/:membership_id/approve",
            post(approve_handler::<R, L, M>),
        )
        .route("/api/v1/bills", get(bill_list_handler::<R, L, M>))
        .route("/api/v1/bills/unpaid", get(unpaid_bill_list_handler::<R, L, M>))
        .route("/api/v1/json", post(json_handler::<R, L, M>))
        .with_state(service)
}

pub(crate) async fn submit_handler<R, L, M>(
    State(service): State<SharedService<R, L, M>>,
    headers: HeaderMap,
    axum::Json(submission): axum::Json<ApplicationSubmission>,
) -> Response
where
    R: MembershipRepository + 'static,
    L: AuditLog + 'static,
    M: BillMailer + 'static,
{
    let remote_addr = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim);

    match service.submit_application(submission, remote_addr) {
        Ok(membership) => {
            let payload = json!({
                "membership_id": membership.id,
                "status": membership.status.label(),
                "linked_contacts": membership.linked_contacts(),
            });
            (StatusCode::CREATED, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<R, L, M>(
    State(service): State<SharedService<R, L, M>>,
    _user: StaffUser,
) -> Response
where
    R: MembershipRepository + 'static,
    L: AuditLog + 'static,
    M: BillMailer + 'static,
{
    respond(service.memberships(MembershipFilter::All))
}

pub(crate) async fn list_new_handler<R, L, M>(
    State(service): State<SharedService<R, L, M>>,
    _user: StaffUser,
) -> Response
where
    R: MembershipRepository + 'static,
    L: AuditLog + 'static,
    M: BillMailer + 'static,
{
    respond(service.memberships(MembershipFilter::New))
}

pub(crate) async fn detail_handler<R, L, M>(
    State(service): State<SharedService<R, L, M>>,
    _user: StaffUser,
    Path(membership_id): Path<u64>,
) -> Response
where
    R: MembershipRepository + 'static,
    L: AuditLog + 'static,
    M: BillMailer + 'static,
{
    respond(service.membership(MembershipId(membership_id)))
}

pub(crate) async fn edit_handler<R, L, M>(
    State(service): State<SharedService<R, L, M>>,
    StaffUser(user): StaffUser,
    Path(membership_id): Path<u64>,
    axum::Json(update): axum::Json<MembershipUpdate>,
) -> Response
where
    R: MembershipRepository + 'static,
    L: AuditLog + 'static,
    M: BillMailer + 'static,
{
    respond(service.edit_membership(MembershipId(membership_id), update, &user))
}

pub(crate) async fn preapprove_handler<R, L, M>(
    State(service): State<SharedService<R, L, M>>,
    StaffUser(user): StaffUser,
    Path(membership_id): Path<u64>,
) -> Response
where
    R: MembershipRepository + 'static,
    L: AuditLog + 'static,
    M: BillMailer + 'static,
{
    respond(service.preapprove(MembershipId(membership_id), &user))
}

pub(crate) async fn approve_handler<R, L, M>(
    State(service): State<SharedService<R, L, M>>,
    StaffUser(user): StaffUser,
    Path(membership_id): Path<u64>,
) -> Response
where
    R: MembershipRepository + 'static,
    L: AuditLog + 'static,
    M: BillMailer + 'static,
{
    respond(service.approve(MembershipId(membership_id), &user))
}

pub(crate) async fn bill_list_handler<R, L, M>(
    State(service): State<SharedService<R, L, M>>,
    _user: StaffUser,
) -> Response
where
    R: MembershipRepository + 'static,
    L: AuditLog + 'static,
    M: BillMailer + 'static,
{
    respond(service.bills(BillFilter::All))
}

pub(crate) async fn unpaid_bill_list_handler<R, L, M>(
    State(service): State<SharedService<R, L, M>>,
    _user: StaffUser,
) -> Response
where
    R: MembershipRepository + 'static,
    L: AuditLog + 'static,
    M: BillMailer + 'static,
{
    respond(service.bills(BillFilter::Unpaid))
}

pub(crate) async fn json_handler<R, L, M>(
    State(service): State<SharedService<R, L, M>>,
    StaffUser(user): StaffUser,
    axum::Json(request): axum::Json<JsonRequest>,
) -> Response
where
    R: MembershipRepository + 'static,
    L: AuditLog + 'static,
    M: BillMailer + 'static,
{
    respond(service.dispatch(request, &user))
}

fn respond<T: serde::Serialize>(result: Result<T, MembershipServiceError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, axum::Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) fn error_response(err: MembershipServiceError) -> Response {
    match err {
        MembershipServiceError::Validation(errors) => {
            let payload = json!({ "errors": errors });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        MembershipServiceError::MembershipNotFound(_)
        | MembershipServiceError::Repository(RepositoryError::NotFound) => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        MembershipServiceError::Repository(RepositoryError::Conflict) => {
            let payload = json!({ "error": "record already exists" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        other => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
