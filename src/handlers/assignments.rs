use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::entities::assignment::{self, ReturnCondition};
use crate::errors::ServiceError;
use crate::services::assignments::{ActiveAssignmentFilter, AssignResourceCommand};
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct AssignmentSummary {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub device_id: Option<Uuid>,
    pub quantity: i32,
    pub status: String,
    pub assigned_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub condition_on_return: Option<String>,
}

impl From<assignment::Model> for AssignmentSummary {
    fn from(model: assignment::Model) -> Self {
        Self {
            id: model.id,
            resource_id: model.resource_id,
            employee_id: model.employee_id,
            device_id: model.device_id,
            quantity: model.quantity,
            status: model.status,
            assigned_at: model.assigned_at,
            returned_at: model.returned_at,
            condition_on_return: model.condition_on_return,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateAssignmentRequest {
    pub resource_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub device_id: Option<Uuid>,
    /// Units to reserve; defaults to 1.
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: Option<i32>,
    /// Backdated assignment date, if the handover already happened.
    pub assigned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ReturnAssignmentRequest {
    /// One of: good, damaged, lost.
    #[validate(length(min = 1, message = "condition must not be empty"))]
    pub condition: String,
}

#[derive(Debug, Deserialize, Default, IntoParams)]
pub struct ActiveAssignmentsQuery {
    pub resource_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub device_id: Option<Uuid>,
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments",
    request_body = CreateAssignmentRequest,
    responses(
        (status = 200, description = "Assignment created", body = AssignmentSummary),
        (status = 404, description = "Resource not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Insufficient availability", body = crate::errors::ErrorResponse)
    ),
    tag = "assignments"
)]
pub async fn create_assignment(
    State(state): State<AppState>,
    Json(payload): Json<CreateAssignmentRequest>,
) -> ApiResult<AssignmentSummary> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let command = AssignResourceCommand {
        resource_id: payload.resource_id,
        employee_id: payload.employee_id,
        device_id: payload.device_id,
        quantity: payload.quantity.unwrap_or(1),
        assigned_at: payload.assigned_at,
    };

    let created = state.services.assignments.assign(command).await?;
    Ok(Json(ApiResponse::success(AssignmentSummary::from(created))))
}

#[utoipa::path(
    get,
    path = "/api/v1/assignments/{id}",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses(
        (status = 200, description = "Assignment returned", body = AssignmentSummary),
        (status = 404, description = "Assignment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "assignments"
)]
pub async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<AssignmentSummary> {
    match state.services.assignments.get_assignment(id).await? {
        Some(model) => Ok(Json(ApiResponse::success(AssignmentSummary::from(model)))),
        None => Err(ServiceError::NotFound(format!(
            "Assignment {} not found",
            id
        ))),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments/{id}/revoke",
    params(("id" = Uuid, Path, description = "Assignment id")),
    responses(
        (status = 200, description = "Assignment revoked", body = AssignmentSummary),
        (status = 404, description = "Assignment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Assignment already terminal", body = crate::errors::ErrorResponse)
    ),
    tag = "assignments"
)]
pub async fn revoke_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<AssignmentSummary> {
    let updated = state.services.assignments.revoke(id).await?;
    Ok(Json(ApiResponse::success(AssignmentSummary::from(updated))))
}

#[utoipa::path(
    post,
    path = "/api/v1/assignments/{id}/return",
    params(("id" = Uuid, Path, description = "Assignment id")),
    request_body = ReturnAssignmentRequest,
    responses(
        (status = 200, description = "Assignment returned", body = AssignmentSummary),
        (status = 400, description = "Unknown condition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Assignment not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Assignment already terminal", body = crate::errors::ErrorResponse)
    ),
    tag = "assignments"
)]
pub async fn return_assignment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ReturnAssignmentRequest>,
) -> ApiResult<AssignmentSummary> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let condition = ReturnCondition::from_str(&payload.condition).ok_or_else(|| {
        ServiceError::ValidationError(format!(
            "Unknown condition {:?}; expected one of good, damaged, lost",
            payload.condition
        ))
    })?;

    let updated = state
        .services
        .assignments
        .return_assignment(id, condition)
        .await?;
    Ok(Json(ApiResponse::success(AssignmentSummary::from(updated))))
}

#[utoipa::path(
    get,
    path = "/api/v1/assignments",
    params(ActiveAssignmentsQuery),
    responses(
        (status = 200, description = "Active assignments returned", body = [AssignmentSummary])
    ),
    tag = "assignments"
)]
pub async fn list_active_assignments(
    State(state): State<AppState>,
    Query(query): Query<ActiveAssignmentsQuery>,
) -> ApiResult<Vec<AssignmentSummary>> {
    let filter = ActiveAssignmentFilter {
        resource_id: query.resource_id,
        employee_id: query.employee_id,
        device_id: query.device_id,
    };

    let items = state.services.assignments.list_active(filter).await?;
    Ok(Json(ApiResponse::success(
        items.into_iter().map(AssignmentSummary::from).collect(),
    )))
}
