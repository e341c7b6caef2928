use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::entities::stock_movement;
use crate::errors::ServiceError;
use crate::services::stock::{AdjustMode, StockLevel};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct MovementSummary {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub delta: i32,
    pub movement_type: String,
    pub reason: Option<String>,
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<stock_movement::Model> for MovementSummary {
    fn from(model: stock_movement::Model) -> Self {
        Self {
            id: model.id,
            resource_id: model.resource_id,
            delta: model.delta,
            movement_type: model.movement_type,
            reason: model.reason,
            actor: model.actor,
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AdjustStockRequest {
    /// Units to add/subtract, or the target level for `set`.
    pub amount: i32,
    pub mode: AdjustMode,
    #[validate(length(max = 500, message = "Reason is too long"))]
    pub reason: Option<String>,
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize, Default, IntoParams)]
pub struct MovementListQuery {
    pub resource_id: Option<Uuid>,
    /// Page number (1-indexed)
    pub page: Option<u64>,
    /// Page size (max 100)
    pub limit: Option<u64>,
}

#[utoipa::path(
    post,
    path = "/api/v1/resources/{id}/stock/adjust",
    params(("id" = Uuid, Path, description = "Resource id")),
    request_body = AdjustStockRequest,
    responses(
        (status = 200, description = "Stock adjusted", body = StockLevel),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Resource not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stock"
)]
pub async fn adjust_stock(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdjustStockRequest>,
) -> ApiResult<StockLevel> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let level = state
        .services
        .stock
        .adjust(id, payload.amount, payload.mode, payload.reason, payload.actor)
        .await?;

    Ok(Json(ApiResponse::success(level)))
}

#[utoipa::path(
    get,
    path = "/api/v1/stock/movements",
    params(MovementListQuery),
    responses(
        (status = 200, description = "Movement list returned", body = [MovementSummary])
    ),
    tag = "stock"
)]
pub async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<MovementListQuery>,
) -> ApiResult<PaginatedResponse<MovementSummary>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let (records, total) = state
        .services
        .stock
        .movements(query.resource_id, page, limit)
        .await?;

    let items: Vec<MovementSummary> = records.into_iter().map(MovementSummary::from).collect();
    let total_pages = (total + limit - 1) / limit;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    })))
}
