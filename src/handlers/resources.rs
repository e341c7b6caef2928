use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::entities::resource::{self, ResourceCategory};
use crate::errors::ServiceError;
use crate::handlers::assignments::AssignmentSummary;
use crate::services::availability::{AvailabilityCalculator, CategoryAvailability};
use crate::services::catalog::{NewResource, ResourceFilter, ResourcePatch};
use crate::{ApiResponse, ApiResult, AppState, PaginatedResponse};

#[derive(Debug, Serialize, ToSchema)]
pub struct ResourceSummary {
    pub id: Uuid,
    pub category: String,
    pub name: String,
    pub total_quantity: i32,
    pub vendor: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub min_stock_threshold: Option<i32>,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<resource::Model> for ResourceSummary {
    fn from(model: resource::Model) -> Self {
        Self {
            id: model.id,
            category: model.category,
            name: model.name,
            total_quantity: model.total_quantity,
            vendor: model.vendor,
            expires_at: model.expires_at,
            min_stock_threshold: model.min_stock_threshold,
            serial_number: model.serial_number,
            notes: model.notes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Single-resource view: the catalog entry, its current availability under
/// the category policy, and optionally its assignment history.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResourceDetail {
    pub resource: ResourceSummary,
    pub available: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignments: Option<Vec<AssignmentSummary>>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateResourceRequest {
    /// One of: license_seat, accessory_unit, physical_device.
    pub category: String,
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: String,
    /// Pool capacity (seats) or opening stock (accessories); a physical
    /// device is always 1.
    pub total_quantity: Option<i32>,
    pub vendor: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub min_stock_threshold: Option<i32>,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateResourceRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    pub name: Option<String>,
    pub total_quantity: Option<i32>,
    pub vendor: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub min_stock_threshold: Option<i32>,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Default, IntoParams)]
pub struct ResourceListQuery {
    /// Page number (1-indexed)
    pub page: Option<u64>,
    /// Page size (max 100)
    pub limit: Option<u64>,
    /// Optional category filter
    pub category: Option<String>,
    /// Only resources expiring within the next N days
    pub expiring_within_days: Option<i64>,
}

#[derive(Debug, Deserialize, Default, IntoParams)]
pub struct GetResourceQuery {
    /// Include the assignment history, active entries first.
    pub include_history: Option<bool>,
}

fn parse_category(raw: &str) -> Result<ResourceCategory, ServiceError> {
    ResourceCategory::from_str(raw).ok_or_else(|| {
        ServiceError::ValidationError(format!(
            "Unknown category {:?}; expected one of license_seat, accessory_unit, physical_device",
            raw
        ))
    })
}

#[utoipa::path(
    post,
    path = "/api/v1/resources",
    request_body = CreateResourceRequest,
    responses(
        (status = 200, description = "Resource created", body = ResourceSummary),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse)
    ),
    tag = "resources"
)]
pub async fn create_resource(
    State(state): State<AppState>,
    Json(payload): Json<CreateResourceRequest>,
) -> ApiResult<ResourceSummary> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let category = parse_category(&payload.category)?;
    let input = NewResource {
        category,
        name: payload.name,
        total_quantity: payload.total_quantity.unwrap_or(1),
        vendor: payload.vendor,
        expires_at: payload.expires_at,
        min_stock_threshold: payload.min_stock_threshold,
        serial_number: payload.serial_number,
        notes: payload.notes,
    };

    let created = state.services.catalog.create_resource(input).await?;
    Ok(Json(ApiResponse::success(ResourceSummary::from(created))))
}

#[utoipa::path(
    put,
    path = "/api/v1/resources/{id}",
    params(("id" = Uuid, Path, description = "Resource id")),
    request_body = UpdateResourceRequest,
    responses(
        (status = 200, description = "Resource updated", body = ResourceSummary),
        (status = 404, description = "Resource not found", body = crate::errors::ErrorResponse)
    ),
    tag = "resources"
)]
pub async fn update_resource(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateResourceRequest>,
) -> ApiResult<ResourceSummary> {
    payload
        .validate()
        .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

    let patch = ResourcePatch {
        name: payload.name,
        total_quantity: payload.total_quantity,
        vendor: payload.vendor,
        expires_at: payload.expires_at,
        min_stock_threshold: payload.min_stock_threshold,
        serial_number: payload.serial_number,
        notes: payload.notes,
    };

    let updated = state.services.catalog.update_resource(id, patch).await?;
    Ok(Json(ApiResponse::success(ResourceSummary::from(updated))))
}

#[utoipa::path(
    delete,
    path = "/api/v1/resources/{id}",
    params(("id" = Uuid, Path, description = "Resource id")),
    responses(
        (status = 200, description = "Resource deleted"),
        (status = 404, description = "Resource not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Assignments reference the resource", body = crate::errors::ErrorResponse)
    ),
    tag = "resources"
)]
pub async fn delete_resource(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<serde_json::Value> {
    state.services.catalog.delete_resource(id).await?;
    Ok(Json(ApiResponse::success(json!({ "deleted": id }))))
}

#[utoipa::path(
    get,
    path = "/api/v1/resources/{id}",
    params(("id" = Uuid, Path, description = "Resource id"), GetResourceQuery),
    responses(
        (status = 200, description = "Resource returned", body = ResourceDetail),
        (status = 404, description = "Resource not found", body = crate::errors::ErrorResponse)
    ),
    tag = "resources"
)]
pub async fn get_resource(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<GetResourceQuery>,
) -> ApiResult<ResourceDetail> {
    let include_history = query.include_history.unwrap_or(false);
    let (found, history) = state
        .services
        .catalog
        .get_resource(id, include_history)
        .await?;

    let available = AvailabilityCalculator::available(&*state.db, &found).await?;

    Ok(Json(ApiResponse::success(ResourceDetail {
        resource: ResourceSummary::from(found),
        available,
        assignments: history
            .map(|items| items.into_iter().map(AssignmentSummary::from).collect()),
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/resources",
    params(ResourceListQuery),
    responses(
        (status = 200, description = "Resource list returned", body = [ResourceSummary])
    ),
    tag = "resources"
)]
pub async fn list_resources(
    State(state): State<AppState>,
    Query(query): Query<ResourceListQuery>,
) -> ApiResult<PaginatedResponse<ResourceSummary>> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);

    let category = query
        .category
        .as_deref()
        .map(parse_category)
        .transpose()?;

    let filter = ResourceFilter {
        category,
        expiring_within_days: query.expiring_within_days,
    };

    let (records, total) = state
        .services
        .catalog
        .list_resources(filter, page, limit)
        .await?;

    let items: Vec<ResourceSummary> = records.into_iter().map(ResourceSummary::from).collect();
    let total_pages = (total + limit - 1) / limit;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/availability/summary",
    responses(
        (status = 200, description = "Aggregate availability by category", body = [CategoryAvailability])
    ),
    tag = "resources"
)]
pub async fn availability_summary(
    State(state): State<AppState>,
) -> ApiResult<Vec<CategoryAvailability>> {
    let summary = AvailabilityCalculator::summary(&*state.db).await?;
    Ok(Json(ApiResponse::success(summary)))
}
