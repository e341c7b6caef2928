//! OpenAPI document aggregation.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health,
        crate::handlers::resources::create_resource,
        crate::handlers::resources::update_resource,
        crate::handlers::resources::delete_resource,
        crate::handlers::resources::get_resource,
        crate::handlers::resources::list_resources,
        crate::handlers::resources::availability_summary,
        crate::handlers::assignments::create_assignment,
        crate::handlers::assignments::get_assignment,
        crate::handlers::assignments::revoke_assignment,
        crate::handlers::assignments::return_assignment,
        crate::handlers::assignments::list_active_assignments,
        crate::handlers::stock::adjust_stock,
        crate::handlers::stock::list_movements,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::resource::ResourceCategory,
        crate::entities::assignment::AssignmentStatus,
        crate::entities::assignment::ReturnCondition,
        crate::entities::stock_movement::MovementType,
        crate::handlers::resources::ResourceSummary,
        crate::handlers::resources::ResourceDetail,
        crate::handlers::resources::CreateResourceRequest,
        crate::handlers::resources::UpdateResourceRequest,
        crate::handlers::assignments::AssignmentSummary,
        crate::handlers::assignments::CreateAssignmentRequest,
        crate::handlers::assignments::ReturnAssignmentRequest,
        crate::handlers::stock::MovementSummary,
        crate::handlers::stock::AdjustStockRequest,
        crate::services::availability::CategoryAvailability,
        crate::services::stock::AdjustMode,
        crate::services::stock::StockLevel,
    )),
    tags(
        (name = "resources", description = "Resource catalog and availability"),
        (name = "assignments", description = "Reservation lifecycle"),
        (name = "stock", description = "Append-only stock ledger"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = doc.to_json().expect("document should serialize");
        assert!(json.contains("/api/v1/resources"));
        assert!(json.contains("/api/v1/assignments"));
        assert!(json.contains("/api/v1/stock/movements"));
    }
}
