pub mod assignments;
pub mod resources;
pub mod stock;

use std::sync::Arc;

use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::assignments::AssignmentService;
use crate::services::catalog::CatalogService;
use crate::services::reservation::ReservationGuard;
use crate::services::stock::StockService;
use crate::ApiResult;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<CatalogService>,
    pub assignments: Arc<AssignmentService>,
    pub stock: Arc<StockService>,
}

impl AppServices {
    /// Build the service container. All three services share one
    /// reservation guard so their critical sections agree per resource.
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        let guard = Arc::new(ReservationGuard::new(db_pool.clone()));

        let catalog = Arc::new(CatalogService::new(
            db_pool.clone(),
            guard.clone(),
            event_sender.clone(),
        ));
        let assignments = Arc::new(AssignmentService::new(
            db_pool.clone(),
            guard.clone(),
            event_sender.clone(),
        ));
        let stock = Arc::new(StockService::new(db_pool, guard, event_sender));

        Self {
            catalog,
            assignments,
            stock,
        }
    }
}

/// Liveness probe with a database ping.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy"),
        (status = 500, description = "Database unreachable")
    ),
    tag = "health"
)]
pub async fn health(State(state): State<AppState>) -> ApiResult<Value> {
    crate::db::check_connection(&state.db).await?;
    Ok(Json(crate::ApiResponse::success(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))))
}
