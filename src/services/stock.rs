//! Append-only stock ledger for ledger-tracked (accessory) resources.

use std::sync::Arc;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::resource;
use crate::entities::stock_movement::{self, MovementType};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::availability::ledger_stock;
use crate::services::reservation::ReservationGuard;

/// Direct stock adjustment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdjustMode {
    Add,
    Subtract,
    Set,
}

/// Outcome of an adjustment.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockLevel {
    pub resource_id: Uuid,
    pub new_stock: i32,
}

/// Ledger-sum law check, exposed for tests: the aggregate and a full replay
/// of the movement history must agree.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerReconciliation {
    pub aggregate: i32,
    pub replayed: i32,
    pub consistent: bool,
}

#[derive(Clone)]
pub struct StockService {
    db: Arc<DbPool>,
    guard: Arc<ReservationGuard>,
    event_sender: EventSender,
}

impl StockService {
    pub fn new(db: Arc<DbPool>, guard: Arc<ReservationGuard>, event_sender: EventSender) -> Self {
        Self {
            db,
            guard,
            event_sender,
        }
    }

    /// Applies a direct stock change. The current-stock read and the
    /// movement append run inside the resource's critical section, so a
    /// concurrent withdrawal cannot drive stock negative.
    #[instrument(skip(self, reason, actor))]
    pub async fn adjust(
        &self,
        resource_id: Uuid,
        amount: i32,
        mode: AdjustMode,
        reason: Option<String>,
        actor: Option<String>,
    ) -> Result<StockLevel, ServiceError> {
        match mode {
            AdjustMode::Add | AdjustMode::Subtract => {
                if amount < 1 {
                    return Err(ServiceError::ValidationError(
                        "Adjustment amount must be at least 1".to_string(),
                    ));
                }
            }
            AdjustMode::Set => {
                if amount < 0 {
                    return Err(ServiceError::ValidationError(
                        "Target stock must not be negative".to_string(),
                    ));
                }
            }
        }

        let (new_stock, delta, movement_type) = self
            .guard
            .with_resource_lock(resource_id, move |txn| {
                let reason = reason.clone();
                let actor = actor.clone();
                Box::pin(async move {
                    let found = resource::Entity::find_by_id(resource_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Resource {} not found", resource_id))
                        })?;

                    let category = found.category().ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "resource {} has unknown category {:?}",
                            found.id, found.category
                        ))
                    })?;
                    if !category.is_ledger_tracked() {
                        return Err(ServiceError::ValidationError(format!(
                            "Stock adjustments apply only to ledger-tracked resources, not {}",
                            found.category
                        )));
                    }

                    let current = ledger_stock(txn, resource_id).await?;

                    let (delta, movement_type) = match mode {
                        AdjustMode::Add => (amount, MovementType::In),
                        AdjustMode::Subtract => {
                            if amount > current {
                                return Err(ServiceError::ValidationError(format!(
                                    "Cannot subtract {} from current stock of {}",
                                    amount, current
                                )));
                            }
                            (-amount, MovementType::Out)
                        }
                        AdjustMode::Set => (amount - current, MovementType::Adjustment),
                    };

                    if delta == 0 {
                        // Setting stock to its current value records nothing.
                        return Ok((current, 0, movement_type));
                    }

                    let movement = stock_movement::ActiveModel {
                        resource_id: Set(resource_id),
                        delta: Set(delta),
                        movement_type: Set(movement_type.as_str().to_string()),
                        reason: Set(reason),
                        actor: Set(actor),
                        ..Default::default()
                    };
                    movement.insert(txn).await?;

                    Ok((current + delta, delta, movement_type))
                })
            })
            .await?;

        if delta != 0 {
            info!(
                resource_id = %resource_id,
                delta,
                movement_type = movement_type.as_str(),
                new_stock,
                "stock adjusted"
            );
            self.event_sender.emit(Event::StockAdjusted {
                resource_id,
                movement_type: movement_type.as_str().to_string(),
                delta,
                new_stock,
            });
        }

        Ok(StockLevel {
            resource_id,
            new_stock,
        })
    }

    /// Reverse-chronological movement listing. A pure query: finite,
    /// restartable, no cursor state retained.
    #[instrument(skip(self))]
    pub async fn movements(
        &self,
        resource_id: Option<Uuid>,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<stock_movement::Model>, u64), ServiceError> {
        if page == 0 {
            return Err(ServiceError::ValidationError(
                "Page number must be greater than 0".to_string(),
            ));
        }
        if limit == 0 || limit > 1000 {
            return Err(ServiceError::ValidationError(
                "Limit must be between 1 and 1000".to_string(),
            ));
        }

        let db = &*self.db;

        let mut query = stock_movement::Entity::find();
        if let Some(resource_id) = resource_id {
            query = query.filter(stock_movement::Column::ResourceId.eq(resource_id));
        }
        query = query.order_by_desc(stock_movement::Column::CreatedAt);

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok((items, total))
    }

    /// Current stock as the sum of all movement deltas.
    #[instrument(skip(self))]
    pub async fn current_stock(&self, resource_id: Uuid) -> Result<i32, ServiceError> {
        ledger_stock(&*self.db, resource_id).await
    }

    /// Recomputes the ledger two ways and compares. The aggregate and the
    /// replay can only disagree if a movement was mutated in place, which
    /// the ledger forbids.
    #[instrument(skip(self))]
    pub async fn reconcile(
        &self,
        resource_id: Uuid,
    ) -> Result<LedgerReconciliation, ServiceError> {
        let db = &*self.db;

        let aggregate = ledger_stock(db, resource_id).await?;

        let movements = stock_movement::Entity::find()
            .filter(stock_movement::Column::ResourceId.eq(resource_id))
            .order_by_asc(stock_movement::Column::CreatedAt)
            .all(db)
            .await?;
        let replayed = movements.iter().map(|m| m.delta).sum::<i32>();

        Ok(LedgerReconciliation {
            aggregate,
            replayed,
            consistent: aggregate == replayed,
        })
    }
}
