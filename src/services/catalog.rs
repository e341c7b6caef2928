//! Resource catalog: definitions of reservable things.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionError, TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::assignment::{self, AssignmentStatus};
use crate::entities::resource::{self, ResourceCategory};
use crate::entities::stock_movement::{self, MovementType};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::availability::active_assigned_quantity;
use crate::services::reservation::ReservationGuard;

/// Input for creating a catalog entry.
#[derive(Debug, Clone)]
pub struct NewResource {
    pub category: ResourceCategory,
    pub name: String,
    pub total_quantity: i32,
    pub vendor: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub min_stock_threshold: Option<i32>,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
}

/// Partial update. Present fields are applied; the category itself is
/// immutable (it selects the availability policy).
#[derive(Debug, Clone, Default)]
pub struct ResourcePatch {
    pub name: Option<String>,
    pub total_quantity: Option<i32>,
    pub vendor: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub min_stock_threshold: Option<i32>,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
}

impl ResourcePatch {
    fn apply(&self, active: &mut resource::ActiveModel) {
        if let Some(name) = &self.name {
            active.name = Set(name.clone());
        }
        if let Some(total_quantity) = self.total_quantity {
            active.total_quantity = Set(total_quantity);
        }
        if let Some(vendor) = &self.vendor {
            active.vendor = Set(Some(vendor.clone()));
        }
        if let Some(expires_at) = self.expires_at {
            active.expires_at = Set(Some(expires_at));
        }
        if let Some(threshold) = self.min_stock_threshold {
            active.min_stock_threshold = Set(Some(threshold));
        }
        if let Some(serial_number) = &self.serial_number {
            active.serial_number = Set(Some(serial_number.clone()));
        }
        if let Some(notes) = &self.notes {
            active.notes = Set(Some(notes.clone()));
        }
    }
}

/// Filters for listing catalog entries.
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    pub category: Option<ResourceCategory>,
    /// Only resources whose expiry falls within the next N days
    /// (already-expired entries included).
    pub expiring_within_days: Option<i64>,
}

#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
    guard: Arc<ReservationGuard>,
    event_sender: EventSender,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>, guard: Arc<ReservationGuard>, event_sender: EventSender) -> Self {
        Self {
            db,
            guard,
            event_sender,
        }
    }

    /// Creates a resource. Accessory entries created with nonzero quantity
    /// get an opening `in` movement in the same transaction, so their ledger
    /// starts consistent with the catalog.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_resource(
        &self,
        input: NewResource,
    ) -> Result<resource::Model, ServiceError> {
        if input.name.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Resource name must not be empty".to_string(),
            ));
        }
        if input.total_quantity < 0 {
            return Err(ServiceError::ValidationError(
                "total_quantity must not be negative".to_string(),
            ));
        }

        // A physical device is a pool of exactly one.
        let total_quantity = match input.category {
            ResourceCategory::PhysicalDevice => 1,
            _ => input.total_quantity,
        };

        let db = &*self.db;
        let created = db
            .transaction::<_, resource::Model, ServiceError>(move |txn| {
                let input = input.clone();
                Box::pin(async move {
                    let active = resource::ActiveModel {
                        category: Set(input.category.as_str().to_string()),
                        name: Set(input.name.trim().to_string()),
                        total_quantity: Set(total_quantity),
                        vendor: Set(input.vendor),
                        expires_at: Set(input.expires_at),
                        min_stock_threshold: Set(input.min_stock_threshold),
                        serial_number: Set(input.serial_number),
                        notes: Set(input.notes),
                        ..Default::default()
                    };
                    let created = active.insert(txn).await?;

                    if input.category.is_ledger_tracked() && total_quantity > 0 {
                        let movement = stock_movement::ActiveModel {
                            resource_id: Set(created.id),
                            delta: Set(total_quantity),
                            movement_type: Set(MovementType::In.as_str().to_string()),
                            reason: Set(Some("opening stock".to_string())),
                            actor: Set(None),
                            ..Default::default()
                        };
                        movement.insert(txn).await?;
                    }

                    Ok(created)
                })
            })
            .await
            .map_err(unwrap_transaction_error)?;

        info!(resource_id = %created.id, category = %created.category, "created resource");
        self.event_sender.emit(Event::ResourceCreated(created.id));

        Ok(created)
    }

    /// Applies a patch. Shrinking a pool below its currently-assigned count
    /// would manufacture overcommit, so quantity changes re-validate inside
    /// the resource's critical section.
    #[instrument(skip(self, patch))]
    pub async fn update_resource(
        &self,
        id: Uuid,
        patch: ResourcePatch,
    ) -> Result<resource::Model, ServiceError> {
        if let Some(total_quantity) = patch.total_quantity {
            if total_quantity < 0 {
                return Err(ServiceError::ValidationError(
                    "total_quantity must not be negative".to_string(),
                ));
            }
        }
        if let Some(name) = &patch.name {
            if name.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "Resource name must not be empty".to_string(),
                ));
            }
        }

        let updated = self
            .guard
            .with_resource_lock(id, move |txn| {
                let patch = patch.clone();
                Box::pin(async move {
                    let existing = resource::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Resource {} not found", id))
                        })?;

                    let category = existing.category().ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "resource {} has unknown category {:?}",
                            existing.id, existing.category
                        ))
                    })?;

                    if let Some(total_quantity) = patch.total_quantity {
                        if category == ResourceCategory::PhysicalDevice && total_quantity != 1 {
                            return Err(ServiceError::ValidationError(
                                "A physical device always has quantity 1".to_string(),
                            ));
                        }
                        if !category.is_ledger_tracked() {
                            let assigned = active_assigned_quantity(txn, existing.id).await?;
                            if total_quantity < assigned {
                                return Err(ServiceError::ValidationError(format!(
                                    "total_quantity {} is below the {} currently assigned units",
                                    total_quantity, assigned
                                )));
                            }
                        }
                    }

                    let mut active: resource::ActiveModel = existing.into();
                    patch.apply(&mut active);
                    let updated = active.update(txn).await?;
                    Ok(updated)
                })
            })
            .await?;

        self.event_sender.emit(Event::ResourceUpdated(updated.id));

        Ok(updated)
    }

    /// Deletes a resource. Rejected while active assignments reference it.
    /// Terminal assignment history and the stock ledger are never cascaded;
    /// both are retained for audit after the catalog entry is gone.
    #[instrument(skip(self))]
    pub async fn delete_resource(&self, id: Uuid) -> Result<(), ServiceError> {
        self.guard
            .with_resource_lock(id, move |txn| {
                Box::pin(async move {
                    let existing = resource::Entity::find_by_id(id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Resource {} not found", id))
                        })?;

                    let active_count = assignment::Entity::find()
                        .filter(assignment::Column::ResourceId.eq(id))
                        .filter(
                            assignment::Column::Status.eq(AssignmentStatus::Active.as_str()),
                        )
                        .count(txn)
                        .await?;
                    if active_count > 0 {
                        return Err(ServiceError::Conflict(format!(
                            "Resource {} has {} active assignment(s)",
                            id, active_count
                        )));
                    }

                    let active: resource::ActiveModel = existing.into();
                    active.delete(txn).await?;

                    Ok(())
                })
            })
            .await?;

        info!(resource_id = %id, "deleted resource");
        self.event_sender.emit(Event::ResourceDeleted(id));

        Ok(())
    }

    /// Fetches a resource, optionally with its assignment history ordered
    /// active-first then by assignment date descending.
    #[instrument(skip(self))]
    pub async fn get_resource(
        &self,
        id: Uuid,
        include_history: bool,
    ) -> Result<(resource::Model, Option<Vec<assignment::Model>>), ServiceError> {
        let db = &*self.db;

        let found = resource::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Resource {} not found", id)))?;

        let history = if include_history {
            let mut assignments = assignment::Entity::find()
                .filter(assignment::Column::ResourceId.eq(id))
                .order_by_desc(assignment::Column::AssignedAt)
                .all(db)
                .await?;
            // Stable: active entries first, assigned_at descending within each group.
            assignments
                .sort_by_key(|a| a.status() != Some(AssignmentStatus::Active));
            Some(assignments)
        } else {
            None
        };

        Ok((found, history))
    }

    /// Lists resources with optional category and expiry-window filters.
    #[instrument(skip(self))]
    pub async fn list_resources(
        &self,
        filter: ResourceFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<resource::Model>, u64), ServiceError> {
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

        let mut query = resource::Entity::find();

        if let Some(category) = filter.category {
            query = query.filter(resource::Column::Category.eq(category.as_str()));
        }

        if let Some(days) = filter.expiring_within_days {
            let cutoff = Utc::now() + Duration::days(days);
            query = query
                .filter(resource::Column::ExpiresAt.is_not_null())
                .filter(resource::Column::ExpiresAt.lte(cutoff));
        }

        query = query.order_by_asc(resource::Column::Name);

        let paginator = query.paginate(db, limit);
        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page - 1).await?;

        Ok((items, total))
    }
}

pub(crate) fn unwrap_transaction_error(err: TransactionError<ServiceError>) -> ServiceError {
    match err {
        TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}
