//! Assignment ledger: reservation lifecycle per holder.
//!
//! `active → {returned, revoked}`, both terminal. The terminal-state check
//! lives here, once, inside the guard's critical section; categories do not
//! re-implement it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::assignment::{self, AssignmentStatus, ReturnCondition};
use crate::entities::resource;
use crate::entities::stock_movement::{self, MovementType};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::availability::{AvailabilityCalculator, AvailabilityPolicy, CategoryPolicy};
use crate::services::reservation::ReservationGuard;

/// Command for reserving units of a resource to a holder.
#[derive(Debug, Clone)]
pub struct AssignResourceCommand {
    pub resource_id: Uuid,
    pub employee_id: Option<Uuid>,
    pub device_id: Option<Uuid>,
    pub quantity: i32,
    pub assigned_at: Option<DateTime<Utc>>,
}

/// Filters for the active-assignment listing.
#[derive(Debug, Clone, Default)]
pub struct ActiveAssignmentFilter {
    pub resource_id: Option<Uuid>,
    pub employee_id: Option<Uuid>,
    pub device_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct AssignmentService {
    db: Arc<DbPool>,
    guard: Arc<ReservationGuard>,
    event_sender: EventSender,
}

impl AssignmentService {
    pub fn new(db: Arc<DbPool>, guard: Arc<ReservationGuard>, event_sender: EventSender) -> Self {
        Self {
            db,
            guard,
            event_sender,
        }
    }

    /// Reserves `quantity` units. Availability is re-read inside the
    /// resource's critical section; for accessories the paired `out`
    /// movement commits in the same transaction as the assignment row.
    #[instrument(skip(self, cmd), fields(resource_id = %cmd.resource_id, quantity = cmd.quantity))]
    pub async fn assign(
        &self,
        cmd: AssignResourceCommand,
    ) -> Result<assignment::Model, ServiceError> {
        if cmd.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Assignment quantity must be at least 1".to_string(),
            ));
        }
        if cmd.employee_id.is_none() && cmd.device_id.is_none() {
            return Err(ServiceError::ValidationError(
                "An assignment needs a holder: employee_id and/or device_id".to_string(),
            ));
        }

        let resource_id = cmd.resource_id;
        let created = self
            .guard
            .with_resource_lock(resource_id, move |txn| {
                let cmd = cmd.clone();
                Box::pin(async move {
                    let found = resource::Entity::find_by_id(cmd.resource_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Resource {} not found",
                                cmd.resource_id
                            ))
                        })?;

                    let category = found.category().ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "resource {} has unknown category {:?}",
                            found.id, found.category
                        ))
                    })?;

                    let available = CategoryPolicy::for_category(category)
                        .available(txn, &found)
                        .await?;
                    if available < cmd.quantity {
                        return Err(ServiceError::InsufficientAvailability {
                            requested: cmd.quantity,
                            available,
                        });
                    }

                    let active = assignment::ActiveModel {
                        resource_id: Set(cmd.resource_id),
                        employee_id: Set(cmd.employee_id),
                        device_id: Set(cmd.device_id),
                        quantity: Set(cmd.quantity),
                        status: Set(AssignmentStatus::Active.as_str().to_string()),
                        assigned_at: Set(cmd.assigned_at.unwrap_or_else(Utc::now)),
                        returned_at: Set(None),
                        condition_on_return: Set(None),
                        ..Default::default()
                    };
                    let created = active.insert(txn).await?;

                    if category.is_ledger_tracked() {
                        // Issuing an accessory withdraws it from the warehouse
                        // ledger; this movement IS the reservation.
                        let movement = stock_movement::ActiveModel {
                            resource_id: Set(cmd.resource_id),
                            delta: Set(-cmd.quantity),
                            movement_type: Set(MovementType::Out.as_str().to_string()),
                            reason: Set(Some(format!("issued on assignment {}", created.id))),
                            actor: Set(None),
                            ..Default::default()
                        };
                        movement.insert(txn).await?;
                    }

                    Ok(created)
                })
            })
            .await?;

        info!(
            assignment_id = %created.id,
            resource_id = %resource_id,
            quantity = created.quantity,
            "created assignment"
        );
        self.event_sender.emit(Event::ResourceAssigned {
            resource_id,
            assignment_id: created.id,
            quantity: created.quantity,
        });

        Ok(created)
    }

    /// Administrative termination: frees the reservation without a condition
    /// note and never touches stock.
    #[instrument(skip(self))]
    pub async fn revoke(&self, assignment_id: Uuid) -> Result<assignment::Model, ServiceError> {
        let resource_id = self.resource_id_of(assignment_id).await?;

        let updated = self
            .guard
            .with_resource_lock(resource_id, move |txn| {
                Box::pin(async move {
                    let current = load_active(txn, assignment_id).await?;

                    let mut active: assignment::ActiveModel = current.into();
                    active.status = Set(AssignmentStatus::Revoked.as_str().to_string());
                    active.returned_at = Set(Some(Utc::now()));
                    let updated = active.update(txn).await?;
                    Ok(updated)
                })
            })
            .await?;

        info!(assignment_id = %assignment_id, "revoked assignment");
        self.event_sender.emit(Event::AssignmentRevoked {
            resource_id,
            assignment_id,
        });

        Ok(updated)
    }

    /// Terminal return. For accessories, a unit returned in good condition
    /// restocks the ledger in the same transaction; damaged or lost units
    /// are written off.
    #[instrument(skip(self))]
    pub async fn return_assignment(
        &self,
        assignment_id: Uuid,
        condition: ReturnCondition,
    ) -> Result<assignment::Model, ServiceError> {
        let resource_id = self.resource_id_of(assignment_id).await?;

        let (updated, restocked) = self
            .guard
            .with_resource_lock(resource_id, move |txn| {
                Box::pin(async move {
                    let current = load_active(txn, assignment_id).await?;

                    let found = resource::Entity::find_by_id(current.resource_id)
                        .one(txn)
                        .await?
                        .ok_or_else(|| {
                            ServiceError::InternalError(format!(
                                "resource {} missing for assignment {}",
                                current.resource_id, current.id
                            ))
                        })?;
                    let category = found.category().ok_or_else(|| {
                        ServiceError::InternalError(format!(
                            "resource {} has unknown category {:?}",
                            found.id, found.category
                        ))
                    })?;

                    let quantity = current.quantity;
                    let mut active: assignment::ActiveModel = current.into();
                    active.status = Set(AssignmentStatus::Returned.as_str().to_string());
                    active.returned_at = Set(Some(Utc::now()));
                    active.condition_on_return = Set(Some(condition.as_str().to_string()));
                    let updated = active.update(txn).await?;

                    let restocked = category.is_ledger_tracked() && condition.restocks();
                    if restocked {
                        let movement = stock_movement::ActiveModel {
                            resource_id: Set(updated.resource_id),
                            delta: Set(quantity),
                            movement_type: Set(MovementType::Return.as_str().to_string()),
                            reason: Set(Some(format!(
                                "returned in good condition on assignment {}",
                                updated.id
                            ))),
                            actor: Set(None),
                            ..Default::default()
                        };
                        movement.insert(txn).await?;
                    }

                    Ok((updated, restocked))
                })
            })
            .await?;

        info!(
            assignment_id = %assignment_id,
            condition = condition.as_str(),
            restocked,
            "returned assignment"
        );
        self.event_sender.emit(Event::AssignmentReturned {
            resource_id,
            assignment_id,
            condition: condition.as_str().to_string(),
            restocked,
        });

        Ok(updated)
    }

    /// Active assignments matching the given filters, newest first.
    #[instrument(skip(self))]
    pub async fn list_active(
        &self,
        filter: ActiveAssignmentFilter,
    ) -> Result<Vec<assignment::Model>, ServiceError> {
        let db = &*self.db;

        let mut query = assignment::Entity::find()
            .filter(assignment::Column::Status.eq(AssignmentStatus::Active.as_str()));

        if let Some(resource_id) = filter.resource_id {
            query = query.filter(assignment::Column::ResourceId.eq(resource_id));
        }
        if let Some(employee_id) = filter.employee_id {
            query = query.filter(assignment::Column::EmployeeId.eq(employee_id));
        }
        if let Some(device_id) = filter.device_id {
            query = query.filter(assignment::Column::DeviceId.eq(device_id));
        }

        let items = query
            .order_by_desc(assignment::Column::AssignedAt)
            .all(db)
            .await?;

        Ok(items)
    }

    /// Fetches an assignment by id.
    #[instrument(skip(self))]
    pub async fn get_assignment(
        &self,
        assignment_id: Uuid,
    ) -> Result<Option<assignment::Model>, ServiceError> {
        let found = assignment::Entity::find_by_id(assignment_id)
            .one(&*self.db)
            .await?;
        Ok(found)
    }

    /// Free units for one resource, through the category policy.
    #[instrument(skip(self))]
    pub async fn available(&self, resource_id: Uuid) -> Result<i32, ServiceError> {
        let db = &*self.db;
        let found = resource::Entity::find_by_id(resource_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Resource {} not found", resource_id)))?;
        AvailabilityCalculator::available(db, &found).await
    }

    /// Pool lookup used only to learn the guard key; the guarded closure
    /// re-reads the row before acting on it.
    async fn resource_id_of(&self, assignment_id: Uuid) -> Result<Uuid, ServiceError> {
        let found = assignment::Entity::find_by_id(assignment_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Assignment {} not found", assignment_id))
            })?;
        Ok(found.resource_id)
    }
}

/// Loads an assignment and enforces the terminal-state rule.
async fn load_active(
    txn: &DatabaseTransaction,
    assignment_id: Uuid,
) -> Result<assignment::Model, ServiceError> {
    let current = assignment::Entity::find_by_id(assignment_id)
        .one(txn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Assignment {} not found", assignment_id)))?;

    match current.status() {
        Some(AssignmentStatus::Active) => Ok(current),
        Some(status) => Err(ServiceError::InvalidState(format!(
            "Assignment {} is {}, which is terminal",
            assignment_id,
            status.as_str()
        ))),
        None => Err(ServiceError::InternalError(format!(
            "assignment {} has unknown status {:?}",
            assignment_id, current.status
        ))),
    }
}
