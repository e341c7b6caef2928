//! Availability derivation.
//!
//! Two incompatible policies live behind one contract, selected once per
//! resource category:
//!
//! * pool-counted (license seats, devices): `total_quantity` minus the sum
//!   of active assignment quantities;
//! * ledger-backed (accessories): the sum of stock-movement deltas. Active
//!   accessory assignments do not subtract again — the `out` movement
//!   written at assignment time already did.

use async_trait::async_trait;
use sea_orm::{
    sea_query::Expr, ColumnTrait, ConnectionTrait, EntityTrait, FromQueryResult, JoinType,
    QueryFilter, QuerySelect, RelationTrait,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::assignment::{self, AssignmentStatus};
use crate::entities::resource::{self, ResourceCategory};
use crate::entities::stock_movement;
use crate::errors::ServiceError;

#[derive(Debug, FromQueryResult)]
struct SumRow {
    total: Option<i64>,
}

/// Sum of active assignment quantities for one resource.
pub(crate) async fn active_assigned_quantity<C>(
    conn: &C,
    resource_id: Uuid,
) -> Result<i32, ServiceError>
where
    C: ConnectionTrait + Sync,
{
    let row = assignment::Entity::find()
        .select_only()
        .column_as(
            Expr::col((assignment::Entity, assignment::Column::Quantity)).sum(),
            "total",
        )
        .filter(assignment::Column::ResourceId.eq(resource_id))
        .filter(assignment::Column::Status.eq(AssignmentStatus::Active.as_str()))
        .into_model::<SumRow>()
        .one(conn)
        .await?;

    Ok(row.and_then(|r| r.total).unwrap_or(0) as i32)
}

/// Sum of movement deltas for one resource.
pub(crate) async fn ledger_stock<C>(conn: &C, resource_id: Uuid) -> Result<i32, ServiceError>
where
    C: ConnectionTrait + Sync,
{
    let row = stock_movement::Entity::find()
        .select_only()
        .column_as(
            Expr::col((stock_movement::Entity, stock_movement::Column::Delta)).sum(),
            "total",
        )
        .filter(stock_movement::Column::ResourceId.eq(resource_id))
        .into_model::<SumRow>()
        .one(conn)
        .await?;

    Ok(row.and_then(|r| r.total).unwrap_or(0) as i32)
}

/// Availability contract shared by both policies.
#[async_trait]
pub trait AvailabilityPolicy: Send + Sync {
    async fn available<C>(
        &self,
        conn: &C,
        resource: &resource::Model,
    ) -> Result<i32, ServiceError>
    where
        C: ConnectionTrait + Sync;
}

/// Reservations counted against a fixed pool.
pub struct PoolCountedPolicy;

#[async_trait]
impl AvailabilityPolicy for PoolCountedPolicy {
    async fn available<C>(
        &self,
        conn: &C,
        resource: &resource::Model,
    ) -> Result<i32, ServiceError>
    where
        C: ConnectionTrait + Sync,
    {
        let assigned = active_assigned_quantity(conn, resource.id).await?;
        Ok(resource.total_quantity - assigned)
    }
}

/// Reservations backed by physical withdrawal from the stock ledger.
pub struct LedgerBackedPolicy;

#[async_trait]
impl AvailabilityPolicy for LedgerBackedPolicy {
    async fn available<C>(
        &self,
        conn: &C,
        resource: &resource::Model,
    ) -> Result<i32, ServiceError>
    where
        C: ConnectionTrait + Sync,
    {
        ledger_stock(conn, resource.id).await
    }
}

/// Policy selected once per category; call sites never branch on the
/// category string again.
pub enum CategoryPolicy {
    PoolCounted(PoolCountedPolicy),
    LedgerBacked(LedgerBackedPolicy),
}

impl CategoryPolicy {
    pub fn for_category(category: ResourceCategory) -> Self {
        match category {
            ResourceCategory::LicenseSeat | ResourceCategory::PhysicalDevice => {
                CategoryPolicy::PoolCounted(PoolCountedPolicy)
            }
            ResourceCategory::AccessoryUnit => CategoryPolicy::LedgerBacked(LedgerBackedPolicy),
        }
    }
}

#[async_trait]
impl AvailabilityPolicy for CategoryPolicy {
    async fn available<C>(
        &self,
        conn: &C,
        resource: &resource::Model,
    ) -> Result<i32, ServiceError>
    where
        C: ConnectionTrait + Sync,
    {
        match self {
            CategoryPolicy::PoolCounted(policy) => policy.available(conn, resource).await,
            CategoryPolicy::LedgerBacked(policy) => policy.available(conn, resource).await,
        }
    }
}

/// Aggregate availability for one category, as reported by the global
/// summary. For accessories `total_units` is reconstructed as stock on hand
/// plus units currently held by employees.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryAvailability {
    pub category: ResourceCategory,
    pub resources: i64,
    pub total_units: i64,
    pub assigned_units: i64,
    pub available_units: i64,
}

pub struct AvailabilityCalculator;

impl AvailabilityCalculator {
    /// Free units for one resource under its category policy. Works against
    /// the pool for display reads and against an open transaction inside the
    /// reservation guard's critical section.
    pub async fn available<C>(conn: &C, resource: &resource::Model) -> Result<i32, ServiceError>
    where
        C: ConnectionTrait + Sync,
    {
        let category = resource.category().ok_or_else(|| {
            ServiceError::InternalError(format!(
                "resource {} has unknown category {:?}",
                resource.id, resource.category
            ))
        })?;

        CategoryPolicy::for_category(category)
            .available(conn, resource)
            .await
    }

    /// Aggregate counts by category for the global summary operation.
    pub async fn summary<C>(conn: &C) -> Result<Vec<CategoryAvailability>, ServiceError>
    where
        C: ConnectionTrait + Sync,
    {
        #[derive(Debug, FromQueryResult)]
        struct ResourceAgg {
            category: String,
            resources: i64,
            total_units: Option<i64>,
        }

        #[derive(Debug, FromQueryResult)]
        struct AssignedAgg {
            category: String,
            assigned_units: Option<i64>,
        }

        let resource_rows = resource::Entity::find()
            .select_only()
            .column(resource::Column::Category)
            .column_as(
                Expr::col((resource::Entity, resource::Column::Id)).count(),
                "resources",
            )
            .column_as(
                Expr::col((resource::Entity, resource::Column::TotalQuantity)).sum(),
                "total_units",
            )
            .group_by(resource::Column::Category)
            .into_model::<ResourceAgg>()
            .all(conn)
            .await?;

        let assigned_rows = assignment::Entity::find()
            .select_only()
            .column(resource::Column::Category)
            .column_as(
                Expr::col((assignment::Entity, assignment::Column::Quantity)).sum(),
                "assigned_units",
            )
            .join(JoinType::InnerJoin, assignment::Relation::Resource.def())
            .filter(assignment::Column::Status.eq(AssignmentStatus::Active.as_str()))
            .group_by(resource::Column::Category)
            .into_model::<AssignedAgg>()
            .all(conn)
            .await?;

        let stock_row = stock_movement::Entity::find()
            .select_only()
            .column_as(
                Expr::col((stock_movement::Entity, stock_movement::Column::Delta)).sum(),
                "total",
            )
            .into_model::<SumRow>()
            .one(conn)
            .await?;
        let accessory_stock = stock_row.and_then(|r| r.total).unwrap_or(0);

        let mut summary = Vec::with_capacity(3);
        for category in [
            ResourceCategory::LicenseSeat,
            ResourceCategory::AccessoryUnit,
            ResourceCategory::PhysicalDevice,
        ] {
            let resources = resource_rows
                .iter()
                .find(|row| row.category == category.as_str());
            let assigned = assigned_rows
                .iter()
                .find(|row| row.category == category.as_str())
                .and_then(|row| row.assigned_units)
                .unwrap_or(0);

            let (total_units, available_units) = if category.is_ledger_tracked() {
                (accessory_stock + assigned, accessory_stock)
            } else {
                let total = resources.and_then(|row| row.total_units).unwrap_or(0);
                (total, total - assigned)
            };

            summary.push(CategoryAvailability {
                category,
                resources: resources.map(|row| row.resources).unwrap_or(0),
                total_units,
                assigned_units: assigned,
                available_units,
            });
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_selection_is_per_category() {
        assert!(matches!(
            CategoryPolicy::for_category(ResourceCategory::LicenseSeat),
            CategoryPolicy::PoolCounted(_)
        ));
        assert!(matches!(
            CategoryPolicy::for_category(ResourceCategory::PhysicalDevice),
            CategoryPolicy::PoolCounted(_)
        ));
        assert!(matches!(
            CategoryPolicy::for_category(ResourceCategory::AccessoryUnit),
            CategoryPolicy::LedgerBacked(_)
        ));
    }
}
