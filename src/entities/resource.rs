use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Category of a reservable resource. The category decides which
/// availability policy applies (see `services::availability`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    /// Seat pool counted against a fixed total (software licenses).
    LicenseSeat,
    /// Physical stock tracked through the movement ledger (cables, docks, ...).
    AccessoryUnit,
    /// A single physical device; capacity is always 1.
    PhysicalDevice,
}

impl ResourceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceCategory::LicenseSeat => "license_seat",
            ResourceCategory::AccessoryUnit => "accessory_unit",
            ResourceCategory::PhysicalDevice => "physical_device",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "license_seat" => Some(ResourceCategory::LicenseSeat),
            "accessory_unit" => Some(ResourceCategory::AccessoryUnit),
            "physical_device" => Some(ResourceCategory::PhysicalDevice),
            _ => None,
        }
    }

    /// Whether direct stock movements apply to this category.
    pub fn is_ledger_tracked(&self) -> bool {
        matches!(self, ResourceCategory::AccessoryUnit)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "resources")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub category: String,
    pub name: String,
    /// Capacity of the pool for seat/device categories; for accessories the
    /// availability signal is the stock ledger, not this column.
    pub total_quantity: i32,
    pub vendor: Option<String>,
    /// License expiry, where applicable.
    pub expires_at: Option<DateTime<Utc>>,
    /// Reorder alert threshold for accessory stock.
    pub min_stock_threshold: Option<i32>,
    pub serial_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn category(&self) -> Option<ResourceCategory> {
        ResourceCategory::from_str(&self.category)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::assignment::Entity")]
    Assignment,
    #[sea_orm(has_many = "super::stock_movement::Entity")]
    StockMovement,
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignment.def()
    }
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockMovement.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        let now = Utc::now();

        if insert {
            active_model.created_at = Set(now);

            if let ActiveValue::NotSet = active_model.id {
                active_model.id = Set(Uuid::new_v4());
            }
        }

        active_model.updated_at = Set(Some(now));

        Ok(active_model)
    }
}
