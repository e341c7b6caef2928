use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, Set};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of an assignment: `active` transitions exactly once to
/// `returned` or `revoked`, both terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Active,
    Returned,
    Revoked,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Active => "active",
            AssignmentStatus::Returned => "returned",
            AssignmentStatus::Revoked => "revoked",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AssignmentStatus::Active),
            "returned" => Some(AssignmentStatus::Returned),
            "revoked" => Some(AssignmentStatus::Revoked),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AssignmentStatus::Returned | AssignmentStatus::Revoked)
    }
}

/// Condition a ledger-tracked unit came back in. `Good` restocks; the other
/// two write the unit off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReturnCondition {
    Good,
    Damaged,
    Lost,
}

impl ReturnCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnCondition::Good => "good",
            ReturnCondition::Damaged => "damaged",
            ReturnCondition::Lost => "lost",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "good" => Some(ReturnCondition::Good),
            "damaged" => Some(ReturnCondition::Damaged),
            "lost" => Some(ReturnCondition::Lost),
            _ => None,
        }
    }

    pub fn restocks(&self) -> bool {
        matches!(self, ReturnCondition::Good)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "assignments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub resource_id: Uuid,
    /// Holder reference: an employee, a device, or both (e.g. a license
    /// seat consumed by a device on behalf of its user).
    pub employee_id: Option<Uuid>,
    pub device_id: Option<Uuid>,
    pub quantity: i32,
    pub status: String,
    pub assigned_at: DateTime<Utc>,
    /// Set exactly once, at the terminal transition.
    pub returned_at: Option<DateTime<Utc>>,
    pub condition_on_return: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn status(&self) -> Option<AssignmentStatus> {
        AssignmentStatus::from_str(&self.status)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::resource::Entity",
        from = "Column::ResourceId",
        to = "super::resource::Column::Id"
    )]
    Resource,
}

impl Related<super::resource::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Resource.def()
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_conversion() {
        assert_eq!(AssignmentStatus::Active.as_str(), "active");
        assert_eq!(
            AssignmentStatus::from_str("revoked"),
            Some(AssignmentStatus::Revoked)
        );
        assert_eq!(AssignmentStatus::from_str("pending"), None);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!AssignmentStatus::Active.is_terminal());
        assert!(AssignmentStatus::Returned.is_terminal());
        assert!(AssignmentStatus::Revoked.is_terminal());
    }

    #[test]
    fn only_good_condition_restocks() {
        assert!(ReturnCondition::Good.restocks());
        assert!(!ReturnCondition::Damaged.restocks());
        assert!(!ReturnCondition::Lost.restocks());
    }
}
