#![allow(dead_code)]

use std::sync::Arc;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tokio::sync::mpsc;
use uuid::Uuid;

use assetledger_api::entities::resource::ResourceCategory;
use assetledger_api::events::{process_events, EventSender};
use assetledger_api::handlers::AppServices;
use assetledger_api::migrator::Migrator;
use assetledger_api::services::assignments::AssignResourceCommand;
use assetledger_api::services::catalog::NewResource;

pub struct TestApp {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
}

/// Boots an in-memory database with the embedded migrations and wires the
/// service container over a drained event channel.
pub async fn setup() -> TestApp {
    // A single connection so every session sees the same in-memory database.
    let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
    opts.max_connections(1).sqlx_logging(false);

    let db = Database::connect(opts).await.expect("db connect");
    Migrator::up(&db, None).await.expect("migrations");

    let (tx, rx) = mpsc::channel(256);
    tokio::spawn(process_events(rx, None));
    let sender = EventSender::new(tx);

    let db = Arc::new(db);
    let services = AppServices::new(db.clone(), sender);

    TestApp { db, services }
}

pub fn license(name: &str, seats: i32) -> NewResource {
    NewResource {
        category: ResourceCategory::LicenseSeat,
        name: name.to_string(),
        total_quantity: seats,
        vendor: Some("Example Software GmbH".to_string()),
        expires_at: None,
        min_stock_threshold: None,
        serial_number: None,
        notes: None,
    }
}

pub fn accessory(name: &str, opening_stock: i32) -> NewResource {
    NewResource {
        category: ResourceCategory::AccessoryUnit,
        name: name.to_string(),
        total_quantity: opening_stock,
        vendor: None,
        expires_at: None,
        min_stock_threshold: Some(2),
        serial_number: None,
        notes: None,
    }
}

pub fn device(name: &str) -> NewResource {
    NewResource {
        category: ResourceCategory::PhysicalDevice,
        name: name.to_string(),
        total_quantity: 1,
        vendor: None,
        expires_at: None,
        min_stock_threshold: None,
        serial_number: Some("SN-0001".to_string()),
        notes: None,
    }
}

pub fn assign_to_employee(resource_id: Uuid, quantity: i32) -> AssignResourceCommand {
    AssignResourceCommand {
        resource_id,
        employee_id: Some(Uuid::new_v4()),
        device_id: None,
        quantity,
        assigned_at: None,
    }
}
