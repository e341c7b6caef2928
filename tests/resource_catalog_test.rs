mod common;

use assert_matches::assert_matches;
use assetledger_api::entities::resource::ResourceCategory;
use assetledger_api::errors::ServiceError;
use assetledger_api::services::availability::AvailabilityCalculator;
use assetledger_api::services::catalog::{ResourceFilter, ResourcePatch};
use chrono::{Duration, Utc};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use uuid::Uuid;

use common::{accessory, assign_to_employee, device, license, setup};

#[tokio::test]
async fn create_validates_input() {
    let app = setup().await;

    let mut nameless = license("", 5);
    nameless.name = "   ".to_string();
    let err = app
        .services
        .catalog
        .create_resource(nameless)
        .await
        .expect_err("blank name");
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = app
        .services
        .catalog
        .create_resource(license("Negative Pool", -1))
        .await
        .expect_err("negative quantity");
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn physical_device_quantity_is_pinned_to_one() {
    let app = setup().await;

    let mut oversized = device("Workstation");
    oversized.total_quantity = 5;
    let created = app
        .services
        .catalog
        .create_resource(oversized)
        .await
        .unwrap();
    assert_eq!(created.total_quantity, 1);
}

#[tokio::test]
async fn accessory_creation_writes_opening_stock() {
    let app = setup().await;

    let created = app
        .services
        .catalog
        .create_resource(accessory("Keyboard", 12))
        .await
        .unwrap();

    assert_eq!(app.services.stock.current_stock(created.id).await.unwrap(), 12);

    let (movements, total) = app
        .services
        .stock
        .movements(Some(created.id), 1, 10)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(movements[0].movement_type, "in");
    assert_eq!(movements[0].delta, 12);
}

#[tokio::test]
async fn update_rejects_shrinking_below_assigned() {
    let app = setup().await;

    let resource = app
        .services
        .catalog
        .create_resource(license("Shrinkable", 5))
        .await
        .unwrap();
    app.services
        .assignments
        .assign(assign_to_employee(resource.id, 3))
        .await
        .unwrap();

    let err = app
        .services
        .catalog
        .update_resource(
            resource.id,
            ResourcePatch {
                total_quantity: Some(2),
                ..Default::default()
            },
        )
        .await
        .expect_err("would overcommit the pool");
    assert_matches!(err, ServiceError::ValidationError(_));

    let updated = app
        .services
        .catalog
        .update_resource(
            resource.id,
            ResourcePatch {
                total_quantity: Some(3),
                ..Default::default()
            },
        )
        .await
        .expect("shrink to exactly the assigned count");
    assert_eq!(updated.total_quantity, 3);
    assert_eq!(app.services.assignments.available(resource.id).await.unwrap(), 0);
}

#[tokio::test]
async fn update_missing_resource_is_not_found() {
    let app = setup().await;

    let err = app
        .services
        .catalog
        .update_resource(
            Uuid::new_v4(),
            ResourcePatch {
                name: Some("Ghost".to_string()),
                ..Default::default()
            },
        )
        .await
        .expect_err("no such resource");
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn delete_is_blocked_by_active_assignments_only() {
    let app = setup().await;

    let resource = app
        .services
        .catalog
        .create_resource(license("Deletable", 1))
        .await
        .unwrap();
    let assignment = app
        .services
        .assignments
        .assign(assign_to_employee(resource.id, 1))
        .await
        .unwrap();

    let err = app
        .services
        .catalog
        .delete_resource(resource.id)
        .await
        .expect_err("active assignment blocks deletion");
    assert_matches!(err, ServiceError::Conflict(_));

    app.services.assignments.revoke(assignment.id).await.unwrap();

    app.services
        .catalog
        .delete_resource(resource.id)
        .await
        .expect("no active assignments left");

    let err = app
        .services
        .catalog
        .delete_resource(resource.id)
        .await
        .expect_err("already gone");
    assert_matches!(err, ServiceError::NotFound(_));

    // Assignment history is retained for audit after the catalog entry is gone.
    use assetledger_api::entities::assignment;
    let history = assignment::Entity::find()
        .filter(assignment::Column::ResourceId.eq(resource.id))
        .count(&*app.db)
        .await
        .unwrap();
    assert_eq!(history, 1);
}

#[tokio::test]
async fn get_resource_orders_history_active_first() {
    let app = setup().await;

    let resource = app
        .services
        .catalog
        .create_resource(license("Historied", 3))
        .await
        .unwrap();

    let older = app
        .services
        .assignments
        .assign(assign_to_employee(resource.id, 1))
        .await
        .unwrap();
    app.services.assignments.revoke(older.id).await.unwrap();

    let newer = app
        .services
        .assignments
        .assign(assign_to_employee(resource.id, 1))
        .await
        .unwrap();

    let (_, history) = app
        .services
        .catalog
        .get_resource(resource.id, true)
        .await
        .unwrap();
    let history = history.expect("history requested");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, newer.id);
    assert_eq!(history[0].status, "active");
    assert_eq!(history[1].id, older.id);

    let (_, no_history) = app
        .services
        .catalog
        .get_resource(resource.id, false)
        .await
        .unwrap();
    assert!(no_history.is_none());
}

#[tokio::test]
async fn list_filters_by_category_and_expiry_window() {
    let app = setup().await;

    let mut expiring = license("Expiring Soon", 5);
    expiring.expires_at = Some(Utc::now() + Duration::days(10));
    app.services.catalog.create_resource(expiring).await.unwrap();

    let mut perpetual = license("Perpetual", 5);
    perpetual.expires_at = None;
    app.services.catalog.create_resource(perpetual).await.unwrap();

    app.services
        .catalog
        .create_resource(accessory("Cable Box", 3))
        .await
        .unwrap();

    let (licenses, total) = app
        .services
        .catalog
        .list_resources(
            ResourceFilter {
                category: Some(ResourceCategory::LicenseSeat),
                ..Default::default()
            },
            1,
            50,
        )
        .await
        .unwrap();
    assert_eq!(total, 2);
    assert!(licenses.iter().all(|r| r.category == "license_seat"));

    let (expiring_soon, total) = app
        .services
        .catalog
        .list_resources(
            ResourceFilter {
                category: None,
                expiring_within_days: Some(30),
            },
            1,
            50,
        )
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(expiring_soon[0].name, "Expiring Soon");
}

#[tokio::test]
async fn availability_summary_aggregates_by_category() {
    let app = setup().await;

    let seats = app
        .services
        .catalog
        .create_resource(license("Summarized License", 5))
        .await
        .unwrap();
    app.services
        .assignments
        .assign(assign_to_employee(seats.id, 2))
        .await
        .unwrap();

    let cables = app
        .services
        .catalog
        .create_resource(accessory("Summarized Cable", 10))
        .await
        .unwrap();
    app.services
        .assignments
        .assign(assign_to_employee(cables.id, 1))
        .await
        .unwrap();

    app.services
        .catalog
        .create_resource(device("Summarized Laptop"))
        .await
        .unwrap();

    let summary = AvailabilityCalculator::summary(&*app.db).await.unwrap();
    assert_eq!(summary.len(), 3);

    let licenses = summary
        .iter()
        .find(|row| row.category == ResourceCategory::LicenseSeat)
        .unwrap();
    assert_eq!(licenses.resources, 1);
    assert_eq!(licenses.total_units, 5);
    assert_eq!(licenses.assigned_units, 2);
    assert_eq!(licenses.available_units, 3);

    let accessories = summary
        .iter()
        .find(|row| row.category == ResourceCategory::AccessoryUnit)
        .unwrap();
    assert_eq!(accessories.assigned_units, 1);
    assert_eq!(accessories.available_units, 9);
    assert_eq!(accessories.total_units, 10);

    let devices = summary
        .iter()
        .find(|row| row.category == ResourceCategory::PhysicalDevice)
        .unwrap();
    assert_eq!(devices.resources, 1);
    assert_eq!(devices.available_units, 1);
}
