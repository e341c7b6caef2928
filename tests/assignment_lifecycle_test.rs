mod common;

use assert_matches::assert_matches;
use assetledger_api::entities::assignment::{AssignmentStatus, ReturnCondition};
use assetledger_api::errors::ServiceError;
use assetledger_api::services::assignments::ActiveAssignmentFilter;
use uuid::Uuid;

use common::{assign_to_employee, device, license, setup};

#[tokio::test]
async fn license_pool_exhausts_then_rejects() {
    let app = setup().await;

    let resource = app
        .services
        .catalog
        .create_resource(license("Design Suite", 5))
        .await
        .expect("create license");

    for _ in 0..5 {
        app.services
            .assignments
            .assign(assign_to_employee(resource.id, 1))
            .await
            .expect("seat should be free");
    }

    let err = app
        .services
        .assignments
        .assign(assign_to_employee(resource.id, 1))
        .await
        .expect_err("pool is exhausted");
    assert_matches!(
        err,
        ServiceError::InsufficientAvailability {
            requested: 1,
            available: 0
        }
    );

    let available = app
        .services
        .assignments
        .available(resource.id)
        .await
        .expect("availability");
    assert_eq!(available, 0);
}

#[tokio::test]
async fn revoke_frees_the_seat() {
    let app = setup().await;

    let resource = app
        .services
        .catalog
        .create_resource(license("Single Seat Tool", 1))
        .await
        .unwrap();

    let assignment = app
        .services
        .assignments
        .assign(assign_to_employee(resource.id, 1))
        .await
        .unwrap();
    assert_eq!(app.services.assignments.available(resource.id).await.unwrap(), 0);

    let revoked = app
        .services
        .assignments
        .revoke(assignment.id)
        .await
        .expect("revoke active assignment");

    assert_eq!(revoked.status(), Some(AssignmentStatus::Revoked));
    assert!(revoked.returned_at.is_some());
    assert!(revoked.condition_on_return.is_none());
    assert_eq!(app.services.assignments.available(resource.id).await.unwrap(), 1);
}

#[tokio::test]
async fn terminal_assignments_are_immutable() {
    let app = setup().await;

    let resource = app
        .services
        .catalog
        .create_resource(license("One-Shot License", 2))
        .await
        .unwrap();
    let assignment = app
        .services
        .assignments
        .assign(assign_to_employee(resource.id, 1))
        .await
        .unwrap();

    let returned = app
        .services
        .assignments
        .return_assignment(assignment.id, ReturnCondition::Good)
        .await
        .expect("first terminal transition");
    assert_eq!(returned.status(), Some(AssignmentStatus::Returned));

    // Second transition attempts fail and leave the record untouched.
    let err = app
        .services
        .assignments
        .return_assignment(assignment.id, ReturnCondition::Damaged)
        .await
        .expect_err("already terminal");
    assert_matches!(err, ServiceError::InvalidState(_));

    let err = app
        .services
        .assignments
        .revoke(assignment.id)
        .await
        .expect_err("already terminal");
    assert_matches!(err, ServiceError::InvalidState(_));

    let after = app
        .services
        .assignments
        .get_assignment(assignment.id)
        .await
        .unwrap()
        .expect("assignment still exists");
    assert_eq!(after.status, returned.status);
    assert_eq!(after.returned_at, returned.returned_at);
    assert_eq!(after.condition_on_return, returned.condition_on_return);
}

#[tokio::test]
async fn missing_assignments_are_not_found() {
    let app = setup().await;

    let err = app
        .services
        .assignments
        .revoke(Uuid::new_v4())
        .await
        .expect_err("no such assignment");
    assert_matches!(err, ServiceError::NotFound(_));

    let err = app
        .services
        .assignments
        .return_assignment(Uuid::new_v4(), ReturnCondition::Good)
        .await
        .expect_err("no such assignment");
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn assign_validates_quantity_and_holder() {
    let app = setup().await;

    let resource = app
        .services
        .catalog
        .create_resource(license("Validated License", 3))
        .await
        .unwrap();

    let err = app
        .services
        .assignments
        .assign(assign_to_employee(resource.id, 0))
        .await
        .expect_err("zero quantity");
    assert_matches!(err, ServiceError::ValidationError(_));

    let mut holderless = assign_to_employee(resource.id, 1);
    holderless.employee_id = None;
    let err = app
        .services
        .assignments
        .assign(holderless)
        .await
        .expect_err("no holder");
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = app
        .services
        .assignments
        .assign(assign_to_employee(Uuid::new_v4(), 1))
        .await
        .expect_err("unknown resource");
    assert_matches!(err, ServiceError::NotFound(_));
}

#[tokio::test]
async fn physical_device_holds_at_most_one_active_assignment() {
    let app = setup().await;

    let laptop = app
        .services
        .catalog
        .create_resource(device("Laptop 14\""))
        .await
        .unwrap();
    assert_eq!(laptop.total_quantity, 1);

    app.services
        .assignments
        .assign(assign_to_employee(laptop.id, 1))
        .await
        .expect("device is free");

    let err = app
        .services
        .assignments
        .assign(assign_to_employee(laptop.id, 1))
        .await
        .expect_err("device already out");
    assert_matches!(
        err,
        ServiceError::InsufficientAvailability {
            requested: 1,
            available: 0
        }
    );
}

#[tokio::test]
async fn list_active_filters_by_resource_and_holder() {
    let app = setup().await;

    let resource = app
        .services
        .catalog
        .create_resource(license("Filterable", 4))
        .await
        .unwrap();

    let first = app
        .services
        .assignments
        .assign(assign_to_employee(resource.id, 1))
        .await
        .unwrap();
    let second = app
        .services
        .assignments
        .assign(assign_to_employee(resource.id, 2))
        .await
        .unwrap();

    app.services.assignments.revoke(first.id).await.unwrap();

    let by_resource = app
        .services
        .assignments
        .list_active(ActiveAssignmentFilter {
            resource_id: Some(resource.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_resource.len(), 1);
    assert_eq!(by_resource[0].id, second.id);

    let by_employee = app
        .services
        .assignments
        .list_active(ActiveAssignmentFilter {
            employee_id: second.employee_id,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_employee.len(), 1);
    assert_eq!(by_employee[0].id, second.id);
}
