mod common;

use assetledger_api::errors::ServiceError;
use assetledger_api::services::assignments::ActiveAssignmentFilter;

use common::{accessory, assign_to_employee, license, setup};

// N+1 concurrent single-unit reservations against capacity N must produce
// exactly N successes; every failure must be the expected availability
// outcome, never a lost update or an internal error.
#[tokio::test]
async fn license_pool_never_overcommits_under_contention() {
    let app = setup().await;

    let resource = app
        .services
        .catalog
        .create_resource(license("Contended License", 10))
        .await
        .expect("create license");

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let assignments = app.services.assignments.clone();
        let resource_id = resource.id;
        tasks.push(tokio::spawn(async move {
            assignments.assign(assign_to_employee(resource_id, 1)).await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        match task.await.expect("task completed") {
            Ok(_) => successes += 1,
            Err(ServiceError::InsufficientAvailability { requested, available }) => {
                assert_eq!(requested, 1);
                assert!(available < 1);
            }
            Err(other) => panic!("unexpected error under contention: {}", other),
        }
    }

    assert_eq!(
        successes, 10,
        "exactly 10 reservations should succeed; got {}",
        successes
    );

    // Conservation: Σ(active quantities) == total, available() == 0.
    let active = app
        .services
        .assignments
        .list_active(ActiveAssignmentFilter {
            resource_id: Some(resource.id),
            ..Default::default()
        })
        .await
        .unwrap();
    let active_quantity: i32 = active.iter().map(|a| a.quantity).sum();
    assert_eq!(active_quantity, resource.total_quantity);
    assert_eq!(app.services.assignments.available(resource.id).await.unwrap(), 0);
}

#[tokio::test]
async fn accessory_ledger_never_goes_negative_under_contention() {
    let app = setup().await;

    let resource = app
        .services
        .catalog
        .create_resource(accessory("Contended Adapter", 5))
        .await
        .expect("create accessory");

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let assignments = app.services.assignments.clone();
        let resource_id = resource.id;
        tasks.push(tokio::spawn(async move {
            assignments.assign(assign_to_employee(resource_id, 1)).await
        }));
    }

    let mut successes = 0;
    for task in tasks {
        match task.await.expect("task completed") {
            Ok(_) => successes += 1,
            Err(ServiceError::InsufficientAvailability { .. }) => {}
            Err(other) => panic!("unexpected error under contention: {}", other),
        }
    }

    assert_eq!(successes, 5);
    assert_eq!(app.services.stock.current_stock(resource.id).await.unwrap(), 0);

    let reconciliation = app.services.stock.reconcile(resource.id).await.unwrap();
    assert!(reconciliation.consistent);
}

// Interleaved reservations and releases must preserve the conservation law
// at the end: available() + Σ(active quantities) == total_quantity.
#[tokio::test]
async fn conservation_holds_across_mixed_operations() {
    let app = setup().await;

    let resource = app
        .services
        .catalog
        .create_resource(license("Churned License", 6))
        .await
        .unwrap();

    let first = app
        .services
        .assignments
        .assign(assign_to_employee(resource.id, 2))
        .await
        .unwrap();
    let _second = app
        .services
        .assignments
        .assign(assign_to_employee(resource.id, 3))
        .await
        .unwrap();
    app.services.assignments.revoke(first.id).await.unwrap();
    let _third = app
        .services
        .assignments
        .assign(assign_to_employee(resource.id, 1))
        .await
        .unwrap();

    let active = app
        .services
        .assignments
        .list_active(ActiveAssignmentFilter {
            resource_id: Some(resource.id),
            ..Default::default()
        })
        .await
        .unwrap();
    let active_quantity: i32 = active.iter().map(|a| a.quantity).sum();
    let available = app
        .services
        .assignments
        .available(resource.id)
        .await
        .unwrap();

    assert_eq!(active_quantity, 4);
    assert_eq!(available + active_quantity, resource.total_quantity);
}
