// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::collections::HashSet;
use std::sync::Arc;

use orgchart_core::application::hierarchy_service::{HierarchyService, StandardHierarchyService};
use orgchart_core::domain::employee::{Employee, EmployeeId, NewEmployee};
use orgchart_core::domain::hierarchy::HierarchyError;
use orgchart_core::infrastructure::repositories::InMemoryDirectory;

const ROUNDS: usize = 25;

fn setup() -> (InMemoryDirectory, Arc<StandardHierarchyService>) {
    let directory = InMemoryDirectory::new();
    let service = Arc::new(StandardHierarchyService::new(Arc::new(directory.clone())));
    (directory, service)
}

async fn hire(
    service: &StandardHierarchyService,
    name: &str,
    is_manager: bool,
    manager_id: Option<EmployeeId>,
) -> Employee {
    service
        .create_employee(NewEmployee {
            name: name.to_string(),
            email: format!("{}@corp.test", name.to_lowercase()),
            department: None,
            salary: None,
            is_manager,
            manager_id,
        })
        .await
        .unwrap()
}

/// Every manager link resolves and every chain reaches a root.
fn assert_forest(employees: &[Employee]) {
    let by_id: std::collections::HashMap<EmployeeId, &Employee> =
        employees.iter().map(|e| (e.id, e)).collect();

    for employee in employees {
        let mut seen = HashSet::new();
        let mut current = Some(employee);
        while let Some(e) = current {
            assert!(seen.insert(e.id), "cycle through {}", e.id);
            current = e.manager_id.map(|m| {
                let manager = by_id.get(&m).unwrap_or_else(|| panic!("dangling manager {}", m));
                assert!(manager.is_manager, "{} reports to non-manager {}", e.id, m);
                *manager
            });
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_crossing_transfers_never_form_a_cycle() {
    for _ in 0..ROUNDS {
        let (directory, service) = setup();
        let a = hire(&service, "A", true, None).await;
        let b = hire(&service, "B", true, None).await;

        let s1 = service.clone();
        let s2 = service.clone();
        let t1 = tokio::spawn(async move { s1.transfer_employee(a.id, Some(b.id)).await });
        let t2 = tokio::spawn(async move { s2.transfer_employee(b.id, Some(a.id)).await });
        let r1 = t1.await.unwrap();
        let r2 = t2.await.unwrap();

        assert!(r1.is_ok() ^ r2.is_ok(), "exactly one transfer must win");
        let loser = if r1.is_ok() { r2 } else { r1 };
        assert!(matches!(loser, Err(HierarchyError::CycleDetected(_))));

        assert_forest(&directory.snapshot().await);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_manager_deletions_leave_no_dangling_links() {
    for _ in 0..ROUNDS {
        let (directory, service) = setup();
        let m1 = hire(&service, "M1", true, None).await;
        let m2 = hire(&service, "M2", true, None).await;
        for i in 0..3 {
            hire(&service, &format!("a{}", i), false, Some(m1.id)).await;
            hire(&service, &format!("b{}", i), false, Some(m2.id)).await;
        }

        let s1 = service.clone();
        let s2 = service.clone();
        let t1 = tokio::spawn(async move { s1.delete_manager(m1.id).await });
        let t2 = tokio::spawn(async move { s2.delete_manager(m2.id).await });
        t1.await.unwrap().unwrap();
        t2.await.unwrap().unwrap();

        let remaining = directory.snapshot().await;
        assert_eq!(remaining.len(), 6);
        assert!(remaining.iter().all(|e| e.manager_id.is_none()));
        assert_forest(&remaining);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_demotion_racing_an_assignment() {
    for _ in 0..ROUNDS {
        let (directory, service) = setup();
        let boss = hire(&service, "Boss", true, None).await;
        let worker = hire(&service, "Worker", false, None).await;

        let s1 = service.clone();
        let s2 = service.clone();
        let assign = tokio::spawn(async move { s1.transfer_employee(worker.id, Some(boss.id)).await });
        let demote = tokio::spawn(async move { s2.demote_from_manager(boss.id).await });
        let assigned = assign.await.unwrap();
        let demoted = demote.await.unwrap();

        match (&assigned, &demoted) {
            (Ok(_), Err(e)) => assert!(matches!(e, HierarchyError::InvalidOperation(_))),
            (Err(e), Ok(_)) => assert!(matches!(e, HierarchyError::InvalidRole(_))),
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert_forest(&directory.snapshot().await);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_hires_get_distinct_ids() {
    let (directory, service) = setup();
    let boss = hire(&service, "Boss", true, None).await;

    let mut handles = Vec::new();
    for i in 0..20 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .create_employee(NewEmployee {
                    name: format!("Hire {}", i),
                    email: format!("hire{}@corp.test", i),
                    department: None,
                    salary: None,
                    is_manager: false,
                    manager_id: Some(boss.id),
                })
                .await
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap().id);
    }
    assert_eq!(ids.len(), 20);
    assert_eq!(service.get_subordinates(boss.id).await.unwrap().len(), 20);
    assert_forest(&directory.snapshot().await);
}
