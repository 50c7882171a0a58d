//! Integration tests for HttpService against the in-process stub backend.
//!
//! Each test spawns the stub on 127.0.0.1:0 with empty in-memory state,
//! then exercises the HTTP client through the full request/response cycle.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use staylog_core::attachment::UploadFile;
use staylog_core::booking::{BookingChannel, CreateBooking};
use staylog_core::earning::CreateEarning;
use staylog_core::expense::{CreateExpense, ExpenseCategory};
use staylog_core::property::{CreateProperty, UpdateProperty};
use staylog_core::scan::{ScanModule, ScanStatus, StartScan};
use staylog_service::test_helpers::{spawn_test_server, spawn_test_server_with_auth, ScanScript};
use staylog_service::{AttachmentStore, HttpService, LedgerService, ScanBackend, ServiceError};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn hill_view() -> CreateProperty {
    CreateProperty {
        name: "Hill View".into(),
        address: "12 Ridge Road".into(),
        rooms: Some(4),
    }
}

#[tokio::test]
async fn health_check_via_http() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    svc.health_check().await.unwrap();
}

#[tokio::test]
async fn health_check_unreachable_server() {
    let svc = HttpService::new("http://127.0.0.1:1");
    let err = svc.health_check().await.unwrap_err();
    assert!(matches!(err, ServiceError::Internal(_)));
}

#[tokio::test]
async fn property_crud_via_http() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);

    // Create
    let property = svc.create_property(&hill_view()).await.unwrap();
    assert_eq!(property.name, "Hill View");
    assert_eq!(property.rooms, Some(4));

    // Get
    let fetched = svc.get_property(&property.id).await.unwrap();
    assert_eq!(fetched.id, property.id);

    // List
    let all = svc.list_properties().await.unwrap();
    assert_eq!(all.len(), 1);

    // Update
    let updated = svc
        .update_property(
            &property.id,
            &UpdateProperty {
                name: Some("Hill View Cottage".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Hill View Cottage");
    assert_eq!(updated.address, "12 Ridge Road");

    // Delete
    svc.delete_property(&property.id).await.unwrap();
    assert!(svc.list_properties().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_property_is_not_found() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let err = svc.get_property("nope").await.unwrap_err();
    match err {
        ServiceError::NotFound(msg) => assert!(msg.contains("nope")),
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn blank_property_name_is_invalid_input() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let err = svc
        .create_property(&CreateProperty {
            name: " ".into(),
            address: String::new(),
            rooms: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn ledger_entries_and_monthly_stats() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let hill = svc.create_property(&hill_view()).await.unwrap();
    let lake = svc
        .create_property(&CreateProperty {
            name: "Lake Hut".into(),
            address: String::new(),
            rooms: None,
        })
        .await
        .unwrap();

    svc.create_booking(&CreateBooking {
        property_id: hill.id.clone(),
        guest_name: "Asha".into(),
        check_in: date(2026, 3, 2),
        check_out: date(2026, 3, 5),
        guests: Some(2),
        amount: 6000.0,
        channel: BookingChannel::Airbnb,
        attachment_id: None,
    })
    .await
    .unwrap();
    svc.create_earning(&CreateEarning {
        property_id: lake.id.clone(),
        amount: 2000.0,
        date: date(2026, 3, 10),
        description: "breakfast extras".into(),
        booking_id: None,
        attachment_id: None,
    })
    .await
    .unwrap();
    svc.create_expense(&CreateExpense {
        property_id: lake.id.clone(),
        amount: 500.0,
        date: date(2026, 3, 12),
        category: ExpenseCategory::Utilities,
        description: "electricity".into(),
        attachment_id: None,
    })
    .await
    .unwrap();
    // Outside the month, must not count.
    svc.create_expense(&CreateExpense {
        property_id: hill.id.clone(),
        amount: 900.0,
        date: date(2026, 4, 1),
        category: ExpenseCategory::Maintenance,
        description: String::new(),
        attachment_id: None,
    })
    .await
    .unwrap();

    assert_eq!(svc.list_bookings(Some(&hill.id)).await.unwrap().len(), 1);
    assert!(svc.list_bookings(Some(&lake.id)).await.unwrap().is_empty());
    assert_eq!(svc.list_earnings(None).await.unwrap().len(), 1);
    assert_eq!(svc.list_expenses(None).await.unwrap().len(), 2);

    let stats = svc.monthly_stats(3, 2026).await.unwrap();
    assert_eq!(stats.booking_count, 1);
    assert_eq!(stats.earnings.total_amount, 8000.0);
    assert_eq!(stats.expenses.total_amount, 500.0);
    assert_eq!(stats.net_profit(), 7500.0);
    assert_eq!(stats.earnings.by_property[0].percentage, 75.0);

    let summary = stats.summary();
    let lake_net = summary
        .properties
        .iter()
        .find(|p| p.property_id == lake.id)
        .unwrap();
    assert_eq!(lake_net.property_name, "Lake Hut");
    assert_eq!(lake_net.net, 1500.0);
}

#[tokio::test]
async fn invalid_booking_rejected_before_request() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let err = svc
        .create_booking(&CreateBooking {
            property_id: "p1".into(),
            guest_name: "Asha".into(),
            check_in: date(2026, 3, 5),
            check_out: date(2026, 3, 2),
            guests: None,
            amount: 100.0,
            channel: BookingChannel::Direct,
            attachment_id: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn property_filter_with_reserved_characters() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let odd_id = "hill&lake#1";
    svc.create_booking(&CreateBooking {
        property_id: odd_id.into(),
        guest_name: "Asha".into(),
        check_in: date(2026, 3, 2),
        check_out: date(2026, 3, 4),
        guests: None,
        amount: 300.0,
        channel: BookingChannel::Direct,
        attachment_id: None,
    })
    .await
    .unwrap();

    let bookings = svc.list_bookings(Some(odd_id)).await.unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].property_id, odd_id);
    assert!(svc.list_bookings(Some("hill")).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_ledger_entries() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let hill = svc.create_property(&hill_view()).await.unwrap();
    let expense = svc
        .create_expense(&CreateExpense {
            property_id: hill.id.clone(),
            amount: 250.0,
            date: date(2026, 2, 1),
            category: ExpenseCategory::Cleaning,
            description: String::new(),
            attachment_id: None,
        })
        .await
        .unwrap();

    svc.delete_expense(&expense.id).await.unwrap();
    assert!(svc.list_expenses(None).await.unwrap().is_empty());

    let err = svc.delete_expense(&expense.id).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn attachment_lifecycle_via_http() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let hill = svc.create_property(&hill_view()).await.unwrap();

    let file = UploadFile::new("bill.pdf", b"%PDF-1.4 test".to_vec());
    let reference = svc.upload_attachment(&hill.id, &file).await.unwrap();
    assert_eq!(reference.label, "bill.pdf");

    let listed = svc.list_attachments(&hill.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, reference.id);
    assert_eq!(listed[0].size_bytes, 13);
    assert_eq!(listed[0].content_type.as_deref(), Some("application/pdf"));

    let url = svc.attachment_download_url(&reference.id).await.unwrap();
    assert!(url.ends_with("/bill.pdf"));

    svc.delete_attachment(&reference.id).await.unwrap();
    assert!(svc.list_attachments(&hill.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn upload_to_unknown_property_fails() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let file = UploadFile::new("bill.pdf", b"x".to_vec());
    let err = svc.upload_attachment("missing", &file).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn scan_job_via_http() {
    let server = spawn_test_server().await;
    server.state.set_scan_script(ScanScript {
        polls_before_done: 1,
        output: json!({ "amount": 500 }),
        fail_with: None,
    });
    let svc = HttpService::new(&server.base_url);
    let hill = svc.create_property(&hill_view()).await.unwrap();
    let reference = svc
        .upload_attachment(&hill.id, &UploadFile::new("bill.pdf", b"pdf".to_vec()))
        .await
        .unwrap();

    let ticket = svc
        .start_scan(&StartScan {
            attachment_id: reference.id.clone(),
            module: ScanModule::Expense,
        })
        .await
        .unwrap();

    let first = svc.get_scan_status(&ticket.task_id).await.unwrap();
    assert_eq!(first.status, ScanStatus::Scanning);
    assert!(first.output.is_none());

    let second = svc.get_scan_status(&ticket.task_id).await.unwrap();
    assert_eq!(second.status, ScanStatus::Completed);
    assert_eq!(second.output, Some(json!({ "amount": 500 })));
    assert_eq!(server.state.status_polls(), 2);
}

#[tokio::test]
async fn scan_for_unknown_attachment_fails() {
    let server = spawn_test_server().await;
    let svc = HttpService::new(&server.base_url);
    let err = svc
        .start_scan(&StartScan {
            attachment_id: "ghost".into(),
            module: ScanModule::Booking,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn bearer_token_is_sent() {
    let server = spawn_test_server_with_auth("secret-token").await;
    let svc = HttpService::with_api_key(&server.base_url, "secret-token".into());
    svc.create_property(&hill_view()).await.unwrap();
    assert_eq!(svc.list_properties().await.unwrap().len(), 1);
}

#[tokio::test]
async fn unauthorized_fires_session_hook() {
    let server = spawn_test_server_with_auth("secret-token").await;
    let fired = Arc::new(AtomicU32::new(0));
    let counter = fired.clone();
    let svc = HttpService::with_api_key(&server.base_url, "stale-token".into()).on_session_expired(
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
    );

    let err = svc.list_properties().await.unwrap_err();
    assert!(matches!(err, ServiceError::Unauthorized(_)));
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // Health is public and never trips the hook.
    svc.health_check().await.unwrap();
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn not_found_does_not_fire_session_hook() {
    let server = spawn_test_server().await;
    let fired = Arc::new(AtomicU32::new(0));
    let counter = fired.clone();
    let svc = HttpService::new(&server.base_url).on_session_expired(Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));
    let _ = svc.get_property("missing").await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}
