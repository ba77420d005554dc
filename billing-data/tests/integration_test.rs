//! Integration tests for roster loading against the SQLite backend.

use billing_core::calculations::InvoiceAggregator;
use billing_core::{BillingRepository, NewContact};
use billing_data::{RosterLoader, RosterLoaderError};
use billing_db_sqlite::SqliteRepository;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use sqlx::sqlite::SqlitePoolOptions;

const TEST_CSV: &str = include_str!("test-data/roster_july_2025.csv");

/// Sets up a migrated in-memory database with the two contacts the
/// roster references.
async fn setup_test_db() -> SqliteRepository {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    let repo = SqliteRepository::new_with_pool(pool);
    repo.run_migrations()
        .await
        .expect("Failed to run migrations");

    for name in ["Alex Participant", "Sam Participant"] {
        repo.create_contact(NewContact {
            name: name.to_string(),
            ndis_number: None,
        })
        .await
        .expect("Failed to create contact");
    }

    repo
}

#[tokio::test]
async fn load_the_full_roster() {
    let repo = setup_test_db().await;

    let records = RosterLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    let inserted = RosterLoader::load(&repo, &records)
        .await
        .expect("Failed to load roster");

    assert_eq!(records.len(), 8);
    assert_eq!(inserted, 8);
}

#[tokio::test]
async fn loaded_shifts_are_billable_where_completed() {
    let repo = setup_test_db().await;
    let records = RosterLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    RosterLoader::load(&repo, &records)
        .await
        .expect("Failed to load roster");

    let billable = repo
        .list_billable_shifts(1)
        .await
        .expect("Failed to list billable shifts");

    // Contact 1 has three completed, priced shifts; the cancelled and
    // scheduled ones stay out.
    assert_eq!(billable.len(), 3);
    let total: rust_decimal::Decimal = billable
        .iter()
        .filter_map(|shift| shift.total_incl_gst)
        .sum();
    assert_eq!(total, dec!(672.50));
}

#[tokio::test]
async fn loaded_roster_feeds_straight_into_invoicing() {
    let repo = setup_test_db().await;
    let records = RosterLoader::parse(TEST_CSV.as_bytes()).expect("Failed to parse CSV");
    RosterLoader::load(&repo, &records)
        .await
        .expect("Failed to load roster");

    let shifts = repo
        .list_billable_shifts(2)
        .await
        .expect("Failed to list billable shifts");
    let shift_ids: Vec<i64> = shifts.iter().map(|shift| shift.id).collect();

    let draft = InvoiceAggregator::new(&shifts, &[])
        .draft(
            2,
            NaiveDate::from_ymd_opt(2025, 7, 31).unwrap(),
            NaiveDate::from_ymd_opt(2025, 8, 14).unwrap(),
            &shift_ids,
            &[],
        )
        .expect("Failed to draft invoice");
    let invoice = repo
        .create_invoice(draft)
        .await
        .expect("Failed to create invoice");

    assert_eq!(invoice.lines.len(), 2);
    assert_eq!(invoice.total_incl_gst(), dec!(480.00));
}

#[tokio::test]
async fn load_fails_for_an_unknown_contact() {
    let repo = setup_test_db().await;
    let csv = "contact_id,start_time,end_time,status,total_incl_gst,description\n\
               99,2025-07-01T23:00:00Z,2025-07-02T02:00:00Z,completed,180.00,Ghost shift";
    let records = RosterLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

    let result = RosterLoader::load(&repo, &records).await;

    assert!(matches!(result, Err(RosterLoaderError::ContactNotFound(99))));
}

#[tokio::test]
async fn load_fails_for_an_unknown_status() {
    let repo = setup_test_db().await;
    let csv = "contact_id,start_time,end_time,status,total_incl_gst,description\n\
               1,2025-07-01T23:00:00Z,2025-07-02T02:00:00Z,on leave,,";
    let records = RosterLoader::parse(csv.as_bytes()).expect("Failed to parse CSV");

    let result = RosterLoader::load(&repo, &records).await;

    assert!(
        matches!(result, Err(RosterLoaderError::InvalidStatus(raw)) if raw == "on leave")
    );
}
