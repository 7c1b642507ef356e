//! Preview phase tests
//!
//! Preview validates the full row set and records counts and structured
//! errors on the batch without touching any member.

mod helpers;

use helpers::{member_fixture, memory_pool, pipeline, seed_reference};
use sima_import::models::{BatchStatus, Severity};
use tempfile::TempDir;

#[tokio::test]
async fn preview_counts_always_reconcile() {
    let pool = memory_pool().await;
    seed_reference(&pool).await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&pool, &dir);

    // One valid row, one missing the required full_name
    let csv = "full_name,email\nBudi Santoso,budi@x.com\n,siti@x.com\n";
    let report = pipeline
        .preview("tester", Some(5), "anggota.csv", csv.as_bytes())
        .await
        .unwrap();

    assert_eq!(report.status, BatchStatus::Previewed);
    assert_eq!(report.total_rows, 2);
    assert_eq!(report.valid_rows, 1);
    assert_eq!(report.invalid_rows, 1);
    assert_eq!(report.valid_rows + report.invalid_rows, report.total_rows);

    // Preview must not create members
    let count = sima_import::db::members::count_members_in_unit(&pool, 5)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn first_duplicate_wins() {
    let pool = memory_pool().await;
    seed_reference(&pool).await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&pool, &dir);

    let csv = "full_name,email\nBudi,a@x.com\nSiti,a@x.com\n";
    let report = pipeline
        .preview("tester", Some(5), "anggota.csv", csv.as_bytes())
        .await
        .unwrap();

    assert_eq!(report.valid_rows, 1);
    assert_eq!(report.invalid_rows, 1);

    // Row 2 is clean; row 3 carries the duplicate error naming row 2
    assert!(report.errors.iter().all(|r| r.row_number != 2));
    let row3 = report
        .errors
        .iter()
        .find(|r| r.row_number == 3)
        .expect("row 3 should have errors");
    let dup = &row3.errors[0];
    assert_eq!(dup.field, "email");
    assert_eq!(dup.severity, Severity::Critical);
    assert!(dup.message.contains("row 2"));
}

#[tokio::test]
async fn unit_field_required_only_for_global_batches() {
    let pool = memory_pool().await;
    seed_reference(&pool).await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&pool, &dir);

    let csv = "full_name\nBudi Santoso\n";

    // Global batch: the row must name its own unit
    let report = pipeline
        .preview("tester", None, "global.csv", csv.as_bytes())
        .await
        .unwrap();
    assert_eq!(report.invalid_rows, 1);
    assert_eq!(report.errors[0].errors[0].field, "organization_unit_id");
    assert_eq!(report.errors[0].errors[0].severity, Severity::Critical);

    // Unit-scoped batch: the same row defaults to the batch's unit
    let report = pipeline
        .preview("tester", Some(5), "scoped.csv", csv.as_bytes())
        .await
        .unwrap();
    assert_eq!(report.valid_rows, 1);
    assert_eq!(report.invalid_rows, 0);
}

#[tokio::test]
async fn row_unit_disagreeing_with_batch_unit_is_rejected() {
    let pool = memory_pool().await;
    seed_reference(&pool).await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&pool, &dir);

    let csv = "full_name,organization_unit_id\nBudi Santoso,7\n";
    let report = pipeline
        .preview("tester", Some(5), "anggota.csv", csv.as_bytes())
        .await
        .unwrap();

    assert_eq!(report.invalid_rows, 1);
    let error = &report.errors[0].errors[0];
    assert_eq!(error.field, "organization_unit_id");
    assert_eq!(error.severity, Severity::Critical);
}

#[tokio::test]
async fn unknown_row_unit_is_rejected_in_global_batch() {
    let pool = memory_pool().await;
    seed_reference(&pool).await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&pool, &dir);

    let csv = "full_name,organization_unit_id\nBudi Santoso,999\n";
    let report = pipeline
        .preview("tester", None, "anggota.csv", csv.as_bytes())
        .await
        .unwrap();

    assert_eq!(report.invalid_rows, 1);
    assert!(report.errors[0].errors[0].message.contains("unknown"));
}

#[tokio::test]
async fn warnings_do_not_invalidate_a_row() {
    let pool = memory_pool().await;
    seed_reference(&pool).await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&pool, &dir);

    let csv = "full_name,email,phone\nBudi Santoso,not-an-email,08x1\n";
    let report = pipeline
        .preview("tester", Some(5), "anggota.csv", csv.as_bytes())
        .await
        .unwrap();

    assert_eq!(report.valid_rows, 1);
    assert_eq!(report.invalid_rows, 0);

    // Warnings are still recorded for display
    let row2 = &report.errors[0];
    assert_eq!(row2.row_number, 2);
    assert_eq!(row2.errors.len(), 2);
    assert!(row2.errors.iter().all(|e| e.severity == Severity::Warning));
}

#[tokio::test]
async fn cross_store_conflict_blocks_row_at_preview() {
    let pool = memory_pool().await;
    seed_reference(&pool).await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&pool, &dir);

    // nra already owned by unit 5
    let mut existing = member_fixture(5, "Pemilik Lama", "lama@x.com");
    existing.nra = Some("010-24-001".to_string());
    sima_import::db::members::insert_member(&pool, &existing)
        .await
        .unwrap();

    // A unit-7 batch tries the same nra
    let csv = "full_name,nra\nPenyusup,010-24-001\n";
    let report = pipeline
        .preview("tester", Some(7), "anggota.csv", csv.as_bytes())
        .await
        .unwrap();

    assert_eq!(report.invalid_rows, 1);
    let conflict = report.errors[0]
        .errors
        .iter()
        .find(|e| e.severity == Severity::Critical)
        .expect("tenant-isolation conflict expected");
    assert_eq!(conflict.field, "nra");
    assert!(conflict.message.contains("another organization unit"));
}

#[tokio::test]
async fn same_unit_existing_value_is_not_a_conflict() {
    let pool = memory_pool().await;
    seed_reference(&pool).await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&pool, &dir);

    let mut existing = member_fixture(5, "Pemilik", "pemilik@x.com");
    existing.nra = Some("010-24-001".to_string());
    sima_import::db::members::insert_member(&pool, &existing)
        .await
        .unwrap();

    // Same unit re-imports the same nra: that is the update path
    let csv = "full_name,nra\nPemilik Baru,010-24-001\n";
    let report = pipeline
        .preview("tester", Some(5), "anggota.csv", csv.as_bytes())
        .await
        .unwrap();

    assert_eq!(report.valid_rows, 1);
    assert_eq!(report.invalid_rows, 0);
}

#[tokio::test]
async fn union_position_code_must_match_a_reference_row() {
    let pool = memory_pool().await;
    seed_reference(&pool).await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&pool, &dir);

    // KETUA is seeded; BENDAHARA is not
    let csv = "full_name,union_position_code\nBudi Santoso,KETUA\nSiti Aminah,BENDAHARA\n";
    let report = pipeline
        .preview("tester", Some(5), "anggota.csv", csv.as_bytes())
        .await
        .unwrap();

    // An unrecognized position warns without invalidating the row
    assert_eq!(report.valid_rows, 2);
    assert_eq!(report.invalid_rows, 0);

    assert!(report.errors.iter().all(|r| r.row_number != 2));
    let row3 = report
        .errors
        .iter()
        .find(|r| r.row_number == 3)
        .expect("row 3 should carry the position warning");
    assert_eq!(row3.errors.len(), 1);
    assert_eq!(row3.errors[0].field, "union_position_code");
    assert_eq!(row3.errors[0].severity, Severity::Warning);
}

#[tokio::test]
async fn unparseable_upload_previews_to_zero_rows() {
    let pool = memory_pool().await;
    seed_reference(&pool).await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&pool, &dir);

    let report = pipeline
        .preview("tester", Some(5), "anggota.pdf", b"%PDF-1.4 not a spreadsheet")
        .await
        .unwrap();

    assert_eq!(report.status, BatchStatus::Previewed);
    assert_eq!(report.total_rows, 0);
    assert_eq!(report.valid_rows, 0);
    assert_eq!(report.invalid_rows, 0);
    assert!(report.errors.is_empty());
}

#[tokio::test]
async fn stored_error_rows_are_capped_at_one_hundred() {
    let pool = memory_pool().await;
    seed_reference(&pool).await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&pool, &dir);

    // 120 rows, all missing the required full_name
    let mut csv = String::from("full_name,email\n");
    for i in 0..120 {
        csv.push_str(&format!(",row{i}@x.com\n"));
    }
    let report = pipeline
        .preview("tester", Some(5), "anggota.csv", csv.as_bytes())
        .await
        .unwrap();

    // Aggregate counts stay exact beyond the cap
    assert_eq!(report.total_rows, 120);
    assert_eq!(report.invalid_rows, 120);
    assert_eq!(report.errors.len(), 100);
}

#[tokio::test]
async fn legacy_headers_are_normalized() {
    let pool = memory_pool().await;
    seed_reference(&pool).await;
    let dir = TempDir::new().unwrap();
    let pipeline = pipeline(&pool, &dir);

    // Legacy template headers, semicolon-delimited, with a BOM
    let csv = "\u{feff}nama_lengkap;alamat_email;jenis_kelamin\nBudi Santoso;budi@x.com;L\n";
    let report = pipeline
        .preview("tester", Some(5), "legacy.csv", csv.as_bytes())
        .await
        .unwrap();

    assert_eq!(report.total_rows, 1);
    assert_eq!(report.valid_rows, 1);
    assert!(report.errors.is_empty());
}
