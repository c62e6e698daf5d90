//! End-to-end runs of the CLI handlers against a file database.

use clap::Parser;
use lockbox_cli::{Cli, handler};
use lockbox_storage::models::CodeFilter;
use lockbox_storage::repositories::{AccessCodeRepository, SqliteAccessCodeRepository};
use lockbox_storage::{Database, DatabaseConfig};

async fn run(db_path: &str, args: &[&str]) -> anyhow::Result<()> {
    let mut argv = vec!["lockbox", "--database", db_path, "--format", "json"];
    argv.extend_from_slice(args);
    handler::run(Cli::try_parse_from(argv)?).await
}

#[tokio::test]
async fn test_lock_and_code_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cli.db");
    let db_path = path.to_str().unwrap();

    run(db_path, &["migrate"]).await.unwrap();
    run(
        db_path,
        &[
            "add-lock", "--property", "5", "--provider", "mock", "--device", "demo-door", "--name",
            "Demo door",
        ],
    )
    .await
    .unwrap();
    run(db_path, &["issue", "--lock", "1", "--hours", "24", "--booking", "12"])
        .await
        .unwrap();
    run(db_path, &["unlock", "--lock", "1"]).await.unwrap();
    run(db_path, &["codes", "--lock", "1"]).await.unwrap();
    run(db_path, &["activity", "--lock", "1", "--limit", "10"])
        .await
        .unwrap();
    run(db_path, &["revoke", "--booking", "12"]).await.unwrap();
    run(db_path, &["sweep"]).await.unwrap();

    let db = Database::new(DatabaseConfig::new(db_path)).await.unwrap();
    let codes = SqliteAccessCodeRepository::new(db.pool().clone())
        .find_by_lock(1, &CodeFilter::default())
        .await
        .unwrap();
    assert_eq!(codes.len(), 1);
    assert_eq!(codes[0].status, lockbox_core::CodeStatus::Revoked);
    db.close().await;
}

#[tokio::test]
async fn test_unknown_lock_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cli.db");

    let result = run(path.to_str().unwrap(), &["sync", "--lock", "404"]).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_invalid_settings_json_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cli.db");

    let result = run(
        path.to_str().unwrap(),
        &[
            "add-lock", "--property", "5", "--provider", "generic", "--device", "g-1", "--name",
            "Garage", "--settings", "{not json",
        ],
    )
    .await;
    assert!(result.is_err());
}
