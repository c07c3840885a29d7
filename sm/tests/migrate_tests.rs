//! End-to-end migrations between the filesystem and SQLite backends

mod common;

use std::sync::Arc;

use common::{Answers, populated, read, seed};
use statemigrate::lock::DESTINATION_LOCK_OPERATION;
use statemigrate::messages;
use statemigrate::{
    CopyOutcome, LockFailure, LockSettings, MigrateError, MigrationOptions, StateMigrator, Strategy,
};
use statestore::{
    Backend, BackendSettings, DEFAULT_WORKSPACE, FsBackend, LockInfo, SnapshotMeta, SqliteBackend, StateFile,
    StoreError, WorkspaceNaming,
};
use tempfile::TempDir;

fn fs_backend(temp: &TempDir, name: &str, settings: BackendSettings) -> FsBackend {
    FsBackend::open(temp.path().join(name), settings).expect("open fs backend")
}

fn sqlite_backend(temp: &TempDir, name: &str, settings: BackendSettings) -> SqliteBackend {
    SqliteBackend::open(temp.path().join(name), settings).expect("open sqlite backend")
}

// =============================================================================
// Single-state copies
// =============================================================================

#[tokio::test]
async fn test_fs_to_sqlite_copy_into_empty() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let source = fs_backend(&temp, "old", BackendSettings::single());
    let destination = sqlite_backend(&temp, "new.db", BackendSettings::single());
    seed(&source, DEFAULT_WORKSPACE, populated("1")).await;

    let ui = Arc::new(Answers::new(&["yes"]));
    let mut opts = MigrationOptions::new(Arc::new(source.clone()), Arc::new(destination.clone()));
    let mut selected = DEFAULT_WORKSPACE.to_string();
    let report = StateMigrator::new(ui.clone())
        .migrate(&mut opts, &mut selected)
        .await
        .expect("migration succeeds");

    assert_eq!(report.strategy, Strategy::DirectCopy);
    assert_eq!(report.outcomes[0].outcome, CopyOutcome::Copied);
    assert_eq!(ui.asked()[0].id, messages::ID_COPY_TO_EMPTY);

    let (src_state, src_meta) = read(&source, DEFAULT_WORKSPACE).await;
    let (dst_state, dst_meta) = read(&destination, DEFAULT_WORKSPACE).await;
    assert_eq!(dst_state, src_state);
    assert_eq!(dst_meta, src_meta);
}

#[tokio::test]
async fn test_overwrite_prompt_points_at_exported_files() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let source = fs_backend(&temp, "old", BackendSettings::single());
    let destination = sqlite_backend(&temp, "new.db", BackendSettings::single());
    seed(&source, DEFAULT_WORKSPACE, populated("new")).await;
    seed(&destination, DEFAULT_WORKSPACE, populated("old")).await;

    let ui = Arc::new(Answers::new(&["yes"]));
    let mut opts = MigrationOptions::new(Arc::new(source.clone()), Arc::new(destination.clone()));
    let mut selected = DEFAULT_WORKSPACE.to_string();
    StateMigrator::new(ui.clone())
        .migrate(&mut opts, &mut selected)
        .await
        .expect("migration succeeds");

    let asked = ui.asked();
    assert_eq!(asked.len(), 1);
    assert_eq!(asked[0].id, messages::ID_TO_BACKEND);
    assert!(asked[0].description.contains("1-local.json"));
    assert!(asked[0].description.contains("2-sqlite.json"));

    let (dst_state, dst_meta) = read(&destination, DEFAULT_WORKSPACE).await;
    let (_, src_meta) = read(&source, DEFAULT_WORKSPACE).await;
    assert_eq!(dst_state, Some(populated("new")));
    assert_eq!(dst_meta.map(|m| m.lineage), src_meta.map(|m| m.lineage));
}

#[tokio::test]
async fn test_declined_overwrite_leaves_destination() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let source = fs_backend(&temp, "old", BackendSettings::single());
    let destination = fs_backend(&temp, "new", BackendSettings::single());
    seed(&source, DEFAULT_WORKSPACE, populated("new")).await;
    seed(&destination, DEFAULT_WORKSPACE, populated("old")).await;
    let before = read(&destination, DEFAULT_WORKSPACE).await;

    let mut opts = MigrationOptions::new(Arc::new(source), Arc::new(destination.clone()));
    let mut selected = DEFAULT_WORKSPACE.to_string();
    let report = StateMigrator::new(Arc::new(Answers::new(&["no"])))
        .migrate(&mut opts, &mut selected)
        .await
        .expect("declining is not an error");

    assert_eq!(report.outcomes[0].outcome, CopyOutcome::Declined);
    assert_eq!(read(&destination, DEFAULT_WORKSPACE).await, before);
}

#[tokio::test]
async fn test_serial_sqlite_cannot_store_is_copy_error() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let source = fs_backend(&temp, "old", BackendSettings::single());
    let destination = sqlite_backend(&temp, "new.db", BackendSettings::single());
    let serial = i64::MAX as u64 + 5;
    {
        let mut manager = source.state_manager(DEFAULT_WORKSPACE).await.expect("open");
        let file = StateFile::new(
            populated("1"),
            SnapshotMeta {
                lineage: "big".to_string(),
                serial,
            },
        );
        manager.write_state_for_migration(file, true).expect("stage");
        manager.persist_state().await.expect("persist");
    }

    let mut opts = MigrationOptions::new(Arc::new(source.clone()), Arc::new(destination.clone())).force(true);
    let mut selected = DEFAULT_WORKSPACE.to_string();
    let err = StateMigrator::new(Arc::new(Answers::default()))
        .migrate(&mut opts, &mut selected)
        .await
        .expect_err("serial does not fit");

    match err {
        MigrateError::Copy { source, .. } => assert!(matches!(source, StoreError::SerialOutOfRange(_))),
        other => panic!("expected Copy error, got {other:?}"),
    }
    assert_eq!(read(&destination, DEFAULT_WORKSPACE).await, (None, None));
    assert_eq!(read(&source, DEFAULT_WORKSPACE).await.1.map(|m| m.serial), Some(serial));
}

// =============================================================================
// Multi-workspace migrations
// =============================================================================

#[tokio::test]
async fn test_fs_to_sqlite_bulk_copy() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let source = fs_backend(&temp, "old", BackendSettings::default());
    let destination = sqlite_backend(&temp, "new.db", BackendSettings::default());
    for name in [DEFAULT_WORKSPACE, "b", "a"] {
        seed(&source, name, populated(name)).await;
    }
    let source_before = read(&source, "a").await;

    let mut opts = MigrationOptions::new(Arc::new(source.clone()), Arc::new(destination.clone())).force(true);
    let mut selected = "b".to_string();
    let report = StateMigrator::new(Arc::new(Answers::default()))
        .migrate(&mut opts, &mut selected)
        .await
        .expect("migration succeeds");

    assert_eq!(report.strategy, Strategy::MultiToMulti);
    let order: Vec<_> = report.outcomes.iter().map(|o| o.source.as_str()).collect();
    assert_eq!(order, vec!["a", "b", DEFAULT_WORKSPACE]);
    assert_eq!(report.copied(), 3);
    assert_eq!(selected, "b");

    assert_eq!(
        destination.workspaces().await.expect("list"),
        vec!["a".to_string(), "b".to_string(), DEFAULT_WORKSPACE.to_string()]
    );
    for name in [DEFAULT_WORKSPACE, "a", "b"] {
        assert_eq!(read(&destination, name).await, read(&source, name).await);
    }
    assert_eq!(read(&source, "a").await, source_before);
}

#[tokio::test]
async fn test_sqlite_to_unique_fs_renames() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let source = sqlite_backend(&temp, "old.db", BackendSettings::default());
    let destination = fs_backend(
        &temp,
        "new",
        BackendSettings {
            naming: WorkspaceNaming::GloballyUnique,
            default_workspace: false,
            ..Default::default()
        },
    );
    seed(&source, "a", populated("a")).await;
    seed(&source, "b", populated("b")).await;

    let ui = Arc::new(Answers::new(&["1", "app-*"]));
    let mut opts = MigrationOptions::new(Arc::new(source), Arc::new(destination.clone()));
    let mut selected = "a".to_string();
    let report = StateMigrator::new(ui.clone())
        .migrate(&mut opts, &mut selected)
        .await
        .expect("migration succeeds");

    assert_eq!(report.strategy, Strategy::MultiToMultiRenamed);
    assert_eq!(selected, "app-a");
    assert_eq!(
        destination.workspaces().await.expect("list"),
        vec!["app-a".to_string(), "app-b".to_string()]
    );
    assert_eq!(read(&destination, "app-b").await.0, Some(populated("b")));
    assert!(ui.shown().iter().any(|s| s.contains("* app-a")));
}

#[tokio::test]
async fn test_multi_to_single_copies_selected() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let source = sqlite_backend(&temp, "old.db", BackendSettings::default());
    let destination = fs_backend(&temp, "new", BackendSettings::single());
    seed(&source, "a", populated("a")).await;
    seed(&source, "b", populated("b")).await;

    let mut opts = MigrationOptions::new(Arc::new(source), Arc::new(destination.clone()));
    let mut selected = "b".to_string();
    let report = StateMigrator::new(Arc::new(Answers::new(&["yes", "yes"])))
        .migrate(&mut opts, &mut selected)
        .await
        .expect("migration succeeds");

    assert_eq!(report.strategy, Strategy::MultiToSingle);
    assert_eq!(read(&destination, DEFAULT_WORKSPACE).await.0, Some(populated("b")));
    assert_eq!(selected, DEFAULT_WORKSPACE);
}

// =============================================================================
// Locking
// =============================================================================

#[tokio::test]
async fn test_held_destination_lock_times_out_and_releases_source() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let source = fs_backend(&temp, "old", BackendSettings::single());
    let destination = sqlite_backend(&temp, "new.db", BackendSettings::single());
    seed(&source, DEFAULT_WORKSPACE, populated("1")).await;

    let mut holder = destination.state_manager(DEFAULT_WORKSPACE).await.expect("open");
    let held_id = holder
        .locker()
        .expect("sqlite supports locking")
        .lock(&LockInfo::new("someone else"))
        .await
        .expect("lock");

    let mut opts = MigrationOptions::new(Arc::new(source.clone()), Arc::new(destination.clone())).force(true);
    let mut selected = DEFAULT_WORKSPACE.to_string();
    let err = StateMigrator::new(Arc::new(Answers::default()))
        .with_locks(LockSettings::default())
        .migrate(&mut opts, &mut selected)
        .await
        .expect_err("destination is locked");

    match err {
        MigrateError::Lock { operation, source } => {
            assert_eq!(operation, DESTINATION_LOCK_OPERATION);
            match source {
                LockFailure::Timeout(info) => assert_eq!(info.id, held_id),
                other => panic!("expected timeout, got {other:?}"),
            }
        }
        other => panic!("expected Lock error, got {other:?}"),
    }
    assert_eq!(read(&destination, DEFAULT_WORKSPACE).await.0, None);

    // The source lock was released
    let mut source_manager = source.state_manager(DEFAULT_WORKSPACE).await.expect("open");
    let locker = source_manager.locker().expect("fs supports locking");
    let id = locker.lock(&LockInfo::new("check")).await.expect("source lock is free");
    locker.unlock(&id).await.expect("unlock");

    holder
        .locker()
        .expect("sqlite supports locking")
        .unlock(&held_id)
        .await
        .expect("unlock");
}

#[tokio::test]
async fn test_disabled_locks_ignore_held_lock() {
    let temp = TempDir::new().expect("Failed to create temp dir");
    let source = fs_backend(&temp, "old", BackendSettings::single());
    let destination = sqlite_backend(&temp, "new.db", BackendSettings::single());
    seed(&source, DEFAULT_WORKSPACE, populated("1")).await;

    let mut holder = destination.state_manager(DEFAULT_WORKSPACE).await.expect("open");
    holder
        .locker()
        .expect("sqlite supports locking")
        .lock(&LockInfo::new("someone else"))
        .await
        .expect("lock");

    let mut opts = MigrationOptions::new(Arc::new(source), Arc::new(destination.clone())).force(true);
    let mut selected = DEFAULT_WORKSPACE.to_string();
    StateMigrator::new(Arc::new(Answers::default()))
        .with_locks(LockSettings {
            enabled: false,
            ..Default::default()
        })
        .migrate(&mut opts, &mut selected)
        .await
        .expect("migration succeeds without locking");

    assert_eq!(read(&destination, DEFAULT_WORKSPACE).await.0, Some(populated("1")));
}
