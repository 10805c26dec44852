use budgetsync_core::{
    DeleteMode, EncryptionKey, FileRecord, FileRepository, Lifecycle, NewFile, RepoError,
    SharedConnection, SqliteFileRepository,
};

fn new_test_repo() -> SqliteFileRepository {
    let conn = SharedConnection::open_in_memory().unwrap();
    SqliteFileRepository::try_new(conn).unwrap()
}

fn add_confirmed(repo: &SqliteFileRepository, n: u64, meta: &str) {
    let id = n.to_string();
    repo.add(&NewFile::new(
        id.as_str(),
        format!("g{n}"),
        n,
        meta,
        format!("Budget{n}"),
    ))
    .unwrap();
    repo.update_encryption(
        &id,
        &EncryptionKey::new(format!("salt{n}"), format!("keyid{n}"), format!("test{n}")),
    )
    .unwrap();
}

fn seed_three(repo: &SqliteFileRepository) {
    add_confirmed(repo, 1, "A1B2C3");
    add_confirmed(repo, 2, "B1F2G3");
    add_confirmed(repo, 3, "B4F7G9");
}

fn confirmed_record(
    id: &str,
    group_id: &str,
    sync_version: u64,
    meta: &str,
    key: (&str, &str, &str),
    lifecycle: Lifecycle,
    name: &str,
) -> FileRecord {
    FileRecord {
        file_id: id.to_string(),
        group_id: group_id.to_string(),
        sync_version,
        encrypt_meta: meta.to_string(),
        encryption: Some(EncryptionKey::new(key.0, key.1, key.2)),
        name: name.to_string(),
        lifecycle,
    }
}

fn budget1(repo: &SqliteFileRepository) {
    repo.add(&NewFile::new("1", "g1", 1, "A1B2C3", "Budget1"))
        .unwrap();
    repo.update_encryption("1", &EncryptionKey::new("salt1", "keyid1", "test1"))
        .unwrap();
}

#[test]
fn count_given_no_rows_is_zero() {
    let repo = new_test_repo();
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn count_given_two_rows() {
    let repo = new_test_repo();
    repo.add(&NewFile::new("f1", "g1", 2, "meta", "budget"))
        .unwrap();
    repo.add(&NewFile::new("f2", "g2", 2, "meta2", "budget2"))
        .unwrap();

    assert_eq!(repo.count().unwrap(), 2);
}

#[test]
fn count_includes_tombstoned_and_matches_all_len() {
    let repo = new_test_repo();
    seed_three(&repo);
    repo.delete("2").unwrap();

    assert_eq!(repo.count().unwrap(), 3);
    assert_eq!(repo.all().unwrap().len(), 3);
}

#[test]
fn add_then_for_id_returns_live_record_without_key() {
    let repo = new_test_repo();
    let new_file = NewFile::new("1", "g1", 1, "A1B2C3", "Budget1");
    repo.add(&new_file).unwrap();

    let loaded = repo.for_id("1").unwrap();
    assert_eq!(loaded, FileRecord::from(new_file));
    assert_eq!(loaded.lifecycle, Lifecycle::Live);
    assert!(loaded.encryption.is_none());
}

#[test]
fn add_then_confirm_key_returns_exact_record() {
    let repo = new_test_repo();
    budget1(&repo);

    assert_eq!(
        repo.for_id("1").unwrap(),
        confirmed_record(
            "1",
            "g1",
            1,
            "A1B2C3",
            ("salt1", "keyid1", "test1"),
            Lifecycle::Live,
            "Budget1"
        )
    );
}

#[test]
fn add_duplicate_id_is_storage_error() {
    let repo = new_test_repo();
    repo.add(&NewFile::new("1", "g1", 1, "A1B2C3", "Budget1"))
        .unwrap();

    let err = repo
        .add(&NewFile::new("1", "g2", 5, "other", "Other"))
        .unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
    assert!(err.is_duplicate_key());
    assert_eq!(repo.count().unwrap(), 1);
    assert_eq!(repo.for_id("1").unwrap().name, "Budget1");
}

#[test]
fn add_blank_id_is_validation_error() {
    let repo = new_test_repo();
    let err = repo
        .add(&NewFile::new("", "g1", 1, "A1B2C3", "Budget1"))
        .unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn for_id_given_no_rows_is_record_not_found() {
    let repo = new_test_repo();
    let err = repo.for_id("1").unwrap_err();
    assert!(matches!(err, RepoError::RecordNotFound(id) if id == "1"));
}

#[test]
fn for_id_given_three_rows_returns_second() {
    let repo = new_test_repo();
    seed_three(&repo);

    assert_eq!(
        repo.for_id("2").unwrap(),
        confirmed_record(
            "2",
            "g2",
            2,
            "B1F2G3",
            ("salt2", "keyid2", "test2"),
            Lifecycle::Live,
            "Budget2"
        )
    );
}

#[test]
fn for_id_and_delete_given_no_rows_is_record_not_found() {
    let repo = new_test_repo();
    let err = repo.for_id_and_delete("1", DeleteMode::Soft).unwrap_err();
    assert!(matches!(err, RepoError::RecordNotFound(_)));

    let err = repo.for_id_and_delete("1", DeleteMode::Hard).unwrap_err();
    assert!(matches!(err, RepoError::RecordNotFound(_)));
}

#[test]
fn for_id_and_delete_soft_returns_snapshot_and_tombstones() {
    let repo = new_test_repo();
    seed_three(&repo);

    let snapshot = repo.for_id_and_delete("2", DeleteMode::Soft).unwrap();
    assert_eq!(
        snapshot,
        confirmed_record(
            "2",
            "g2",
            2,
            "B1F2G3",
            ("salt2", "keyid2", "test2"),
            Lifecycle::Live,
            "Budget2"
        )
    );

    let after = repo.for_id("2").unwrap();
    assert_eq!(after.lifecycle, Lifecycle::Tombstoned);
    assert_eq!(repo.count().unwrap(), 3);

    let second = repo.for_id_and_delete("2", DeleteMode::Soft).unwrap();
    assert!(second.is_deleted());
}

#[test]
fn for_id_and_delete_hard_purges_row() {
    let repo = new_test_repo();
    seed_three(&repo);

    let snapshot = repo.for_id_and_delete("2", DeleteMode::Hard).unwrap();
    assert_eq!(snapshot.file_id, "2");
    assert_eq!(snapshot.lifecycle, Lifecycle::Live);

    assert!(matches!(
        repo.for_id("2").unwrap_err(),
        RepoError::RecordNotFound(_)
    ));
    assert_eq!(repo.count().unwrap(), 2);
    let ids: Vec<_> = repo
        .all()
        .unwrap()
        .into_iter()
        .map(|file| file.file_id)
        .collect();
    assert_eq!(ids, vec!["1", "3"]);

    let again = repo.for_id_and_delete("2", DeleteMode::Hard).unwrap_err();
    assert!(matches!(again, RepoError::RecordNotFound(_)));
}

#[test]
fn for_id_and_delete_hard_on_tombstone_returns_tombstoned_snapshot() {
    let repo = new_test_repo();
    budget1(&repo);
    repo.delete("1").unwrap();

    let snapshot = repo.for_id_and_delete("1", DeleteMode::Hard).unwrap();
    assert!(snapshot.is_deleted());
    assert_eq!(repo.count().unwrap(), 0);
}

#[test]
fn all_given_no_rows_is_empty() {
    let repo = new_test_repo();
    assert!(repo.all().unwrap().is_empty());
}

#[test]
fn all_given_three_rows_returns_insertion_order() {
    let repo = new_test_repo();
    seed_three(&repo);

    let files = repo.all().unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(
        files[0],
        confirmed_record(
            "1",
            "g1",
            1,
            "A1B2C3",
            ("salt1", "keyid1", "test1"),
            Lifecycle::Live,
            "Budget1"
        )
    );
    assert_eq!(
        files[1],
        confirmed_record(
            "2",
            "g2",
            2,
            "B1F2G3",
            ("salt2", "keyid2", "test2"),
            Lifecycle::Live,
            "Budget2"
        )
    );
    assert_eq!(
        files[2],
        confirmed_record(
            "3",
            "g3",
            3,
            "B4F7G9",
            ("salt3", "keyid3", "test3"),
            Lifecycle::Live,
            "Budget3"
        )
    );
}

#[test]
fn all_orders_by_insertion_not_by_id() {
    let repo = new_test_repo();
    for id in ["zeta", "alpha", "mid"] {
        repo.add(&NewFile::new(id, "", 0, "meta", id)).unwrap();
    }

    let ids: Vec<_> = repo
        .all()
        .unwrap()
        .into_iter()
        .map(|file| file.file_id)
        .collect();
    assert_eq!(ids, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn all_includes_tombstoned_records() {
    let repo = new_test_repo();
    seed_three(&repo);
    repo.delete("1").unwrap();

    let files = repo.all().unwrap();
    assert_eq!(files.len(), 3);
    assert!(files[0].is_deleted());
    assert!(!files[1].is_deleted());
}

#[test]
fn update_given_no_row_is_no_record_updated() {
    let repo = new_test_repo();
    let err = repo.update("1", 1, "A1B2C3", "Budget1").unwrap_err();
    assert!(matches!(err, RepoError::NoRecordUpdated(id) if id == "1"));
}

#[test]
fn update_changes_only_content_fields() {
    let repo = new_test_repo();
    budget1(&repo);

    repo.update("1", 2, "X9Y6Z7", "Budget1").unwrap();

    assert_eq!(
        repo.for_id("1").unwrap(),
        confirmed_record(
            "1",
            "g1",
            2,
            "X9Y6Z7",
            ("salt1", "keyid1", "test1"),
            Lifecycle::Live,
            "Budget1"
        )
    );
}

#[test]
fn update_keeps_tombstone() {
    let repo = new_test_repo();
    budget1(&repo);
    repo.delete("1").unwrap();

    repo.update("1", 3, "M", "Renamed").unwrap();

    let loaded = repo.for_id("1").unwrap();
    assert!(loaded.is_deleted());
    assert_eq!(loaded.sync_version, 3);
}

#[test]
fn sync_version_beyond_u32_range_round_trips() {
    let repo = new_test_repo();
    let created = u64::from(u32::MAX) + 10;
    repo.add(&NewFile::new("1", "g1", created, "A1B2C3", "Budget1"))
        .unwrap();
    assert_eq!(repo.for_id("1").unwrap().sync_version, created);

    let bumped = i64::MAX as u64;
    repo.update("1", bumped, "A1B2C3", "Budget1").unwrap();
    assert_eq!(repo.for_id("1").unwrap().sync_version, bumped);
}

#[test]
fn sync_version_beyond_sqlite_integer_is_rejected() {
    let repo = new_test_repo();
    budget1(&repo);

    let err = repo
        .update("1", i64::MAX as u64 + 1, "A1B2C3", "Budget1")
        .unwrap_err();
    assert!(matches!(err, RepoError::Db(_)));
    assert_eq!(repo.for_id("1").unwrap().sync_version, 1);
}

#[test]
fn clear_group_given_no_row_is_no_record_updated() {
    let repo = new_test_repo();
    let err = repo.clear_group("1").unwrap_err();
    assert!(matches!(err, RepoError::NoRecordUpdated(_)));
}

#[test]
fn clear_group_resets_group_only() {
    let repo = new_test_repo();
    budget1(&repo);

    repo.clear_group("1").unwrap();

    let loaded = repo.for_id("1").unwrap();
    assert_eq!(
        loaded,
        confirmed_record(
            "1",
            "",
            1,
            "A1B2C3",
            ("salt1", "keyid1", "test1"),
            Lifecycle::Live,
            "Budget1"
        )
    );
    assert_eq!(loaded.group(), None);
}

#[test]
fn delete_given_no_row_is_no_record_updated() {
    let repo = new_test_repo();
    let err = repo.delete("1").unwrap_err();
    assert!(matches!(err, RepoError::NoRecordUpdated(_)));
}

#[test]
fn delete_tombstones_and_record_stays_resolvable() {
    let repo = new_test_repo();
    budget1(&repo);

    repo.delete("1").unwrap();

    assert_eq!(
        repo.for_id("1").unwrap(),
        confirmed_record(
            "1",
            "g1",
            1,
            "A1B2C3",
            ("salt1", "keyid1", "test1"),
            Lifecycle::Tombstoned,
            "Budget1"
        )
    );
}

#[test]
fn update_name_given_no_row_is_no_record_updated() {
    let repo = new_test_repo();
    let err = repo.update_name("1", "My budget").unwrap_err();
    assert!(matches!(err, RepoError::NoRecordUpdated(_)));
}

#[test]
fn update_name_changes_name_only() {
    let repo = new_test_repo();
    budget1(&repo);

    repo.update_name("1", "My budget").unwrap();

    assert_eq!(
        repo.for_id("1").unwrap(),
        confirmed_record(
            "1",
            "g1",
            1,
            "A1B2C3",
            ("salt1", "keyid1", "test1"),
            Lifecycle::Live,
            "My budget"
        )
    );
}

#[test]
fn update_group_given_no_row_is_no_record_updated() {
    let repo = new_test_repo();
    let err = repo.update_group("1", "gnew").unwrap_err();
    assert!(matches!(err, RepoError::NoRecordUpdated(_)));
}

#[test]
fn update_group_changes_group_only() {
    let repo = new_test_repo();
    budget1(&repo);

    repo.update_group("1", "gnew").unwrap();

    assert_eq!(
        repo.for_id("1").unwrap(),
        confirmed_record(
            "1",
            "gnew",
            1,
            "A1B2C3",
            ("salt1", "keyid1", "test1"),
            Lifecycle::Live,
            "Budget1"
        )
    );
}

#[test]
fn update_encryption_given_no_row_is_no_record_updated() {
    let repo = new_test_repo();
    let err = repo
        .update_encryption("1", &EncryptionKey::new("saltNew", "keyidNew", "testNew"))
        .unwrap_err();
    assert!(matches!(err, RepoError::NoRecordUpdated(_)));
}

#[test]
fn update_encryption_rotates_all_three_fields() {
    let repo = new_test_repo();
    budget1(&repo);

    repo.update_encryption("1", &EncryptionKey::new("saltNew", "keyidNew", "testNew"))
        .unwrap();

    assert_eq!(
        repo.for_id("1").unwrap(),
        confirmed_record(
            "1",
            "g1",
            1,
            "A1B2C3",
            ("saltNew", "keyidNew", "testNew"),
            Lifecycle::Live,
            "Budget1"
        )
    );
}

#[test]
fn mutators_on_unknown_id_never_report_record_not_found() {
    let repo = new_test_repo();
    let key = EncryptionKey::new("s", "k", "t");
    let results = [
        repo.update("x", 1, "m", "n"),
        repo.update_name("x", "n"),
        repo.update_group("x", "g"),
        repo.clear_group("x"),
        repo.update_encryption("x", &key),
        repo.delete("x"),
    ];

    for result in results {
        assert!(matches!(result, Err(RepoError::NoRecordUpdated(_))));
    }
}

#[test]
fn partially_set_key_in_storage_is_invalid_data() {
    let conn = SharedConnection::open_in_memory().unwrap();
    let repo = SqliteFileRepository::try_new(conn.clone()).unwrap();
    budget1(&repo);

    {
        let raw = conn.lock().unwrap();
        raw.execute_batch("PRAGMA ignore_check_constraints = ON;")
            .unwrap();
        raw.execute("UPDATE files SET encrypt_test = NULL WHERE id = '1';", [])
            .unwrap();
    }

    let err = repo.for_id("1").unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn schema_rejects_partially_set_key() {
    let conn = SharedConnection::open_in_memory().unwrap();
    let repo = SqliteFileRepository::try_new(conn.clone()).unwrap();
    budget1(&repo);

    let raw = conn.lock().unwrap();
    let result = raw.execute("UPDATE files SET encrypt_salt = NULL WHERE id = '1';", []);
    assert!(result.is_err());
}
