use pipediff::{EntryRef, PipediffError, Snapshot, SnapshotLog};
use std::sync::Arc;

fn numbered(n: usize) -> Snapshot {
    Snapshot {
        shape: Some((n, 0)),
        ..Default::default()
    }
}

fn log_of(n: usize) -> SnapshotLog {
    let mut log = SnapshotLog::new();
    for i in 0..n {
        log.append(numbered(i), Some(&format!("k{}", i))).unwrap();
    }
    log
}

#[test]
fn test_positions_follow_insertion_order() {
    let n = 5;
    let log = log_of(n);

    for i in 0..n {
        let forward = log.get_by_position(i as isize).unwrap();
        let backward = log.get_by_position(i as isize - n as isize).unwrap();
        assert!(Arc::ptr_eq(forward, backward));
        assert_eq!(forward.shape, Some((i, 0)));
        assert!(Arc::ptr_eq(forward, log.get_by_key(&format!("k{}", i)).unwrap()));
    }
}

#[test]
fn test_duplicate_never_mutates() {
    let mut log = log_of(3);
    let before: Vec<String> = log.keys().map(str::to_string).collect();

    for key in ["k0", "k1", "k2"] {
        let result = log.append(numbered(99), Some(key));
        assert!(matches!(result, Err(PipediffError::DuplicateKey { .. })));
    }

    assert_eq!(log.keys().collect::<Vec<_>>(), before);
    assert_eq!(log.len(), 3);
    assert_eq!(log["k1"].shape, Some((1, 0)));
}

#[test]
fn test_slice_shares_records_and_keys() {
    let log = log_of(4);
    let tail = log.slice(-2..);

    assert_eq!(tail.keys().collect::<Vec<_>>(), vec!["k2", "k3"]);
    assert!(Arc::ptr_eq(tail.get_by_key("k3").unwrap(), log.get_by_key("k3").unwrap()));
    assert_eq!(tail[0].shape, Some((2, 0)));

    let everything = log.slice(..);
    assert_eq!(everything.len(), 4);
    assert!(log.slice(10..).is_empty());
}

#[test]
fn test_auto_keys_keep_counting_past_explicit_keys() {
    let mut log = SnapshotLog::new();
    assert_eq!(log.append(numbered(0), None).unwrap(), "entry_0");
    log.append(numbered(1), Some("manual")).unwrap();
    assert_eq!(log.append(numbered(2), None).unwrap(), "entry_2");
    assert_eq!(log.len(), 3);
}

#[test]
fn test_resolve_hybrid_refs() {
    let log = log_of(3);
    let (key, _) = log.resolve(&EntryRef::from(-1isize)).unwrap();
    assert_eq!(key, "k2");
    let (key, _) = log.resolve(&EntryRef::from("k0")).unwrap();
    assert_eq!(key, "k0");

    assert!(matches!(
        log.resolve(&EntryRef::from("missing")),
        Err(PipediffError::KeyNotFound { .. })
    ));
    assert!(matches!(
        log.resolve(&EntryRef::from(3isize)),
        Err(PipediffError::PositionOutOfRange { position: 3, len: 3 })
    ));
}

#[test]
fn test_reset_empties_log() {
    let mut log = log_of(2);
    log.reset();
    assert!(log.is_empty());
    assert!(log.get_by_position(0).is_err());
}
