use super::*;

#[test]
fn test_basic_set_get() {
    let mut store = Store::new();
    assert!(matches!(store.set("tirth", b"great"), Outcome::Ok));
    assert_eq!(store.get("tirth"), Some(b"great".to_vec()));
    assert_eq!(store.get("none"), None);
}

#[test]
fn test_snapshot_then_edit_preserves_history() {
    let mut store = Store::new();
    store.set("abhigyan", b"supergreat");
    store.set("rijul", b"notgreat");
    let v0 = store.snapshot();
    assert_eq!(v0, 0);

    assert!(matches!(store.edit("abhigyan", b"supersupergreat"), Outcome::Ok));
    assert_eq!(store.vget(0, "abhigyan").unwrap(), Some(b"supergreat".to_vec()));
    assert_eq!(store.get("abhigyan"), Some(b"supersupergreat".to_vec()));
}

#[test]
fn test_delete_preserves_history() {
    let mut store = Store::new();
    store.set("abhigyan", b"supergreat");
    store.set("rijul", b"notgreat");
    store.snapshot();
    store.edit("abhigyan", b"supersupergreat");
    let v1 = store.snapshot();
    assert_eq!(v1, 1);

    assert!(matches!(store.del("rijul"), Outcome::Ok));
    assert_eq!(store.vget(1, "rijul").unwrap(), Some(b"notgreat".to_vec()));
    assert_eq!(store.get("rijul"), None);
}

#[test]
fn test_duplicate_insert_rejected() {
    let mut store = Store::new();
    assert!(matches!(store.set("k", b"v1"), Outcome::Ok));
    assert!(matches!(store.set("k", b"v2"), Outcome::AlreadyExists));
    assert_eq!(store.get("k"), Some(b"v1".to_vec()));
}

#[test]
fn test_vget_invalid_version_is_error() {
    let store = Store::new();
    assert!(store.vget(0, "k").is_err());
}

#[test]
fn test_change_promotes_snapshot_to_live() {
    let mut store = Store::new();
    store.set("a", b"1");
    let v0 = store.snapshot();
    store.set("b", b"2");

    store.change(v0).unwrap();
    assert_eq!(store.get("a"), Some(b"1".to_vec()));
    assert_eq!(store.get("b"), None);
}

#[test]
fn test_store_load_roundtrip() {
    let dir = std::env::temp_dir().join(format!("vertree-test-{:?}", std::thread::current().id()));
    let mut store = Store::new();
    store.set("a", b"1");
    store.snapshot();
    store.set("b", b"2");

    store.store_image(&dir, "img").unwrap();

    let mut restored = Store::new();
    restored.load_image(&dir, "img").unwrap();

    assert_eq!(restored.get("a"), Some(b"1".to_vec()));
    assert_eq!(restored.get("b"), Some(b"2".to_vec()));
    assert_eq!(restored.vget(0, "b").unwrap(), None);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn test_load_missing_file_is_codec_error() {
    let dir = std::env::temp_dir().join("vertree-test-missing-dir-does-not-exist");
    let mut store = Store::new();
    assert!(store.load_image(&dir, "does-not-exist").is_err());
}
