use super::*;

#[test]
fn test_add_get_roundtrip() {
    let mut arena: Arena<String> = Arena::new();
    let a = arena.add("alpha".to_string());
    let b = arena.add("beta".to_string());

    assert_eq!(arena.get(a), "alpha");
    assert_eq!(arena.get(b), "beta");
    assert_eq!(arena.len(), 2);
}

#[test]
fn test_ids_never_reused() {
    let mut arena: Arena<u32> = Arena::new();
    let ids: Vec<Id<u32>> = (0..10).map(|n| arena.add(n)).collect();
    for (i, id) in ids.iter().enumerate() {
        assert_eq!(id.as_u32(), i as u32);
    }
}
