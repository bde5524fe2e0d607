use super::*;

#[test]
fn lru_eviction_and_order() {
    let mut cache = BoundedLru::new(3);

    assert!(cache.insert("key1", 1).is_none());
    assert!(cache.insert("key2", 2).is_none());
    assert!(cache.insert("key3", 3).is_none());

    // Promote key1; key2 becomes the eviction candidate.
    assert_eq!(cache.get(&"key1"), Some(1));
    assert_eq!(cache.insert("key4", 4), Some("key2"));
    assert!(!cache.contains(&"key2"));
    assert!(cache.contains(&"key1"));
    assert_eq!(cache.len(), 3);

    // peek does not promote.
    assert_eq!(cache.peek(&"key3"), Some(&3));
    assert_eq!(cache.insert("key5", 5), Some("key3"));
}

#[test]
fn overwrite_is_not_an_eviction() {
    let mut cache = BoundedLru::new(2);
    cache.insert("a", 1);
    cache.insert("b", 2);
    assert_eq!(cache.insert("a", 10), None);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.get(&"a"), Some(10));
}

#[test]
fn entry_1025_evicts_least_recently_accessed() {
    let mut cache = BoundedLru::new(1024);
    for i in 0..1024u32 {
        cache.insert(i, i);
    }
    // Touch the oldest so the second oldest becomes least recently used.
    assert_eq!(cache.get(&0), Some(0));
    assert_eq!(cache.insert(1024, 1024), Some(1));
    assert_eq!(cache.len(), 1024);
    assert!(cache.contains(&0));
    assert!(!cache.contains(&1));
}

#[test]
fn zero_capacity_is_clamped() {
    let cache = BoundedLru::<u8, u8>::new(0);
    assert_eq!(cache.capacity(), 1);
}

#[test]
fn absent_is_distinct_from_picture() {
    assert!(CacheEntry::from(None).is_absent());
    assert!(CacheEntry::Absent.picture().is_none());
}
