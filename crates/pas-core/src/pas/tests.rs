use super::*;
use crate::config::PasConfig;

fn small_pas() -> Pas {
    Pas::with_config(PasConfig {
        initial_data_size: 256,
        initial_slot_capacity: 2,
        initial_type_capacity: 2,
        initial_name_capacity: 2,
        initial_free_capacity: 2,
    })
}

#[test]
fn create_and_resolve_scalar() {
    let mut pas = Pas::new();
    let off = pas.create::<u64>(Some("counter"));
    assert!(!off.is_null());
    *pas.resolve_mut::<u64>(off).unwrap() = 42;
    assert_eq!(*pas.resolve::<u64>(off).unwrap(), 42);
    assert_eq!(pas.find("counter"), off);
}

#[test]
fn unnamed_objects_are_not_findable() {
    let mut pas = Pas::new();
    let off = pas.create::<u32>(None);
    assert!(!off.is_null());
    assert!(pas.get_name(off).is_none());
    assert_eq!(pas.find(""), Offset::NULL);
}

#[test]
fn duplicate_name_fails_without_corrupting_state() {
    let mut pas = Pas::new();
    let first = pas.create::<u64>(Some("dup"));
    assert!(!first.is_null());
    let second = pas.create::<u64>(Some("dup"));
    assert!(second.is_null());
    assert_eq!(pas.slot_count(), 1);
    assert_eq!(pas.named_count(), 1);
    assert!(pas.validate());
}

#[test]
fn create_array_rejects_zero_count() {
    let mut pas = Pas::new();
    assert_eq!(pas.create_array::<u8>(0, None), Offset::NULL);
}

#[test]
fn create_array_resolves_each_element() {
    let mut pas = Pas::new();
    let off = pas.create_array::<u32>(4, Some("arr"));
    for i in 0..4 {
        *pas.resolve_element_mut::<u32>(off, i).unwrap() = i as u32 * 10;
    }
    for i in 0..4 {
        assert_eq!(*pas.resolve_element::<u32>(off, i).unwrap(), i as u32 * 10);
    }
    assert!(pas.resolve_element::<u32>(off, 4).is_none());
    assert_eq!(pas.get_count(off), 4);
}

#[test]
fn delete_reclaims_space_for_next_allocation_of_equal_size() {
    let mut pas = small_pas();
    let a = pas.create::<[u8; 32]>(Some("a"));
    let bump_before = pas.bump();
    pas.delete(a);
    assert_eq!(pas.find("a"), Offset::NULL);
    assert_eq!(pas.free_list_len(), 1);

    let b = pas.create::<[u8; 32]>(Some("b"));
    assert_eq!(b, a, "reused the freed region instead of bumping further");
    assert_eq!(pas.bump(), bump_before);
    assert_eq!(pas.free_list_len(), 0);
}

#[test]
fn delete_zeroes_reused_region() {
    let mut pas = small_pas();
    let a = pas.create::<u64>(Some("a"));
    *pas.resolve_mut::<u64>(a).unwrap() = u64::MAX;
    pas.delete(a);
    let b = pas.create::<u64>(Some("b"));
    assert_eq!(*pas.resolve::<u64>(b).unwrap(), 0);
}

#[test]
fn deleting_a_named_slot_keeps_other_names_findable() {
    let mut pas = Pas::new();
    let a = pas.create::<u32>(Some("a"));
    let b = pas.create::<u32>(Some("b"));
    let c = pas.create::<u32>(Some("c"));
    pas.delete(b);
    assert_eq!(pas.find("a"), a);
    assert_eq!(pas.find("b"), Offset::NULL);
    assert_eq!(pas.find("c"), c);
    assert!(pas.validate());
}

#[test]
fn find_typed_rejects_wrong_type() {
    let mut pas = Pas::new();
    pas.create::<u32>(Some("x"));
    assert_eq!(pas.find_typed::<u64>("x"), Offset::NULL);
    assert!(!pas.find_typed::<u32>("x").is_null());
}

#[test]
fn growth_beyond_initial_capacity_preserves_existing_entries() {
    let mut pas = small_pas();
    let mut offsets = Vec::new();
    for i in 0..20 {
        let off = pas.create::<u64>(Some(&format!("n{i}")));
        assert!(!off.is_null(), "allocation {i} failed");
        offsets.push(off);
    }
    for (i, off) in offsets.iter().enumerate() {
        assert_eq!(pas.find(&format!("n{i}")), *off);
    }
    assert!(pas.validate());
}

#[test]
fn save_and_load_round_trip_preserves_values_and_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("image.pas");

    let mut pas = Pas::new();
    let off = pas.create::<u64>(Some("counter"));
    *pas.resolve_mut::<u64>(off).unwrap() = 7;
    pas.save(&path).unwrap();

    let mut reopened = Pas::load(&path).unwrap();
    let found = reopened.find("counter");
    assert!(!found.is_null());
    assert_eq!(*reopened.resolve::<u64>(found).unwrap(), 7);
    assert!(reopened.validate());
}

#[test]
fn load_missing_file_creates_empty_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.pas");
    let pas = Pas::load(&path).unwrap();
    assert!(pas.validate());
    assert_eq!(pas.slot_count(), 0);
}

#[test]
fn load_garbage_file_falls_back_to_empty_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.pas");
    std::fs::write(&path, b"not a pas image").unwrap();
    let pas = Pas::load(&path).unwrap();
    assert!(pas.validate());
    assert_eq!(pas.slot_count(), 0);
}

#[test]
fn reset_discards_every_object() {
    let mut pas = Pas::new();
    pas.create::<u32>(Some("a"));
    pas.create::<u32>(Some("b"));
    pas.reset();
    assert_eq!(pas.slot_count(), 0);
    assert_eq!(pas.find("a"), Offset::NULL);
    assert!(pas.validate());
}

#[test]
fn realloc_only_succeeds_on_the_last_block() {
    let mut pas = Pas::new();
    let a = pas.create_array::<u32>(2, None);
    let _b = pas.create_array::<u32>(2, None);
    // a is no longer the last block, so growing it in place must fail.
    assert_eq!(pas.realloc(a, 2, 4, 4), Offset::NULL);

    let c = pas.create_array::<u32>(2, None);
    let grown = pas.realloc(c, 2, 6, 4);
    assert_eq!(grown, c);
    assert_eq!(pas.bump(), c.get() + 6 * 4);
}

#[test]
fn validate_detects_a_corrupted_header() {
    let mut pas = Pas::new();
    let mut h = pas.header();
    h.magic = 0xDEAD_BEEF;
    pas.set_header(h);
    assert!(!pas.validate());
}

#[test]
fn load_bytes_too_short_falls_back_to_empty_image() {
    let pas = Pas::load_bytes(&[0u8; 4]);
    assert!(pas.validate());
    assert_eq!(pas.slot_count(), 0);
}

#[test]
fn load_bytes_bad_magic_falls_back_to_empty_image() {
    let mut pas = Pas::new();
    pas.create::<u32>(Some("x"));
    let mut bytes = pas.data.clone();
    bytes[0] ^= 0xFF;
    let loaded = Pas::load_bytes(&bytes);
    assert!(loaded.validate());
    assert_eq!(loaded.slot_count(), 0);
}

#[test]
fn load_bytes_round_trips_a_saved_image() {
    let mut pas = Pas::new();
    let off = pas.create::<u64>(Some("counter"));
    *pas.resolve_mut::<u64>(off).unwrap() = 99;

    let bytes = pas.data.clone();
    let loaded = Pas::load_bytes(&bytes);
    assert!(loaded.validate());
    let found = loaded.find("counter");
    assert!(!found.is_null());
    assert_eq!(*loaded.resolve::<u64>(found).unwrap(), 99);
}

#[test]
fn reserve_slots_grows_capacity_without_changing_contents() {
    let mut pas = small_pas();
    let off = pas.create::<u32>(Some("only"));
    pas.reserve_slots(64);
    assert!(pas.slot_capacity() >= 64);
    assert_eq!(pas.find("only"), off);
    assert!(pas.validate());
}
