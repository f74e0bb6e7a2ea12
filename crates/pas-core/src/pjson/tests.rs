use super::*;
use crate::pas::Pas;

#[test]
fn scalars_round_trip() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_int(&mut pas, off, -7);
    assert!(is_int(&pas, off));
    assert_eq!(get_int(&pas, off), -7);

    set_uint(&mut pas, off, 42);
    assert!(is_uint(&pas, off));
    assert_eq!(get_uint(&pas, off), 42);

    set_bool(&mut pas, off, true);
    assert!(get_bool(&pas, off));

    set_real(&mut pas, off, 1.5);
    assert!((get_real(&pas, off) - 1.5).abs() < f64::EPSILON);
}

#[test]
fn string_payload_round_trips_and_empty_string_stores_no_buffer() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_string(&mut pas, off, "hello");
    assert_eq!(get_string(&pas, off), "hello");

    set_string(&mut pas, off, "");
    assert_eq!(get_string(&pas, off), "");
}

#[test]
fn object_insert_preserves_sorted_order_and_distinct_key_buffers() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_object(&mut pas, off);

    let c = obj_insert(&mut pas, off, "c");
    set_int(&mut pas, c, 3);
    let a = obj_insert(&mut pas, off, "a");
    set_int(&mut pas, a, 1);
    let b = obj_insert(&mut pas, off, "b");
    set_int(&mut pas, b, 2);

    assert_eq!(size(&pas, off), 3);
    assert_eq!(obj_keys(&pas, off), vec!["a", "b", "c"]);

    let a_val = obj_find(&pas, off, "a").unwrap();
    let b_val = obj_find(&pas, off, "b").unwrap();
    let c_val = obj_find(&pas, off, "c").unwrap();
    assert_eq!(get_int(&pas, a_val), 1);
    assert_eq!(get_int(&pas, b_val), 2);
    assert_eq!(get_int(&pas, c_val), 3);

    let v = read(&pas, off);
    let hdr = pas.array_header(v.w0);
    let mut chars_offs = Vec::new();
    for i in 0..hdr.size {
        let entry: PJsonEntry = pas.record_at(hdr.data_off, i);
        assert_ne!(entry.key_chars_off, 0);
        chars_offs.push(entry.key_chars_off);
    }
    let unique: std::collections::HashSet<_> = chars_offs.iter().collect();
    assert_eq!(unique.len(), chars_offs.len());
}

#[test]
fn obj_insert_on_existing_key_overwrites_without_duplicating() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_object(&mut pas, off);
    let first = obj_insert(&mut pas, off, "key");
    set_int(&mut pas, first, 1);
    let second = obj_insert(&mut pas, off, "key");
    set_int(&mut pas, second, 2);
    assert_eq!(size(&pas, off), 1);
    assert_eq!(get_int(&pas, obj_find(&pas, off, "key").unwrap()), 2);
}

#[test]
fn obj_erase_removes_only_the_matching_key() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_object(&mut pas, off);
    for k in ["a", "b", "c"] {
        let v = obj_insert(&mut pas, off, k);
        set_string(&mut pas, v, k);
    }
    assert!(obj_erase(&mut pas, off, "b"));
    assert_eq!(obj_keys(&pas, off), vec!["a", "c"]);
    assert!(!obj_erase(&mut pas, off, "b"));
}

#[test]
fn array_push_back_grows_and_preserves_elements() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_array(&mut pas, off);
    for i in 0..10 {
        let elem = push_back(&mut pas, off);
        set_int(&mut pas, elem, i);
    }
    assert_eq!(size(&pas, off), 10);
    for i in 0..10 {
        let elem = at(&pas, off, i as u64).unwrap();
        assert_eq!(get_int(&pas, elem), i);
    }
    assert!(at(&pas, off, 10).is_none());
}

#[test]
fn array_erase_shifts_tail_left() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_array(&mut pas, off);
    for i in 0..5 {
        let elem = push_back(&mut pas, off);
        set_int(&mut pas, elem, i);
    }
    assert!(array_erase(&mut pas, off, 2));
    let remaining: Vec<i64> = (0..size(&pas, off))
        .map(|i| get_int(&pas, at(&pas, off, i).unwrap()))
        .collect();
    assert_eq!(remaining, vec![0, 1, 3, 4]);
}

#[test]
fn free_recursively_releases_nested_array_and_object_values() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_object(&mut pas, off);
    let arr = obj_insert(&mut pas, off, "items");
    set_array(&mut pas, arr);
    for i in 0..3 {
        let elem = push_back(&mut pas, arr);
        set_string(&mut pas, elem, &format!("item{i}"));
    }
    free(&mut pas, off);
    assert!(is_null(&pas, off));
    assert_eq!(pas.free_list_len() > 0, true);
}

#[test]
fn reassigning_a_value_frees_its_previous_payload() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_string(&mut pas, off, "first");
    let before = pas.free_list_len();
    set_string(&mut pas, off, "second and longer");
    assert!(pas.free_list_len() > before);
    assert_eq!(get_string(&pas, off), "second and longer");
}

#[test]
fn set_array_assumes_array_type_and_push_back_bootstraps_storage() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    assert!(is_null(&pas, off));
    set_array(&mut pas, off);
    assert_eq!(size(&pas, off), 0);
    let elem = push_back(&mut pas, off);
    set_bool(&mut pas, elem, true);
    assert_eq!(size(&pas, off), 1);
}

#[test]
fn display_renders_the_same_as_to_string() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_int(&mut pas, off, 9);
    assert_eq!(format!("{}", Render(&pas, off)), to_string(&pas, off));
}
