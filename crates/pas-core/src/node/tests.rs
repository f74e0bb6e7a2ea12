use super::*;
use crate::pas::Pas;

#[test]
fn scalars_round_trip() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    let v = NodeView::new(off);

    set_int(&mut pas, off, -7);
    assert!(v.is_integer(&pas));
    assert_eq!(v.as_int(&pas), -7);

    set_uint(&mut pas, off, 42);
    assert!(v.is_uinteger(&pas));
    assert_eq!(v.as_uint(&pas), 42);

    set_bool(&mut pas, off, true);
    assert!(v.as_bool(&pas));

    set_real(&mut pas, off, 1.5);
    assert!((v.as_double(&pas) - 1.5).abs() < f64::EPSILON);
}

#[test]
fn string_value_is_read_write_and_not_interned() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    let v = NodeView::new(off);
    set_string(&mut pas, off, "hello");
    assert_eq!(v.as_string(&pas), "hello");
    set_string(&mut pas, off, "goodbye, much longer");
    assert_eq!(v.as_string(&pas), "goodbye, much longer");
}

#[test]
fn array_push_back_allocates_distinct_child_slots() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_array(&mut pas, off);
    let v = NodeView::new(off);

    let mut ids = Vec::new();
    for i in 0..5 {
        let elem = array_push_back(&mut pas, off);
        set_int(&mut pas, elem, i);
        ids.push(elem);
    }
    assert_eq!(v.size(&pas), 5);
    let unique: std::collections::HashSet<_> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());

    for i in 0..5 {
        assert_eq!(v.at(&pas, i as u64).as_int(&pas), i);
    }
    assert!(!v.at(&pas, 5).valid());
}

#[test]
fn object_insert_preserves_sorted_order_and_distinct_keys() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_object(&mut pas, off);
    let v = NodeView::new(off);

    let c = object_insert(&mut pas, off, "c");
    set_int(&mut pas, c, 3);
    let a = object_insert(&mut pas, off, "a");
    set_int(&mut pas, a, 1);
    let b = object_insert(&mut pas, off, "b");
    set_int(&mut pas, b, 2);

    assert_eq!(v.size(&pas), 3);
    let keys: Vec<&str> = (0..v.size(&pas)).map(|i| v.key_at(&pas, i)).collect();
    assert_eq!(keys, vec!["a", "b", "c"]);

    assert_eq!(v.at_key(&pas, "a").as_int(&pas), 1);
    assert_eq!(v.at_key(&pas, "b").as_int(&pas), 2);
    assert_eq!(v.at_key(&pas, "c").as_int(&pas), 3);
    assert!(!v.at_key(&pas, "missing").valid());
}

#[test]
fn object_insert_on_existing_key_returns_the_same_value_slot() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_object(&mut pas, off);
    let first = object_insert(&mut pas, off, "key");
    set_int(&mut pas, first, 1);
    let second = object_insert(&mut pas, off, "key");
    assert_eq!(first, second);
    let v = NodeView::new(off);
    assert_eq!(v.size(&pas), 1);
    assert_eq!(v.at_key(&pas, "key").as_int(&pas), 1);
}

#[test]
fn object_keys_are_interned_so_unrelated_keys_share_no_buffer_but_equal_keys_do() {
    let mut pas = Pas::new();
    let off1 = create(&mut pas, None);
    set_object(&mut pas, off1);
    let off2 = create(&mut pas, None);
    set_object(&mut pas, off2);

    object_insert(&mut pas, off1, "shared");
    object_insert(&mut pas, off2, "shared");

    let v1 = NodeView::new(off1);
    let v2 = NodeView::new(off2);
    assert_eq!(v1.key_at(&pas, 0), v2.key_at(&pas, 0));
}

#[test]
fn binary_push_back_accumulates_bytes() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_binary(&mut pas, off);
    let v = NodeView::new(off);
    for b in [1u8, 2, 3, 4] {
        binary_push_back(&mut pas, off, b);
    }
    assert_eq!(v.as_binary(&pas), &[1, 2, 3, 4]);
}

#[test]
fn ref_resolves_through_target() {
    let mut pas = Pas::new();
    let target = create(&mut pas, None);
    set_int(&mut pas, target, 99);

    let r = create(&mut pas, None);
    set_ref(&mut pas, r, "/some/path");
    set_ref_target(&mut pas, r, target);

    let v = NodeView::new(r);
    assert!(v.is_ref(&pas));
    assert_eq!(v.ref_path(&pas), "/some/path");
    let resolved = v.deref(&pas, true, 32);
    assert_eq!(resolved, NodeView::new(target));
    assert_eq!(resolved.as_int(&pas), 99);
}

#[test]
fn deref_detects_a_self_cycle() {
    let mut pas = Pas::new();
    let r = create(&mut pas, None);
    set_ref(&mut pas, r, "/self");
    set_ref_target(&mut pas, r, r);

    let v = NodeView::new(r);
    assert!(!v.deref(&pas, true, 32).valid());
}

#[test]
fn deref_detects_a_longer_cycle_via_the_visited_set() {
    let mut pas = Pas::new();
    let a = create(&mut pas, None);
    let b = create(&mut pas, None);
    let c = create(&mut pas, None);
    set_ref(&mut pas, a, "/b");
    set_ref_target(&mut pas, a, b);
    set_ref(&mut pas, b, "/c");
    set_ref_target(&mut pas, b, c);
    set_ref(&mut pas, c, "/a");
    set_ref_target(&mut pas, c, a);

    let v = NodeView::new(a);
    assert!(!v.deref(&pas, true, 32).valid());
}

#[test]
fn deref_non_recursive_follows_exactly_one_hop() {
    let mut pas = Pas::new();
    let inner_target = create(&mut pas, None);
    set_int(&mut pas, inner_target, 5);
    let middle = create(&mut pas, None);
    set_ref(&mut pas, middle, "/inner");
    set_ref_target(&mut pas, middle, inner_target);
    let outer = create(&mut pas, None);
    set_ref(&mut pas, outer, "/middle");
    set_ref_target(&mut pas, outer, middle);

    let v = NodeView::new(outer);
    let one_hop = v.deref(&pas, false, 32);
    assert_eq!(one_hop, NodeView::new(middle));
    assert!(one_hop.is_ref(&pas));
}

#[test]
fn free_recursively_releases_nested_array_and_object_children() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_object(&mut pas, off);
    let arr = object_insert(&mut pas, off, "items");
    set_array(&mut pas, arr);
    for i in 0..3 {
        let elem = array_push_back(&mut pas, arr);
        set_string(&mut pas, elem, &format!("item{i}"));
    }
    free(&mut pas, off);
    let v = NodeView::new(off);
    assert!(v.is_null(&pas));
    assert!(pas.free_list_len() > 0);
}

#[test]
fn reassigning_a_value_frees_its_previous_payload() {
    let mut pas = Pas::new();
    let off = create(&mut pas, None);
    set_string(&mut pas, off, "first value");
    let before = pas.free_list_len();
    set_string(&mut pas, off, "second and much longer value");
    assert!(pas.free_list_len() > before);
}
