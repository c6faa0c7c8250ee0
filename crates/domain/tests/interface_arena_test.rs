mod helpers;

use ferrous_netd_domain::{InterfaceArena, InterfaceId};
use helpers::InterfaceBuilder;

#[test]
fn test_insert_and_get() {
    let mut arena = InterfaceArena::new();
    let id = arena.insert(InterfaceBuilder::new("eth0", "192.168.1.1").build());

    assert_eq!(arena.len(), 1);
    assert_eq!(&*arena.get(id).unwrap().name, "eth0");
}

#[test]
fn test_removed_id_goes_stale() {
    let mut arena = InterfaceArena::new();
    let id = arena.insert(InterfaceBuilder::new("eth0", "192.168.1.1").build());

    assert!(arena.remove(id).is_some());
    assert!(arena.get(id).is_none());
    assert!(arena.remove(id).is_none());
    assert!(arena.is_empty());
}

#[test]
fn test_reused_slot_does_not_resurrect_old_id() {
    let mut arena = InterfaceArena::new();
    let old = arena.insert(InterfaceBuilder::new("eth0", "192.168.1.1").build());
    arena.remove(old);

    let new = arena.insert(InterfaceBuilder::new("wlan0", "192.168.2.1").build());

    assert_ne!(old, new);
    assert!(arena.get(old).is_none());
    assert_eq!(&*arena.get(new).unwrap().name, "wlan0");
}

#[test]
fn test_id_bits_round_trip() {
    let mut arena = InterfaceArena::new();
    arena.insert(InterfaceBuilder::new("lo", "127.0.0.1").build());
    let id = arena.insert(InterfaceBuilder::new("eth0", "192.168.1.1").build());

    assert_eq!(InterfaceId::from_bits(id.to_bits()), id);
}

#[test]
fn test_iter_skips_free_slots() {
    let mut arena = InterfaceArena::new();
    let a = arena.insert(InterfaceBuilder::new("eth0", "192.168.1.1").build());
    let b = arena.insert(InterfaceBuilder::new("eth1", "192.168.2.1").build());
    arena.remove(a);

    let ids: Vec<_> = arena.iter().map(|(id, _)| id).collect();
    assert_eq!(ids, vec![b]);
}
