use crate::*;

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        // Deterministic, dependency-free PRNG for tests.
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_u64(&mut self, start: u64, end_exclusive: u64) -> u64 {
        debug_assert!(start < end_exclusive);
        let span = end_exclusive - start;
        start + (self.next_u64() % span)
    }

    fn gen_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

fn counting<V>() -> AggregateTree<u64, V, usize> {
    AggregateTree::new(TreeOptions::counting())
}

fn heights() -> AggregateTree<u64, u64, u64> {
    AggregateTree::new(TreeOptions::summing(|_, h| *h))
}

/// Linear oracle: every entry with its exclusive prefix sum.
fn with_prefixes(tree: &AggregateTree<u64, u64, u64>) -> Vec<(u64, u64, u64)> {
    let mut prefix = 0u64;
    tree.iter()
        .map(|(k, v)| {
            let row = (*k, *v, prefix);
            prefix += *v;
            row
        })
        .collect()
}

fn classify_between(lo: u64, hi: u64) -> impl Fn(&u64, &u64, &u64) -> RangePosition + Clone {
    move |_: &u64, _: &u64, p: &u64| {
        if *p < lo {
            RangePosition::Below
        } else if *p > hi {
            RangePosition::Above
        } else {
            RangePosition::In
        }
    }
}

#[test]
fn running_count_range_yields_middle_entries() {
    let tree = counting::<&str>()
        .with(5, "five")
        .with(3, "three")
        .with(8, "eight")
        .with(1, "one");
    tree.check_invariants().unwrap();

    let hits: Vec<(u64, usize)> = tree
        .range(|_, _, seen| {
            if *seen < 1 {
                RangePosition::Below
            } else if *seen < 3 {
                RangePosition::In
            } else {
                RangePosition::Above
            }
        })
        .map(|e| (*e.key, e.prefix))
        .collect();
    assert_eq!(hits, vec![(3, 1), (5, 2)]);
}

#[test]
fn removing_the_only_entry_leaves_an_empty_aggregate() {
    let tree = heights().with(7, 40);
    assert_eq!(*tree.total(), 40);

    let empty = tree.without(&7);
    assert_eq!(empty.len(), 0);
    assert!(empty.is_empty());
    assert_eq!(*empty.total(), 0);
    empty.check_invariants().unwrap();
}

#[test]
fn random_operations_preserve_invariants_and_match_oracle() {
    let mut rng = Lcg::new(0x5eed);
    let mut tree = heights();
    let mut oracle = BTreeMap::<u64, u64>::new();

    for step in 0..4000 {
        let key = rng.gen_range_u64(0, 300);
        if rng.gen_range_u64(0, 3) == 0 {
            tree = tree.without(&key);
            oracle.remove(&key);
        } else {
            let height = rng.gen_range_u64(0, 50);
            tree = tree.with(key, height);
            oracle.insert(key, height);
        }

        if step % 25 == 0 {
            tree.check_invariants().unwrap();
        }
        assert_eq!(tree.len(), oracle.len());
    }
    tree.check_invariants().unwrap();

    let entries: Vec<(u64, u64)> = tree.iter().map(|(k, v)| (*k, *v)).collect();
    let expected: Vec<(u64, u64)> = oracle.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(entries, expected);
    assert_eq!(*tree.total(), oracle.values().sum::<u64>());
}

#[test]
fn ascending_and_descending_runs_stay_balanced() {
    let mut up = counting::<u64>();
    let mut down = counting::<u64>();
    for i in 0..512u64 {
        up = up.with(i, i);
        down = down.with(511 - i, i);
    }
    up.check_invariants().unwrap();
    down.check_invariants().unwrap();
    assert_eq!(*up.total(), 512);

    // Drain from both ends, checking along the way.
    for i in 0..256u64 {
        up = up.without(&i).without(&(511 - i));
        down = down.without(&(255 - i)).without(&(256 + i));
        if i % 16 == 0 {
            up.check_invariants().unwrap();
            down.check_invariants().unwrap();
        }
    }
    assert!(up.is_empty());
    assert!(down.is_empty());
}

#[test]
fn older_snapshots_are_unaffected_by_later_operations() {
    let t1 = heights().with(1, 10).with(2, 20).with(3, 30);
    let before: Vec<(u64, u64)> = t1.iter().map(|(k, v)| (*k, *v)).collect();

    let t2 = t1.with(4, 40);
    assert!(!t1.contains_key(&4));
    assert!(t2.contains_key(&4));

    let t3 = t2.without(&2).with(1, 99).with_empty();
    assert!(t3.is_empty());

    let after: Vec<(u64, u64)> = t1.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(before, after);
    assert_eq!(*t1.total(), 60);
    assert_eq!(*t2.total(), 100);
    t1.check_invariants().unwrap();
    t2.check_invariants().unwrap();
}

#[test]
fn overwriting_with_the_same_value_handle_is_a_no_op() {
    let value = Arc::new(String::from("row"));
    let once = AggregateTree::new(TreeOptions::<u64, String, usize>::counting())
        .with(1, String::from("a"))
        .with_arc(2, Arc::clone(&value));
    let twice = once.with_arc(2, Arc::clone(&value));
    assert!(once.ptr_eq(&twice));

    // An equal but distinct value still produces a new version.
    let replaced = once.with(2, String::from("row"));
    assert!(!once.ptr_eq(&replaced));
    assert_eq!(replaced.get(&2).map(String::as_str), Some("row"));
    assert_eq!(replaced.len(), 2);
}

#[test]
fn overwrite_modes_report_contract_violations() {
    let tree = counting::<u64>().with(1, 100);

    assert_eq!(
        tree.try_with(1, 200, OverwriteMode::Forbid).unwrap_err(),
        TreeError::DuplicateKey
    );
    assert_eq!(
        tree.try_with(2, 200, OverwriteMode::Require).unwrap_err(),
        TreeError::KeyNotFound
    );

    let replaced = tree.try_with(1, 200, OverwriteMode::Require).unwrap();
    assert_eq!(replaced[&1], 200);
    let inserted = tree.try_with(2, 300, OverwriteMode::Forbid).unwrap();
    assert_eq!(inserted.len(), 2);
    assert_eq!(tree[&1], 100);
}

#[test]
fn lookups_distinguish_missing_keys() {
    let tree = counting::<&str>().with(4, "four");
    assert_eq!(tree.get(&4), Some(&"four"));
    assert_eq!(tree.get(&5), None);
    assert!(tree.contains_key(&4));
    assert!(!tree.contains_key(&5));
    assert_eq!(tree.value(&5), Err(TreeError::KeyNotFound));
    assert_eq!(tree.try_without(&5).unwrap_err(), TreeError::KeyNotFound);
    assert!(tree.without(&5).ptr_eq(&tree));
    assert_eq!(tree.get_arc(&4).as_deref(), Some(&"four"));
}

#[test]
#[should_panic(expected = "key not found")]
fn indexing_a_missing_key_panics() {
    let tree = counting::<u64>().with(1, 1);
    let _ = tree[&2];
}

#[test]
fn range_matches_linear_scan_for_monotonic_predicates() {
    let mut rng = Lcg::new(42);
    for round in 0..40 {
        let mut tree = heights();
        let n = rng.gen_range_u64(0, 200);
        for _ in 0..n {
            let key = rng.gen_range_u64(0, 1000);
            let height = rng.gen_range_u64(0, 20);
            tree = tree.with(key, height);
        }
        let total = *tree.total();
        let lo = rng.gen_range_u64(0, total + 2);
        let hi = lo + rng.gen_range_u64(0, 60);

        let predicate = classify_between(lo, hi);
        let got: Vec<(u64, u64, u64)> = tree
            .range(predicate.clone())
            .map(|e| (*e.key, **e.value, e.prefix))
            .collect();
        let expected: Vec<(u64, u64, u64)> = with_prefixes(&tree)
            .into_iter()
            .filter(|(k, v, p)| predicate(k, v, p) == RangePosition::In)
            .collect();
        assert_eq!(got, expected, "round {round}, bounds [{lo}, {hi}]");
    }
}

#[test]
fn range_prunes_subtrees_outside_the_window() {
    let tree = AggregateTree::from_iter_with(
        TreeOptions::summing(|_, h: &u64| *h),
        (0..4096u64).map(|i| (i, 1u64)),
    );
    let mut calls = 0usize;
    let hits = tree
        .range(|_, _, p| {
            calls += 1;
            classify_between(2000, 2009)(&0, &0, p)
        })
        .count();
    assert_eq!(hits, 10);
    // Two root-to-leaf walks plus the hits, far below a full scan.
    assert!(calls < 200, "visited {calls} nodes");
}

#[test]
fn non_monotonic_predicate_terminates() {
    let mut tree = heights();
    for i in 0..300u64 {
        tree = tree.with(i, i % 7);
    }
    let mut rng = Lcg::new(7);
    let n = tree
        .range(|_, _, _| match rng.gen_range_u64(0, 3) {
            0 => RangePosition::Below,
            1 => RangePosition::In,
            _ => RangePosition::Above,
        })
        .count();
    assert!(n <= tree.len());
}

#[test]
fn range_iterator_clone_resumes_from_the_same_position() {
    let tree = AggregateTree::from_iter_with(
        TreeOptions::summing(|_, h: &u64| *h),
        (0..50u64).map(|i| (i, 2u64)),
    );
    let mut it = tree.range(classify_between(10, 40));
    let first = it.next().map(|e| *e.key);
    let rest: Vec<u64> = it.clone().map(|e| *e.key).collect();
    let rest_again: Vec<u64> = it.map(|e| *e.key).collect();
    assert_eq!(first, Some(5));
    assert_eq!(rest, rest_again);
    assert_eq!(rest.last(), Some(&20));
}

#[test]
fn equal_caller_keys_keep_insertion_order() {
    let options = TreeOptions::<UniqueKey<&str>, u32, usize>::counting();
    let mut tree = AggregateTree::new(options);
    let mut keys = Vec::new();
    for (i, name) in ["b", "a", "b", "a", "b"].into_iter().enumerate() {
        let key = UniqueKey::new(name);
        tree = tree.with(key.clone(), i as u32);
        keys.push(key);
    }
    assert_eq!(tree.len(), 5);

    let order: Vec<u32> = tree.iter().map(|(_, v)| *v).collect();
    assert_eq!(order, vec![1, 3, 0, 2, 4]);

    tree = tree.without(&keys[2]);
    assert_eq!(tree.len(), 4);
    assert!(!tree.contains_key(&keys[2]));
    assert!(tree.contains_key(&keys[0]));
    tree.check_invariants().unwrap();
}

#[test]
fn unique_keys_compare_by_value_then_identity() {
    let a = UniqueKey::new(10);
    let b = UniqueKey::new(10);
    let c = UniqueKey::new(5);
    assert_ne!(a, b);
    assert_eq!(a, a.clone());
    assert!(a < b);
    assert!(c < a);
    assert_eq!(a.cmp(&a.clone()), Ordering::Equal);
    assert!(b.id() > a.id());

    let reversed = UniqueKey::<i32>::comparer(Arc::new(|x: &i32, y: &i32| y.cmp(x)));
    assert_eq!(reversed(&c, &a), Ordering::Greater);
    assert_eq!(reversed(&a, &b), Ordering::Less);
}

#[test]
fn custom_comparer_orders_entries() {
    let options = TreeOptions::<u64, (), usize>::counting().with_compare(|a, b| b.cmp(a));
    let tree = AggregateTree::from_iter_with(options, [3u64, 9, 1, 7].map(|k| (k, ())));
    let keys: Vec<u64> = tree.keys().copied().collect();
    assert_eq!(keys, vec![9, 7, 3, 1]);
    assert_eq!(tree.first().map(|(k, _)| *k), Some(9));
    assert_eq!(tree.last().map(|(k, _)| *k), Some(1));
    tree.check_invariants().unwrap();
}

#[test]
fn non_commutative_aggregate_keeps_left_to_right_order() {
    let options = TreeOptions::<u64, char, String>::new(
        String::new(),
        |l, _, c, r| {
            let mut s = l.clone();
            s.push(*c);
            s.push_str(r);
            s
        },
        |l, r| {
            let mut s = l.clone();
            s.push_str(r);
            s
        },
    );
    let mut tree = AggregateTree::new(options);
    for (k, c) in [(4, 'd'), (2, 'b'), (5, 'e'), (1, 'a'), (3, 'c'), (6, 'f')] {
        tree = tree.with(k, c);
        tree.check_invariants().unwrap();
    }
    assert_eq!(tree.total(), "abcdef");
    tree = tree.without(&4);
    assert_eq!(tree.total(), "abcef");

    let prefixes: Vec<String> = tree
        .range(|_, _, _| RangePosition::In)
        .map(|e| e.prefix)
        .collect();
    assert_eq!(prefixes, vec!["", "a", "ab", "abc", "abce"]);
}

#[test]
fn debug_renders_as_map() {
    let tree = counting::<&str>().with(2, "b").with(1, "a");
    assert_eq!(alloc::format!("{tree:?}"), r#"{1: "a", 2: "b"}"#);
}

#[test]
fn window_bounds_include_margin_on_both_sides() {
    let bounds = WindowBounds::new(100, 40, 0.5);
    assert_eq!(bounds, WindowBounds { min: 80, max: 160 });
    assert_eq!(WindowBounds::new(5, 40, 0.5).min, 0);

    assert_eq!(bounds.classify(0, 79), RangePosition::Below);
    assert_eq!(bounds.classify(0, 80), RangePosition::In);
    assert_eq!(bounds.classify(160, 5), RangePosition::In);
    assert_eq!(bounds.classify(161, 5), RangePosition::Above);
    assert!(bounds.contains(150, 20));
    assert!(!bounds.contains(170, 20));
}

#[test]
fn visible_entries_cover_the_viewport() {
    let tree = AggregateTree::from_iter_with(
        TreeOptions::summing(|_, h: &u64| *h),
        (0..100u64).map(|i| (i, 10u64)),
    );
    let bounds = WindowBounds::new(500, 50, 0.5);
    let visible: Vec<(u64, u64)> = visible_entries(&tree, bounds, |_, h| *h)
        .map(|e| (*e.key, e.start))
        .collect();
    // bounds = [475, 575]: items starting at 470..=570.
    assert_eq!(visible.first(), Some(&(47, 470)));
    assert_eq!(visible.last(), Some(&(57, 570)));
    assert_eq!(visible.len(), 11);
}

#[test]
fn visible_entries_handle_uneven_extents() {
    let mut rng = Lcg::new(99);
    let mut tree = heights();
    for i in 0..500u64 {
        let h = if rng.gen_bool() { 0 } else { rng.gen_range_u64(1, 40) };
        tree = tree.with(i, h);
    }
    for _ in 0..30 {
        let offset = rng.gen_range_u64(0, *tree.total() + 1);
        let bounds = WindowBounds::new(offset, 120, 0.25);
        let got: Vec<u64> = visible_entries(&tree, bounds, |_, h| *h)
            .map(|e| *e.key)
            .collect();
        let expected: Vec<u64> = with_prefixes(&tree)
            .into_iter()
            .filter(|(_, h, start)| bounds.contains(*start, *h))
            .map(|(k, _, _)| k)
            .collect();
        assert_eq!(got, expected);
    }
}

#[test]
fn pool_prefers_exact_key_then_spare_then_any() {
    let mut pool = ResourcePool::<u64, &str>::new();
    assert!(pool.acquire(&1).is_none());

    pool.release(1, "r1");
    pool.release(2, "r2");
    pool.release_spare("s");
    assert_eq!(pool.stats(), PoolStats { parked: 2, spare: 1 });

    assert_eq!(pool.acquire(&2), Some(("r2", Reuse::ExactKey)));
    assert_eq!(pool.acquire(&9), Some(("s", Reuse::Spare)));
    assert_eq!(pool.acquire(&9), Some(("r1", Reuse::Repurposed)));
    assert!(pool.is_empty());
}

#[test]
fn pool_moves_displaced_resource_to_spare() {
    let mut pool = ResourcePool::<u64, u32>::new();
    pool.release(7, 1);
    pool.release(7, 2);
    assert_eq!(pool.stats(), PoolStats { parked: 1, spare: 1 });
    assert_eq!(pool.acquire(&7), Some((2, Reuse::ExactKey)));

    let mut drained = pool.drain();
    drained.sort_unstable();
    assert_eq!(drained, vec![1]);
    assert_eq!(pool.len(), 0);
}
