// Example: persistent snapshots and a viewport query over summed row heights.
use virtual_tree::{AggregateTree, TreeOptions, UniqueKey, WindowBounds, visible_entries};

fn main() {
    let options = TreeOptions::<UniqueKey<u32>, u64, u64>::summing(|_, height| *height);
    let mut rows = AggregateTree::new(options);
    let mut keys = Vec::new();
    for i in 0..100_000u32 {
        let key = UniqueKey::new(i / 10);
        rows = rows.with(key.clone(), 20 + u64::from(i % 7) * 4);
        keys.push(key);
    }
    println!("rows={} total_height={}", rows.len(), rows.total());

    let snapshot = rows.clone();
    rows = rows.without(&keys[0]).with(keys[1].clone(), 400);
    println!(
        "snapshot_height={} current_height={}",
        snapshot.total(),
        rows.total()
    );

    let bounds = WindowBounds::new(1_234_567, 600, 0.5);
    let visible: Vec<_> = visible_entries(&rows, bounds, |_, height| *height).collect();
    println!("bounds={bounds:?} visible={}", visible.len());
    println!("first_visible={:?}", visible.first());
}
