use std::time::Duration;

use virtual_tree_adapter::{
    QueueExecutor, ResourceHost, ViewportState, WindowEngine, WindowOptions,
};

#[derive(Debug)]
struct Message {
    text: String,
    lines: u64,
}

/// Stands in for a UI toolkit: resources are plain strings describing a label widget.
#[derive(Default)]
struct Labels {
    created: usize,
}

impl ResourceHost<Message> for Labels {
    type Kind = u64;
    type Resource = String;

    fn kind_of(&self, payload: &Message) -> u64 {
        payload.lines.min(3)
    }

    fn create_resource(&mut self, kind: &u64) -> String {
        self.created += 1;
        format!("label#{} ({kind} lines)", self.created)
    }

    fn bind_payload(&mut self, label: &mut String, payload: &Message) {
        label.truncate(label.find(':').unwrap_or(label.len()));
        label.push_str(": ");
        label.push_str(&payload.text);
    }

    fn place(&mut self, _label: &mut String, _offset: u64) {}

    fn show(&mut self, _label: &mut String) {}

    fn hide(&mut self, _label: &mut String) {}
}

fn main() {
    // Example: a chat log whose messages arrive out of order, drained once per "frame".
    let frame = QueueExecutor::new();
    let options = WindowOptions::new(|_: &u64, m: &Message| m.lines * 18)
        .with_cooldown(Duration::ZERO)
        .with_executor(frame.clone())
        .with_initial_viewport(ViewportState::new(0, 600));
    let engine = WindowEngine::new(options, Labels::default());

    for seq in (0..5_000u64).rev() {
        engine.add(
            seq,
            Message {
                text: format!("message {seq}"),
                lines: 1 + seq % 4,
            },
        );
    }
    println!("queued_jobs={} len={}", frame.pending(), engine.len());
    frame.run_pending();

    for offset in [0u64, 9_000, 90_000, 9_000] {
        engine.set_scroll_offset(offset);
        let summary = engine.schedule_recompute();
        frame.run_pending();
        println!("offset={offset} summary={:?}", summary.try_take());
    }

    let first = engine.visible_items().into_iter().next();
    println!(
        "first_visible={:?} pools={:?} created={}",
        first.map(|item| (item.offset, item.payload.text.clone())),
        engine.pool_stats(),
        engine.with_host(|labels| labels.created),
    );
}
