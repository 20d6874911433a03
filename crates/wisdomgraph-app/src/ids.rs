use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use wisdomgraph_core::NodeId;

/// Issues ids for nodes created by expansion: `{parent}-{counter}-{random}`.
///
/// The counter is monotonic for the generator's lifetime and the random
/// component keeps ids unique across generators (e.g. after an import).
/// Candidates that collide with `taken` are discarded and redrawn.
#[derive(Debug, Default)]
pub struct NodeIdGenerator {
    counter: AtomicU64,
}

impl NodeIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self, parent: &NodeId, taken: impl Fn(&str) -> bool) -> NodeId {
        let mut rng = rand::thread_rng();
        loop {
            let counter = self.counter.fetch_add(1, Ordering::Relaxed);
            let suffix: u32 = rng.r#gen();
            let candidate = format!("{parent}-{counter}-{suffix:08x}");
            if !taken(&candidate) {
                return NodeId(candidate);
            }
            tracing::debug!(candidate = %candidate, "node id collision, redrawing");
        }
    }
}

/// `e-{source}-{target}`, or the first free `e-{source}-{target}-{n}` (n >= 2).
pub fn edge_id_for(source: &str, target: &str, taken: impl Fn(&str) -> bool) -> String {
    let base = format!("e-{source}-{target}");
    if !taken(&base) {
        return base;
    }
    (2u64..)
        .map(|n| format!("{base}-{n}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or(base)
}
