use crate::graph::{EdgeIndex, GraphModel, NodeIndex};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;
use wisdomgraph_core::{LayoutDirection, Position};

pub trait Layouter {
    fn execute(&self, model: &GraphModel) -> Layout;
}

/// Box dimensions and spacing shared by every node in a drawing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub direction: LayoutDirection,
    pub node_width: f64,
    pub node_height: f64,
    /// Gap between neighbours in the same rank.
    pub node_spacing: f64,
    /// Gap between consecutive ranks.
    pub rank_spacing: f64,
}

impl LayoutConfig {
    pub const DEFAULT_NODE_WIDTH: f64 = 172.0;
    pub const DEFAULT_NODE_HEIGHT: f64 = 36.0;
    pub const DEFAULT_NODE_SPACING: f64 = 50.0;
    pub const DEFAULT_RANK_SPACING: f64 = 80.0;

    pub fn with_direction(mut self, direction: LayoutDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn validate(&self) -> Result<(), LayoutConfigError> {
        if !(self.node_width.is_finite() && self.node_width > 0.0) {
            return Err(LayoutConfigError::NodeWidth(self.node_width));
        }
        if !(self.node_height.is_finite() && self.node_height > 0.0) {
            return Err(LayoutConfigError::NodeHeight(self.node_height));
        }
        if !(self.node_spacing.is_finite() && self.node_spacing >= 0.0) {
            return Err(LayoutConfigError::NodeSpacing(self.node_spacing));
        }
        if !(self.rank_spacing.is_finite() && self.rank_spacing >= 0.0) {
            return Err(LayoutConfigError::RankSpacing(self.rank_spacing));
        }
        Ok(())
    }

    /// Distance between neighbours along the in-rank axis.
    fn cross_step(&self) -> f64 {
        if self.direction.is_vertical() {
            self.node_width + self.node_spacing
        } else {
            self.node_height + self.node_spacing
        }
    }

    /// Distance between ranks along the flow axis.
    fn rank_step(&self) -> f64 {
        if self.direction.is_vertical() {
            self.node_height + self.rank_spacing
        } else {
            self.node_width + self.rank_spacing
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            direction: LayoutDirection::TopToBottom,
            node_width: Self::DEFAULT_NODE_WIDTH,
            node_height: Self::DEFAULT_NODE_HEIGHT,
            node_spacing: Self::DEFAULT_NODE_SPACING,
            rank_spacing: Self::DEFAULT_RANK_SPACING,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutConfigError {
    #[error("node_width must be a positive number, got {0}")]
    NodeWidth(f64),
    #[error("node_height must be a positive number, got {0}")]
    NodeHeight(f64),
    #[error("node_spacing must be zero or positive, got {0}")]
    NodeSpacing(f64),
    #[error("rank_spacing must be zero or positive, got {0}")]
    RankSpacing(f64),
}

/// Result of one layout pass, indexed by `NodeIndex`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Layout {
    positions: Vec<Position>,
    ranks: Vec<usize>,
    layers: Vec<Vec<NodeIndex>>,
    back_edges: Vec<EdgeIndex>,
}

impl Layout {
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn position(&self, index: NodeIndex) -> Option<Position> {
        self.positions.get(index.0).copied()
    }

    pub fn rank(&self, index: NodeIndex) -> Option<usize> {
        self.ranks.get(index.0).copied()
    }

    /// Final left-to-right (or top-to-bottom) order of each rank.
    pub fn layers(&self) -> &[Vec<NodeIndex>] {
        &self.layers
    }

    /// Edges ignored to make the graph acyclic.
    pub fn back_edges(&self) -> &[EdgeIndex] {
        &self.back_edges
    }

    pub fn positions(&self) -> impl Iterator<Item = (NodeIndex, Position)> + '_ {
        self.positions
            .iter()
            .enumerate()
            .map(|(idx, pos)| (NodeIndex(idx), *pos))
    }

    /// Writes every computed position into the model.
    pub fn apply_to(&self, model: &mut GraphModel) {
        for (idx, pos) in self.positions() {
            model.set_position_at(idx, pos);
        }
    }
}

/// Layered (Sugiyama-style) layout for rooted, near-tree concept maps.
///
/// Every call lays out the complete node/edge set: cycles are broken by
/// dropping DFS back-edges, ranks are longest-path depths from the roots,
/// each rank is ordered by the barycenter of its placed parents, and
/// coordinates come from the rank index and in-rank index.
#[derive(Debug, Clone, Default)]
pub struct LayeredLayouter {
    pub config: LayoutConfig,
}

#[derive(Default)]
struct Relations {
    outgoing: Vec<Vec<(EdgeIndex, NodeIndex)>>,
    in_degree: Vec<usize>,
    degree: Vec<usize>,
}

impl LayeredLayouter {
    pub fn new(config: LayoutConfig) -> Self {
        Self { config }
    }

    fn build_relations(model: &GraphModel) -> Relations {
        let n = model.node_count();
        let mut relations = Relations {
            outgoing: vec![Vec::new(); n],
            in_degree: vec![0; n],
            degree: vec![0; n],
        };

        for edge_idx in model.edge_indices() {
            let Some((source, target)) = model.edge_endpoints(edge_idx) else {
                tracing::warn!(
                    "Skipping edge {} with an endpoint missing from the graph model",
                    model[edge_idx].id
                );
                continue;
            };
            if source == target {
                continue;
            }
            relations.outgoing[source.0].push((edge_idx, target));
            relations.in_degree[target.0] += 1;
            relations.degree[source.0] += 1;
            relations.degree[target.0] += 1;
        }

        relations
    }

    /// Iterative DFS marking every edge that closes onto the current stack.
    /// Roots are visited first, then the remaining nodes, both in insertion
    /// order, so the chosen back-edges depend only on the input order.
    fn find_back_edges(relations: &Relations) -> HashSet<EdgeIndex> {
        const UNVISITED: u8 = 0;
        const ON_STACK: u8 = 1;
        const DONE: u8 = 2;

        let n = relations.outgoing.len();
        let mut state = vec![UNVISITED; n];
        let mut back_edges = HashSet::new();

        let roots = (0..n).filter(|&i| relations.in_degree[i] == 0);
        let rest = (0..n).filter(|&i| relations.in_degree[i] != 0);

        for start in roots.chain(rest) {
            if state[start] != UNVISITED {
                continue;
            }
            state[start] = ON_STACK;
            let mut stack: Vec<(usize, usize)> = vec![(start, 0)];

            while let Some(top) = stack.last_mut() {
                let (node, cursor) = *top;
                let Some(&(edge_idx, target)) = relations.outgoing[node].get(cursor) else {
                    state[node] = DONE;
                    stack.pop();
                    continue;
                };
                top.1 += 1;
                match state[target.0] {
                    UNVISITED => {
                        state[target.0] = ON_STACK;
                        stack.push((target.0, 0));
                    }
                    ON_STACK => {
                        back_edges.insert(edge_idx);
                    }
                    _ => {}
                }
            }
        }

        back_edges
    }

    /// Longest-path ranks over the acyclic edge set, plus each node's parents.
    fn assign_ranks(
        relations: &Relations,
        back_edges: &HashSet<EdgeIndex>,
    ) -> (Vec<usize>, Vec<Vec<NodeIndex>>) {
        let n = relations.outgoing.len();
        let mut parents: Vec<Vec<NodeIndex>> = vec![Vec::new(); n];
        let mut pending = vec![0usize; n];

        for (source, targets) in relations.outgoing.iter().enumerate() {
            for &(edge_idx, target) in targets {
                if back_edges.contains(&edge_idx) {
                    continue;
                }
                parents[target.0].push(NodeIndex(source));
                pending[target.0] += 1;
            }
        }

        let mut ranks = vec![0usize; n];
        let mut queue: VecDeque<usize> = (0..n).filter(|&i| pending[i] == 0).collect();
        let mut visited = 0usize;

        while let Some(node) = queue.pop_front() {
            visited += 1;
            for &(edge_idx, target) in &relations.outgoing[node] {
                if back_edges.contains(&edge_idx) {
                    continue;
                }
                ranks[target.0] = ranks[target.0].max(ranks[node] + 1);
                pending[target.0] -= 1;
                if pending[target.0] == 0 {
                    queue.push_back(target.0);
                }
            }
        }

        if visited != n {
            // Unreachable once back-edges are removed; keep the pass total anyway.
            tracing::warn!(
                "Rank assignment left {} nodes unranked; placing them at rank 0",
                n - visited
            );
        }

        (ranks, parents)
    }

    /// Groups nodes by rank in insertion order. Nodes without any edges go
    /// to the end of rank 0 so they sit in their own lane.
    fn build_layers(ranks: &[usize], relations: &Relations) -> Vec<Vec<NodeIndex>> {
        let rank_count = ranks.iter().copied().max().map_or(0, |max| max + 1);
        let mut layers: Vec<Vec<NodeIndex>> = vec![Vec::new(); rank_count];
        let mut isolated = Vec::new();

        for (idx, &rank) in ranks.iter().enumerate() {
            if relations.degree[idx] == 0 {
                isolated.push(NodeIndex(idx));
            } else {
                layers[rank].push(NodeIndex(idx));
            }
        }

        if let Some(first) = layers.first_mut() {
            first.extend(isolated);
        }
        layers
    }

    fn order_layer_by_barycenter(
        layer_nodes: &mut [NodeIndex],
        cross: &[Option<f64>],
        parents: &[Vec<NodeIndex>],
    ) {
        let barycenter = |node: NodeIndex| -> Option<f64> {
            let placed: Vec<f64> = parents[node.0].iter().filter_map(|p| cross[p.0]).collect();
            if placed.is_empty() {
                None
            } else {
                Some(placed.iter().sum::<f64>() / placed.len() as f64)
            }
        };

        let mut keyed: Vec<(Option<f64>, NodeIndex)> = layer_nodes
            .iter()
            .map(|&node| (barycenter(node), node))
            .collect();

        // Nodes without placed parents keep their relative order after the rest.
        keyed.sort_by(|(a_bary, a), (b_bary, b)| {
            let by_bary = match (a_bary, b_bary) {
                (Some(x), Some(y)) => x.total_cmp(y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_bary.then_with(|| a.cmp(b))
        });

        for (slot, (_, node)) in layer_nodes.iter_mut().zip(keyed) {
            *slot = node;
        }
    }

    fn place_layer(layer_nodes: &[NodeIndex], cross: &mut [Option<f64>], cross_step: f64) {
        let extent = layer_nodes.len().saturating_sub(1) as f64 * cross_step;
        let offset = -extent / 2.0;
        for (j, &node) in layer_nodes.iter().enumerate() {
            cross[node.0] = Some(offset + j as f64 * cross_step);
        }
    }

    fn to_position(&self, rank: usize, max_rank: usize, cross: f64) -> Position {
        let main = |r: usize| r as f64 * self.config.rank_step();
        match self.config.direction {
            LayoutDirection::TopToBottom => Position::new(cross, main(rank)),
            LayoutDirection::BottomToTop => Position::new(cross, main(max_rank - rank)),
            LayoutDirection::LeftToRight => Position::new(main(rank), cross),
            LayoutDirection::RightToLeft => Position::new(main(max_rank - rank), cross),
        }
    }
}

impl Layouter for LayeredLayouter {
    fn execute(&self, model: &GraphModel) -> Layout {
        let n = model.node_count();
        if n == 0 {
            return Layout::default();
        }

        let relations = Self::build_relations(model);
        let back_edges = Self::find_back_edges(&relations);
        if !back_edges.is_empty() {
            tracing::warn!(
                back_edge_count = back_edges.len(),
                "Graph contains cycles; ignoring back-edges for layout"
            );
        }

        let (ranks, parents) = Self::assign_ranks(&relations, &back_edges);
        let mut layers = Self::build_layers(&ranks, &relations);
        let cross_step = self.config.cross_step();
        let mut cross: Vec<Option<f64>> = vec![None; n];

        for (rank, layer_nodes) in layers.iter_mut().enumerate() {
            if rank > 0 {
                Self::order_layer_by_barycenter(layer_nodes, &cross, &parents);
            }
            Self::place_layer(layer_nodes, &mut cross, cross_step);
        }

        let max_rank = layers.len().saturating_sub(1);
        let positions = (0..n)
            .map(|idx| self.to_position(ranks[idx], max_rank, cross[idx].unwrap_or(0.0)))
            .collect();

        let mut back_edges: Vec<EdgeIndex> = back_edges.into_iter().collect();
        back_edges.sort();

        tracing::debug!(
            node_count = n,
            edge_count = model.edge_count(),
            rank_count = layers.len(),
            back_edge_count = back_edges.len(),
            "layered layout complete"
        );

        Layout {
            positions,
            ranks,
            layers,
            back_edges,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use wisdomgraph_core::{ConceptEdge, ConceptNode, NodeId};

    fn add_node(model: &mut GraphModel, id: &str) {
        model.add_node(ConceptNode::new(id, id)).unwrap();
    }

    fn add_edge(model: &mut GraphModel, source: &str, target: &str) {
        let id = format!("e-{source}-{target}-{}", model.edge_count());
        model
            .add_edge(ConceptEdge::new(id, NodeId::from(source), NodeId::from(target)))
            .unwrap();
    }

    fn idx(model: &GraphModel, id: &str) -> NodeIndex {
        model.node_index(&NodeId::from(id)).unwrap()
    }

    fn boxes_overlap(a: Position, b: Position, config: &LayoutConfig) -> bool {
        a.x < b.x + config.node_width
            && b.x < a.x + config.node_width
            && a.y < b.y + config.node_height
            && b.y < a.y + config.node_height
    }

    fn assert_no_overlap(layout: &Layout, config: &LayoutConfig) {
        let positions: Vec<_> = layout.positions().collect();
        for (i, &(a_idx, a)) in positions.iter().enumerate() {
            for &(b_idx, b) in &positions[i + 1..] {
                assert!(
                    !boxes_overlap(a, b, config),
                    "nodes {a_idx} and {b_idx} overlap: {a:?} vs {b:?}"
                );
            }
        }
    }

    #[test]
    fn test_empty_graph_yields_empty_layout() {
        let layout = LayeredLayouter::default().execute(&GraphModel::new());
        assert!(layout.is_empty());
        assert!(layout.layers().is_empty());
    }

    #[test]
    fn test_single_tree_ranks_and_order() {
        let mut model = GraphModel::new();
        for id in ["A", "B", "C", "D"] {
            add_node(&mut model, id);
        }
        add_edge(&mut model, "A", "B");
        add_edge(&mut model, "A", "C");
        add_edge(&mut model, "A", "D");

        let config = LayoutConfig::default();
        let layout = LayeredLayouter::new(config).execute(&model);

        assert_eq!(layout.rank(idx(&model, "A")), Some(0));
        for child in ["B", "C", "D"] {
            assert_eq!(layout.rank(idx(&model, child)), Some(1));
        }

        let xs: Vec<f64> = ["B", "C", "D"]
            .iter()
            .map(|id| layout.position(idx(&model, id)).unwrap().x)
            .collect();
        assert!(xs[0] + config.node_width <= xs[1]);
        assert!(xs[1] + config.node_width <= xs[2]);

        // Recentred: middle child sits under the root.
        let root = layout.position(idx(&model, "A")).unwrap();
        assert_eq!(root.x, 0.0);
        assert_eq!(xs[1], 0.0);
        assert_eq!(root.y, 0.0);
        assert_eq!(
            layout.position(idx(&model, "B")).unwrap().y,
            config.node_height + config.rank_spacing
        );
        assert_no_overlap(&layout, &config);
    }

    #[test]
    fn test_rank_is_longest_path() {
        let mut model = GraphModel::new();
        for id in ["r", "a", "b", "c"] {
            add_node(&mut model, id);
        }
        add_edge(&mut model, "r", "a");
        add_edge(&mut model, "a", "b");
        add_edge(&mut model, "b", "c");
        add_edge(&mut model, "r", "c");

        let layout = LayeredLayouter::default().execute(&model);
        assert_eq!(layout.rank(idx(&model, "c")), Some(3));
    }

    #[test]
    fn test_cycle_terminates_with_back_edge() {
        let mut model = GraphModel::new();
        for id in ["a", "b", "c"] {
            add_node(&mut model, id);
        }
        add_edge(&mut model, "a", "b");
        add_edge(&mut model, "b", "c");
        add_edge(&mut model, "c", "a");

        let layout = LayeredLayouter::default().execute(&model);
        assert_eq!(layout.len(), 3);
        assert_eq!(layout.back_edges(), &[EdgeIndex(2)]);
        assert_eq!(layout.rank(idx(&model, "a")), Some(0));
        assert_eq!(layout.rank(idx(&model, "b")), Some(1));
        assert_eq!(layout.rank(idx(&model, "c")), Some(2));
    }

    #[test]
    fn test_cycle_below_root_is_broken_from_root_side() {
        let mut model = GraphModel::new();
        // Inserted before the root on purpose.
        for id in ["x", "y", "root"] {
            add_node(&mut model, id);
        }
        add_edge(&mut model, "x", "y");
        add_edge(&mut model, "y", "x");
        add_edge(&mut model, "root", "x");

        let layout = LayeredLayouter::default().execute(&model);
        assert_eq!(layout.rank(idx(&model, "root")), Some(0));
        assert_eq!(layout.rank(idx(&model, "x")), Some(1));
        assert_eq!(layout.rank(idx(&model, "y")), Some(2));
    }

    #[test]
    fn test_self_loop_is_ignored() {
        let mut model = GraphModel::new();
        add_node(&mut model, "a");
        add_edge(&mut model, "a", "a");
        let layout = LayeredLayouter::default().execute(&model);
        assert_eq!(layout.rank(idx(&model, "a")), Some(0));
        assert!(layout.back_edges().is_empty());
    }

    #[test]
    fn test_isolated_nodes_follow_connected_roots() {
        let mut model = GraphModel::new();
        for id in ["lonely", "root", "child"] {
            add_node(&mut model, id);
        }
        add_edge(&mut model, "root", "child");

        let layout = LayeredLayouter::default().execute(&model);
        assert_eq!(
            layout.layers()[0],
            vec![idx(&model, "root"), idx(&model, "lonely")]
        );
        assert_eq!(layout.rank(idx(&model, "lonely")), Some(0));
    }

    #[test]
    fn test_barycenter_follows_parent_order() {
        let mut model = GraphModel::new();
        for id in ["p1", "p2", "c_of_p2", "c_of_p1"] {
            add_node(&mut model, id);
        }
        // Children inserted in the opposite order of their parents.
        add_edge(&mut model, "p2", "c_of_p2");
        add_edge(&mut model, "p1", "c_of_p1");

        let layout = LayeredLayouter::default().execute(&model);
        assert_eq!(
            layout.layers()[1],
            vec![idx(&model, "c_of_p1"), idx(&model, "c_of_p2")]
        );
    }

    #[test]
    fn test_shared_child_sits_between_its_parents_children() {
        let mut model = GraphModel::new();
        for id in ["p1", "p3", "c", "b", "a"] {
            add_node(&mut model, id);
        }
        add_edge(&mut model, "p3", "c");
        add_edge(&mut model, "p1", "b");
        add_edge(&mut model, "p3", "b");
        add_edge(&mut model, "p1", "a");

        let layout = LayeredLayouter::default().execute(&model);
        assert_eq!(
            layout.layers()[1],
            vec![idx(&model, "a"), idx(&model, "b"), idx(&model, "c")]
        );
        let x = |id| layout.position(idx(&model, id)).unwrap().x;
        assert!(x("p1") < x("p3"));
        assert!(x("a") < x("b"));
        assert!(x("b") < x("c"));
    }

    #[test]
    fn test_direction_changes_primary_axis() {
        let mut model = GraphModel::new();
        add_node(&mut model, "a");
        add_node(&mut model, "b");
        add_edge(&mut model, "a", "b");

        let run = |direction| {
            let layout = LayeredLayouter::new(LayoutConfig::default().with_direction(direction))
                .execute(&model);
            (
                layout.position(idx(&model, "a")).unwrap(),
                layout.position(idx(&model, "b")).unwrap(),
            )
        };

        let (a, b) = run(LayoutDirection::TopToBottom);
        assert!(b.y > a.y);
        let (a, b) = run(LayoutDirection::BottomToTop);
        assert!(b.y < a.y);
        let (a, b) = run(LayoutDirection::LeftToRight);
        assert!(b.x > a.x);
        assert_eq!(a.y, b.y);
        let (a, b) = run(LayoutDirection::RightToLeft);
        assert!(b.x < a.x);
    }

    #[test]
    fn test_config_validation() {
        assert!(LayoutConfig::default().validate().is_ok());
        let bad = LayoutConfig {
            node_width: 0.0,
            ..LayoutConfig::default()
        };
        assert_eq!(bad.validate(), Err(LayoutConfigError::NodeWidth(0.0)));
        let bad = LayoutConfig {
            rank_spacing: -1.0,
            ..LayoutConfig::default()
        };
        assert_eq!(bad.validate(), Err(LayoutConfigError::RankSpacing(-1.0)));
    }

    #[test]
    fn test_config_deserializes_partial_json() {
        let config: LayoutConfig =
            serde_json::from_str(r#"{"direction":"left-to-right","node_width":100.0}"#).unwrap();
        assert_eq!(config.direction, LayoutDirection::LeftToRight);
        assert_eq!(config.node_width, 100.0);
        assert_eq!(config.node_height, LayoutConfig::DEFAULT_NODE_HEIGHT);
    }

    fn arbitrary_graph() -> impl Strategy<Value = GraphModel> {
        (1usize..24)
            .prop_flat_map(|n| (Just(n), prop::collection::vec((0..n, 0..n), 0..40)))
            .prop_map(|(n, pairs)| {
                let mut model = GraphModel::new();
                for i in 0..n {
                    add_node(&mut model, &format!("n{i}"));
                }
                for (s, t) in pairs {
                    add_edge(&mut model, &format!("n{s}"), &format!("n{t}"));
                }
                model
            })
    }

    proptest! {
        #[test]
        fn prop_layout_has_no_overlap(model in arbitrary_graph(), dir in 0usize..4) {
            let direction = [
                LayoutDirection::TopToBottom,
                LayoutDirection::BottomToTop,
                LayoutDirection::LeftToRight,
                LayoutDirection::RightToLeft,
            ][dir];
            let config = LayoutConfig::default().with_direction(direction);
            let layout = LayeredLayouter::new(config).execute(&model);
            prop_assert_eq!(layout.len(), model.node_count());
            assert_no_overlap(&layout, &config);
        }

        #[test]
        fn prop_layout_is_deterministic(model in arbitrary_graph()) {
            let layouter = LayeredLayouter::default();
            prop_assert_eq!(layouter.execute(&model), layouter.execute(&model));
        }

        #[test]
        fn prop_forward_edges_increase_rank(model in arbitrary_graph()) {
            let layout = LayeredLayouter::default().execute(&model);
            for edge_idx in model.edge_indices() {
                let (s, t) = model.edge_endpoints(edge_idx).unwrap();
                if s == t || layout.back_edges().contains(&edge_idx) {
                    continue;
                }
                prop_assert!(layout.rank(t).unwrap() > layout.rank(s).unwrap());
            }
        }
    }
}
