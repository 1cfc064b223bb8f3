use std::fmt::Debug;

use itertools::Itertools;
use log::debug;

use crate::col::{self, HashMap};
use crate::cost::CostModel;
use crate::error::{SolverError, SolverResult};
use crate::indexer::Indexer;
use crate::primitives::{FVal, EPS};

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIdx(pub u32);

impl Debug for NodeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("n#{}", self.0))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeIdx(pub u32);

impl Debug for EdgeIdx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("e#{}", self.0))
    }
}

/// Edges marked `Negative` take part in the inverse-demand shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Positive,
    Negative,
}

#[derive(Debug, Clone)]
pub struct NodePayload {
    pub id: String,
    pub incoming: Vec<EdgeIdx>,
    pub outgoing: Vec<EdgeIdx>,
    /// Added to the cost of every edge entering this node.
    pub potential: Option<FVal>,
    pub imbalance: FVal,
}

#[derive(Debug, Clone)]
pub struct EdgePayload {
    pub from: NodeIdx,
    pub to: NodeIdx,
    pub free_flow_cost: FVal,
    pub capacity: FVal,
    pub sign: Sign,
    pub is_dummy: bool,
    pub passenger_flow: FVal,
    pub rebalancer_flow: FVal,
    pub cost: FVal,
}

impl EdgePayload {
    pub fn total_flow(&self) -> FVal {
        self.passenger_flow + self.rebalancer_flow
    }
}

/// Static attributes of an edge as supplied by the caller.
#[derive(Debug, Clone, Copy)]
pub struct EdgeSpec {
    pub free_flow_cost: FVal,
    pub capacity: FVal,
    pub sign: Sign,
    pub is_dummy: bool,
}

impl EdgeSpec {
    pub fn road(free_flow_cost: FVal, capacity: FVal) -> Self {
        EdgeSpec {
            free_flow_cost,
            capacity,
            sign: Sign::Positive,
            is_dummy: false,
        }
    }

    pub fn inverse_demand(mut self) -> Self {
        self.sign = Sign::Negative;
        self
    }

    pub fn dummy(mut self) -> Self {
        self.is_dummy = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Network {
    nodes: Vec<NodePayload>,
    edges: Vec<EdgePayload>,
    index_by_id: HashMap<String, NodeIdx>,
    sink: Option<NodeIdx>,
    /// Terminal (elastic destination) to its paired real node.
    dummy_nodes: HashMap<NodeIdx, NodeIdx>,
}

impl Network {
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIdx, &NodePayload)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .map(|(idx, node)| (NodeIdx(idx as u32), node))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeIdx, &EdgePayload)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .map(|(idx, edge)| (EdgeIdx(idx as u32), edge))
    }

    pub fn edge_indices(
        &self,
    ) -> impl DoubleEndedIterator<Item = EdgeIdx> + ExactSizeIterator {
        (0..self.edges.len() as u32).map(EdgeIdx)
    }

    pub fn node(&self, node_idx: NodeIdx) -> &NodePayload {
        &self.nodes[node_idx.0 as usize]
    }

    pub fn node_mut(&mut self, node_idx: NodeIdx) -> &mut NodePayload {
        &mut self.nodes[node_idx.0 as usize]
    }

    pub fn edge(&self, edge_idx: EdgeIdx) -> &EdgePayload {
        &self.edges[edge_idx.0 as usize]
    }

    pub fn edge_mut(&mut self, edge_idx: EdgeIdx) -> &mut EdgePayload {
        &mut self.edges[edge_idx.0 as usize]
    }

    pub fn node_idx(&self, id: &str) -> SolverResult<NodeIdx> {
        self.index_by_id
            .get(id)
            .copied()
            .ok_or_else(|| SolverError::UnknownNode(id.to_string()))
    }

    pub fn node_id(&self, node_idx: NodeIdx) -> &str {
        &self.node(node_idx).id
    }

    pub fn sink(&self) -> Option<NodeIdx> {
        self.sink
    }

    pub fn is_sink(&self, node_idx: NodeIdx) -> bool {
        self.sink == Some(node_idx)
    }

    pub fn is_terminal(&self, node_idx: NodeIdx) -> bool {
        self.dummy_nodes.contains_key(&node_idx)
    }

    /// The real node paired with an elastic terminal.
    pub fn paired_node(&self, terminal: NodeIdx) -> Option<NodeIdx> {
        self.dummy_nodes.get(&terminal).copied()
    }

    pub fn has_terminals(&self) -> bool {
        !self.dummy_nodes.is_empty()
    }

    /// Whether the edge's passenger flow contributes to node imbalance.
    pub fn counts_towards_imbalance(&self, edge_idx: EdgeIdx) -> bool {
        let edge = self.edge(edge_idx);
        !edge.is_dummy && !self.is_terminal(edge.to)
    }

    /// The edge from `node_idx` into the rebalancer sink, if any.
    pub fn sink_edge(&self, node_idx: NodeIdx) -> Option<EdgeIdx> {
        let sink = self.sink?;
        self.node(node_idx)
            .outgoing
            .iter()
            .copied()
            .find(|&e| self.edge(e).to == sink)
    }

    pub fn dummy_edge(&self, from: NodeIdx, to: NodeIdx) -> Option<EdgeIdx> {
        self.node(from).outgoing.iter().copied().find(|&e| {
            let edge = self.edge(e);
            edge.is_dummy && edge.to == to
        })
    }

    pub fn enters_sink(&self, edge_idx: EdgeIdx) -> bool {
        self.is_sink(self.edge(edge_idx).to)
    }

    pub fn refresh_costs(&mut self, model: &CostModel) {
        for idx in 0..self.edges.len() {
            let potential = self.nodes[self.edges[idx].to.0 as usize].potential;
            let cost = model.edge_cost(&self.edges[idx], potential);
            self.edges[idx].cost = cost;
        }
    }

    /// Zeroes rebalancer flow on edges the cost model considers closed.
    pub fn drop_unusable_rebalancer_flow(&mut self, model: &CostModel) -> usize {
        let mut dropped = 0;
        for edge in self.edges.iter_mut() {
            if !model.is_usable(edge.capacity) && edge.rebalancer_flow != 0.0 {
                edge.rebalancer_flow = 0.0;
                dropped += 1;
            }
        }
        dropped
    }

    pub fn reset_flows(&mut self) {
        for edge in self.edges.iter_mut() {
            edge.passenger_flow = 0.0;
            edge.rebalancer_flow = 0.0;
        }
    }

    pub fn describe(&self) -> String {
        let terminals = self
            .dummy_nodes
            .keys()
            .map(|&t| self.node_id(t))
            .sorted()
            .join(", ");
        format!(
            "{} nodes, {} edges ({} dummy, {} inverse-demand), sink: {}, terminals: [{}]",
            self.num_nodes(),
            self.num_edges(),
            self.edges.iter().filter(|e| e.is_dummy).count(),
            self.edges.iter().filter(|e| e.sign == Sign::Negative).count(),
            self.sink.map_or("none", |s| self.node_id(s)),
            terminals
        )
    }
}

/// Assembles a [`Network`]. Nodes are created on first mention.
pub struct NetworkBuilder {
    indexer: Indexer<String, NodeIdx, fn(usize) -> NodeIdx>,
    potentials: Vec<(NodeIdx, FVal)>,
    edges: Vec<EdgePayload>,
    sink: Option<NodeIdx>,
    dummy_nodes: Vec<(NodeIdx, NodeIdx)>,
}

fn to_node_idx(idx: usize) -> NodeIdx {
    NodeIdx(idx as u32)
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkBuilder {
    pub fn new() -> Self {
        NetworkBuilder {
            indexer: Indexer::new(to_node_idx as fn(usize) -> NodeIdx),
            potentials: Vec::new(),
            edges: Vec::new(),
            sink: None,
            dummy_nodes: Vec::new(),
        }
    }

    pub fn node(&mut self, id: impl Into<String>) -> NodeIdx {
        self.indexer.index(id.into()).0
    }

    pub fn potential(&mut self, id: impl Into<String>, potential: FVal) -> &mut Self {
        let node_idx = self.node(id);
        self.potentials.push((node_idx, potential));
        self
    }

    pub fn edge(
        &mut self,
        from: impl Into<String>,
        to: impl Into<String>,
        spec: EdgeSpec,
    ) -> EdgeIdx {
        let from = self.node(from);
        let to = self.node(to);
        let edge_idx = EdgeIdx(self.edges.len() as u32);
        self.edges.push(EdgePayload {
            from,
            to,
            free_flow_cost: spec.free_flow_cost,
            capacity: spec.capacity,
            sign: spec.sign,
            is_dummy: spec.is_dummy,
            passenger_flow: 0.0,
            rebalancer_flow: 0.0,
            cost: 0.0,
        });
        edge_idx
    }

    pub fn rebalancer_sink(&mut self, id: impl Into<String>) -> &mut Self {
        self.sink = Some(self.node(id));
        self
    }

    /// Declares `terminal` as an elastic destination paired with `real`.
    pub fn dummy_node(&mut self, terminal: impl Into<String>, real: impl Into<String>) -> &mut Self {
        let terminal = self.node(terminal);
        let real = self.node(real);
        self.dummy_nodes.push((terminal, real));
        self
    }

    pub fn build(self) -> SolverResult<Network> {
        let (ids, index_by_id) = self.indexer.into_parts();
        let mut nodes: Vec<NodePayload> = ids
            .into_iter()
            .map(|id| NodePayload {
                id,
                incoming: Vec::new(),
                outgoing: Vec::new(),
                potential: None,
                imbalance: 0.0,
            })
            .collect();

        for (node_idx, potential) in self.potentials {
            if !potential.is_finite() {
                return Err(SolverError::InvalidNetwork(format!(
                    "potential {} on node '{}' is not finite",
                    potential, nodes[node_idx.0 as usize].id
                )));
            }
            nodes[node_idx.0 as usize].potential = Some(potential);
        }

        let mut edges = self.edges;
        for (idx, edge) in edges.iter_mut().enumerate() {
            let describe = || {
                format!(
                    "{} -> {}",
                    nodes[edge.from.0 as usize].id, nodes[edge.to.0 as usize].id
                )
            };
            if !edge.free_flow_cost.is_finite() {
                return Err(SolverError::InvalidNetwork(format!(
                    "free-flow cost of edge {} is not finite",
                    describe()
                )));
            }
            if !(edge.capacity.is_finite() && edge.capacity >= 0.0) {
                return Err(SolverError::InvalidNetwork(format!(
                    "capacity {} of edge {} is not a finite non-negative number",
                    edge.capacity,
                    describe()
                )));
            }
            if edge.capacity == 0.0 {
                debug!("Clamping zero capacity of edge {} to {}", describe(), EPS);
                edge.capacity = EPS;
            }
            let edge_idx = EdgeIdx(idx as u32);
            nodes[edge.from.0 as usize].outgoing.push(edge_idx);
            nodes[edge.to.0 as usize].incoming.push(edge_idx);
        }

        let mut dummy_nodes = col::map_new();
        for (terminal, real) in self.dummy_nodes {
            if self.sink == Some(terminal) {
                return Err(SolverError::InvalidNetwork(format!(
                    "rebalancer sink '{}' cannot be a terminal",
                    nodes[terminal.0 as usize].id
                )));
            }
            dummy_nodes.insert(terminal, real);
        }

        Ok(Network {
            nodes,
            edges,
            index_by_id,
            sink: self.sink,
            dummy_nodes,
        })
    }
}
