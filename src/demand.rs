use crate::col::{self, HashMap};
use crate::error::{SolverError, SolverResult};
use crate::network::{Network, NodeIdx};
use crate::primitives::FVal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Commodity {
    Passenger,
    Rebalancer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OdPair {
    pub origin: NodeIdx,
    pub destination: NodeIdx,
}

impl OdPair {
    pub fn new(origin: NodeIdx, destination: NodeIdx) -> Self {
        OdPair {
            origin,
            destination,
        }
    }

    /// Pairs ending in the rebalancer sink carry rebalancers.
    pub fn commodity(&self, network: &Network) -> Commodity {
        if network.is_sink(self.destination) {
            Commodity::Rebalancer
        } else {
            Commodity::Passenger
        }
    }
}

/// Demand per OD pair, iterated in insertion order.
///
/// Overwriting an existing pair keeps its position, so the order of
/// assignment stays stable across outer iterations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OdDemand {
    pairs: Vec<(OdPair, FVal)>,
    position: HashMap<OdPair, usize>,
}

impl OdDemand {
    pub fn new() -> Self {
        OdDemand {
            pairs: Vec::new(),
            position: col::map_new(),
        }
    }

    pub fn set(&mut self, pair: OdPair, demand: FVal) {
        match self.position.get(&pair) {
            Some(&pos) => self.pairs[pos].1 = demand,
            None => {
                self.position.insert(pair, self.pairs.len());
                self.pairs.push((pair, demand));
            }
        }
    }

    /// Sets demand for a pair given by external node ids.
    pub fn set_by_id(
        &mut self,
        network: &Network,
        origin: &str,
        destination: &str,
        demand: FVal,
    ) -> SolverResult<OdPair> {
        let pair = OdPair::new(network.node_idx(origin)?, network.node_idx(destination)?);
        self.set(pair, demand);
        Ok(pair)
    }

    pub fn get(&self, pair: &OdPair) -> Option<FVal> {
        self.position.get(pair).map(|&pos| self.pairs[pos].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (OdPair, FVal)> + '_ {
        self.pairs.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn total(&self, network: &Network, commodity: Commodity) -> FVal {
        self.iter()
            .filter(|(pair, _)| pair.commodity(network) == commodity)
            .map(|(_, demand)| demand)
            .sum()
    }

    /// Checks that every pair references nodes of `network` with a finite,
    /// non-negative demand.
    pub fn validate(&self, network: &Network) -> SolverResult<()> {
        for (pair, demand) in self.iter() {
            for node in [pair.origin, pair.destination] {
                if node.0 as usize >= network.num_nodes() {
                    return Err(SolverError::UnknownNode(format!("{:?}", node)));
                }
            }
            if !(demand.is_finite() && demand >= 0.0) {
                return Err(SolverError::InvalidDemand {
                    origin: network.node_id(pair.origin).to_string(),
                    destination: network.node_id(pair.destination).to_string(),
                    demand,
                });
            }
        }
        Ok(())
    }
}
