//! `PropertySet` and related types for pass communication.
//!
//! Layout passes decide where each logical qubit lives on the device, and the
//! lowering pass reads that decision back. The [`PropertySet`] carries these
//! shared facts through the pass pipeline.
//!
//! # Examples
//!
//! ```
//! use qcal_compile::{CouplingMap, Layout, PropertySet};
//! use qcal_ir::QubitId;
//!
//! let props = PropertySet::new()
//!     .with_coupling_map(CouplingMap::linear(3))
//!     .with_layout(Layout::from_pairs([(QubitId(0), 2), (QubitId(1), 1)]));
//!
//! let layout = props.layout.as_ref().unwrap();
//! assert_eq!(layout.get_physical(QubitId(0)), Some(2));
//! assert_eq!(layout.get_physical(QubitId(1)), Some(1));
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use qcal_ir::QubitId;

/// A mapping from logical qubits to physical qubits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Map from logical qubit to physical qubit index.
    logical_to_physical: FxHashMap<QubitId, u32>,
    /// Map from physical qubit index to logical qubit.
    physical_to_logical: FxHashMap<u32, QubitId>,
}

impl Layout {
    /// Create a new empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a layout that keeps every qubit on the physical index equal to its id.
    pub fn trivial(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self::from_pairs(qubits.into_iter().map(|q| (q, q.0)))
    }

    /// Create a layout from (logical, physical) pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (QubitId, u32)>) -> Self {
        let mut layout = Self::new();
        for (logical, physical) in pairs {
            layout.add(logical, physical);
        }
        layout
    }

    /// Add a mapping from logical to physical qubit.
    ///
    /// Any previous mapping of either side is dropped so both maps stay
    /// mutually inverse.
    pub fn add(&mut self, logical: QubitId, physical: u32) {
        if let Some(&old_logical) = self.physical_to_logical.get(&physical) {
            if old_logical != logical {
                self.logical_to_physical.remove(&old_logical);
            }
        }
        if let Some(&old_physical) = self.logical_to_physical.get(&logical) {
            if old_physical != physical {
                self.physical_to_logical.remove(&old_physical);
            }
        }
        self.logical_to_physical.insert(logical, physical);
        self.physical_to_logical.insert(physical, logical);
    }

    /// Get the physical qubit for a logical qubit.
    pub fn get_physical(&self, logical: QubitId) -> Option<u32> {
        self.logical_to_physical.get(&logical).copied()
    }

    /// Get the number of mapped qubits.
    pub fn len(&self) -> usize {
        self.logical_to_physical.len()
    }

    /// Check if the layout is empty.
    pub fn is_empty(&self) -> bool {
        self.logical_to_physical.is_empty()
    }

    /// Iterate over (logical, physical) pairs in ascending logical order.
    pub fn iter(&self) -> impl Iterator<Item = (QubitId, u32)> + '_ {
        let mut pairs: Vec<_> = self
            .logical_to_physical
            .iter()
            .map(|(&l, &p)| (l, p))
            .collect();
        pairs.sort_unstable();
        pairs.into_iter()
    }
}

/// Target device coupling map.
///
/// The coupling map defines which pairs of physical qubits can interact with
/// two-qubit gates and how many physical qubits the device has.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingMap {
    /// List of connected qubit pairs (bidirectional).
    edges: Vec<(u32, u32)>,
    /// Number of physical qubits.
    num_qubits: u32,
    /// Adjacency list for fast lookup.
    #[serde(skip)]
    adjacency: FxHashMap<u32, Vec<u32>>,
}

impl CouplingMap {
    /// Create a new coupling map with the given number of qubits.
    pub fn new(num_qubits: u32) -> Self {
        Self {
            edges: vec![],
            num_qubits,
            adjacency: FxHashMap::default(),
        }
    }

    /// Add an edge between two qubits (bidirectional).
    ///
    /// Duplicate edges (including reversed pairs) are ignored.
    pub fn add_edge(&mut self, q1: u32, q2: u32) {
        if self
            .edges
            .iter()
            .any(|&(a, b)| (a == q1 && b == q2) || (a == q2 && b == q1))
        {
            return;
        }
        self.edges.push((q1, q2));
        self.adjacency.entry(q1).or_default().push(q2);
        self.adjacency.entry(q2).or_default().push(q1);
    }

    /// Rebuild the adjacency list from the edge list.
    ///
    /// Must be called after deserialization.
    pub fn rebuild_caches(&mut self) {
        self.adjacency.clear();
        for &(q1, q2) in &self.edges {
            self.adjacency.entry(q1).or_default().push(q2);
            self.adjacency.entry(q2).or_default().push(q1);
        }
    }

    /// Check if two qubits are directly connected.
    #[inline]
    pub fn is_connected(&self, q1: u32, q2: u32) -> bool {
        self.adjacency
            .get(&q1)
            .is_some_and(|neighbors| neighbors.contains(&q2))
    }

    /// Get the number of physical qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Get the coupling edges.
    pub fn edges(&self) -> &[(u32, u32)] {
        &self.edges
    }

    /// Create a linear coupling map (0-1-2-3-...).
    pub fn linear(n: u32) -> Self {
        let mut map = Self::new(n);
        for i in 0..n.saturating_sub(1) {
            map.add_edge(i, i + 1);
        }
        map
    }
}

/// Properties shared between compilation passes.
///
/// | Field | Type | Description |
/// |-------|------|-------------|
/// | `layout` | [`Layout`] | Logical-to-physical qubit mapping |
/// | `coupling_map` | [`CouplingMap`] | Device connectivity graph |
#[derive(Debug, Default, Clone)]
pub struct PropertySet {
    /// Qubit layout mapping (logical → physical).
    ///
    /// Supplied by the caller or set by the layout pass.
    pub layout: Option<Layout>,

    /// Target coupling map defining device size and allowed interactions.
    pub coupling_map: Option<CouplingMap>,
}

impl PropertySet {
    /// Create a new empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the target coupling map.
    #[must_use]
    pub fn with_coupling_map(mut self, coupling_map: CouplingMap) -> Self {
        self.coupling_map = Some(coupling_map);
        self
    }

    /// Set the layout.
    #[must_use]
    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_trivial() {
        let layout = Layout::trivial([QubitId(0), QubitId(3)]);
        assert_eq!(layout.get_physical(QubitId(3)), Some(3));
        assert_eq!(layout.get_physical(QubitId(0)), Some(0));
        assert_eq!(layout.len(), 2);
    }

    #[test]
    fn test_layout_remapping_stays_consistent() {
        let mut layout = Layout::from_pairs([(QubitId(0), 0), (QubitId(1), 1)]);
        layout.add(QubitId(0), 1);

        assert_eq!(layout.get_physical(QubitId(0)), Some(1));
        assert_eq!(layout.get_physical(QubitId(1)), None);
        assert_eq!(layout.iter().collect::<Vec<_>>(), vec![(QubitId(0), 1)]);
    }

    #[test]
    fn test_coupling_map_linear() {
        let map = CouplingMap::linear(5);
        assert!(map.is_connected(0, 1));
        assert!(map.is_connected(2, 1));
        assert!(!map.is_connected(0, 2));
        assert_eq!(map.edges().len(), 4);
    }

    #[test]
    fn test_coupling_map_ignores_duplicate_edges() {
        let mut map = CouplingMap::linear(3);
        map.add_edge(1, 0);
        map.add_edge(1, 2);
        assert_eq!(map.edges(), &[(0, 1), (1, 2)]);
    }

    #[test]
    fn test_coupling_map_serde_requires_rebuild() {
        let json = serde_json::to_string(&CouplingMap::linear(3)).unwrap();
        let mut restored: CouplingMap = serde_json::from_str(&json).unwrap();
        assert!(!restored.is_connected(0, 1));
        restored.rebuild_caches();
        assert!(restored.is_connected(0, 1));
    }
}
