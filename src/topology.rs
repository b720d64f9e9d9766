//! Component H: the topology facade — four public constructors plus the
//! read-only query surface consumed by downstream code (a spectral-element
//! grid builder, in the originating system).
//!
//! Grounded on the mesh crate's `Dimension` enum (`mesh/dimension.rs`):
//! a small, plain, `Copy` enum with a tiny associated-constant surface, no
//! value-level generic dispatch over element kind.

use std::ops::Range;

use itertools::Itertools;
use ndarray::{Array2, Array3};
use petgraph::prelude::UnGraphMap;
use serde::{Deserialize, Serialize};

use crate::brick::{generate_brick, BrickInput};
use crate::comm::Comm;
use crate::connectivity::build_connectivity;
use crate::cubed_shell::generate_cubed_shell;
use crate::dim::Dim;
use crate::error::{Result, TopologyError};
use crate::sfc::sfc_partition;
use crate::stack::{extrude, StackInput};

/// Distinguishes the four constructors at the value level; stacked variants
/// carry their extra `stacksize`. Collapses the source's
/// topology/stacked-topology inheritance into one tagged enum, per the
/// design note that inheritance here is better served by a flat variant
/// than a trait hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopologyKind {
    Brick,
    StackedBrick { stacksize: usize },
    CubedShell,
    StackedCubedSphere { stacksize: usize },
}

/// Recognized constructor options (§4.H's enumerated table). Each
/// constructor only exposes the options meaningful to it; passing an
/// out-of-range *value* for a recognized option (e.g. `ghostsize != 1`)
/// fails at construction time with [`TopologyError::Unsupported`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyOptions {
    pub periodicity: Vec<bool>,
    pub boundary: Vec<[i32; 2]>,
    pub connectivity: Connectivity,
    pub ghostsize: usize,
    /// Sphere-stack-only inner/outer radial boundary tags.
    pub bc: (i32, i32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connectivity {
    /// The only recognized scheme: neighbors share a full face.
    Face,
    /// Vertex-adjacency (neighbors sharing only a corner); representable so
    /// callers can ask for it, but rejected at construction time since the
    /// connectivity engine (component E) only ever builds face neighbors.
    Vertex,
}

impl Default for TopologyOptions {
    fn default() -> Self {
        TopologyOptions {
            periodicity: Vec::new(),
            boundary: Vec::new(),
            connectivity: Connectivity::Face,
            ghostsize: 1,
            bc: (1, 1),
        }
    }
}

impl TopologyOptions {
    fn validate_common(&self) -> Result<()> {
        if self.connectivity != Connectivity::Face {
            return Err(TopologyError::Unsupported(
                "only face connectivity is recognized".to_string(),
            ));
        }
        if self.ghostsize != 1 {
            return Err(TopologyError::Unsupported(format!(
                "ghostsize {} is not recognized, only 1",
                self.ghostsize
            )));
        }
        Ok(())
    }
}

/// An immutable, collectively-constructed record of one rank's view of the
/// mesh. Built once by a collective call across every rank of `comm`;
/// read-only thereafter (enforced by exposing no mutating methods, not by a
/// runtime lock — §5 notes no locking is required for an immutable value).
pub struct Topology {
    pub(crate) kind: TopologyKind,
    pub(crate) dim: Dim,
    pub(crate) comm: Box<dyn Comm>,
    pub(crate) nreal: usize,
    pub(crate) nghost: usize,
    /// `(3, 2^dim, nreal+nghost)`.
    pub(crate) elemtocoord: Array3<f64>,
    /// `(2*dim, nreal)`, local indices (ghosts are `nreal..nreal+nghost`).
    pub(crate) elemtoelem: Array2<usize>,
    pub(crate) elemtoface: Array2<usize>,
    pub(crate) elemtoordr: Array2<i32>,
    pub(crate) elemtobndy: Array2<i32>,
    pub(crate) global_id: Vec<usize>,
    pub(crate) ghost_global_id: Vec<usize>,
    pub(crate) sendelems: Vec<usize>,
    pub(crate) nabrtorank: Vec<i32>,
    pub(crate) nabrtorecv: Vec<Range<usize>>,
    pub(crate) nabrtosend: Vec<Range<usize>>,
    pub(crate) stacksize: Option<usize>,
}

impl Topology {
    pub fn kind(&self) -> TopologyKind {
        self.kind
    }

    pub fn dim(&self) -> Dim {
        self.dim
    }

    pub fn comm(&self) -> &dyn Comm {
        self.comm.as_ref()
    }

    pub fn elems(&self) -> Range<usize> {
        0..(self.nreal + self.nghost)
    }

    pub fn realelems(&self) -> Range<usize> {
        0..self.nreal
    }

    pub fn ghostelems(&self) -> Range<usize> {
        self.nreal..(self.nreal + self.nghost)
    }

    pub fn sendelems(&self) -> &[usize] {
        &self.sendelems
    }

    pub fn elemtocoord(&self) -> &Array3<f64> {
        &self.elemtocoord
    }

    pub fn elemtoelem(&self) -> &Array2<usize> {
        &self.elemtoelem
    }

    pub fn elemtoface(&self) -> &Array2<usize> {
        &self.elemtoface
    }

    pub fn elemtoordr(&self) -> &Array2<i32> {
        &self.elemtoordr
    }

    pub fn elemtobndy(&self) -> &Array2<i32> {
        &self.elemtobndy
    }

    /// Global element id of real element `e` (`0..nreal`) or ghost element
    /// `e` (`nreal..nreal+nghost`).
    pub fn global_id(&self, e: usize) -> usize {
        if e < self.nreal {
            self.global_id[e]
        } else {
            self.ghost_global_id[e - self.nreal]
        }
    }

    pub fn nabrtorank(&self) -> &[i32] {
        &self.nabrtorank
    }

    pub fn nabrtorecv(&self) -> &[Range<usize>] {
        &self.nabrtorecv
    }

    pub fn nabrtosend(&self) -> &[Range<usize>] {
        &self.nabrtosend
    }

    pub fn stacksize(&self) -> Option<usize> {
        self.stacksize
    }

    /// The face-adjacency graph of this rank's elements (real and ghost):
    /// one node per local element index, one undirected edge per
    /// non-boundary face, weighted by the lower-indexed endpoint's local
    /// face number. Mirrors the mesh crate's `compute_neighbours`
    /// element-to-element graph (`topology.rs`), built here directly from
    /// the already-resolved index tables rather than recomputed from
    /// scratch.
    pub fn neighbor_graph(&self) -> UnGraphMap<usize, usize> {
        let mut graph = UnGraphMap::with_capacity(self.nreal + self.nghost, self.sendelems.len());
        for e in self.realelems() {
            for f in 0..self.dim.num_faces() {
                if self.elemtobndy[[f, e]] != 0 {
                    continue;
                }
                let peer = self.elemtoelem[[f, e]];
                if peer == e {
                    continue;
                }
                graph.add_edge(e, peer, f);
            }
        }
        graph
    }

    /// A plain, `comm`-free snapshot of this rank's index tables, suitable
    /// for serializing to disk as part of a checkpoint/restart hand-off to
    /// the host driver. The communicator itself is never serialized; on
    /// restart the host reconstructs the topology from the original
    /// constructor call, not from the snapshot.
    pub fn snapshot(&self) -> TopologySnapshot {
        TopologySnapshot {
            kind: self.kind,
            dim: self.dim.as_usize(),
            nreal: self.nreal,
            nghost: self.nghost,
            elemtocoord: self.elemtocoord.clone(),
            elemtoelem: self.elemtoelem.clone(),
            elemtoface: self.elemtoface.clone(),
            elemtoordr: self.elemtoordr.clone(),
            elemtobndy: self.elemtobndy.clone(),
            global_id: self.global_id.clone(),
            ghost_global_id: self.ghost_global_id.clone(),
            sendelems: self.sendelems.clone(),
            nabrtorank: self.nabrtorank.clone(),
            nabrtorecv: self.nabrtorecv.clone(),
            nabrtosend: self.nabrtosend.clone(),
            stacksize: self.stacksize,
        }
    }
}

/// Serializable snapshot of a [`Topology`]'s index tables (§3), with no
/// dependency on the `comm` port. See [`Topology::snapshot`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub kind: TopologyKind,
    pub dim: usize,
    pub nreal: usize,
    pub nghost: usize,
    pub elemtocoord: Array3<f64>,
    pub elemtoelem: Array2<usize>,
    pub elemtoface: Array2<usize>,
    pub elemtoordr: Array2<i32>,
    pub elemtobndy: Array2<i32>,
    pub global_id: Vec<usize>,
    pub ghost_global_id: Vec<usize>,
    pub sendelems: Vec<usize>,
    pub nabrtorank: Vec<i32>,
    pub nabrtorecv: Vec<Range<usize>>,
    pub nabrtosend: Vec<Range<usize>>,
    pub stacksize: Option<usize>,
}

/// `dim`-dimensional axis-aligned brick, optionally periodic per axis.
pub fn brick_topology(
    comm: Box<dyn Comm>,
    elemrange: Vec<Vec<f64>>,
    options: &TopologyOptions,
) -> Result<Topology> {
    options.validate_common()?;
    let d = elemrange.len();
    let periodicity = if options.periodicity.is_empty() {
        vec![false; d]
    } else {
        options.periodicity.clone()
    };
    let boundary = if options.boundary.is_empty() {
        vec![[1, 1]; d]
    } else {
        options.boundary.clone()
    };
    let input = BrickInput {
        elemrange,
        periodicity,
        boundary,
    };
    let part = comm.rank() as usize;
    let nparts = comm.size() as usize;
    let patch = generate_brick(&input, part, nparts)?;
    let reordered = sfc_partition(&patch, comm.as_ref());
    build_connectivity(reordered, comm, TopologyKind::Brick)
}

/// A `(d-1)`-dimensional brick extruded along `stack` into vertical
/// columns that never split across ranks.
pub fn stacked_brick_topology(
    comm: Box<dyn Comm>,
    elemrange: Vec<Vec<f64>>,
    stack: Vec<f64>,
    stack_periodic: bool,
    stack_boundary: [i32; 2],
    options: &TopologyOptions,
) -> Result<Topology> {
    options.validate_common()?;
    let base_d = elemrange.len();
    if base_d < 1 {
        return Err(TopologyError::InvalidShape(
            "stacked brick requires a base dimension of at least 1".to_string(),
        ));
    }
    if stack.len() < 2 {
        return Err(TopologyError::InvalidShape(
            "stack must have at least 2 coordinates".to_string(),
        ));
    }
    if stack.iter().tuple_windows().any(|(a, b)| !(b > a)) {
        return Err(TopologyError::InvalidShape(
            "stack must be strictly monotonic increasing".to_string(),
        ));
    }

    let periodicity = if options.periodicity.is_empty() {
        vec![false; base_d]
    } else {
        options.periodicity.clone()
    };
    let boundary = if options.boundary.is_empty() {
        vec![[1, 1]; base_d]
    } else {
        options.boundary.clone()
    };
    let base_input = BrickInput {
        elemrange,
        periodicity,
        boundary,
    };
    let part = comm.rank() as usize;
    let nparts = comm.size() as usize;
    let base_patch = generate_brick(&base_input, part, nparts)?;
    let base_reordered = sfc_partition(&base_patch, comm.as_ref());
    let base_topo = build_connectivity(base_reordered, comm, TopologyKind::Brick)?;

    let stacksize = stack.len() - 1;
    let stack_input = StackInput {
        stack,
        periodic: stack_periodic,
        boundary: stack_boundary,
        radial: false,
    };
    extrude(
        base_topo,
        &stack_input,
        TopologyKind::StackedBrick { stacksize },
    )
}

/// Six-patch cubed shell, `Ne` elements per side per patch.
pub fn cubed_shell_topology(comm: Box<dyn Comm>, ne: usize, options: &TopologyOptions) -> Result<Topology> {
    options.validate_common()?;
    let part = comm.rank() as usize;
    let nparts = comm.size() as usize;
    let patch = generate_cubed_shell(ne, part, nparts)?;
    let reordered = sfc_partition(&patch, comm.as_ref());
    build_connectivity(reordered, comm, TopologyKind::CubedShell)
}

/// The cubed shell extruded radially into spherical shell layers that never
/// split across ranks. `stack_periodic` must be `false` — a sphere stack can
/// never wrap radially (there is no "outside" to identify with the
/// innermost shell) — and is only a parameter at all so that a caller
/// passing `true` actually reaches [`TopologyError::Unsupported`], as
/// spec'd, rather than the option being silently unrepresentable.
pub fn stacked_cubed_sphere_topology(
    comm: Box<dyn Comm>,
    ne: usize,
    rrange: Vec<f64>,
    stack_periodic: bool,
    options: &TopologyOptions,
) -> Result<Topology> {
    options.validate_common()?;
    if stack_periodic {
        return Err(TopologyError::Unsupported(
            "stacked cubed sphere cannot be periodic along the radial axis".to_string(),
        ));
    }
    if rrange.len() < 2 {
        return Err(TopologyError::InvalidShape(
            "Rrange must have at least 2 radii".to_string(),
        ));
    }
    if rrange.iter().tuple_windows().any(|(a, b)| !(b > a)) {
        return Err(TopologyError::InvalidShape(
            "Rrange must be strictly monotonic increasing".to_string(),
        ));
    }

    let part = comm.rank() as usize;
    let nparts = comm.size() as usize;
    let base_patch = generate_cubed_shell(ne, part, nparts)?;
    let base_reordered = sfc_partition(&base_patch, comm.as_ref());
    let base_topo = build_connectivity(base_reordered, comm, TopologyKind::CubedShell)?;

    let stacksize = rrange.len() - 1;
    let stack_input = StackInput {
        stack: rrange,
        periodic: false,
        boundary: [options.bc.0, options.bc.1],
        radial: true,
    };
    extrude(
        base_topo,
        &stack_input,
        TopologyKind::StackedCubedSphere { stacksize },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::testing::SingleRankComm;

    fn axis(lo: f64, hi: f64, n: usize) -> Vec<f64> {
        let step = (hi - lo) / n as f64;
        (0..=n).map(|i| lo + i as f64 * step).collect()
    }

    #[test]
    fn rejects_unsupported_ghostsize() {
        let mut options = TopologyOptions::default();
        options.ghostsize = 2;
        let result = brick_topology(
            Box::new(SingleRankComm),
            vec![axis(0.0, 1.0, 1)],
            &options,
        );
        assert!(matches!(result, Err(TopologyError::Unsupported(_))));
    }

    #[test]
    fn rejects_unsupported_connectivity() {
        let mut options = TopologyOptions::default();
        options.connectivity = Connectivity::Vertex;
        let result = brick_topology(
            Box::new(SingleRankComm),
            vec![axis(0.0, 1.0, 1)],
            &options,
        );
        assert!(matches!(result, Err(TopologyError::Unsupported(_))));
    }

    #[test]
    fn s4_cubed_shell_ne2_single_rank() {
        let options = TopologyOptions::default();
        let topo = cubed_shell_topology(Box::new(SingleRankComm), 2, &options).unwrap();
        assert_eq!(topo.realelems().len(), 24);
        assert!(topo.elemtobndy().iter().all(|&b| b == 0));
    }

    #[test]
    fn s3_stacked_2d_brick_boundary_tags() {
        let options = TopologyOptions::default();
        let topo = stacked_brick_topology(
            Box::new(SingleRankComm),
            vec![axis(2.0, 5.0, 3)],
            axis(4.0, 6.0, 2),
            false,
            [1, 2],
            &options,
        )
        .unwrap();
        assert_eq!(topo.realelems().len(), 6);
        assert_eq!(topo.stacksize(), Some(2));
    }

    #[test]
    fn s5_stacked_cubed_sphere() {
        let options = TopologyOptions::default();
        let topo = stacked_cubed_sphere_topology(
            Box::new(SingleRankComm),
            2,
            vec![1.0, 2.0, 3.0],
            false,
            &options,
        )
        .unwrap();
        assert_eq!(topo.realelems().len(), 48);
        assert_eq!(topo.stacksize(), Some(2));
    }

    #[test]
    fn rejects_vertical_periodicity_on_sphere_stack() {
        let options = TopologyOptions::default();
        let result = stacked_cubed_sphere_topology(
            Box::new(SingleRankComm),
            2,
            vec![1.0, 2.0, 3.0],
            true,
            &options,
        );
        assert!(matches!(result, Err(TopologyError::Unsupported(_))));
    }

    #[test]
    fn neighbor_graph_has_one_edge_per_interior_face() {
        let options = TopologyOptions::default();
        let topo = brick_topology(
            Box::new(SingleRankComm),
            vec![axis(0.0, 4.0, 4)],
            &options,
        )
        .unwrap();
        let graph = topo.neighbor_graph();
        assert_eq!(graph.node_count(), 4);
        // 3 interior faces connect the 4-element chain; the two outer ends
        // are physical boundaries and contribute no edge.
        assert_eq!(graph.edge_count(), 3);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let options = TopologyOptions::default();
        let topo = cubed_shell_topology(Box::new(SingleRankComm), 2, &options).unwrap();
        let snapshot = topo.snapshot();
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: TopologySnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.nreal, snapshot.nreal);
        assert_eq!(restored.elemtoelem, snapshot.elemtoelem);
        assert_eq!(restored.global_id, snapshot.global_id);
    }
}
