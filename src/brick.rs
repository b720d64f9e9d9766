//! Component B: the d-dimensional axis-aligned brick generator.
//!
//! Grounded on `tools/grid.rs`'s `RegularUMeshBuilder`: the same per-axis
//! vertex-coordinate vectors and the same lexicographic (axis-0-fastest)
//! vertex numbering, but with global element ids assigned along the Hilbert
//! curve (component J) rather than row-major, so that `linear_partition`
//! (component A) hands out spatially local slices.

use itertools::Itertools;
use ndarray::{Array2, Array3};

use crate::dim::Dim;
use crate::error::{Result, TopologyError};
use crate::hilbert::hilbert_index;
use crate::partition::linear_partition;
use crate::patch::{Lattice, MeshPatch};

/// Per-axis element-corner coordinates, periodicity and boundary tags for a
/// [`generate_brick`] call. One `elemrange[a]` entry is a strictly
/// increasing vertex-coordinate sequence of length `nelem[a] + 1`.
pub struct BrickInput {
    pub elemrange: Vec<Vec<f64>>,
    pub periodicity: Vec<bool>,
    /// `[low, high]` boundary tag per axis; `boundary[a] = [lo, hi]`.
    pub boundary: Vec<[i32; 2]>,
}

impl BrickInput {
    pub fn dim(&self) -> Result<Dim> {
        Dim::try_from_usize(self.elemrange.len())
    }
}

/// Builds this rank's slice of a `dim`-dimensional brick.
///
/// `part`/`nparts` are this rank's index and the communicator size (4.A);
/// the caller is responsible for calling this identically on every rank.
pub fn generate_brick(input: &BrickInput, part: usize, nparts: usize) -> Result<MeshPatch> {
    let dim = input.dim()?;
    let d = dim.as_usize();
    if input.periodicity.len() != d {
        return Err(TopologyError::InvalidShape(format!(
            "periodicity has {} entries, expected {d}",
            input.periodicity.len()
        )));
    }
    if input.boundary.len() != d {
        return Err(TopologyError::InvalidShape(format!(
            "boundary has {} entries, expected {d}",
            input.boundary.len()
        )));
    }

    let nelem_axis: Vec<usize> = input
        .elemrange
        .iter()
        .map(|axis| axis.len().saturating_sub(1))
        .collect();
    for (a, &n) in nelem_axis.iter().enumerate() {
        if n == 0 {
            return Err(TopologyError::InvalidShape(format!(
                "axis {a} has zero elements"
            )));
        }
    }
    for axis in &input.elemrange {
        if axis.iter().tuple_windows().any(|(a, b)| !(b > a)) {
            return Err(TopologyError::InvalidShape(
                "elemrange axis must be strictly increasing".to_string(),
            ));
        }
    }

    let n_global: usize = nelem_axis.iter().product();
    let vert_sizes: Vec<usize> = nelem_axis.iter().map(|&n| n + 1).collect();
    let vert_lattice = Lattice::new(&vert_sizes);
    let elem_lattice = Lattice::new(&nelem_axis);

    // Global element id -> lattice multi-index, in Cartesian (row-major,
    // axis-0-fastest) enumeration order; the Hilbert key reorders only the
    // *global id assignment*, not this local corner/coordinate layout.
    let elem_multi_index = |cartesian_id: usize| -> Vec<usize> {
        let mut rem = cartesian_id;
        let mut idx = vec![0usize; d];
        for a in 0..d {
            idx[a] = rem % nelem_axis[a];
            rem /= nelem_axis[a];
        }
        idx
    };

    // Order every element in the global brick along the Hilbert curve, then
    // slice the rank's contiguous stretch of that order.
    let mut order: Vec<usize> = (0..n_global).collect();
    order.sort_by_key(|&cart_id| {
        let idx = elem_multi_index(cart_id);
        let axes: Vec<u32> = idx.iter().map(|&i| i as u32).collect();
        (hilbert_index(&axes), cart_id)
    });

    let local_range = linear_partition(n_global, part, nparts);
    let num_corners = dim.num_corners();

    let mut global_id = Vec::with_capacity(local_range.len());
    let mut elemtovert = Array2::<usize>::zeros((local_range.len(), num_corners));
    let mut elemtocoord = Array3::<f64>::zeros((3, num_corners, local_range.len()));
    let mut elemtobndy = Array2::<i32>::zeros((dim.num_faces(), local_range.len()));

    for (local_e, &sfc_pos) in local_range.clone().enumerate() {
        let cart_id = order[sfc_pos];
        let idx = elem_multi_index(cart_id);
        global_id.push(cart_id);

        for k in 0..num_corners {
            let bits = dim.corner_bits(k);
            let vert_idx: Vec<usize> =
                idx.iter().zip(&bits).map(|(&i, &b)| i + b).collect();
            let vid = vert_lattice.id(&vert_idx);
            elemtovert[[local_e, k]] = vid;
            for (axis, &vi) in vert_idx.iter().enumerate() {
                elemtocoord[[axis, k, local_e]] = input.elemrange[axis][vi];
            }
        }

        for axis in 0..d {
            for side in 0..2 {
                let face = 2 * axis + side;
                let at_edge = if side == 0 {
                    idx[axis] == 0
                } else {
                    idx[axis] == nelem_axis[axis] - 1
                };
                if at_edge && !input.periodicity[axis] {
                    elemtobndy[[face, local_e]] = input.boundary[axis][side];
                }
            }
        }
    }

    let mut face_connections = Vec::new();
    for (axis, &periodic) in input.periodicity.iter().enumerate() {
        if !periodic {
            continue;
        }
        // Identify every low-face vertex with its high-face partner along
        // this axis: same multi-index in every other coordinate, `0` vs.
        // `nelem_axis[axis]` in this one. Identical, deterministic on every
        // rank since it only depends on global shape, not on the local
        // slice.
        let other_axes: Vec<usize> = (0..d).filter(|&a| a != axis).collect();
        let other_sizes: Vec<usize> = other_axes.iter().map(|&a| vert_sizes[a]).collect();
        let n_other: usize = other_sizes.iter().product();
        for k in 0..n_other {
            let mut rem = k;
            let mut full = vec![0usize; d];
            for (&a, &size) in other_axes.iter().zip(&other_sizes) {
                full[a] = rem % size;
                rem /= size;
            }
            full[axis] = 0;
            let lo = vert_lattice.id(&full);
            full[axis] = nelem_axis[axis];
            let hi = vert_lattice.id(&full);
            face_connections.push((lo.min(hi), lo.max(hi)));
        }
    }

    Ok(MeshPatch {
        dim,
        n_global,
        global_id,
        elemtovert,
        elemtocoord,
        elemtobndy,
        face_connections,
    })
}
