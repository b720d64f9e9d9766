//! Component C: the six-patch cubed-shell generator.
//!
//! Grounded on `topology.rs`'s static dispatch over element kinds (a
//! `match`/lookup-table keyed on a small enum) generalized here to the six
//! cube faces: each patch is a closure mapping its local `(i, j)` element
//! and local corner `k` onto a vertex triple in a shared `(Ne+1)^3` lattice,
//! chosen so that abutting patches agree on the vertex ids along their
//! common edge.

use ndarray::{Array2, Array3};
use once_cell::sync::Lazy;

use crate::dim::Dim;
use crate::error::{Result, TopologyError};
use crate::patch::MeshPatch;

/// A lattice coordinate in the shared `(Ne+1)^3` cube lattice, one per cube
/// axis, each in `0..=ne`.
type LatticeCoord = [usize; 3];

/// Per-patch closure: given `ne`, the element indices `(i, j)` in `0..ne`
/// and the local corner index `k` in `0..4` (Cartesian: `(0,0) (1,0) (0,1)
/// (1,1)`), returns the corner's coordinate in the shared cube lattice.
type PatchMap = fn(ne: usize, i: usize, j: usize, k: usize) -> LatticeCoord;

/// The six patches in the "T" layout of the source diagram: four equatorial
/// faces (1..4) plus north (5) and south (6) caps relative to patch 1's
/// orientation.
static PATCHES: Lazy<[PatchMap; 6]> = Lazy::new(|| [patch1, patch2, patch3, patch4, patch5, patch6]);

fn corner_offsets(i: usize, j: usize, k: usize) -> (usize, usize) {
    let (di, dj) = match k {
        0 => (0, 0),
        1 => (1, 0),
        2 => (0, 1),
        3 => (1, 1),
        other => unreachable!("quad corner index {other} out of range"),
    };
    (i + di, j + dj)
}

// Patch 1: the "front" face, x = ne (fixed), (y, z) vary with (i, j).
fn patch1(ne: usize, i: usize, j: usize, k: usize) -> LatticeCoord {
    let (a, b) = corner_offsets(i, j, k);
    [ne, a, b]
}

// Patch 2: the "right" face, y = ne (fixed), (x, z) vary, x running
// backwards from patch 1's x = ne edge so that the shared edge (y=ne,
// x=ne) lines up.
fn patch2(ne: usize, i: usize, j: usize, k: usize) -> LatticeCoord {
    let (a, b) = corner_offsets(i, j, k);
    [ne - a, ne, b]
}

// Patch 3: the "back" face, x = 0 (fixed), (y, z) vary with y running
// backwards so the shared edge with patch 2 (y=0 side) and with patch 4
// (x=0, y=ne) lines up.
fn patch3(ne: usize, i: usize, j: usize, k: usize) -> LatticeCoord {
    let (a, b) = corner_offsets(i, j, k);
    [0, ne - a, b]
}

// Patch 4: the "left" face, y = 0 (fixed), x running forward to close the
// equatorial belt back onto patch 1.
fn patch4(ne: usize, i: usize, j: usize, k: usize) -> LatticeCoord {
    let (a, b) = corner_offsets(i, j, k);
    [a, 0, b]
}

// Patch 5: the "top" cap, z = ne (fixed), sharing its equatorial edge with
// patch 1's top edge (b = ne).
fn patch5(ne: usize, i: usize, j: usize, k: usize) -> LatticeCoord {
    let (a, b) = corner_offsets(i, j, k);
    [ne - b, a, ne]
}

// Patch 6: the "bottom" cap, z = 0 (fixed), sharing its equatorial edge with
// patch 1's bottom edge (b = 0).
fn patch6(ne: usize, i: usize, j: usize, k: usize) -> LatticeCoord {
    let (a, b) = corner_offsets(i, j, k);
    [b, a, 0]
}

fn lattice_id(ne: usize, c: LatticeCoord) -> usize {
    let n1 = ne + 1;
    c[0] + n1 * (c[1] + n1 * c[2])
}

fn lattice_coord_to_xyz(ne: usize, c: LatticeCoord) -> [f64; 3] {
    let half = ne as f64;
    [
        (2.0 * c[0] as f64 - half) / half,
        (2.0 * c[1] as f64 - half) / half,
        (2.0 * c[2] as f64 - half) / half,
    ]
}

/// Builds this rank's slice of a 6-patch, `Ne x Ne` per patch cubed shell
/// (`6 * Ne^2` elements total).
///
/// Connectivity is entirely carried by shared vertex ids: no
/// `face_connections` are emitted (4.C leaves that list empty, unlike the
/// brick generator's periodic wraps).
pub fn generate_cubed_shell(ne: usize, part: usize, nparts: usize) -> Result<MeshPatch> {
    if ne == 0 {
        return Err(TopologyError::InvalidShape(
            "cubed-shell Ne must be positive".to_string(),
        ));
    }
    let dim = Dim::D2;
    let n_global = 6 * ne * ne;
    let num_corners = dim.num_corners();

    use crate::partition::linear_partition;
    let local_range = linear_partition(n_global, part, nparts);

    let mut global_id = Vec::with_capacity(local_range.len());
    let mut elemtovert = Array2::<usize>::zeros((local_range.len(), num_corners));
    let mut elemtocoord = Array3::<f64>::zeros((3, num_corners, local_range.len()));
    let elemtobndy = Array2::<i32>::zeros((dim.num_faces(), local_range.len()));

    for (local_e, global_e) in local_range.enumerate() {
        global_id.push(global_e);
        let per_patch = ne * ne;
        let b = global_e / per_patch;
        let within = global_e % per_patch;
        let i = within % ne;
        let j = within / ne;
        let map = PATCHES[b];
        for k in 0..num_corners {
            let lat = map(ne, i, j, k);
            let vid = lattice_id(ne, lat);
            elemtovert[[local_e, k]] = vid;
            let xyz = lattice_coord_to_xyz(ne, lat);
            for axis in 0..3 {
                elemtocoord[[axis, k, local_e]] = xyz[axis];
            }
        }
    }

    Ok(MeshPatch {
        dim,
        n_global,
        global_id,
        elemtovert,
        elemtocoord,
        elemtobndy,
        face_connections: Vec::new(),
    })
}
