//! Component F: the stack extruder.
//!
//! Grounded on `builders/extrude.rs`'s `MeshTransform::extrude_along`
//! signature (the mesh crate's own implementation is a stub that never got
//! past the trait declaration); this is a full, non-stubbed
//! implementation of the same shape — lift one base topology level along an
//! externally supplied coordinate sequence.
//!
//! Construction is purely mechanical index-table arithmetic over an
//! already fully-connected base [`Topology`]; it never re-runs the
//! connectivity engine (4.E). `stacksize * i + j` gives the new element
//! index for base element `i`, level `j`.

use ndarray::{Array2, Array3};

use crate::error::Result;
use crate::topology::{Topology, TopologyKind};

/// Extrusion coordinate sequence and the new axis's periodicity/boundary
/// tags. `radial = true` for the cubed-sphere stack: base coordinates are
/// scaled by `stack[j]`/`stack[j+1]` in place rather than gaining a new
/// coordinate row.
pub struct StackInput {
    pub stack: Vec<f64>,
    pub periodic: bool,
    pub boundary: [i32; 2],
    pub radial: bool,
}

fn lift_index(base_idx: usize, j: usize, n_base_real: usize, stacksize: usize, n_real_new: usize) -> usize {
    if base_idx < n_base_real {
        stacksize * base_idx + j
    } else {
        let g = base_idx - n_base_real;
        n_real_new + stacksize * g + j
    }
}

/// Lifts `base` (dimension `d-1`) into a stacked topology of dimension `d`.
pub fn extrude(base: Topology, input: &StackInput, kind: TopologyKind) -> Result<Topology> {
    let stacksize = input.stack.len() - 1;
    let base_dim = base.dim;
    let new_dim = base_dim.up()?;
    let base_num_corners = base_dim.num_corners();
    let new_num_corners = new_dim.num_corners();
    let base_num_faces = base_dim.num_faces();
    let new_num_faces = new_dim.num_faces();
    let bottom_face = base_num_faces;
    let top_face = base_num_faces + 1;

    let n_base_real = base.nreal;
    let n_base_ghost = base.nghost;
    let n_real_new = stacksize * n_base_real;
    let n_ghost_new = stacksize * n_base_ghost;

    let mut elemtocoord = Array3::<f64>::zeros((3, new_num_corners, n_real_new + n_ghost_new));
    let mut elemtoelem = Array2::<usize>::zeros((new_num_faces, n_real_new));
    let mut elemtoface = Array2::<usize>::zeros((new_num_faces, n_real_new));
    let mut elemtoordr = Array2::<i32>::zeros((new_num_faces, n_real_new));
    let mut elemtobndy = Array2::<i32>::zeros((new_num_faces, n_real_new));
    let mut global_id = vec![0usize; n_real_new];

    // Coordinates: real and ghost columns are built the same way, since
    // both need the full corner geometry at every level.
    for base_e in 0..(n_base_real + n_base_ghost) {
        for j in 0..stacksize {
            let e = lift_index(base_e, j, n_base_real, stacksize, n_real_new);
            if input.radial {
                let lo_scale = input.stack[j];
                let hi_scale = input.stack[j + 1];
                for half in 0..2 {
                    let scale = if half == 0 { lo_scale } else { hi_scale };
                    for bc in 0..base_num_corners {
                        let corner = half * base_num_corners + bc;
                        for axis in 0..3 {
                            elemtocoord[[axis, corner, e]] =
                                base.elemtocoord[[axis, bc, base_e]] * scale;
                        }
                    }
                }
            } else {
                let new_axis = base_dim.as_usize();
                for half in 0..2 {
                    let level_coord = input.stack[j + half];
                    for bc in 0..base_num_corners {
                        let corner = half * base_num_corners + bc;
                        for axis in 0..new_axis {
                            elemtocoord[[axis, corner, e]] = base.elemtocoord[[axis, bc, base_e]];
                        }
                        elemtocoord[[new_axis, corner, e]] = level_coord;
                    }
                }
            }
        }
    }

    for base_i in 0..n_base_real {
        let base_gid = base.global_id(base_i);
        for j in 0..stacksize {
            let e = lift_index(base_i, j, n_base_real, stacksize, n_real_new);
            global_id[e] = base_gid * stacksize + j;

            for bf in 0..base_num_faces {
                let base_peer = base.elemtoelem[[bf, base_i]];
                let base_peer_face = base.elemtoface[[bf, base_i]];
                let ordr = base.elemtoordr[[bf, base_i]];
                let tag = base.elemtobndy[[bf, base_i]];
                if tag == 0 {
                    debug_assert!(
                        input.radial || ordr == 1,
                        "brick extrusion assumes base horizontal orientation is identity"
                    );
                }
                elemtoelem[[bf, e]] = lift_index(base_peer, j, n_base_real, stacksize, n_real_new);
                elemtoface[[bf, e]] = base_peer_face;
                elemtoordr[[bf, e]] = ordr;
                elemtobndy[[bf, e]] = tag;
            }

            if j > 0 {
                elemtoelem[[bottom_face, e]] = e - 1;
                elemtoface[[bottom_face, e]] = top_face;
                elemtoordr[[bottom_face, e]] = 1;
                elemtobndy[[bottom_face, e]] = 0;
            } else if input.periodic {
                let wrapped = lift_index(base_i, stacksize - 1, n_base_real, stacksize, n_real_new);
                elemtoelem[[bottom_face, e]] = wrapped;
                elemtoface[[bottom_face, e]] = top_face;
                elemtoordr[[bottom_face, e]] = 1;
                elemtobndy[[bottom_face, e]] = 0;
            } else {
                elemtoelem[[bottom_face, e]] = e;
                elemtoface[[bottom_face, e]] = bottom_face;
                elemtoordr[[bottom_face, e]] = 1;
                elemtobndy[[bottom_face, e]] = input.boundary[0];
            }

            if j + 1 < stacksize {
                elemtoelem[[top_face, e]] = e + 1;
                elemtoface[[top_face, e]] = bottom_face;
                elemtoordr[[top_face, e]] = 1;
                elemtobndy[[top_face, e]] = 0;
            } else if input.periodic {
                let wrapped = lift_index(base_i, 0, n_base_real, stacksize, n_real_new);
                elemtoelem[[top_face, e]] = wrapped;
                elemtoface[[top_face, e]] = bottom_face;
                elemtoordr[[top_face, e]] = 1;
                elemtobndy[[top_face, e]] = 0;
            } else {
                elemtoelem[[top_face, e]] = e;
                elemtoface[[top_face, e]] = top_face;
                elemtoordr[[top_face, e]] = 1;
                elemtobndy[[top_face, e]] = input.boundary[1];
            }
        }
    }

    let mut ghost_global_id = vec![0usize; n_ghost_new];
    for g in 0..n_base_ghost {
        let base_gid = base.global_id(n_base_real + g);
        for j in 0..stacksize {
            let e = n_real_new + stacksize * g + j;
            ghost_global_id[e - n_real_new] = base_gid * stacksize + j;
        }
    }

    let lift_range = |r: &std::ops::Range<usize>| (stacksize * r.start)..(stacksize * r.end);
    let nabrtorecv: Vec<_> = base.nabrtorecv.iter().map(lift_range).collect();
    let nabrtosend: Vec<_> = base.nabrtosend.iter().map(lift_range).collect();
    let nabrtorank = base.nabrtorank.clone();

    let mut sendelems = Vec::with_capacity(stacksize * base.sendelems.len());
    for &base_i in &base.sendelems {
        for j in 0..stacksize {
            sendelems.push(lift_index(base_i, j, n_base_real, stacksize, n_real_new));
        }
    }

    Ok(Topology {
        kind,
        dim: new_dim,
        comm: base.comm,
        nreal: n_real_new,
        nghost: n_ghost_new,
        elemtocoord,
        elemtoelem,
        elemtoface,
        elemtoordr,
        elemtobndy,
        global_id,
        ghost_global_id,
        sendelems,
        nabrtorank,
        nabrtorecv,
        nabrtosend,
        stacksize: Some(stacksize),
    })
}
