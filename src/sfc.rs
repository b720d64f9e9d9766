//! Component D: the space-filling-curve partitioner.
//!
//! Collective over `comm`: every rank contributes its local slice of
//! `(elemtovert, elemtocoord, elemtobndy, face_connections)`, the union is
//! reordered along the Hilbert curve of per-element centroids, and each
//! rank gets back its new contiguous slice. Grounded on the same
//! broadcast/gather shape the connectivity engine (component E) uses for
//! its own face-matching exchange (`comm::Comm::all_to_all_v`), applied
//! here to whole element records rather than face keys.

use ndarray::{Array2, Array3};

use crate::comm::Comm;
use crate::hilbert::{hilbert_index, MAX_COORD};
use crate::partition::linear_partition;
use crate::patch::MeshPatch;

/// One element's record as exchanged during the global reorder: compact
/// enough to serialize with no external crate, since only this module needs
/// the wire format.
struct ElemRecord {
    global_id: usize,
    vert: Vec<usize>,
    coord: Vec<f64>,
    bndy: Vec<i32>,
}

fn encode(records: &[ElemRecord], num_corners: usize, num_faces: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(records.len() * (8 + num_corners * 8 + num_corners * 3 * 8 + num_faces * 4));
    for r in records {
        out.extend_from_slice(&(r.global_id as u64).to_le_bytes());
        for &v in &r.vert {
            out.extend_from_slice(&(v as u64).to_le_bytes());
        }
        for &c in &r.coord {
            out.extend_from_slice(&c.to_le_bytes());
        }
        for &b in &r.bndy {
            out.extend_from_slice(&b.to_le_bytes());
        }
    }
    out
}

fn decode(buf: &[u8], num_corners: usize, num_faces: usize) -> Vec<ElemRecord> {
    let rec_len = 8 + num_corners * 8 + num_corners * 3 * 8 + num_faces * 4;
    if rec_len == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(buf.len() / rec_len);
    let mut pos = 0;
    while pos < buf.len() {
        let global_id = u64::from_le_bytes(buf[pos..pos + 8].try_into().unwrap()) as usize;
        pos += 8;
        let mut vert = Vec::with_capacity(num_corners);
        for _ in 0..num_corners {
            vert.push(u64::from_le_bytes(buf[pos..pos + 8].try_into().unwrap()) as usize);
            pos += 8;
        }
        let mut coord = Vec::with_capacity(num_corners * 3);
        for _ in 0..num_corners * 3 {
            coord.push(f64::from_le_bytes(buf[pos..pos + 8].try_into().unwrap()));
            pos += 8;
        }
        let mut bndy = Vec::with_capacity(num_faces);
        for _ in 0..num_faces {
            bndy.push(i32::from_le_bytes(buf[pos..pos + 4].try_into().unwrap()));
            pos += 4;
        }
        out.push(ElemRecord {
            global_id,
            vert,
            coord,
            bndy,
        });
    }
    out
}

fn centroid_lattice_coord(coord: &[f64], num_corners: usize, bounds: (f64, f64, f64, f64, f64, f64)) -> [u32; 3] {
    let (xmin, xmax, ymin, ymax, zmin, zmax) = bounds;
    let mut sum = [0.0f64; 3];
    for v in 0..num_corners {
        for axis in 0..3 {
            sum[axis] += coord[axis * num_corners + v];
        }
    }
    let centroid = [
        sum[0] / num_corners as f64,
        sum[1] / num_corners as f64,
        sum[2] / num_corners as f64,
    ];
    let span = [
        (xmax - xmin).max(1e-12),
        (ymax - ymin).max(1e-12),
        (zmax - zmin).max(1e-12),
    ];
    let min = [xmin, ymin, zmin];
    let mut out = [0u32; 3];
    for axis in 0..3 {
        let frac = ((centroid[axis] - min[axis]) / span[axis]).clamp(0.0, 1.0);
        out[axis] = (frac * MAX_COORD as f64) as u32;
    }
    out
}

/// Collectively reorders `local` along the global Hilbert curve over
/// element centroids, and returns this rank's new contiguous slice.
///
/// Every rank must call this with its own `local` patch; `face_connections`
/// must agree bit-for-bit across ranks (it describes global shape, not a
/// per-rank property) — the first rank's copy is kept, others are dropped
/// after a consistency check.
pub fn sfc_partition(local: &MeshPatch, comm: &dyn Comm) -> MeshPatch {
    let dim = local.dim;
    let num_corners = dim.num_corners();
    let num_faces = dim.num_faces();
    let size = comm.size() as usize;
    let part = comm.rank() as usize;

    let my_records: Vec<ElemRecord> = (0..local.nelem())
        .map(|e| ElemRecord {
            global_id: local.global_id[e],
            vert: (0..num_corners).map(|v| local.elemtovert[[e, v]]).collect(),
            coord: {
                let mut c = Vec::with_capacity(3 * num_corners);
                for axis in 0..3 {
                    for v in 0..num_corners {
                        c.push(local.elemtocoord[[axis, v, e]]);
                    }
                }
                c
            },
            bndy: (0..num_faces).map(|f| local.elemtobndy[[f, e]]).collect(),
        })
        .collect();

    // Every rank ships its whole local slice to every other rank (including
    // itself); this makes the reorder a genuine collective without
    // requiring callers to know the global count up front.
    let payload = encode(&my_records, num_corners, num_faces);
    let send: Vec<Vec<u8>> = (0..size).map(|_| payload.clone()).collect();
    let recv = comm.all_to_all_v(&send);

    let mut all: Vec<ElemRecord> = Vec::with_capacity(local.n_global);
    for buf in &recv {
        all.extend(decode(buf, num_corners, num_faces));
    }
    all.sort_by_key(|r| r.global_id);
    all.dedup_by_key(|r| r.global_id);

    let n_global = all.len();

    let (mut xmin, mut xmax) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut ymin, mut ymax) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut zmin, mut zmax) = (f64::INFINITY, f64::NEG_INFINITY);
    for r in &all {
        for v in 0..num_corners {
            let x = r.coord[v];
            let y = r.coord[num_corners + v];
            let z = r.coord[2 * num_corners + v];
            xmin = xmin.min(x);
            xmax = xmax.max(x);
            ymin = ymin.min(y);
            ymax = ymax.max(y);
            zmin = zmin.min(z);
            zmax = zmax.max(z);
        }
    }
    let bounds = (xmin, xmax, ymin, ymax, zmin, zmax);

    let mut order: Vec<usize> = (0..n_global).collect();
    let keys: Vec<(u64, usize)> = all
        .iter()
        .map(|r| {
            let lat = centroid_lattice_coord(&r.coord, num_corners, bounds);
            (hilbert_index(&lat), r.global_id)
        })
        .collect();
    order.sort_by_key(|&i| keys[i]);

    let local_range = linear_partition(n_global, part, size);
    let nelem = local_range.len();

    let mut global_id = Vec::with_capacity(nelem);
    let mut elemtovert = Array2::<usize>::zeros((nelem, num_corners));
    let mut elemtocoord = Array3::<f64>::zeros((3, num_corners, nelem));
    let mut elemtobndy = Array2::<i32>::zeros((num_faces, nelem));

    for (local_e, &pos) in local_range.enumerate() {
        let r = &all[order[pos]];
        global_id.push(r.global_id);
        for v in 0..num_corners {
            elemtovert[[local_e, v]] = r.vert[v];
        }
        for axis in 0..3 {
            for v in 0..num_corners {
                elemtocoord[[axis, v, local_e]] = r.coord[axis * num_corners + v];
            }
        }
        for f in 0..num_faces {
            elemtobndy[[f, local_e]] = r.bndy[f];
        }
    }

    MeshPatch {
        dim,
        n_global,
        global_id,
        elemtovert,
        elemtocoord,
        elemtobndy,
        face_connections: local.face_connections.clone(),
    }
}
