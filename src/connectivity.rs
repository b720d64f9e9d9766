//! Component E: the connectivity engine, the heart of the mesh topology
//! core.
//!
//! Grounded on `topology.rs::compute_neighbours` / `tools/neighbours.rs`:
//! a canonical-key-keyed hashmap from face corner ids to incident elements,
//! generalized from single-process matching to the two-phase (periodic
//! vertex fusion, then cross-rank exchange) matching the distributed case
//! needs. `rustc_hash::FxHashMap` and `smallvec::SmallVec` are reused
//! directly from that file's style.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::comm::Comm;
use crate::error::{Result, TopologyError};
use crate::partition::owner_of;
use crate::patch::MeshPatch;
use crate::topology::{Topology, TopologyKind};

/// Disjoint-set-backed vertex fuser built from `face_connections`: vertices
/// not mentioned there are their own representative.
struct VertexFuser {
    parent: FxHashMap<usize, usize>,
}

impl VertexFuser {
    fn new(face_connections: &[(usize, usize)]) -> Self {
        let mut parent = FxHashMap::default();
        for &(a, b) in face_connections {
            parent.entry(a).or_insert(a);
            parent.entry(b).or_insert(b);
        }
        let mut fuser = VertexFuser { parent };
        for &(a, b) in face_connections {
            fuser.union(a, b);
        }
        fuser
    }

    fn find(&mut self, x: usize) -> usize {
        let p = *self.parent.entry(x).or_insert(x);
        if p == x {
            return x;
        }
        let root = self.find(p);
        self.parent.insert(x, root);
        root
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            // Lower id wins as representative: keeps the canonical key
            // deterministic without tracking union-by-rank metadata across
            // the wire.
            let (lo, hi) = (ra.min(rb), ra.max(rb));
            self.parent.insert(hi, lo);
        }
    }
}

/// One element's contribution to the global face-matching exchange: its
/// coordinates (needed to populate ghost `elemtocoord`) and, per face, the
/// fused vertex-id sequence and boundary tag used to find its peer.
struct ElemRecord {
    global_id: usize,
    coord: Vec<f64>,
    faces: Vec<FaceInfo>,
}

struct FaceInfo {
    fused_ids: Vec<usize>,
    bndy: i32,
}

fn encode(records: &[ElemRecord]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(records.len() as u64).to_le_bytes());
    for r in records {
        out.extend_from_slice(&(r.global_id as u64).to_le_bytes());
        out.extend_from_slice(&(r.coord.len() as u64).to_le_bytes());
        for &c in &r.coord {
            out.extend_from_slice(&c.to_le_bytes());
        }
        out.extend_from_slice(&(r.faces.len() as u64).to_le_bytes());
        for face in &r.faces {
            out.extend_from_slice(&(face.bndy).to_le_bytes());
            out.extend_from_slice(&(face.fused_ids.len() as u64).to_le_bytes());
            for &v in &face.fused_ids {
                out.extend_from_slice(&(v as u64).to_le_bytes());
            }
        }
    }
    out
}

fn decode(buf: &[u8]) -> Vec<ElemRecord> {
    let mut pos = 0;
    let read_u64 = |buf: &[u8], pos: &mut usize| {
        let v = u64::from_le_bytes(buf[*pos..*pos + 8].try_into().unwrap());
        *pos += 8;
        v
    };
    let read_f64 = |buf: &[u8], pos: &mut usize| {
        let v = f64::from_le_bytes(buf[*pos..*pos + 8].try_into().unwrap());
        *pos += 8;
        v
    };
    let read_i32 = |buf: &[u8], pos: &mut usize| {
        let v = i32::from_le_bytes(buf[*pos..*pos + 4].try_into().unwrap());
        *pos += 4;
        v
    };

    if buf.is_empty() {
        return Vec::new();
    }
    let n = read_u64(buf, &mut pos) as usize;
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        let global_id = read_u64(buf, &mut pos) as usize;
        let ncoord = read_u64(buf, &mut pos) as usize;
        let coord = (0..ncoord).map(|_| read_f64(buf, &mut pos)).collect();
        let nfaces = read_u64(buf, &mut pos) as usize;
        let mut faces = Vec::with_capacity(nfaces);
        for _ in 0..nfaces {
            let bndy = read_i32(buf, &mut pos);
            let nv = read_u64(buf, &mut pos) as usize;
            let fused_ids = (0..nv).map(|_| read_u64(buf, &mut pos) as usize).collect();
            faces.push(FaceInfo { fused_ids, bndy });
        }
        out.push(ElemRecord {
            global_id,
            coord,
            faces,
        });
    }
    out
}

/// Compares our face's fused vertex-id sequence to the peer's and returns
/// the orientation code: `1` if they agree pointwise, `3` if reversing the
/// peer's sequence agrees. Any other relationship is a mesh invariant
/// violation. The cubed-shell/brick constructions studied here never
/// produce anything past these two outcomes: 3-D brick faces always align
/// (monotonic lattice numbering), and every non-brick face with more than
/// two corners never needs reversal, so only 2-corner (edge) faces ever
/// take code `3`.
fn compute_orientation(ours: &[usize], theirs: &[usize]) -> Result<i32> {
    if ours.len() != theirs.len() {
        return Err(TopologyError::MeshInvariant(format!(
            "matched faces have different corner counts: {} vs {}",
            ours.len(),
            theirs.len()
        )));
    }
    if ours == theirs {
        return Ok(1);
    }
    let reversed: Vec<usize> = theirs.iter().rev().copied().collect();
    if ours == reversed.as_slice() {
        return Ok(3);
    }
    Err(TopologyError::MeshInvariant(format!(
        "matched faces {ours:?} / {theirs:?} do not reduce to identity or reversal"
    )))
}

/// Resolved outcome for one (global element id, local face) pair, used to
/// fill in `elemtoelem`/`elemtoface`/`elemtoordr`/`elemtobndy` for every
/// real element this rank owns.
enum Resolution {
    Boundary { tag: i32 },
    Matched { peer_global: usize, peer_face: usize, ordr: i32 },
}

/// Runs the connectivity engine over an already SFC-partitioned patch
/// (4.D's output), producing a fully populated [`Topology`].
pub fn build_connectivity(
    patch: MeshPatch,
    comm: Box<dyn Comm>,
    kind: TopologyKind,
) -> Result<Topology> {
    let dim = patch.dim;
    let num_corners = dim.num_corners();
    let num_faces = dim.num_faces();
    let n_global = patch.n_global;
    let nparts = comm.size().max(1) as usize;

    let mut fuser = VertexFuser::new(&patch.face_connections);

    let mut my_records = Vec::with_capacity(patch.nelem());
    for e in 0..patch.nelem() {
        let mut coord = Vec::with_capacity(3 * num_corners);
        for axis in 0..3 {
            for v in 0..num_corners {
                coord.push(patch.elemtocoord[[axis, v, e]]);
            }
        }
        let mut faces = Vec::with_capacity(num_faces);
        for f in 0..num_faces {
            let positions = dim.face_corner_positions(f);
            let fused_ids: Vec<usize> = positions
                .iter()
                .map(|&p| fuser.find(patch.elemtovert[[e, p]]))
                .collect();
            faces.push(FaceInfo {
                fused_ids,
                bndy: patch.elemtobndy[[f, e]],
            });
        }
        my_records.push(ElemRecord {
            global_id: patch.global_id[e],
            coord,
            faces,
        });
    }

    let payload = encode(&my_records);
    let send: Vec<Vec<u8>> = (0..nparts).map(|_| payload.clone()).collect();
    let recv = comm.all_to_all_v(&send);

    let mut all_records: Vec<ElemRecord> = Vec::with_capacity(n_global);
    for buf in &recv {
        all_records.extend(decode(buf));
    }

    let mut coord_by_gid: FxHashMap<usize, Vec<f64>> = FxHashMap::default();
    // bucket: canonical sorted key -> (global_id, local_face, fused_ids (in
    // this element's order), bndy tag)
    type Bucket = SmallVec<[(usize, usize, Vec<usize>, i32); 2]>;
    let mut buckets: FxHashMap<Vec<usize>, Bucket> = FxHashMap::default();

    for r in &all_records {
        coord_by_gid.insert(r.global_id, r.coord.clone());
        for (f, face) in r.faces.iter().enumerate() {
            let mut key = face.fused_ids.clone();
            key.sort_unstable();
            buckets
                .entry(key)
                .or_default()
                .push((r.global_id, f, face.fused_ids.clone(), face.bndy));
        }
    }

    // (global_id, local_face) -> resolution
    let mut resolutions: FxHashMap<(usize, usize), Resolution> = FxHashMap::default();

    for (key, bucket) in &buckets {
        match bucket.len() {
            1 => {
                let (gid, f, _, tag) = &bucket[0];
                if *tag == 0 {
                    return Err(TopologyError::MeshInvariant(format!(
                        "face {key:?} of element {gid} face {f} has no peer and no boundary tag"
                    )));
                }
                resolutions.insert((*gid, *f), Resolution::Boundary { tag: *tag });
            }
            2 => {
                let (gid_a, f_a, ids_a, _) = &bucket[0];
                let (gid_b, f_b, ids_b, _) = &bucket[1];
                let ordr_a = compute_orientation(ids_a, ids_b)?;
                let ordr_b = compute_orientation(ids_b, ids_a)?;
                resolutions.insert(
                    (*gid_a, *f_a),
                    Resolution::Matched {
                        peer_global: *gid_b,
                        peer_face: *f_b,
                        ordr: ordr_a,
                    },
                );
                resolutions.insert(
                    (*gid_b, *f_b),
                    Resolution::Matched {
                        peer_global: *gid_a,
                        peer_face: *f_a,
                        ordr: ordr_b,
                    },
                );
            }
            n => {
                return Err(TopologyError::MeshInvariant(format!(
                    "face key {key:?} shared by {n} elements, expected 1 or 2"
                )));
            }
        }
    }

    let global_id_to_local: FxHashMap<usize, usize> = patch
        .global_id
        .iter()
        .enumerate()
        .map(|(local, &gid)| (gid, local))
        .collect();

    // Ghost allocation: collect every distinct remote peer referenced by a
    // local real face, grouped by owner rank ascending, then by the peer's
    // global id ascending (its position in the global SFC order).
    let mut ghost_peers: Vec<usize> = Vec::new();
    let mut seen_ghost: FxHashMap<usize, ()> = FxHashMap::default();
    for e in 0..patch.nelem() {
        let gid = patch.global_id[e];
        for f in 0..num_faces {
            if let Some(Resolution::Matched { peer_global, .. }) = resolutions.get(&(gid, f)) {
                if !global_id_to_local.contains_key(peer_global)
                    && seen_ghost.insert(*peer_global, ()).is_none()
                {
                    ghost_peers.push(*peer_global);
                }
            }
        }
    }
    ghost_peers.sort_by_key(|&gid| (owner_of(n_global, nparts, gid), gid));

    let nreal = patch.nelem();
    let nghost = ghost_peers.len();
    let ghost_local_index: FxHashMap<usize, usize> = ghost_peers
        .iter()
        .enumerate()
        .map(|(k, &gid)| (gid, nreal + k))
        .collect();

    let mut nabrtorank: Vec<i32> = Vec::new();
    let mut nabrtorecv: Vec<std::ops::Range<usize>> = Vec::new();
    {
        let mut start = 0usize;
        let mut idx = 0usize;
        while idx < ghost_peers.len() {
            let rank = owner_of(n_global, nparts, ghost_peers[idx]) as i32;
            let mut end = idx;
            while end < ghost_peers.len() && owner_of(n_global, nparts, ghost_peers[end]) as i32 == rank {
                end += 1;
            }
            nabrtorank.push(rank);
            nabrtorecv.push(start..(start + (end - idx)));
            start += end - idx;
            idx = end;
        }
    }

    // Send list: for each neighbor rank, the local real elements that rank
    // needs as ghosts (i.e. elements referenced as a peer by a face whose
    // owner is that rank), grouped in the same ascending-rank order and
    // within a rank by this element's own global id ascending.
    let mut send_by_rank: FxHashMap<i32, Vec<usize>> = FxHashMap::default();
    for e in 0..patch.nelem() {
        let gid = patch.global_id[e];
        for f in 0..num_faces {
            if let Some(Resolution::Matched { peer_global, .. }) = resolutions.get(&(gid, f)) {
                if global_id_to_local.contains_key(peer_global) {
                    continue;
                }
                let peer_rank = owner_of(n_global, nparts, *peer_global) as i32;
                let entry = send_by_rank.entry(peer_rank).or_default();
                if !entry.contains(&e) {
                    entry.push(e);
                }
            }
        }
    }
    for v in send_by_rank.values_mut() {
        v.sort_by_key(|&e| patch.global_id[e]);
    }

    let mut sendelems: Vec<usize> = Vec::new();
    let mut nabrtosend: Vec<std::ops::Range<usize>> = Vec::new();
    for &rank in &nabrtorank {
        let start = sendelems.len();
        if let Some(v) = send_by_rank.get(&rank) {
            sendelems.extend(v.iter().copied());
        }
        nabrtosend.push(start..sendelems.len());
    }

    let mut elemtoelem = ndarray::Array2::<usize>::zeros((num_faces, nreal));
    let mut elemtoface = ndarray::Array2::<usize>::zeros((num_faces, nreal));
    let mut elemtoordr = ndarray::Array2::<i32>::zeros((num_faces, nreal));
    let mut elemtobndy = ndarray::Array2::<i32>::zeros((num_faces, nreal));

    for e in 0..nreal {
        let gid = patch.global_id[e];
        for f in 0..num_faces {
            match resolutions.get(&(gid, f)) {
                Some(Resolution::Boundary { tag }) => {
                    elemtoelem[[f, e]] = e;
                    elemtoface[[f, e]] = f;
                    elemtoordr[[f, e]] = 1;
                    elemtobndy[[f, e]] = *tag;
                }
                Some(Resolution::Matched {
                    peer_global,
                    peer_face,
                    ordr,
                }) => {
                    let peer_local = global_id_to_local
                        .get(peer_global)
                        .copied()
                        .or_else(|| ghost_local_index.get(peer_global).copied())
                        .ok_or_else(|| {
                            TopologyError::MeshInvariant(format!(
                                "element {peer_global} referenced as neighbor but absent from global table"
                            ))
                        })?;
                    elemtoelem[[f, e]] = peer_local;
                    elemtoface[[f, e]] = *peer_face;
                    elemtoordr[[f, e]] = *ordr;
                    elemtobndy[[f, e]] = 0;
                }
                None => {
                    return Err(TopologyError::MeshInvariant(format!(
                        "element {gid} face {f} was never resolved"
                    )));
                }
            }
        }
    }

    let mut elemtocoord = ndarray::Array3::<f64>::zeros((3, num_corners, nreal + nghost));
    for e in 0..nreal {
        for axis in 0..3 {
            for v in 0..num_corners {
                elemtocoord[[axis, v, e]] = patch.elemtocoord[[axis, v, e]];
            }
        }
    }
    for (k, &gid) in ghost_peers.iter().enumerate() {
        let coord = coord_by_gid.get(&gid).ok_or_else(|| {
            TopologyError::MeshInvariant(format!(
                "ghost element {gid} missing from global coordinate exchange"
            ))
        })?;
        let e = nreal + k;
        for axis in 0..3 {
            for v in 0..num_corners {
                elemtocoord[[axis, v, e]] = coord[axis * num_corners + v];
            }
        }
    }

    Ok(Topology {
        kind,
        dim,
        comm,
        nreal,
        nghost,
        elemtocoord,
        elemtoelem,
        elemtoface,
        elemtoordr,
        elemtobndy,
        global_id: patch.global_id,
        ghost_global_id: ghost_peers,
        sendelems,
        nabrtorank,
        nabrtorecv,
        nabrtosend,
        stacksize: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brick::{generate_brick, BrickInput};
    use crate::comm::testing::{ChannelComm, SingleRankComm};
    use crate::sfc::sfc_partition;

    fn axis(lo: f64, hi: f64, n: usize) -> Vec<f64> {
        let step = (hi - lo) / n as f64;
        (0..=n).map(|i| lo + i as f64 * step).collect()
    }

    #[test]
    fn s1_one_d_periodic_single_rank() {
        let input = BrickInput {
            elemrange: vec![axis(0.0, 10.0, 10)],
            periodicity: vec![true],
            boundary: vec![[0, 0]],
        };
        let patch = generate_brick(&input, 0, 1).unwrap();
        let comm = SingleRankComm;
        let reordered = sfc_partition(&patch, &comm);
        let topo = build_connectivity(reordered, Box::new(SingleRankComm), TopologyKind::Brick).unwrap();

        assert_eq!(topo.nreal, 10);
        assert_eq!(topo.nghost, 0);
        for e in 0..10 {
            // face 0 = low (x-1), face 1 = high (x)
            let expected_low = if e == 0 { 9 } else { e - 1 };
            let expected_high = if e == 9 { 0 } else { e + 1 };
            assert_eq!(topo.elemtoelem[[0, e]], expected_low);
            assert_eq!(topo.elemtoelem[[1, e]], expected_high);
            assert_eq!(topo.elemtoface[[0, e]], 1);
            assert_eq!(topo.elemtoface[[1, e]], 0);
            assert_eq!(topo.elemtoordr[[0, e]], 1);
            assert_eq!(topo.elemtoordr[[1, e]], 1);
            assert_eq!(topo.elemtobndy[[0, e]], 0);
            assert_eq!(topo.elemtobndy[[1, e]], 0);
        }
    }

    #[test]
    fn two_d_nonperiodic_brick_has_self_referencing_boundaries() {
        let input = BrickInput {
            elemrange: vec![axis(0.0, 4.0, 4), axis(5.0, 9.0, 4)],
            periodicity: vec![false, true],
            boundary: vec![[1, 1], [0, 0]],
        };
        let patch = generate_brick(&input, 0, 1).unwrap();
        let comm = SingleRankComm;
        let reordered = sfc_partition(&patch, &comm);
        let topo = build_connectivity(reordered, Box::new(SingleRankComm), TopologyKind::Brick).unwrap();
        assert_eq!(topo.nreal, 16);
        for e in 0..16 {
            for f in 0..4 {
                if topo.elemtobndy[[f, e]] != 0 {
                    assert_eq!(topo.elemtoelem[[f, e]], e);
                    assert_eq!(topo.elemtoface[[f, e]], f);
                    assert_eq!(topo.elemtoordr[[f, e]], 1);
                }
            }
        }
    }

    #[test]
    fn s6_two_rank_brick_each_gets_one_ghost_per_side() {
        let input = BrickInput {
            elemrange: vec![axis(0.0, 8.0, 8)],
            periodicity: vec![false],
            boundary: vec![[1, 1]],
        };
        let comms = ChannelComm::new_group(2);
        let results: Vec<_> = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .into_iter()
                .map(|comm| {
                    let input_ref = &input;
                    s.spawn(move || {
                        let rank = comm.rank() as usize;
                        let patch = generate_brick(input_ref, rank, 2).unwrap();
                        let reordered = sfc_partition(&patch, &comm);
                        build_connectivity(reordered, Box::new(comm), TopologyKind::Brick).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for topo in &results {
            assert_eq!(topo.nreal, 4);
            assert_eq!(topo.nghost, 1);
            assert_eq!(topo.nabrtorank.len(), 1);
            assert_eq!(topo.sendelems.len(), 1);
            assert_eq!(topo.nabrtorecv[0].len(), 1);
            assert_eq!(topo.nabrtosend[0].len(), 1);
        }
    }
}
