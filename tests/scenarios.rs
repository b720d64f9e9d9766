//! End-to-end seed scenarios (spec §8, S1-S6), exercised purely through the
//! public API — no `meshtopo` internals are visible here, the way a
//! spectral-element grid builder consuming this crate would see it.

use meshtopo::prelude::*;
use meshtopo::testing::{ChannelComm, SingleRankComm};

fn axis(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let step = (hi - lo) / n as f64;
    (0..=n).map(|i| lo + i as f64 * step).collect()
}

/// S1 - 1-D periodic brick, single rank.
#[test]
fn s1_one_d_periodic_brick() {
    let options = TopologyOptions {
        periodicity: vec![true],
        ..TopologyOptions::default()
    };
    let topo = brick_topology(Box::new(SingleRankComm), vec![axis(0.0, 10.0, 10)], &options).unwrap();

    assert_eq!(topo.realelems().len(), 10);
    assert_eq!(topo.ghostelems().len(), 0);
    assert!(topo.sendelems().is_empty());

    for e in 0..10 {
        assert_eq!(topo.elemtocoord()[[0, 0, e]], e as f64);
        assert_eq!(topo.elemtocoord()[[0, 1, e]], (e + 1) as f64);
        let expected_low = if e == 0 { 9 } else { e - 1 };
        let expected_high = if e == 9 { 0 } else { e + 1 };
        assert_eq!(topo.elemtoelem()[[0, e]], expected_low);
        assert_eq!(topo.elemtoelem()[[1, e]], expected_high);
        assert_eq!(topo.elemtoface()[[0, e]], 1);
        assert_eq!(topo.elemtoface()[[1, e]], 0);
        assert_eq!(topo.elemtobndy()[[0, e]], 0);
        assert_eq!(topo.elemtobndy()[[1, e]], 0);
    }
}

/// S2 - 2-D brick periodic in y only, single rank: 16 elements, every
/// orientation trivial, no boundary tags (none supplied).
#[test]
fn s2_two_d_brick_periodic_in_y() {
    let options = TopologyOptions {
        periodicity: vec![false, true],
        ..TopologyOptions::default()
    };
    let topo = brick_topology(
        Box::new(SingleRankComm),
        vec![axis(0.0, 4.0, 4), axis(5.0, 9.0, 4)],
        &options,
    )
    .unwrap();

    assert_eq!(topo.realelems().len(), 16);
    assert!(topo.elemtoordr().iter().all(|&o| o == 1));

    // x is non-periodic: faces 0 (low x) and 1 (high x) are boundary exactly
    // at the two x-extremes; y is periodic so faces 2/3 never carry a tag.
    assert!(topo.elemtobndy().row(2).iter().all(|&b| b == 0));
    assert!(topo.elemtobndy().row(3).iter().all(|&b| b == 0));
    let x_boundary_count = topo.elemtobndy().row(0).iter().filter(|&&b| b != 0).count()
        + topo.elemtobndy().row(1).iter().filter(|&&b| b != 0).count();
    assert_eq!(x_boundary_count, 8); // 4 elements on each of the two x-edges
}

/// S3 - stacked 2-D brick: base 1-D brick of 3 elements, extruded into 2
/// vertical levels, with distinct inner/outer boundary tags.
#[test]
fn s3_stacked_brick_six_elements() {
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

    for base_i in 0..3 {
        let bottom = 2 * base_i;
        let top = 2 * base_i + 1;
        assert_eq!(topo.elemtobndy()[[2, bottom]], 1);
        assert_eq!(topo.elemtobndy()[[3, top]], 2);
        assert_eq!(topo.elemtoelem()[[3, bottom]], top);
        assert_eq!(topo.elemtoelem()[[2, top]], bottom);
    }
}

/// S4 - cubed shell Ne=2, single rank: 24 elements, no boundary faces, every
/// element has 4 connected faces, and the 8 cube corners are each shared by
/// exactly 3 elements (checked directly on the generator in `cubed_shell`'s
/// own unit tests; here we check the post-connectivity view).
#[test]
fn s4_cubed_shell_ne2() {
    let options = TopologyOptions::default();
    let topo = cubed_shell_topology(Box::new(SingleRankComm), 2, &options).unwrap();

    assert_eq!(topo.realelems().len(), 24);
    assert!(topo.elemtobndy().iter().all(|&b| b == 0));
    for e in topo.realelems() {
        for f in 0..4 {
            assert_ne!(topo.elemtoelem()[[f, e]], e, "every face of a shell element must be connected");
        }
    }
}

/// S5 - stacked cubed sphere, Ne=2, 3 radial levels: 48 elements, innermost
/// vertical faces tagged `bc[0]`, outermost tagged `bc[1]`, vertical
/// orientations always identity.
#[test]
fn s5_stacked_cubed_sphere() {
    let options = TopologyOptions {
        bc: (7, 8),
        ..TopologyOptions::default()
    };
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

    let stacksize = 2;
    for base_i in 0..24 {
        let bottom = stacksize * base_i;
        let top = stacksize * base_i + 1;
        assert_eq!(topo.elemtobndy()[[4, bottom]], 7);
        assert_eq!(topo.elemtobndy()[[5, top]], 8);
        assert_eq!(topo.elemtoordr()[[4, bottom]], 1);
        assert_eq!(topo.elemtoordr()[[5, top]], 1);
    }
}

/// S6 - 2-rank brick of 8 elements: each rank holds 4 real elements with
/// exactly one ghost across the shared internal boundary.
#[test]
fn s6_two_rank_brick() {
    let options = TopologyOptions::default();
    let comms = ChannelComm::new_group(2);
    let topos: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = comms
            .into_iter()
            .map(|comm| {
                let options = &options;
                s.spawn(move || brick_topology(Box::new(comm), vec![axis(0.0, 8.0, 8)], options).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for topo in &topos {
        assert_eq!(topo.realelems().len(), 4);
        assert_eq!(topo.ghostelems().len(), 1);
        assert_eq!(topo.nabrtorank().len(), 1);
        assert_eq!(topo.sendelems().len(), 1);
        assert_eq!(topo.nabrtorecv()[0].len(), 1);
        assert_eq!(topo.nabrtosend()[0].len(), 1);
    }

    // Reciprocity across ranks: each rank's one ghost must be the other
    // rank's boundary-adjacent real element and vice versa.
    let rank0_ghost_gid = topos[0].global_id(topos[0].realelems().len());
    let rank1_first_real_gid = topos[1].global_id(0);
    assert_eq!(rank0_ghost_gid, rank1_first_real_gid);
}

/// Invalid option values are rejected at construction, never silently
/// accepted.
#[test]
fn unsupported_ghostsize_is_rejected() {
    let options = TopologyOptions {
        ghostsize: 2,
        ..TopologyOptions::default()
    };
    let result = brick_topology(Box::new(SingleRankComm), vec![axis(0.0, 1.0, 1)], &options);
    assert!(matches!(result, Err(TopologyError::Unsupported(_))));
}

#[test]
fn unsupported_connectivity_is_rejected() {
    let options = TopologyOptions {
        connectivity: Connectivity::Vertex,
        ..TopologyOptions::default()
    };
    let result = brick_topology(Box::new(SingleRankComm), vec![axis(0.0, 1.0, 1)], &options);
    assert!(matches!(result, Err(TopologyError::Unsupported(_))));
}

#[test]
fn vertical_periodicity_on_sphere_stack_is_rejected() {
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
fn zero_length_axis_is_rejected() {
    let options = TopologyOptions::default();
    let result = brick_topology(Box::new(SingleRankComm), vec![vec![0.0]], &options);
    assert!(matches!(result, Err(TopologyError::InvalidShape(_))));
}
