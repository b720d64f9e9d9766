use std::ops::Range;

/// Splits `0..n_global` into `nparts` contiguous, non-overlapping ranges as
/// evenly as possible; the first `n_global % nparts` parts get one extra
/// element. Pure and side-effect free (component A of the mesh topology
/// core).
pub fn linear_partition(n_global: usize, part: usize, nparts: usize) -> Range<usize> {
    assert!(nparts > 0, "nparts must be positive");
    assert!(part < nparts, "part must be < nparts");
    let q = n_global / nparts;
    let r = n_global % nparts;
    let start = part * q + part.min(r);
    let extra = usize::from(part < r);
    start..(start + q + extra)
}

/// Inverse of [`linear_partition`]: which rank owns global element `gid`
/// under the same even split. Used by the connectivity engine (4.E step 3)
/// to resolve face-peer ownership from the global SFC ordering.
pub fn owner_of(n_global: usize, nparts: usize, gid: usize) -> usize {
    assert!(gid < n_global, "gid {gid} out of range for n_global {n_global}");
    let q = n_global / nparts;
    let r = n_global % nparts;
    let boundary = r * (q + 1);
    if gid < boundary {
        gid / (q + 1)
    } else {
        r + (gid - boundary) / q
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn even_split() {
        for p in 0..4 {
            assert_eq!(linear_partition(8, p, 4), (p * 2)..(p * 2 + 2));
        }
    }

    #[test]
    fn uneven_split_front_loads_extra() {
        // 10 elements across 3 parts -> sizes 4, 3, 3
        assert_eq!(linear_partition(10, 0, 3), 0..4);
        assert_eq!(linear_partition(10, 1, 3), 4..7);
        assert_eq!(linear_partition(10, 2, 3), 7..10);
    }

    #[test]
    fn ranges_partition_the_whole_set() {
        let n = 37;
        let nparts = 5;
        let mut covered = Vec::new();
        for p in 0..nparts {
            covered.extend(linear_partition(n, p, nparts));
        }
        covered.sort_unstable();
        assert_eq!(covered, (0..n).collect::<Vec<_>>());
    }

    #[test]
    fn single_part_covers_everything() {
        assert_eq!(linear_partition(5, 0, 1), 0..5);
    }

    #[test]
    fn empty_global_set() {
        assert_eq!(linear_partition(0, 0, 3), 0..0);
        assert_eq!(linear_partition(0, 2, 3), 0..0);
    }

    #[test]
    fn owner_of_agrees_with_linear_partition() {
        let n = 37;
        let nparts = 5;
        for p in 0..nparts {
            for gid in linear_partition(n, p, nparts) {
                assert_eq!(owner_of(n, nparts, gid), p);
            }
        }
    }

    #[test]
    fn owner_of_handles_fewer_elements_than_parts() {
        // n=2, nparts=5: ranks 0,1 own one element each, ranks 2..5 own none.
        assert_eq!(owner_of(2, 5, 0), 0);
        assert_eq!(owner_of(2, 5, 1), 1);
    }
}
