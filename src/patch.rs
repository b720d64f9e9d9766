use ndarray::{Array2, Array3};

use crate::dim::Dim;

/// The interchange value passed `generator -> sfc::sfc_partition ->
/// connectivity::build_connectivity`.
///
/// One `MeshPatch` describes the elements a single rank currently holds,
/// before face connectivity has been resolved. `global_id[i]` is the stable
/// global element id of local element `i`; it is what the SFC partitioner
/// reorders and what the connectivity engine uses to resolve element
/// ownership (4.E step 3).
#[derive(Debug, Clone)]
pub struct MeshPatch {
    pub dim: Dim,
    pub n_global: usize,
    pub global_id: Vec<usize>,
    /// `(nelem, 2^dim)`: global vertex id of each corner, Cartesian order.
    pub elemtovert: Array2<usize>,
    /// `(3, 2^dim, nelem)`: embedding coordinate of each corner.
    pub elemtocoord: Array3<f64>,
    /// `(2*dim, nelem)`: boundary tag per face, 0 if not a physical
    /// boundary (the connectivity engine resolves the rest).
    pub elemtobndy: Array2<i32>,
    /// Global vertex-id pairs that must be treated as identical (periodic
    /// wraps, cubed-shell corner fusion). Identical on every rank.
    pub face_connections: Vec<(usize, usize)>,
}

impl MeshPatch {
    pub fn nelem(&self) -> usize {
        self.global_id.len()
    }
}

/// Row-major (axis-0 fastest) dense lattice id assignment, shared by the
/// brick and cubed-shell generators for vertex numbering.
pub(crate) struct Lattice {
    strides: Vec<usize>,
}

impl Lattice {
    pub fn new(sizes: &[usize]) -> Self {
        let mut strides = vec![1usize; sizes.len()];
        for i in 1..sizes.len() {
            strides[i] = strides[i - 1] * sizes[i - 1];
        }
        Self { strides }
    }

    pub fn id(&self, idx: &[usize]) -> usize {
        idx.iter().zip(&self.strides).map(|(&i, &s)| i * s).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lattice_is_row_major_axis0_fastest() {
        let lat = Lattice::new(&[3, 2]);
        assert_eq!(lat.id(&[0, 0]), 0);
        assert_eq!(lat.id(&[1, 0]), 1);
        assert_eq!(lat.id(&[2, 0]), 2);
        assert_eq!(lat.id(&[0, 1]), 3);
        assert_eq!(lat.id(&[2, 1]), 5);
    }
}
