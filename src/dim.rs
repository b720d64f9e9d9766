use crate::error::{Result, TopologyError};

/// Logical dimension of a topology: 1, 2 or 3.
///
/// Unlike the embedding dimension of `elemtocoord` (always 3 rows), this is
/// the dimension that drives face counts, corner counts and axis indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dim {
    D1 = 1,
    D2 = 2,
    D3 = 3,
}

impl Dim {
    pub fn as_usize(self) -> usize {
        self as usize
    }

    /// `2^dim` corners per element, enumerated in Cartesian (lexicographic,
    /// axis-0-fastest) order.
    pub fn num_corners(self) -> usize {
        1 << self.as_usize()
    }

    /// `2^(dim-1)` corners per face.
    pub fn face_corners(self) -> usize {
        1 << (self.as_usize() - 1)
    }

    /// `2*dim` faces per element: face `2a` is the low face of axis `a`,
    /// face `2a+1` is the high face (0-indexed storage; the 1-indexed
    /// `2d-1`/`2d` convention of the spec is `2a`/`2a+1` here).
    pub fn num_faces(self) -> usize {
        2 * self.as_usize()
    }

    pub fn try_from_usize(d: usize) -> Result<Dim> {
        match d {
            1 => Ok(Dim::D1),
            2 => Ok(Dim::D2),
            3 => Ok(Dim::D3),
            other => Err(TopologyError::InvalidShape(format!(
                "dimension must be 1, 2 or 3, got {other}"
            ))),
        }
    }

    /// The dimension one level up (used when extruding a base topology).
    pub fn up(self) -> Result<Dim> {
        Dim::try_from_usize(self.as_usize() + 1)
    }

    /// Per-axis low/high bit of corner `k` (`0..2^dim`), axis 0 fastest.
    pub fn corner_bits(self, k: usize) -> Vec<usize> {
        (0..self.as_usize()).map(|a| (k >> a) & 1).collect()
    }

    /// Indices (into the `2^dim`-long corner array) of the corners that
    /// belong to face `face` (`0..2*dim`, `2*axis` = low face, `2*axis+1` =
    /// high face), in Cartesian order over the remaining axes.
    pub fn face_corner_positions(self, face: usize) -> Vec<usize> {
        let dim = self.as_usize();
        assert!(face < 2 * dim, "face {face} out of range for dim {dim}");
        let axis = face / 2;
        let side = face % 2;
        let other_axes: Vec<usize> = (0..dim).filter(|&a| a != axis).collect();
        let num_face_corners = 1 << other_axes.len();
        (0..num_face_corners)
            .map(|k| {
                let mut corner = side << axis;
                for (bit_pos, &a) in other_axes.iter().enumerate() {
                    corner |= ((k >> bit_pos) & 1) << a;
                }
                corner
            })
            .collect()
    }
}
