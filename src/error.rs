use std::fmt;

/// Errors that can arise while constructing a [`crate::topology::Topology`].
///
/// Runtime accessors on an already-built topology never fail: every variant
/// here can only be produced during the one-shot collective construction
/// call, never afterwards.
#[derive(Debug, Clone, PartialEq)]
pub enum TopologyError {
    /// A caller requested an option value outside the enumerated recognized
    /// set (`connectivity != face`, `ghostsize != 1`, vertical periodicity
    /// on a stacked sphere, ...).
    Unsupported(String),
    /// The element-range / stack description supplied to a constructor is
    /// not well formed (zero-length axis, non-monotonic radii, stacking a
    /// 0- or 1-dimensional base, ...).
    InvalidShape(String),
    /// The connectivity engine found the inputs collectively inconsistent:
    /// a non-boundary face shared by something other than exactly two
    /// elements, a dangling neighbor id, or an orientation that does not
    /// reduce to identity or a reversal.
    MeshInvariant(String),
    /// The cubed-shell warp was called on a point with no dominant axis.
    InvalidWarpInput { a: f64, b: f64, c: f64 },
}

impl fmt::Display for TopologyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TopologyError::Unsupported(msg) => write!(f, "unsupported option: {msg}"),
            TopologyError::InvalidShape(msg) => write!(f, "invalid shape: {msg}"),
            TopologyError::MeshInvariant(msg) => write!(f, "mesh invariant violated: {msg}"),
            TopologyError::InvalidWarpInput { a, b, c } => {
                write!(f, "warp input ({a}, {b}, {c}) has no dominant axis")
            }
        }
    }
}

impl std::error::Error for TopologyError {}

pub type Result<T> = std::result::Result<T, TopologyError>;
