//! Distributed mesh topology core for a climate/atmosphere dynamical-core
//! solver: builds, per rank of a message-passing communicator, a
//! partitioned unstructured hex/quad mesh with explicit ghost layers,
//! neighbor-communication descriptors, and face-to-face connectivity.
//!
//! Four constructors share one connectivity engine: [`brick_topology`],
//! [`stacked_brick_topology`], [`cubed_shell_topology`] and
//! [`stacked_cubed_sphere_topology`]. Everything downstream (a
//! spectral-element grid builder, physical parameterizations, the
//! Runge-Kutta time stepper) is an external collaborator consuming the
//! read-only [`Topology`] record; none of that lives here.

mod brick;
mod comm;
mod connectivity;
mod cubed_shell;
mod dim;
mod error;
mod hilbert;
mod partition;
mod patch;
mod sfc;
mod stack;
mod topology;
mod unionfind;
mod warp;

pub use crate::comm::Comm;
pub use crate::dim::Dim;
pub use crate::error::{Result, TopologyError};
pub use crate::topology::{
    brick_topology, cubed_shell_topology, stacked_brick_topology, stacked_cubed_sphere_topology,
    Connectivity, Topology, TopologyKind, TopologyOptions, TopologySnapshot,
};
pub use crate::warp::warp;

/// Test-only communicator stand-ins, re-exported so downstream integration
/// tests can exercise multi-rank scenarios without a real message-passing
/// library.
pub mod testing {
    pub use crate::comm::testing::{ChannelComm, SingleRankComm};
}

/// Common imports for constructing and querying a [`Topology`].
pub mod prelude {
    pub use crate::{
        brick_topology, cubed_shell_topology, stacked_brick_topology,
        stacked_cubed_sphere_topology, warp, Comm, Connectivity, Dim, Result, Topology,
        TopologyError, TopologyKind, TopologyOptions,
    };
}
