//! Wire types and service glue for the discovery API.
//!
//! The code under this module is vendored output of `prost-build` /
//! `tonic-build` over `proto/discovery.proto`.

#[allow(clippy::all)]
mod generated {
    include!("lattice.discovery.v1.rs");
}

pub use self::generated::*;
