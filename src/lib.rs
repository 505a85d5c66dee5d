//! A host-side runtime that mediates a restricted POSIX-like file I/O
//! surface for an untrusted guest: a linear memory region it can read and
//! write by offset, and a virtual file descriptor namespace distinct from
//! the host's own.
//!
//! None of the wrappers in [`wrappers`] trust a guest-supplied pointer,
//! path, or fd number without first routing it through the address
//! translator ([`mem`]), the path resolver ([`path`]), or the fd bijection
//! ([`fd`]). [`sandbox::SandboxContext`] is the entry point: it owns all
//! three plus this context's [`metrics`], the way the teacher's `Sandbox`
//! owns its guest memory and hypervisor handle.

#![deny(unused_mut)]

/// Dealing with the error taxonomy that crosses every fallible boundary.
pub mod error;
/// Sandbox configuration, mirroring the teacher's clamped-builder pattern.
pub mod config;
/// Guest linear memory and the address translator (C2).
pub mod mem;
/// The path resolver and its root-confinement normalization (C3).
pub mod path;
/// The virtual/host fd bijection (C4).
pub mod fd;
/// Safety-invariant predicates checkable at runtime or by a verifier (C7).
pub mod invariant;
/// The host primitive interface: the trusted adapter over real OS calls (C6).
pub mod host;
/// The sandbox context that owns memory, fds, config, and metrics (C1).
pub mod sandbox;
/// The guest-visible syscall wrappers (C5).
pub mod wrappers;
/// Prometheus metrics reported by a [`sandbox::SandboxContext`].
pub mod metrics;
/// Version and git metadata stamped in by `build.rs`.
pub mod built_info;
/// Test fixtures shared across this crate's unit and integration tests.
#[cfg(test)]
pub(crate) mod testing;

pub use config::SandboxConfig;
pub use error::{Result, SandboxError};
pub use sandbox::SandboxContext;
