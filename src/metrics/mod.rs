//! Prometheus metrics for the sandbox runtime.
//!
//! Grounded on the teacher's `metrics::{IntCounter, IntGauge}` wrappers,
//! which wrap a dynamic `HyperlightMetric` enum keyed by name, built for a
//! sandbox that exposes dozens of pluggable metrics. This crate has a
//! small, fixed set of counters known at compile time, so they are plain
//! `prometheus` types registered into a registry owned by each sandbox
//! context.

use prometheus::{IntCounter, IntGauge, Registry};

use crate::error::new_error;
use crate::Result;

/// The metrics a [`crate::sandbox::SandboxContext`] reports over its lifetime.
///
/// Each `SandboxContext` owns its own [`Registry`] rather than sharing one
/// process-wide registry: a host embedding several sandboxes at once wants
/// per-sandbox series, and a private registry means creating and
/// destroying sandboxes in the same process (as the test suite does) never
/// collides on metric names.
pub struct SandboxMetrics {
    registry: Registry,
    /// Total number of wrapper calls that returned success, by design a
    /// single counter rather than one per operation: per-operation
    /// breakdowns belong to a tracing backend, not this crate.
    pub syscalls_total: IntCounter,
    /// Total number of wrapper calls that returned an error.
    pub syscall_errors_total: IntCounter,
    /// Total bytes copied out of guest memory into the host (`write`,
    /// path resolution).
    pub bytes_read_total: IntCounter,
    /// Total bytes copied from the host into guest memory (`read`).
    pub bytes_written_total: IntCounter,
    /// Number of virtual fds currently sealed.
    pub open_fds: IntGauge,
}

impl SandboxMetrics {
    /// Build a fresh registry and register this context's counters into it.
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let syscalls_total = IntCounter::new("wavebox_syscalls_total", "total wrapper calls")
            .map_err(|e| new_error!("failed to construct syscalls_total counter: {e}"))?;
        let syscall_errors_total = IntCounter::new(
            "wavebox_syscall_errors_total",
            "total wrapper calls that returned an error",
        )
        .map_err(|e| new_error!("failed to construct syscall_errors_total counter: {e}"))?;
        let bytes_read_total = IntCounter::new(
            "wavebox_bytes_read_total",
            "total bytes copied out of guest memory",
        )
        .map_err(|e| new_error!("failed to construct bytes_read_total counter: {e}"))?;
        let bytes_written_total = IntCounter::new(
            "wavebox_bytes_written_total",
            "total bytes copied into guest memory",
        )
        .map_err(|e| new_error!("failed to construct bytes_written_total counter: {e}"))?;
        let open_fds = IntGauge::new("wavebox_open_fds", "currently sealed virtual fds")
            .map_err(|e| new_error!("failed to construct open_fds gauge: {e}"))?;

        registry
            .register(Box::new(syscalls_total.clone()))
            .map_err(|e| new_error!("failed to register syscalls_total: {e}"))?;
        registry
            .register(Box::new(syscall_errors_total.clone()))
            .map_err(|e| new_error!("failed to register syscall_errors_total: {e}"))?;
        registry
            .register(Box::new(bytes_read_total.clone()))
            .map_err(|e| new_error!("failed to register bytes_read_total: {e}"))?;
        registry
            .register(Box::new(bytes_written_total.clone()))
            .map_err(|e| new_error!("failed to register bytes_written_total: {e}"))?;
        registry
            .register(Box::new(open_fds.clone()))
            .map_err(|e| new_error!("failed to register open_fds: {e}"))?;

        Ok(Self {
            registry,
            syscalls_total,
            syscall_errors_total,
            bytes_read_total,
            bytes_written_total,
            open_fds,
        })
    }

    /// The registry these counters are registered into, exposed through
    /// e.g. a `/metrics` HTTP handler the embedding process wires up
    /// itself. This crate does not serve metrics over the network (see
    /// Non-goals in `SPEC_FULL.md`).
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        let m = SandboxMetrics::new().unwrap();
        assert_eq!(m.syscalls_total.get(), 0);
        m.syscalls_total.inc();
        assert_eq!(m.syscalls_total.get(), 1);
        m.open_fds.set(3);
        assert_eq!(m.open_fds.get(), 3);
    }

    #[test]
    fn independent_instances_do_not_collide() {
        let a = SandboxMetrics::new().unwrap();
        let b = SandboxMetrics::new().unwrap();
        a.syscalls_total.inc();
        assert_eq!(a.syscalls_total.get(), 1);
        assert_eq!(b.syscalls_total.get(), 0);
    }
}
