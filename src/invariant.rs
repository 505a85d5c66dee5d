//! The safety-invariant monitor (component C7 of the spec): predicates
//! checkable both by tests in this crate and, in principle, by an external
//! symbolic-execution harness against the same contract.
//!
//! `assert_safe` and `assume_safe` exist as separate entry points even
//! though they currently share an implementation: a verification harness
//! would bind `assume_safe` to a symbolic-execution `assume`, while
//! `assert_safe` stays a normal runtime check callable from `#[test]`s.

use crate::sandbox::SandboxContext;

/// Check invariant I1: `membase + memlen` does not overflow and
/// `membase > memlen`, matching `VALID_CTX` in the reference sources.
pub fn valid_ctx(ctx: &SandboxContext) -> bool {
    let membase = ctx.membase();
    let memlen = ctx.memlen();
    membase.checked_add(memlen).is_some() && membase > memlen
}

/// Check invariants I2 (bijection) and I3 (range) for every slot.
pub fn fd_safe(ctx: &SandboxContext) -> bool {
    ctx.fds().check_bijection()
}

/// Check invariant I1 plus I2/I3 restricted to the given witness indices,
/// mirroring the reference `SAFE(ctx)` macro. Pass `None` for either
/// witness to check all indices (used by exhaustive tests).
pub fn assert_safe(ctx: &SandboxContext, vfd_witness: Option<i32>, hfd_witness: Option<i32>) -> bool {
    if !valid_ctx(ctx) {
        return false;
    }
    match (vfd_witness, hfd_witness) {
        (None, None) => fd_safe(ctx),
        (vfd, hfd) => {
            let fds = ctx.fds();
            let vfd_ok = vfd.map_or(true, |v| {
                !fds.in_fd_map(v) || {
                    let h = fds.translate(v);
                    fds.in_rev_fd_map(h) && fds.reverse_translate(h) == v
                }
            });
            let hfd_ok = hfd.map_or(true, |h| {
                !fds.in_rev_fd_map(h) || {
                    let v = fds.reverse_translate(h);
                    fds.in_fd_map(v) && fds.translate(v) == h
                }
            });
            vfd_ok && hfd_ok
        }
    }
}

/// The verifier-side dual of [`assert_safe`]: imposes the same properties
/// as assumptions on symbolic state rather than checking concrete state.
/// In this runtime crate there is no symbolic executor to hand assumptions
/// to, so this is implemented identically to `assert_safe` and exists to
/// give the verification harness a distinct, documented entry point to
/// bind against.
pub fn assume_safe(ctx: &SandboxContext, vfd_witness: Option<i32>, hfd_witness: Option<i32>) -> bool {
    assert_safe(ctx, vfd_witness, hfd_witness)
}
