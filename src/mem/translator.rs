use tracing::{instrument, Span};

use crate::error::new_error;
use crate::mem::SharedMemory;
use crate::Result;

/// Translates guest offsets into host addresses, range-checking every
/// access before it reaches [`SharedMemory`] (component C2 of the spec).
///
/// A `MemTranslator` borrows no mutable state of its own: `membase` and
/// `memlen` are immutable for the lifetime of a [`crate::sandbox::SandboxContext`]
/// (invariant I1), so every method here takes `&self`.
#[derive(Debug, Clone)]
pub struct MemTranslator {
    mem: SharedMemory,
}

impl MemTranslator {
    pub(crate) fn new(mem: SharedMemory) -> Self {
        Self { mem }
    }

    /// `membase`: the host address the guest's offset 0 maps to.
    pub fn membase(&self) -> usize {
        self.mem.base_addr()
    }

    /// `memlen`: the length in bytes of the guest's linear memory.
    pub fn memlen(&self) -> usize {
        self.mem.mem_size()
    }

    /// Computes `membase + gptr`. The result is *unvalidated*: callers
    /// must follow up with [`Self::in_mem_region`] and
    /// [`Self::fits_in_mem_region`] before dereferencing it.
    #[instrument(skip_all, parent = Span::current(), level = "Trace")]
    pub fn swizzle(&self, gptr: u32) -> usize {
        self.membase().wrapping_add(gptr as usize)
    }

    /// Recovers the guest offset a host address was swizzled from.
    #[instrument(skip_all, parent = Span::current(), level = "Trace")]
    pub fn reverse_swizzle(&self, hptr: usize) -> u32 {
        hptr.wrapping_sub(self.membase()) as u32
    }

    /// `membase ≤ hptr ≤ membase + memlen`.
    #[instrument(skip_all, parent = Span::current(), level = "Trace")]
    pub fn in_mem_region(&self, hptr: usize) -> bool {
        let base = self.membase();
        let end = base.saturating_add(self.memlen());
        hptr >= base && hptr <= end
    }

    /// `hptr + n < membase + memlen`, computed without overflow.
    #[instrument(skip_all, parent = Span::current(), level = "Trace")]
    pub fn fits_in_mem_region(&self, hptr: usize, n: usize) -> bool {
        let end = self.membase().saturating_add(self.memlen());
        match hptr.checked_add(n) {
            Some(sum) => sum < end,
            None => false,
        }
    }

    /// Validate that `[gptr, gptr + n)` lies within `[0, memlen)` without
    /// overflow, returning the swizzled host address on success.
    ///
    /// `n == 0` is valid and always succeeds (a no-op range). `n >= memlen`
    /// always fails, per the spec's edge cases for C2.
    #[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
    pub fn validate_range(&self, gptr: u32, n: usize) -> Result<usize> {
        if n >= self.memlen() {
            return Err(new_error!(
                "requested length {} is not smaller than memlen {}",
                n,
                self.memlen()
            ));
        }
        let hptr = self.swizzle(gptr);
        if !self.in_mem_region(hptr) || (n > 0 && !self.fits_in_mem_region(hptr, n)) {
            return Err(new_error!(
                "guest pointer {:#x} with length {} escapes the memory region",
                gptr,
                n
            ));
        }
        Ok(hptr)
    }

    /// Copy `n` bytes out of guest memory starting at `gptr` into a fresh,
    /// owned buffer. `n == 0` returns an empty buffer without touching
    /// guest memory.
    #[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
    pub fn copy_buf_from_sandbox(&self, gptr: u32, n: usize) -> Result<Vec<u8>> {
        if n == 0 {
            self.validate_range(gptr, 0)?;
            return Ok(Vec::new());
        }
        self.validate_range(gptr, n)?;
        let mut buf = vec![0u8; n];
        self.mem.copy_to_slice(&mut buf, gptr as usize)?;
        Ok(buf)
    }

    /// Copy `src` into guest memory starting at `gptr`.
    #[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
    pub fn copy_buf_to_sandbox(&self, gptr: u32, src: &[u8]) -> Result<()> {
        if src.is_empty() {
            self.validate_range(gptr, 0)?;
            return Ok(());
        }
        self.validate_range(gptr, src.len())?;
        self.mem.copy_from_slice(src, gptr as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator(memlen: usize) -> MemTranslator {
        MemTranslator::new(SharedMemory::new(memlen).unwrap())
    }

    #[test]
    fn round_trip_swizzle() {
        let t = translator(1024 * 1024);
        for gptr in [0u32, 1, 0x100, 0xFFFFF] {
            assert_eq!(t.reverse_swizzle(t.swizzle(gptr)), gptr);
        }
    }

    #[test]
    fn zero_length_is_always_valid() {
        let t = translator(1024 * 1024);
        assert!(t.validate_range(0, 0).is_ok());
        assert!(t.validate_range(t.memlen() as u32, 0).is_ok());
    }

    #[test]
    fn length_must_be_smaller_than_memlen() {
        let t = translator(1024 * 1024);
        assert!(t.validate_range(0, t.memlen()).is_err());
        assert!(t.validate_range(0, t.memlen() - 1).is_ok());
    }

    #[test]
    fn out_of_bounds_offset_rejected() {
        let t = translator(1024 * 1024);
        assert!(t.validate_range(0xFFFFF, 2).is_err());
        assert!(t.validate_range(0xFFFFE, 1).is_ok());
    }

    #[test]
    fn copy_round_trips_through_guest_memory() {
        let t = translator(4096);
        t.copy_buf_to_sandbox(0x100, b"hello").unwrap();
        let out = t.copy_buf_from_sandbox(0x100, 5).unwrap();
        assert_eq!(&out, b"hello");
    }

    #[test]
    fn copy_rejects_out_of_range() {
        let t = translator(4096);
        assert!(t.copy_buf_from_sandbox(4090, 100).is_err());
    }
}
