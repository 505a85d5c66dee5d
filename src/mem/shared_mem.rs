use std::ffi::c_void;
use std::io::Error;
use std::ptr::null_mut;
use std::sync::Arc;

use tracing::{instrument, Span};
#[cfg(target_os = "windows")]
use windows::Win32::System::Memory::{VirtualAlloc, MEM_COMMIT, PAGE_READWRITE};

use crate::error::{new_error, SandboxError};
use crate::Result;

const PAGE_SIZE: usize = 4096;

/// Makes sure that `offset + size` does not run off the end of memory of
/// size `mem_size`, without overflowing while computing the sum.
macro_rules! bounds_check {
    ($offset:expr, $size:expr, $mem_size:expr) => {
        if $offset.checked_add($size).map_or(true, |end| end > $mem_size) {
            return Err(new_error!(
                "access at offset {} with size {} escapes memory of size {}",
                $offset,
                $size,
                $mem_size
            ));
        }
    };
}
pub(crate) use bounds_check;

#[derive(Debug)]
struct PtrCVoidMut(*mut c_void);
unsafe impl Send for PtrCVoidMut {}
unsafe impl Sync for PtrCVoidMut {}

#[derive(Debug)]
struct PtrAndSize {
    ptr: PtrCVoidMut,
    /// total size including the two guard pages
    size: usize,
}

impl Drop for PtrAndSize {
    #[cfg(target_os = "linux")]
    fn drop(&mut self) {
        use libc::munmap;
        unsafe {
            munmap(self.ptr.0, self.size);
        }
    }
    #[cfg(target_os = "windows")]
    fn drop(&mut self) {
        use windows::Win32::System::Memory::{VirtualFree, MEM_RELEASE};
        unsafe {
            let _ = VirtualFree(self.ptr.0, 0, MEM_RELEASE);
        }
    }
}

/// The guest's linear memory: a single contiguous, host-allocated byte
/// region, surrounded by two `PROT_NONE` guard pages so that an
/// out-of-range access that slips past [`crate::mem::translator`]'s
/// checks traps instead of silently touching adjacent heap.
///
/// Cheap to clone: internally a reference-counted pointer, so cloning
/// only bumps the refcount. The mapping is released when the last clone
/// is dropped.
#[derive(Debug, Clone)]
pub struct SharedMemory {
    ptr_and_size: Arc<PtrAndSize>,
}

impl SharedMemory {
    /// Allocate a new linear memory region of exactly `size_bytes`
    /// usable bytes (not counting the surrounding guard pages).
    #[cfg(target_os = "linux")]
    #[instrument(skip_all, parent = Span::current(), level = "Trace")]
    pub fn new(size_bytes: usize) -> Result<Self> {
        use libc::{
            mmap, mprotect, MAP_ANONYMOUS, MAP_FAILED, MAP_NORESERVE, MAP_SHARED, PROT_NONE,
            PROT_READ, PROT_WRITE,
        };

        if size_bytes == 0 {
            return Err(new_error!("cannot create linear memory with size 0"));
        }

        let total_size = size_bytes
            .checked_add(2 * PAGE_SIZE)
            .ok_or_else(|| new_error!("requested memory size overflows usize"))?;
        let total_size = total_size.div_ceil(PAGE_SIZE) * PAGE_SIZE;

        let addr = unsafe {
            let ptr = mmap(
                null_mut(),
                total_size,
                PROT_READ | PROT_WRITE,
                MAP_ANONYMOUS | MAP_SHARED | MAP_NORESERVE,
                -1,
                0,
            );
            if ptr == MAP_FAILED {
                return Err(SandboxError::ResourceExhausted(format!(
                    "mmap failed: {}",
                    Error::last_os_error()
                )));
            }
            ptr
        };

        unsafe {
            if mprotect(addr, PAGE_SIZE, PROT_NONE) != 0 {
                return Err(SandboxError::ResourceExhausted(format!(
                    "mprotect (head guard page) failed: {}",
                    Error::last_os_error()
                )));
            }
            let tail = (addr as *const u8).add(total_size - PAGE_SIZE) as *mut c_void;
            if mprotect(tail, PAGE_SIZE, PROT_NONE) != 0 {
                return Err(SandboxError::ResourceExhausted(format!(
                    "mprotect (tail guard page) failed: {}",
                    Error::last_os_error()
                )));
            }
        }

        Ok(Self {
            ptr_and_size: Arc::new(PtrAndSize {
                ptr: PtrCVoidMut(addr),
                size: total_size,
            }),
        })
    }

    #[cfg(target_os = "windows")]
    #[instrument(skip_all, parent = Span::current(), level = "Trace")]
    pub fn new(size_bytes: usize) -> Result<Self> {
        if size_bytes == 0 {
            return Err(new_error!("cannot create linear memory with size 0"));
        }

        let total_size = size_bytes
            .checked_add(2 * PAGE_SIZE)
            .ok_or_else(|| new_error!("requested memory size overflows usize"))?;
        let total_size = total_size.div_ceil(PAGE_SIZE) * PAGE_SIZE;

        let addr = unsafe {
            let ptr = VirtualAlloc(Some(null_mut()), total_size, MEM_COMMIT, PAGE_READWRITE);
            if ptr.is_null() {
                return Err(SandboxError::ResourceExhausted(format!(
                    "VirtualAlloc failed: {}",
                    Error::last_os_error()
                )));
            }
            ptr
        };
        // TODO: protect the guard pages on Windows (VirtualProtect over the
        // head/tail pages); tracked as a follow-up, not required for the
        // reference platform.

        Ok(Self {
            ptr_and_size: Arc::new(PtrAndSize {
                ptr: PtrCVoidMut(addr),
                size: total_size,
            }),
        })
    }

    /// Internal helper to view the usable region (excluding guard pages)
    /// as a mutable slice.
    ///
    /// # Safety
    ///
    /// Not marked `unsafe` because `base_addr()` is guaranteed valid and
    /// `[base_addr(), base_addr() + mem_size())` is guaranteed mapped for
    /// the lifetime of `self`.
    #[instrument(skip_all, parent = Span::current(), level = "Trace")]
    fn as_mut_slice(&self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.base_addr() as *mut u8, self.mem_size()) }
    }

    /// Address of the first usable byte, i.e. `membase` in the spec.
    #[instrument(skip_all, parent = Span::current(), level = "Trace")]
    pub fn base_addr(&self) -> usize {
        self.ptr_and_size.ptr.0 as usize + PAGE_SIZE
    }

    /// Length of the usable region, i.e. `memlen` in the spec. Does not
    /// include the guard pages.
    #[instrument(skip_all, parent = Span::current(), level = "Trace")]
    pub fn mem_size(&self) -> usize {
        self.ptr_and_size.size - 2 * PAGE_SIZE
    }

    /// Copy `src` into `self` at `offset`.
    #[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
    pub fn copy_from_slice(&self, src: &[u8], offset: usize) -> Result<()> {
        let data = self.as_mut_slice();
        bounds_check!(offset, src.len(), data.len());
        data[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    /// Copy `[offset, offset + dst.len())` of `self` into `dst`.
    #[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
    pub fn copy_to_slice(&self, dst: &mut [u8], offset: usize) -> Result<()> {
        let data = self.as_mut_slice();
        bounds_check!(offset, dst.len(), data.len());
        dst.copy_from_slice(&data[offset..offset + dst.len()]);
        Ok(())
    }
}
