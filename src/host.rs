//! The host primitive interface (component C6 of the spec): a thin,
//! trusted adapter over the real OS primitives. No policy lives here —
//! every argument arriving at this module has already been validated by
//! C2/C3/C4. Implementations may log but must never mutate sandbox state.

use std::ffi::CString;
use std::io;
use std::os::raw::c_int;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use tracing::{instrument, Span};

use crate::error::new_error;
use crate::Result;

/// A host file descriptor, already range-checked into `[0, MAX_H)` by the
/// caller wherever one appears as an argument.
pub type RawHostFd = i32;

/// A host-endian `stat(2)` record, copied verbatim into the guest buffer
/// by the `fstat` wrapper after C2 validates the destination range.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct GuestStat {
    pub dev: u64,
    pub ino: u64,
    pub mode: u32,
    pub nlink: u64,
    pub uid: u32,
    pub gid: u32,
    pub size: i64,
    pub blksize: i64,
    pub blocks: i64,
    pub atime_sec: i64,
    pub atime_nsec: i64,
    pub mtime_sec: i64,
    pub mtime_nsec: i64,
    pub ctime_sec: i64,
    pub ctime_nsec: i64,
}

impl GuestStat {
    /// View this record as its raw host-endian byte representation, for
    /// copying into guest memory via [`crate::mem::MemTranslator::copy_buf_to_sandbox`].
    pub fn as_bytes(&self) -> &[u8] {
        unsafe {
            std::slice::from_raw_parts(
                (self as *const Self) as *const u8,
                std::mem::size_of::<Self>(),
            )
        }
    }
}

fn cstring(path: &Path) -> Result<CString> {
    CString::new(path.as_os_str().as_bytes())
        .map_err(|e| new_error!("path contains an interior NUL: {}", e))
}

fn check(ret: c_int) -> Result<()> {
    if ret == -1 {
        Err(io::Error::last_os_error().into())
    } else {
        Ok(())
    }
}

/// `open(2)`. `flags` must already be a fully-resolved host `O_*` bitmask.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub fn host_open(path: &Path, flags: c_int, mode: u32) -> Result<RawHostFd> {
    let c_path = cstring(path)?;
    let fd = unsafe { libc::open(c_path.as_ptr(), flags, mode as libc::mode_t) };
    if fd == -1 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(fd)
}

/// `close(2)`.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub fn host_close(fd: RawHostFd) -> Result<()> {
    check(unsafe { libc::close(fd) })
}

/// `read(2)` directly into an already-validated host buffer.
///
/// # Safety
/// Not marked `unsafe`: `buf` has already been range-checked by C2 against
/// the guest's linear memory, which is guaranteed valid for the lifetime
/// of the call.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub fn host_read(fd: RawHostFd, buf: &mut [u8]) -> Result<usize> {
    let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
    if n == -1 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(n as usize)
}

/// `write(2)` directly from an already-validated host buffer.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub fn host_write(fd: RawHostFd, buf: &[u8]) -> Result<usize> {
    let n = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
    if n == -1 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(n as usize)
}

/// `fstat(2)`, translated into the fixed-size [`GuestStat`] record.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub fn host_fstat(fd: RawHostFd) -> Result<GuestStat> {
    let mut st: libc::stat = unsafe { std::mem::zeroed() };
    check(unsafe { libc::fstat(fd, &mut st) })?;
    Ok(GuestStat {
        dev: st.st_dev,
        ino: st.st_ino,
        mode: st.st_mode,
        nlink: st.st_nlink as u64,
        uid: st.st_uid,
        gid: st.st_gid,
        size: st.st_size,
        blksize: st.st_blksize as i64,
        blocks: st.st_blocks,
        atime_sec: st.st_atime,
        atime_nsec: st.st_atime_nsec,
        mtime_sec: st.st_mtime,
        mtime_nsec: st.st_mtime_nsec,
        ctime_sec: st.st_ctime,
        ctime_nsec: st.st_ctime_nsec,
    })
}

/// `lseek(2)`. `whence` is passed through verbatim; the caller
/// (the `lseek` wrapper) is responsible for rejecting values outside
/// `SEEK_SET`/`SEEK_CUR`/`SEEK_END`.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub fn host_lseek(fd: RawHostFd, offset: i64, whence: c_int) -> Result<i64> {
    let pos = unsafe { libc::lseek(fd, offset, whence) };
    if pos == -1 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(pos)
}

/// `dup(2)`: duplicate `fd` onto a fresh host fd chosen by the OS. The
/// `dup2` wrapper uses this rather than `dup2(2)` itself, since the
/// "target" of a guest `dup2` call is a *virtual* fd, not a specific host
/// fd number; sealing the duplicate at the guest's requested virtual fd
/// is [`crate::fd::FdSealer::create_seal_at`]'s job.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub fn host_dup(fd: RawHostFd) -> Result<RawHostFd> {
    let new_fd = unsafe { libc::dup(fd) };
    if new_fd == -1 {
        return Err(io::Error::last_os_error().into());
    }
    Ok(new_fd)
}

/// `unlink(2)`.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub fn host_unlink(path: &Path) -> Result<()> {
    let c_path = cstring(path)?;
    check(unsafe { libc::unlink(c_path.as_ptr()) })
}

/// `symlink(2)`.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub fn host_symlink(target: &Path, linkpath: &Path) -> Result<()> {
    let c_target = cstring(target)?;
    let c_linkpath = cstring(linkpath)?;
    check(unsafe { libc::symlink(c_target.as_ptr(), c_linkpath.as_ptr()) })
}

/// `readlink(2)`, reading at most `bufsiz` bytes. POSIX does not
/// NUL-terminate `readlink`'s output and neither do we: doing so would
/// make the confinement check brittle against a target exactly `bufsiz`
/// bytes long.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub fn host_readlink(path: &Path, bufsiz: usize) -> Result<Vec<u8>> {
    let c_path = cstring(path)?;
    let mut buf = vec![0u8; bufsiz];
    let n = unsafe {
        libc::readlink(
            c_path.as_ptr(),
            buf.as_mut_ptr() as *mut libc::c_char,
            bufsiz,
        )
    };
    if n == -1 {
        return Err(io::Error::last_os_error().into());
    }
    buf.truncate(n as usize);
    Ok(buf)
}

/// `getcwd(2)`, reading at most `size` bytes including the NUL terminator.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub fn host_getcwd(size: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; size];
    let ret = unsafe { libc::getcwd(buf.as_mut_ptr() as *mut libc::c_char, size) };
    if ret.is_null() {
        return Err(io::Error::last_os_error().into());
    }
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    buf.truncate(len);
    Ok(buf)
}

/// `chdir(2)`.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub fn host_chdir(path: &Path) -> Result<()> {
    let c_path = cstring(path)?;
    check(unsafe { libc::chdir(c_path.as_ptr()) })
}

/// `mkdir(2)`.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub fn host_mkdir(path: &Path, mode: u32) -> Result<()> {
    let c_path = cstring(path)?;
    check(unsafe { libc::mkdir(c_path.as_ptr(), mode as libc::mode_t) })
}

/// `rmdir(2)`.
#[instrument(err(Debug), skip_all, parent = Span::current(), level = "Trace")]
pub fn host_rmdir(path: &Path) -> Result<()> {
    let c_path = cstring(path)?;
    check(unsafe { libc::rmdir(c_path.as_ptr()) })
}
