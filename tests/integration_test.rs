//! End-to-end coverage for the concrete scenarios in the spec's §8: each
//! test drives the public wrapper surface exactly as a guest would, against
//! a [`SandboxContext`] rooted at a throwaway temp directory.

use tempfile::tempdir;
use wavebox_host::{wrappers, SandboxConfig, SandboxContext};

fn write_path(ctx: &SandboxContext, gptr: u32, s: &str) {
    let mut bytes = s.as_bytes().to_vec();
    bytes.push(0);
    ctx.mem().copy_buf_to_sandbox(gptr, &bytes).unwrap();
}

/// Scenario 1: open-write-read-close cycle.
#[test]
fn open_write_read_close_cycle() {
    let dir = tempdir().unwrap();
    let mut ctx = SandboxContext::create(SandboxConfig::new(
        SandboxConfig::DEFAULT_MEMLEN,
        dir.path(),
    ))
    .unwrap();

    write_path(&ctx, 0, "data/tmp.txt");
    let vfd = wrappers::open(&mut ctx, 0, libc::O_RDWR | libc::O_CREAT);
    assert_eq!(vfd, 0);

    ctx.mem().copy_buf_to_sandbox(0x100, b"hello").unwrap();
    assert_eq!(wrappers::write(&mut ctx, vfd, 0x100, 5), 5);

    assert_eq!(wrappers::lseek(&mut ctx, vfd, 0, libc::SEEK_SET), 0);
    assert_eq!(wrappers::read(&mut ctx, vfd, 0x200, 5), 5);
    let out = ctx.mem().copy_buf_from_sandbox(0x200, 5).unwrap();
    assert_eq!(&out, b"hello");

    assert_eq!(wrappers::close(&mut ctx, vfd), 0);
    assert_eq!(wrappers::close(&mut ctx, vfd), -1);
}

/// Scenario 2: the allocator always hands out the smallest free vfd.
#[test]
fn allocator_tie_break() {
    let dir = tempdir().unwrap();
    let mut ctx = SandboxContext::create(SandboxConfig::new(
        SandboxConfig::DEFAULT_MEMLEN,
        dir.path(),
    ))
    .unwrap();

    let mut vfds = Vec::new();
    for i in 0..4 {
        write_path(&ctx, i * 64, &format!("f{i}.txt"));
        let vfd = wrappers::open(&mut ctx, i * 64, libc::O_RDWR | libc::O_CREAT);
        vfds.push(vfd);
    }
    assert_eq!(vfds, vec![0, 1, 2, 3]);

    assert_eq!(wrappers::close(&mut ctx, 1), 0);
    write_path(&ctx, 256, "reopened.txt");
    let reused = wrappers::open(&mut ctx, 256, libc::O_RDWR | libc::O_CREAT);
    assert_eq!(reused, 1, "the next open must reuse the smallest free vfd");

    assert_eq!(wrappers::close(&mut ctx, 0), 0);
    assert_eq!(wrappers::close(&mut ctx, 2), 0);
    write_path(&ctx, 320, "a.txt");
    let a = wrappers::open(&mut ctx, 320, libc::O_RDWR | libc::O_CREAT);
    write_path(&ctx, 384, "b.txt");
    let b = wrappers::open(&mut ctx, 384, libc::O_RDWR | libc::O_CREAT);
    assert_eq!(a, 0);
    assert_eq!(b, 2);
}

/// Scenario 3: an out-of-bounds guest buffer never reaches the host.
#[test]
fn out_of_bounds_read_is_rejected_before_the_host_primitive_runs() {
    let dir = tempdir().unwrap();
    let mut ctx = SandboxContext::create(SandboxConfig::new(
        SandboxConfig::DEFAULT_MEMLEN,
        dir.path(),
    ))
    .unwrap();

    write_path(&ctx, 0, "f.txt");
    let vfd = wrappers::open(&mut ctx, 0, libc::O_RDWR | libc::O_CREAT);
    ctx.mem().copy_buf_to_sandbox(0x100, b"ab").unwrap();
    wrappers::write(&mut ctx, vfd, 0x100, 2);
    wrappers::lseek(&mut ctx, vfd, 0, libc::SEEK_SET);

    let memlen = ctx.memlen() as u32;
    assert_eq!(wrappers::read(&mut ctx, vfd, memlen - 1, 2), -1);
    assert_eq!(wrappers::read(&mut ctx, vfd, memlen - 2, 1), 1);
}

/// Scenario 4 (P5, confinement): a path that normalizes outside the
/// authorized root is rejected, and the fd bijection stays untouched.
#[test]
fn path_escape_is_rejected_and_leaves_fd_state_untouched() {
    let dir = tempdir().unwrap();
    let mut ctx = SandboxContext::create(SandboxConfig::new(
        SandboxConfig::DEFAULT_MEMLEN,
        dir.path(),
    ))
    .unwrap();

    write_path(&ctx, 0, "../../etc/passwd");
    assert_eq!(wrappers::open(&mut ctx, 0, libc::O_RDONLY), -1);
    assert!(ctx.fds().check_bijection());
    assert_eq!(ctx.fds().sealed_pairs().count(), 0);
}

/// Scenario 5: exhausting the virtual fd table fails cleanly and the
/// bijection remains internally consistent.
#[test]
fn fd_table_exhaustion_fails_cleanly() {
    let dir = tempdir().unwrap();
    let cfg = SandboxConfig::new(SandboxConfig::DEFAULT_MEMLEN, dir.path())
        .with_max_virtual_fds(2);
    let mut ctx = SandboxContext::create(cfg).unwrap();

    for i in 0..2 {
        write_path(&ctx, i * 64, &format!("f{i}.txt"));
        let vfd = wrappers::open(&mut ctx, i * 64, libc::O_RDWR | libc::O_CREAT);
        assert_ne!(vfd, -1);
    }

    write_path(&ctx, 256, "overflow.txt");
    assert_eq!(
        wrappers::open(&mut ctx, 256, libc::O_RDWR | libc::O_CREAT),
        -1
    );
    assert!(ctx.fds().check_bijection());
}
