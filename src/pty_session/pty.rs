//! Raw OS layer: pseudoterminal allocation, fork/exec, and master-side syscalls.
//!
//! Everything unsafe lives here so the session state machine stays in safe Rust.

use super::mode::{TerminalMode, WindowSize};
use std::ffi::CStr;
use std::io;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};
use std::ptr;
use std::time::Duration;

/// Allocate a PTY pair configured with `mode`/`size`, fork, and exec `command` in the child.
///
/// Returns the master side and the child pid. The slave side is closed in the
/// parent before returning, so the only live handle the caller holds is the master.
pub(super) fn spawn_pty_child(
    command: &CStr,
    mode: &TerminalMode,
    size: WindowSize,
) -> io::Result<(OwnedFd, libc::pid_t)> {
    let mut termios = mode.to_termios()?;
    let mut winsize = size.to_winsize();

    // Everything the child touches is prepared up front; after fork it may only
    // make async-signal-safe calls.
    let argv: [*const libc::c_char; 2] = [command.as_ptr(), ptr::null()];
    let envp: [*const libc::c_char; 1] = [ptr::null()];
    let mut diagnostic = b"shellpty: execve(".to_vec();
    diagnostic.extend_from_slice(command.to_bytes());
    diagnostic.extend_from_slice(b") failed\n");

    let mut master_fd: RawFd = -1;
    let mut slave_fd: RawFd = -1;
    #[allow(clippy::unnecessary_mut_passed)]
    // SAFETY: openpty writes two descriptors into our stack locals and reads the
    // termios/winsize we just built; a null name pointer is accepted.
    let rc = unsafe {
        libc::openpty(
            &mut master_fd,
            &mut slave_fd,
            ptr::null_mut(),
            &mut termios,
            &mut winsize,
        )
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    // SAFETY: openpty succeeded, so both descriptors are open and owned by nobody else.
    let (master, slave) = unsafe {
        (
            OwnedFd::from_raw_fd(master_fd),
            OwnedFd::from_raw_fd(slave_fd),
        )
    };

    // Keep both ends out of children spawned concurrently by other threads.
    set_cloexec(master.as_raw_fd())?;
    set_cloexec(slave.as_raw_fd())?;

    // SAFETY: the child branch only runs child_exec, which never returns.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(io::Error::last_os_error());
    }
    if pid == 0 {
        // SAFETY: we are the freshly forked child; the pointers stay valid until exec.
        unsafe {
            child_exec(
                master.as_raw_fd(),
                slave.as_raw_fd(),
                &argv,
                &envp,
                &diagnostic,
            )
        }
    }

    drop(slave);
    Ok((master, pid))
}

/// Child side after fork: make the slave the controlling terminal and stdio, then exec.
///
/// # Safety
///
/// Must only be called in the child process after `fork()`. `argv` and `envp`
/// must be null-terminated arrays of valid C strings. This function never
/// returns: it either replaces the process image or calls `_exit(1)`.
unsafe fn child_exec(
    master_fd: RawFd,
    slave_fd: RawFd,
    argv: &[*const libc::c_char],
    envp: &[*const libc::c_char],
    diagnostic: &[u8],
) -> ! {
    libc::close(master_fd);

    if libc::setsid() == -1 {
        libc::_exit(1);
    }
    if libc::ioctl(slave_fd, libc::TIOCSCTTY as _, 0) == -1 {
        libc::_exit(1);
    }
    if libc::dup2(slave_fd, libc::STDIN_FILENO) < 0
        || libc::dup2(slave_fd, libc::STDOUT_FILENO) < 0
        || libc::dup2(slave_fd, libc::STDERR_FILENO) < 0
    {
        libc::_exit(1);
    }
    if slave_fd > libc::STDERR_FILENO {
        libc::close(slave_fd);
    }

    // The Rust runtime ignores SIGPIPE; ignored dispositions survive exec.
    libc::signal(libc::SIGPIPE, libc::SIG_DFL);

    libc::execve(argv[0], argv.as_ptr(), envp.as_ptr());

    // stderr is the slave now, so the host sees this on its next read.
    let _ = libc::write(
        libc::STDERR_FILENO,
        diagnostic.as_ptr() as *const libc::c_void,
        diagnostic.len(),
    );
    libc::_exit(1);
}

fn set_cloexec(fd: RawFd) -> io::Result<()> {
    // SAFETY: fcntl only inspects/updates descriptor flags on an fd we own.
    unsafe {
        let flags = libc::fcntl(fd, libc::F_GETFD);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        if libc::fcntl(fd, libc::F_SETFD, flags | libc::FD_CLOEXEC) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Release a descriptor, reporting the close error instead of swallowing it.
pub(super) fn close_fd(fd: OwnedFd) -> io::Result<()> {
    let raw = fd.into_raw_fd();
    // SAFETY: into_raw_fd transferred ownership; this is the only close of `raw`.
    if unsafe { libc::close(raw) } != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// One `read(2)` on the master.
pub(super) fn read_fd(fd: BorrowedFd<'_>, buf: &mut [u8]) -> io::Result<usize> {
    // SAFETY: buf is a valid writable region of buf.len() bytes.
    let n = unsafe {
        libc::read(
            fd.as_raw_fd(),
            buf.as_mut_ptr() as *mut libc::c_void,
            buf.len(),
        )
    };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(n as usize)
}

/// One `write(2)` on the master.
pub(super) fn write_fd(fd: BorrowedFd<'_>, buf: &[u8]) -> io::Result<usize> {
    // SAFETY: buf is a valid readable region of buf.len() bytes.
    let n = unsafe {
        libc::write(
            fd.as_raw_fd(),
            buf.as_ptr() as *const libc::c_void,
            buf.len(),
        )
    };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(n as usize)
}

/// Toggle `O_NONBLOCK` on the master.
pub(super) fn set_nonblocking(fd: BorrowedFd<'_>, enabled: bool) -> io::Result<()> {
    let raw = fd.as_raw_fd();
    // SAFETY: fcntl only inspects/updates status flags on a descriptor we borrow.
    unsafe {
        let flags = libc::fcntl(raw, libc::F_GETFL, 0);
        if flags < 0 {
            return Err(io::Error::last_os_error());
        }
        let updated = if enabled {
            flags | libc::O_NONBLOCK
        } else {
            flags & !libc::O_NONBLOCK
        };
        if updated != flags && libc::fcntl(raw, libc::F_SETFL, updated) < 0 {
            return Err(io::Error::last_os_error());
        }
    }
    Ok(())
}

/// Which directions of the master are ready after a poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
}

/// Wait up to `timeout` for the master to become readable, or writable when
/// `want_write` is set.
///
/// Hangup and error conditions count as ready in both directions: the
/// following read or write returns immediately instead of blocking.
pub(super) fn wait_ready(
    fd: BorrowedFd<'_>,
    want_write: bool,
    timeout: Duration,
) -> io::Result<Readiness> {
    let mut events = libc::POLLIN;
    if want_write {
        events |= libc::POLLOUT;
    }
    let mut pfd = libc::pollfd {
        fd: fd.as_raw_fd(),
        events,
        revents: 0,
    };
    let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
    // SAFETY: pfd is a single valid pollfd for the duration of the call.
    let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
    if rc < 0 {
        let err = io::Error::last_os_error();
        if err.kind() == io::ErrorKind::Interrupted {
            return Ok(Readiness::default());
        }
        return Err(err);
    }
    if rc == 0 {
        return Ok(Readiness::default());
    }
    let broken = pfd.revents & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0;
    Ok(Readiness {
        readable: broken || pfd.revents & libc::POLLIN != 0,
        writable: want_write && (broken || pfd.revents & libc::POLLOUT != 0),
    })
}
