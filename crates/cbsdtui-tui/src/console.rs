//! Persistent login console
//!
//! One shell runs on a host-side PTY for the lifetime of the TUI. Logging
//! into a container types its login command into that shell; attaching
//! relays the real terminal to the PTY until the user detaches (Ctrl+\).
//! Detaching leaves the shell and whatever runs in it alive; its output is
//! drained into a bounded backlog and replayed on the next attach.

use cbsdtui_core::Console;
use std::io::{self, Read as _, Write};
use std::os::unix::io::{AsFd, AsRawFd, BorrowedFd, FromRawFd, IntoRawFd, OwnedFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::Duration;

use nix::libc;
use nix::poll::{PollFd, PollFlags, PollTimeout};
use nix::pty::openpty;
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

const CTRL_BACKSLASH: u8 = 0x1c;
const CTRL_C: u8 = 0x03;
/// Most recent detached output kept for the next attach
const BACKLOG_LIMIT: usize = 64 * 1024;

/// Why the relay loop stopped
#[derive(Debug)]
pub enum ConsoleExit {
    /// User pressed Ctrl+\ to return to the table (session preserved)
    Detached,
    /// Shell process exited
    Exited,
    /// I/O error during relay
    Error(io::Error),
}

static SIGWINCH_RECEIVED: AtomicBool = AtomicBool::new(false);

extern "C" fn sigwinch_handler(_: libc::c_int) {
    SIGWINCH_RECEIVED.store(true, Ordering::SeqCst);
}

/// Output read from the master while nobody is attached
///
/// Whoever reads the master holds `bytes`: the drain thread while detached,
/// the relay while attached.
#[derive(Default)]
struct Backlog {
    bytes: Mutex<Vec<u8>>,
    attaching: AtomicBool,
    stop: AtomicBool,
}

impl Backlog {
    fn push(bytes: &mut Vec<u8>, data: &[u8]) {
        bytes.extend_from_slice(data);
        if bytes.len() > BACKLOG_LIMIT {
            let excess = bytes.len() - BACKLOG_LIMIT;
            bytes.drain(..excess);
        }
    }
}

/// Keep the PTY from filling up while detached
fn drain_detached(master: OwnedFd, backlog: Arc<Backlog>) {
    let mut buf = [0u8; 4096];
    while !backlog.stop.load(Ordering::SeqCst) {
        if backlog.attaching.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(50));
            continue;
        }
        let mut bytes = lock(&backlog.bytes);
        let mut fds = [PollFd::new(master.as_fd(), PollFlags::POLLIN)];
        match nix::poll::poll(&mut fds, PollTimeout::from(100u16)) {
            Ok(0) | Err(nix::errno::Errno::EINTR) => continue,
            Err(_) => break,
            Ok(_) => {}
        }
        match nix::unistd::read(master.as_raw_fd(), &mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => Backlog::push(&mut bytes, &buf[..n]),
        }
    }
    tracing::debug!("Console drain stopped");
}

/// A shell whose terminal is the slave side of a PTY we hold the master of
struct PtyShell {
    master_fd: OwnedFd,
    child: Mutex<Child>,
    backlog: Arc<Backlog>,
}

impl PtyShell {
    fn spawn(shell: &str) -> io::Result<Self> {
        let (cols, rows) = crossterm::terminal::size().unwrap_or((80, 24));
        let winsize = nix::pty::Winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        let pty = openpty(Some(&winsize), None).map_err(io::Error::other)?;

        let mut cmd = Command::new(shell);
        // Each Stdio takes ownership of its fd, so stdin and stdout get dups
        // and stderr the original.
        let slave_raw = pty.slave.into_raw_fd();
        unsafe {
            cmd.stdin(Stdio::from_raw_fd(libc::dup(slave_raw)));
            cmd.stdout(Stdio::from_raw_fd(libc::dup(slave_raw)));
            cmd.stderr(Stdio::from_raw_fd(slave_raw));
            // New session with the PTY as controlling terminal, so Ctrl-C
            // reaches the foreground job
            cmd.pre_exec(|| {
                nix::unistd::setsid().map_err(io::Error::from)?;
                if libc::ioctl(0, libc::TIOCSCTTY as _, 0) < 0 {
                    return Err(io::Error::last_os_error());
                }
                Ok(())
            });
        }

        let child = cmd.spawn()?;
        tracing::debug!("Console shell {} started as pid {}", shell, child.id());

        let backlog = Arc::new(Backlog::default());
        let reader = pty.master.try_clone()?;
        let drain = Arc::clone(&backlog);
        std::thread::Builder::new()
            .name("console-drain".into())
            .spawn(move || drain_detached(reader, drain))?;

        Ok(Self {
            master_fd: pty.master,
            child: Mutex::new(child),
            backlog,
        })
    }

    fn write_all(&self, mut bytes: &[u8]) -> io::Result<()> {
        while !bytes.is_empty() {
            let n = nix::unistd::write(&self.master_fd, bytes).map_err(io::Error::from)?;
            bytes = &bytes[n..];
        }
        Ok(())
    }

    fn relay(&self) -> ConsoleExit {
        SIGWINCH_RECEIVED.store(false, Ordering::SeqCst);
        let sa = SigAction::new(
            SigHandler::Handler(sigwinch_handler),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        let old_sigwinch = unsafe { sigaction(Signal::SIGWINCH, &sa) };

        if let Err(e) = crossterm::terminal::enable_raw_mode() {
            return ConsoleExit::Error(e);
        }
        // Sizes may have changed while detached
        self.propagate_winsize();

        self.backlog.attaching.store(true, Ordering::SeqCst);
        let result = {
            let mut missed = lock(&self.backlog.bytes);
            self.backlog.attaching.store(false, Ordering::SeqCst);
            let mut stdout = io::stdout().lock();
            let _ = stdout.write_all(&missed);
            let _ = stdout.flush();
            drop(stdout);
            missed.clear();
            self.relay_loop()
        };

        let _ = crossterm::terminal::disable_raw_mode();
        if let Ok(old) = old_sigwinch {
            let _ = unsafe { sigaction(Signal::SIGWINCH, &old) };
        }
        result
    }

    fn relay_loop(&self) -> ConsoleExit {
        let stdin_raw = io::stdin().as_raw_fd();
        let master_raw = self.master_fd.as_raw_fd();
        // SAFETY: stdin stays open for the duration of this function
        let stdin_borrowed = unsafe { BorrowedFd::borrow_raw(stdin_raw) };
        let master_borrowed = self.master_fd.as_fd();
        let mut buf = [0u8; 4096];

        loop {
            if SIGWINCH_RECEIVED.swap(false, Ordering::SeqCst) {
                self.propagate_winsize();
            }

            let mut fds = [
                PollFd::new(stdin_borrowed, PollFlags::POLLIN),
                PollFd::new(master_borrowed, PollFlags::POLLIN),
            ];
            match nix::poll::poll(&mut fds, PollTimeout::from(200u16)) {
                Ok(0) | Err(nix::errno::Errno::EINTR) => continue,
                Err(e) => return ConsoleExit::Error(io::Error::other(e)),
                Ok(_) => {}
            }

            if let Some(revents) = fds[1].revents() {
                if revents.contains(PollFlags::POLLIN) {
                    match nix::unistd::read(master_raw, &mut buf) {
                        Ok(0) | Err(_) => return ConsoleExit::Exited,
                        Ok(n) => {
                            let mut stdout = io::stdout().lock();
                            if stdout.write_all(&buf[..n]).is_err() {
                                return ConsoleExit::Exited;
                            }
                            let _ = stdout.flush();
                        }
                    }
                }
                if revents.intersects(PollFlags::POLLHUP | PollFlags::POLLERR) {
                    return ConsoleExit::Exited;
                }
            }

            if let Some(revents) = fds[0].revents() {
                if revents.contains(PollFlags::POLLIN) {
                    let n = match io::stdin().lock().read(&mut buf) {
                        Ok(0) => return ConsoleExit::Exited,
                        Ok(n) => n,
                        Err(e) => return ConsoleExit::Error(e),
                    };
                    if let Some(pos) = buf[..n].iter().position(|&b| b == CTRL_BACKSLASH) {
                        if pos > 0 {
                            let _ = self.write_all(&buf[..pos]);
                        }
                        return ConsoleExit::Detached;
                    }
                    if self.write_all(&buf[..n]).is_err() {
                        return ConsoleExit::Exited;
                    }
                }
            }
        }
    }

    fn propagate_winsize(&self) {
        let Ok((cols, rows)) = crossterm::terminal::size() else {
            return;
        };
        let ws = libc::winsize {
            ws_row: rows,
            ws_col: cols,
            ws_xpixel: 0,
            ws_ypixel: 0,
        };
        unsafe {
            libc::ioctl(self.master_fd.as_raw_fd(), libc::TIOCSWINSZ, &ws);
        }
    }

    fn kill(&self) {
        let mut child = lock(&self.child);
        let pid = nix::unistd::Pid::from_raw(child.id() as i32);
        if let Err(e) = nix::sys::signal::kill(pid, Signal::SIGKILL) {
            tracing::debug!("Killing console shell {} failed: {}", pid, e);
        }
        let _ = child.wait();
    }

    fn is_alive(&self) -> bool {
        matches!(lock(&self.child).try_wait(), Ok(None))
    }
}

impl Drop for PtyShell {
    fn drop(&mut self) {
        self.backlog.stop.store(true, Ordering::SeqCst);
        self.kill();
    }
}

/// The shell shared by every container login
pub struct ConsoleSession {
    shell: String,
    pty: RwLock<PtyShell>,
    active: Mutex<Option<String>>,
}

impl ConsoleSession {
    pub fn spawn(shell: &str) -> io::Result<Self> {
        Ok(Self {
            shell: shell.to_string(),
            pty: RwLock::new(PtyShell::spawn(shell)?),
            active: Mutex::new(None),
        })
    }

    /// Hand the real terminal to the shell until detach or exit.
    ///
    /// Blocks; run it on a blocking thread with the TUI suspended.
    pub fn relay(&self) -> ConsoleExit {
        let exit = match self.pty.read() {
            Ok(pty) => pty.relay(),
            Err(poisoned) => poisoned.into_inner().relay(),
        };
        if matches!(exit, ConsoleExit::Exited) {
            tracing::info!("Console shell exited");
            self.set_active(None);
        }
        exit
    }

    /// Kill the shell outright and start a fresh one
    pub fn reset(&self) -> io::Result<()> {
        let fresh = PtyShell::spawn(&self.shell)?;
        let old = match self.pty.write() {
            Ok(mut pty) => std::mem::replace(&mut *pty, fresh),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), fresh),
        };
        // Dropping sends SIGKILL
        drop(old);
        self.set_active(None);
        tracing::info!("Console reset");
        Ok(())
    }

    pub fn is_alive(&self) -> bool {
        match self.pty.read() {
            Ok(pty) => pty.is_alive(),
            Err(poisoned) => poisoned.into_inner().is_alive(),
        }
    }

    fn write(&self, bytes: &[u8]) {
        let result = match self.pty.read() {
            Ok(pty) => pty.write_all(bytes),
            Err(poisoned) => poisoned.into_inner().write_all(bytes),
        };
        if let Err(e) = result {
            tracing::warn!("Writing to console failed: {}", e);
        }
    }
}

impl Console for ConsoleSession {
    fn active(&self) -> Option<String> {
        lock(&self.active).clone()
    }

    fn set_active(&self, name: Option<String>) {
        *lock(&self.active) = name;
    }

    fn send(&self, line: &str) {
        tracing::debug!("console <- {}", line);
        self.write(format!("{}\r", line).as_bytes());
    }

    fn interrupt(&self) {
        self.write(&[CTRL_C]);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Detached output collected so far, waiting up to 5s for `needle`
    fn read_until(session: &ConsoleSession, needle: &str) -> String {
        let pty = session.pty.read().unwrap();
        let mut seen = String::new();
        for _ in 0..50 {
            seen = String::from_utf8_lossy(&lock(&pty.backlog.bytes)).into_owned();
            if seen.contains(needle) {
                break;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
        seen
    }

    #[test]
    fn test_send_reaches_shell() {
        let session = ConsoleSession::spawn("/bin/sh").unwrap();
        assert!(session.is_alive());

        session.send("echo console-$((40 + 2))");
        let seen = read_until(&session, "console-42");
        assert!(seen.contains("console-42"), "shell output: {:?}", seen);
    }

    #[test]
    fn test_active_name_tracking() {
        let session = ConsoleSession::spawn("/bin/sh").unwrap();
        assert_eq!(session.active(), None);
        session.set_active(Some("web".into()));
        assert_eq!(session.active().as_deref(), Some("web"));
    }

    #[test]
    fn test_reset_replaces_shell_and_clears_active() {
        let session = ConsoleSession::spawn("/bin/sh").unwrap();
        session.set_active(Some("web".into()));

        session.reset().unwrap();
        assert!(session.is_alive());
        assert_eq!(session.active(), None);

        session.send("echo after-reset");
        assert!(read_until(&session, "after-reset").contains("after-reset"));
    }

    #[test]
    fn test_detached_output_is_drained_and_bounded() {
        let session = ConsoleSession::spawn("/bin/sh").unwrap();

        // Far more than a PTY buffer holds; the shell would block without a reader
        session.send("head -c 300000 /dev/zero | tr '\\0' x; echo; echo drained-$((1 + 1))");
        let seen = read_until(&session, "drained-2");

        assert!(seen.contains("drained-2"), "{} bytes seen", seen.len());
        assert!(seen.len() <= BACKLOG_LIMIT);
        assert!(session.is_alive());
    }

    #[test]
    fn test_backlog_keeps_most_recent_bytes() {
        let mut bytes = Vec::new();
        Backlog::push(&mut bytes, &vec![b'a'; BACKLOG_LIMIT]);
        Backlog::push(&mut bytes, b"tail");

        assert_eq!(bytes.len(), BACKLOG_LIMIT);
        assert!(bytes.ends_with(b"aatail"));
    }

    #[test]
    fn test_spawn_missing_shell_fails() {
        assert!(ConsoleSession::spawn("/nonexistent/shell").is_err());
    }
}
