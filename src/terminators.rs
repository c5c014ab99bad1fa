//! Terminators for controlling and interrupting long-running processes.
//!
//! This module provides several implementations of the [`Terminator`] trait, including:
//! - [`InterruptTerminator`]: Responds to Ctrl-C (SIGINT) or programmatic interrupts.
//! - [`TimeOutTerminator`]: Terminates after a specified time limit.
//! - [`IterationLimitTerminator`]: Terminates once a pivot-count cap is reached.
//! - [`ThreadLocalTerminator`]: A terminate flag local to the calling thread.
//! - [`MultipleTerminators`]: Combines multiple terminators.
//!
//! Together these model §4.I's termination gate: "a direct thread-local
//! terminate flag, the environment's main flag, and (if present) an
//! async/external flag", polled in that order and short-circuiting on the
//! first hit. `MultipleTerminators` already is that combinator; callers
//! compose it from whichever of the terminators below apply.
//!
//! # Note
//! [`InterruptTerminator`] installs a global signal handler and **can only be constructed once** per process. Attempting to create multiple instances will result in a panic.

use std::cell::Cell;
use std::sync::{Arc, atomic::AtomicBool};

use crate::Status;


pub trait Terminator {
  fn initialize(&mut self) {}

  /// Called with the current pivot count before each `terminate()` poll.
  /// Most terminators ignore it; [`IterationLimitTerminator`] uses it to
  /// compare against its cap without needing the full solver state.
  fn observe_iteration(&mut self, _nit: usize) {}

  fn terminate(&mut self) -> Option<Status>;
}


/// Terminator that responds to Ctrl-C (SIGINT) or programmatic interrupts.
///
/// # Note
/// Only one instance of `InterruptTerminator` can be constructed per process, as it installs a global signal handler.
/// Creating more than one will panic.
pub struct InterruptTerminator {
  interrupted: Arc<AtomicBool>,
}

impl InterruptTerminator {
  pub fn new() -> Self {
    let interrupted = Arc::new(AtomicBool::new(false));
    ctrlc::set_handler({
      let interrupted_clone = interrupted.clone();
      move || {
        interrupted_clone.store(true, std::sync::atomic::Ordering::SeqCst);
      }
    }).expect("Error setting Ctrl-C handler");
    Self { interrupted }
  }

  pub fn interrupt(&mut self) {
    self.interrupted.store(true, std::sync::atomic::Ordering::SeqCst);
  }
}

impl Terminator for InterruptTerminator {
  fn terminate(&mut self) -> Option<Status> {
    if self.interrupted.load(std::sync::atomic::Ordering::SeqCst) {
      Some(Status::UserTerminated)
    } else {
      None
    }
  }
}


/// Terminator that triggers after a specified number of seconds.
pub struct TimeOutTerminator {
  max_time_secs: u64,
  start_time: std::time::Instant,
}

impl TimeOutTerminator {
  pub fn new(max_time_secs: u64) -> Self {
    Self {
      max_time_secs,
      start_time: std::time::Instant::now(),
    }
  }
}

impl Terminator for TimeOutTerminator {
  fn initialize(&mut self) {
    self.start_time = std::time::Instant::now();
  }

  fn terminate(&mut self) -> Option<Status> {
    if self.max_time_secs > 0 && self.start_time.elapsed().as_secs() >= self.max_time_secs {
      Some(Status::TimeLimit)
      } else {
        None
      }
  }
}


/// Terminator that triggers once the pivot count reaches `max_iter`.
///
/// Mirrors `TimeOutTerminator`'s shape but for §6's `max_iter` tunable
/// rather than `time_limit`; the phase driver reports its current pivot
/// count via `observe_iteration` ahead of every `terminate()` poll.
pub struct IterationLimitTerminator {
  max_iter: usize,
  current: usize,
}

impl IterationLimitTerminator {
  pub fn new(max_iter: usize) -> Self {
    Self { max_iter, current: 0 }
  }
}

impl Terminator for IterationLimitTerminator {
  fn observe_iteration(&mut self, nit: usize) {
    self.current = nit;
  }

  fn terminate(&mut self) -> Option<Status> {
    if self.current >= self.max_iter {
      Some(Status::IterationLimit)
    } else {
      None
    }
  }
}


thread_local! {
  static THREAD_LOCAL_TERMINATE: Cell<bool> = const { Cell::new(false) };
}

/// A terminate flag scoped to the calling thread, distinct from the
/// process-wide `AtomicBool` that [`InterruptTerminator`] watches. §4.I
/// calls this out as the first flag a poll checks: "a direct thread-local
/// terminate flag, the environment's main flag, and (if present) an
/// async/external flag."
pub struct ThreadLocalTerminator {}

impl ThreadLocalTerminator {
  pub fn new() -> Self {
    THREAD_LOCAL_TERMINATE.with(|flag| flag.set(false));
    Self {}
  }

  /// Sets the calling thread's flag. Polling from any terminator composed
  /// with this one observes it on the next `terminate()` call.
  pub fn set() {
    THREAD_LOCAL_TERMINATE.with(|flag| flag.set(true));
  }
}

impl Terminator for ThreadLocalTerminator {
  fn terminate(&mut self) -> Option<Status> {
    if THREAD_LOCAL_TERMINATE.with(|flag| flag.get()) {
      Some(Status::UserTerminated)
    } else {
      None
    }
  }
}


/// Terminator that combines multiple terminators and triggers if any of them do.
pub struct MultipleTerminators {
  terminators: Vec<Box<dyn Terminator>>,
}

impl MultipleTerminators {
  pub fn new(terminators: Vec<Box<dyn Terminator>>) -> Self {
    Self { terminators }
  }
}

impl Terminator for MultipleTerminators {
  fn initialize(&mut self) {
    for terminator in &mut self.terminators {
      terminator.initialize();
    }
  }

  fn observe_iteration(&mut self, nit: usize) {
    for terminator in &mut self.terminators {
      terminator.observe_iteration(nit);
    }
  }

  fn terminate(&mut self) -> Option<Status> {
    for terminator in &mut self.terminators {
      if let Some(status) = terminator.as_mut().terminate() {
        return Some(status);
      }
    }
    None
  }
}

#[cfg(test)]
mod tests {
use super::*;

  #[cfg(unix)]
  mod platform {
    pub fn send_sigint() {
      use nix::sys::signal::{self, Signal};
      use nix::unistd::Pid;

      let pid = std::process::id() as i32;
      signal::kill(Pid::from_raw(pid), Signal::SIGINT).expect("Failed to send SIGINT");
    }
  }

  #[cfg(windows)]
  mod platform {
    pub fn send_sigint() {
      use windows_sys::Win32::System::Console::{GenerateConsoleCtrlEvent, CTRL_C_EVENT};

      unsafe {
        GenerateConsoleCtrlEvent(CTRL_C_EVENT, 0);
      }
    }
  }

  #[test]
  fn test_interruption_terminator_ctrlc() {
    let mut terminator = InterruptTerminator::new();

  std::thread::spawn(|| {
    std::thread::sleep(std::time::Duration::from_secs(2));
    platform::send_sigint();
  });

    println!("Press Ctrl-C to test interruption terminator...");
    loop {
      if let Some(status) = terminator.terminate() {
        assert_eq!(status, Status::UserTerminated);
        break;
      }
    }
  }

  #[test]
  fn test_iteration_limit_terminator() {
    let mut terminator = IterationLimitTerminator::new(10);
    for nit in 0..10 {
      terminator.observe_iteration(nit);
      assert_eq!(terminator.terminate(), None);
    }
    terminator.observe_iteration(10);
    assert_eq!(terminator.terminate(), Some(Status::IterationLimit));
  }

  #[test]
  fn test_thread_local_terminator() {
    let mut terminator = ThreadLocalTerminator::new();
    assert_eq!(terminator.terminate(), None);
    ThreadLocalTerminator::set();
    assert_eq!(terminator.terminate(), Some(Status::UserTerminated));
  }
}
