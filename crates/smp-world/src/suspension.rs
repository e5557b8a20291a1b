use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use parking_lot::Mutex;

use crate::error::{StepError, StepResult};

/// Whether the simulation may step.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspensionState {
    /// Stepping runs normally.
    Running = 0,
    /// Stepping is paused.
    Suspended = 1,
    /// Stepping is paused for a load; resuming resets every system first.
    SuspendedLoading = 2,
    /// Stepping is frozen while a one-shot operation runs.
    Stasis = 3,
}

impl SuspensionState {
    fn from_tag(tag: u8) -> Self {
        match tag {
            1 => Self::Suspended,
            2 => Self::SuspendedLoading,
            3 => Self::Stasis,
            _ => Self::Running,
        }
    }
}

impl fmt::Display for SuspensionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Suspended => write!(f, "suspended"),
            Self::SuspendedLoading => write!(f, "suspended (loading)"),
            Self::Stasis => write!(f, "stasis"),
        }
    }
}

/// Gate deciding whether stepping runs.
///
/// The state is a single atomic tag so the step path can check it without
/// locking. Transitions are serialised by a small mutex so that the reset on
/// leaving [`SuspensionState::SuspendedLoading`] happens exactly once.
///
/// Suspend and resume requests that arrive while in
/// [`SuspensionState::Stasis`] are rejected with
/// [`StepError::IllegalState`] and leave the state untouched.
#[derive(Debug)]
pub struct SuspensionController {
    state: AtomicU8,
    transition: Mutex<()>,
}

impl Default for SuspensionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SuspensionController {
    /// Create a controller in the running state.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(SuspensionState::Running as u8),
            transition: Mutex::new(()),
        }
    }

    /// Current state.
    pub fn state(&self) -> SuspensionState {
        SuspensionState::from_tag(self.state.load(Ordering::Acquire))
    }

    /// True when stepping may proceed.
    pub fn is_running(&self) -> bool {
        self.state() == SuspensionState::Running
    }

    /// True for both suspended states. Stasis is reported separately.
    pub fn is_suspended(&self) -> bool {
        matches!(
            self.state(),
            SuspensionState::Suspended | SuspensionState::SuspendedLoading
        )
    }

    /// True while a stasis operation runs.
    pub fn is_in_stasis(&self) -> bool {
        self.state() == SuspensionState::Stasis
    }

    fn store(&self, state: SuspensionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Pause stepping. A loading suspend stays loading until resumed, even
    /// if a plain suspend follows it.
    pub fn suspend(&self, loading: bool) -> StepResult<()> {
        let _transition = self.transition.lock();
        let next = match self.state() {
            SuspensionState::Stasis => {
                return Err(StepError::IllegalState(
                    "cannot suspend while in stasis".into(),
                ));
            }
            SuspensionState::SuspendedLoading => SuspensionState::SuspendedLoading,
            SuspensionState::Running | SuspensionState::Suspended if loading => {
                SuspensionState::SuspendedLoading
            }
            SuspensionState::Running | SuspensionState::Suspended => SuspensionState::Suspended,
        };
        self.store(next);
        tracing::debug!(state = %next, "simulation suspended");
        Ok(())
    }

    /// Resume stepping. When leaving a loading suspend, `on_loading` runs
    /// before the state flips back to running. Returns whether it ran.
    pub fn resume(&self, on_loading: impl FnOnce()) -> StepResult<bool> {
        let _transition = self.transition.lock();
        match self.state() {
            SuspensionState::Stasis => Err(StepError::IllegalState(
                "cannot resume while in stasis".into(),
            )),
            SuspensionState::Running => Ok(false),
            SuspensionState::Suspended => {
                self.store(SuspensionState::Running);
                tracing::debug!("simulation resumed");
                Ok(false)
            }
            SuspensionState::SuspendedLoading => {
                on_loading();
                self.store(SuspensionState::Running);
                tracing::debug!("simulation resumed after load");
                Ok(true)
            }
        }
    }

    /// Freeze stepping, run `completion` exactly once, then return to
    /// running. Only allowed from the running state.
    pub fn enter_stasis<R>(&self, completion: impl FnOnce() -> R) -> StepResult<R> {
        {
            let _transition = self.transition.lock();
            match self.state() {
                SuspensionState::Running => self.store(SuspensionState::Stasis),
                other => {
                    return Err(StepError::IllegalState(format!(
                        "cannot enter stasis while {other}"
                    )));
                }
            }
        }
        let _exit = StasisExit(self);
        Ok(completion())
    }

    /// Run `work` with stepping halted. From running this goes through
    /// stasis; when already suspended the work runs directly and the state
    /// is left as it was.
    pub fn suspend_until_finished<R>(&self, work: impl FnOnce() -> R) -> StepResult<R> {
        match self.state() {
            SuspensionState::Suspended | SuspensionState::SuspendedLoading => Ok(work()),
            _ => self.enter_stasis(work),
        }
    }
}

/// Returns the controller to running when a stasis operation ends, even if
/// it unwinds.
struct StasisExit<'a>(&'a SuspensionController);

impl Drop for StasisExit<'_> {
    fn drop(&mut self) {
        let _transition = self.0.transition.lock();
        self.0.store(SuspensionState::Running);
    }
}
