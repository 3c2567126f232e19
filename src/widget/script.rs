use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use once_cell::sync::Lazy;

pub const CHALLENGE_SCRIPT_URL: &str = "https://challenges.cloudflare.com/turnstile/v0/api.js";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    /// Injected, `onload` not fired yet
    Loading,
    Ready,
}

/// Guards the one-time injection of the challenge script. Every form on the
/// page may ask for the script; only the first request injects it.
#[derive(Debug)]
pub struct ScriptLoader {
    state: Mutex<LoadState>,
}

/// Shared by every form in the process
pub static CHALLENGE_SCRIPT: Lazy<Arc<ScriptLoader>> = Lazy::new(|| Arc::new(ScriptLoader::new()));

impl Default for ScriptLoader {
    fn default() -> Self { Self::new() }
}

impl ScriptLoader {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LoadState::Unloaded),
        }
    }

    // the state is a plain enum, so a panic elsewhere cannot leave it half-written
    fn lock(&self) -> MutexGuard<'_, LoadState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> LoadState { *self.lock() }

    /// Idempotent: `inject` runs only for the caller that moves the state
    /// from `Unloaded` to `Loading`. The lock is released before `inject`
    /// runs, so the closure may call back into the loader (e.g. a cached
    /// script whose `onload` fires straight away). Returns the state after
    /// the call.
    pub fn ensure_loaded<F>(
        &self,
        inject: F,
    ) -> LoadState
    where
        F: FnOnce(&str),
    {
        {
            let mut state = self.lock();
            if *state != LoadState::Unloaded {
                return *state;
            }
            *state = LoadState::Loading;
        }
        tracing::debug!(src = CHALLENGE_SCRIPT_URL, "injecting challenge script");
        inject(CHALLENGE_SCRIPT_URL);
        self.state()
    }

    /// The script's `onload`. Returns `true` only for the call that made the
    /// script ready.
    pub fn mark_ready(&self) -> bool {
        let mut state = self.lock();
        let was_ready = *state == LoadState::Ready;
        *state = LoadState::Ready;
        !was_ready
    }
}
