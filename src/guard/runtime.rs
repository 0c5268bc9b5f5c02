//! Guard runtime: verification, timers, and navigation side effects.
//!
//! DESIGN
//! ======
//! The guard is a single-owner value. Its host calls `mount`, forwards
//! activity and primary actions, and drives `step` to process events posted
//! by background tasks (the verification call, the expiry interval, the
//! redirect debounce). Nothing outside the guard observes its state except
//! through the navigator.
//!
//! CANCELLATION
//! ============
//! `unmount` aborts both timers. An in-flight verification call is left to
//! finish; its event carries the attempt number it was started under and is
//! dropped when the guard is unmounted or a newer attempt has begun.

use std::sync::Arc;

use time::OffsetDateTime;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use super::screen::{self, PrimaryAction, Render};
use super::{ActivityEvent, GuardConfig, GuardState, resolve};
use crate::session::Session;
use crate::session::auth::AuthStore;
use crate::session::verify::{TokenVerifier, VerificationOutcome};

/// Sink for redirects; the only externally visible effect of the guard.
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

#[derive(Debug)]
pub enum GuardEvent {
    Verified { attempt: u64, outcome: VerificationOutcome },
    ExpiryTick,
    RedirectDue { seq: u64 },
}

pub struct Guard {
    config: GuardConfig,
    auth: AuthStore,
    verifier: Arc<dyn TokenVerifier>,
    navigator: Arc<dyn Navigator>,
    state: GuardState,
    verifying: bool,
    mounted: bool,
    attempt: u64,
    redirect_seq: u64,
    /// Set once the login redirect has been issued for the current
    /// `Unauthenticated` stretch.
    redirected: bool,
    events_tx: mpsc::UnboundedSender<GuardEvent>,
    events_rx: mpsc::UnboundedReceiver<GuardEvent>,
    expiry_timer: Option<JoinHandle<()>>,
    redirect_timer: Option<JoinHandle<()>>,
}

impl Guard {
    #[must_use]
    pub fn new(
        config: GuardConfig,
        auth: AuthStore,
        verifier: Arc<dyn TokenVerifier>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            auth,
            verifier,
            navigator,
            state: GuardState::Verifying,
            verifying: false,
            mounted: false,
            attempt: 0,
            redirect_seq: 0,
            redirected: false,
            events_tx,
            events_rx,
            expiry_timer: None,
            redirect_timer: None,
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Enter `Verifying`, start the expiry interval, and evaluate the session.
    /// Must be called from within a tokio runtime.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.redirected = false;
        self.state = GuardState::Verifying;
        self.start_expiry_timer();
        self.verify_session();
    }

    /// Stop timers and ignore any result still in flight.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        self.verifying = false;
        self.cancel_redirect();
        if let Some(timer) = self.expiry_timer.take() {
            timer.abort();
        }
        debug!("guard unmounted");
    }

    /// Wait for the next background event and apply it.
    pub async fn step(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.handle(event);
        }
    }

    /// Process events until no verification call is outstanding.
    pub async fn settle(&mut self) {
        while self.mounted && self.verifying {
            self.step().await;
        }
    }

    pub fn handle(&mut self, event: GuardEvent) {
        if !self.mounted {
            trace!(?event, "guard unmounted, dropping event");
            return;
        }
        let now = OffsetDateTime::now_utc();
        match event {
            GuardEvent::Verified { attempt, outcome } => {
                if attempt != self.attempt {
                    debug!(attempt, current = self.attempt, "dropping stale verification result");
                    return;
                }
                self.verifying = false;
                self.auth.apply_verification(outcome, now);
            }
            GuardEvent::ExpiryTick => {
                self.auth.check_expiration(now);
            }
            GuardEvent::RedirectDue { seq } => {
                if seq != self.redirect_seq || self.redirect_timer.take().is_none() {
                    return;
                }
                if self.state == GuardState::Unauthenticated {
                    let login = self.config.settings.login_path.clone();
                    info!(path = %login, "redirecting unauthenticated visitor");
                    self.redirected = true;
                    self.navigator.navigate(&login);
                }
                return;
            }
        }
        self.refresh();
    }

    // =========================================================================
    // HOST INPUT
    // =========================================================================

    /// Counts for any signed-in session, including one shown `InsufficientRole`.
    pub fn record_activity(&mut self, event: ActivityEvent) {
        trace!(?event, "activity");
        self.auth.record_activity(OffsetDateTime::now_utc());
    }

    /// Perform the primary action of the current screen.
    pub fn activate(&mut self, action: PrimaryAction) {
        debug!(action = action.label(), state = %self.state, "guard action");
        match action {
            PrimaryAction::GoToLogin => self.navigate_to_login(),
            PrimaryAction::LoginAgain => {
                self.auth.logout();
                self.refresh();
                self.navigate_to_login();
            }
            PrimaryAction::TryAgain => {
                self.auth.clear_error();
                self.verify_session();
            }
            PrimaryAction::GoBack => {
                let path = self.config.settings.default_path.clone();
                self.navigator.navigate(&path);
            }
        }
    }

    // =========================================================================
    // OUTPUT
    // =========================================================================

    #[must_use]
    pub fn state(&self) -> &GuardState {
        &self.state
    }

    #[must_use]
    pub fn render(&self) -> Render {
        screen::render(&self.state)
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        self.auth.session()
    }

    #[must_use]
    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn verify_session(&mut self) {
        self.attempt += 1;
        let session = self.auth.session();
        let needs_call = session.token().is_some() && session.user().is_none();

        if needs_call {
            if let Some(token) = self.auth.begin_verification() {
                self.verifying = true;
                let attempt = self.attempt;
                let verifier = Arc::clone(&self.verifier);
                let tx = self.events_tx.clone();
                debug!(attempt, "verifying stored token");
                tokio::spawn(async move {
                    let outcome = verifier.verify(&token).await;
                    let _ = tx.send(GuardEvent::Verified { attempt, outcome });
                });
            }
        } else {
            self.verifying = false;
        }
        self.refresh();
    }

    fn refresh(&mut self) {
        let next = resolve(self.auth.session(), &self.config, self.verifying);
        if next != self.state {
            debug!(from = %self.state, to = %next, "guard transition");
            self.state = next;
        }
        if self.state == GuardState::Unauthenticated {
            if !self.redirected {
                self.schedule_redirect();
            }
        } else {
            self.redirected = false;
            self.cancel_redirect();
        }
    }

    fn navigate_to_login(&mut self) {
        self.cancel_redirect();
        self.redirected = true;
        let login = self.config.settings.login_path.clone();
        self.navigator.navigate(&login);
    }

    fn schedule_redirect(&mut self) {
        if self.redirect_timer.is_some() || !self.mounted {
            return;
        }
        self.redirect_seq += 1;
        let seq = self.redirect_seq;
        let delay = self.config.settings.redirect_delay;
        let tx = self.events_tx.clone();
        self.redirect_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(GuardEvent::RedirectDue { seq });
        }));
    }

    fn cancel_redirect(&mut self) {
        if let Some(timer) = self.redirect_timer.take() {
            timer.abort();
        }
    }

    fn start_expiry_timer(&mut self) {
        let period = self.config.settings.expiry_check_interval;
        if period.is_zero() {
            return;
        }
        let tx = self.events_tx.clone();
        self.expiry_timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if tx.send(GuardEvent::ExpiryTick).is_err() {
                    break;
                }
            }
        }));
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        self.cancel_redirect();
        if let Some(timer) = self.expiry_timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
#[path = "runtime_test.rs"]
mod tests;
