//! Client session state.
//!
//! `SessionCell` owns the state behind a `tokio::sync::watch` channel. Every
//! write replaces the whole `SessionState`, so observers never see a half
//! applied login or logout.
//!
//! Writes that finish an asynchronous call (whoami) carry the generation
//! captured when the call started. `sign_in` and `sign_out` bump the
//! generation, so a whoami answer or a gateway sign-out that lands after
//! them is dropped.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use medgate_contracts::{error::MedgateError, identity::Identity, role::Role, wire::ReviewNotice};
use medgate_core::traits::RoleStore;
use medgate_guard::SessionView;

/// A message kept on the login page after the session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginNotice {
    pub message: String,
    /// Present when a reviewed account was refused; drives the reapply offer.
    pub review: Option<ReviewNotice>,
}

impl LoginNotice {
    pub fn blocked(review: Option<ReviewNotice>) -> Self {
        Self {
            message: medgate_guard::BLOCKED_MESSAGE.to_string(),
            review,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<Identity>,
    pub role: Option<Role>,
    pub is_authenticated: bool,
    pub loading: bool,
    pub is_active: bool,
    pub notice: Option<LoginNotice>,
}

impl SessionState {
    /// State before `init` has run.
    pub fn initial() -> Self {
        Self {
            user: None,
            role: None,
            is_authenticated: false,
            loading: true,
            is_active: false,
            notice: None,
        }
    }

    pub fn signed_out(notice: Option<LoginNotice>) -> Self {
        Self {
            loading: false,
            notice,
            ..Self::initial()
        }
    }

    pub fn signed_in(identity: Identity) -> Self {
        Self {
            role: Some(identity.role()),
            is_active: identity.is_active(),
            user: Some(identity),
            is_authenticated: true,
            loading: false,
            notice: None,
        }
    }

    /// The part of the state the route guard reads.
    pub fn view(&self) -> SessionView {
        match (&self.user, self.is_authenticated) {
            (Some(identity), true) => SessionView::signed_in(identity),
            _ if self.loading => SessionView::loading(),
            _ => SessionView::signed_out(),
        }
    }
}

/// Shared session state plus the persisted role marker.
pub struct SessionCell {
    state: watch::Sender<SessionState>,
    generation: Mutex<u64>,
    role_writes: Mutex<()>,
    roles: Arc<dyn RoleStore>,
}

impl SessionCell {
    pub fn new(roles: Arc<dyn RoleStore>) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        Self {
            state,
            generation: Mutex::new(0),
            role_writes: Mutex::new(()),
            roles,
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn generation(&self) -> u64 {
        *self.lock_generation()
    }

    /// The role marker persisted by the last sign-in, if any.
    pub fn saved_role(&self) -> Option<Role> {
        match self.roles.load() {
            Ok(role) => role,
            Err(err) => {
                warn!(error = %err, "could not read saved role");
                None
            }
        }
    }

    /// Replace the state with a signed-in session and persist the role.
    pub fn sign_in(&self, identity: Identity) {
        let role = identity.role();
        let account_id = identity.id();
        let generation = {
            let mut generation = self.lock_generation();
            *generation += 1;
            self.state.send_replace(SessionState::signed_in(identity));
            *generation
        };
        self.persist_role(generation, Some(role));
        info!(account_id = %account_id, role = %role, generation, "session signed in");
    }

    /// Clear the session and the role marker. Safe to call repeatedly.
    pub fn sign_out(&self, notice: Option<LoginNotice>) {
        self.end(None, notice);
    }

    /// Sign out only if no sign-in or sign-out happened since `started`.
    /// Returns whether the session was ended.
    pub fn sign_out_if_current(&self, started: u64, notice: Option<LoginNotice>) -> bool {
        self.end(Some(started), notice)
    }

    fn end(&self, started: Option<u64>, notice: Option<LoginNotice>) -> bool {
        let (generation, was_authenticated) = {
            let mut generation = self.lock_generation();
            if let Some(started) = started.filter(|started| *started != *generation) {
                debug!(started, current = *generation, "dropping stale sign-out");
                return false;
            }
            *generation += 1;
            let was_authenticated = self.state.borrow().is_authenticated;
            self.state.send_replace(SessionState::signed_out(notice));
            (*generation, was_authenticated)
        };
        self.persist_role(generation, None);
        if was_authenticated {
            info!(generation, "session signed out");
        } else {
            debug!(generation, "sign-out on an empty session");
        }
        true
    }

    /// Leave `loading` without touching anything else.
    pub fn finish_loading(&self) {
        let _generation = self.lock_generation();
        self.state.send_if_modified(|state| std::mem::replace(&mut state.loading, false));
    }

    /// Apply a whoami answer if no sign-in or sign-out happened since
    /// `started`. Returns whether it was applied.
    pub fn apply_whoami(&self, started: u64, identity: Identity) -> bool {
        let generation = self.lock_generation();
        if *generation != started {
            debug!(started, current = *generation, "dropping stale whoami answer");
            return false;
        }
        self.state.send_replace(SessionState::signed_in(identity));
        true
    }

    /// Apply a failed whoami if still current. Session loss also clears the
    /// role marker; other failures keep it for the next reload.
    pub fn apply_whoami_failure(&self, started: u64, err: &MedgateError) -> bool {
        {
            let generation = self.lock_generation();
            if *generation != started {
                debug!(started, current = *generation, "dropping stale whoami failure");
                return false;
            }
            self.state.send_replace(SessionState::signed_out(None));
        }
        if err.is_session_error() {
            self.persist_role(started, None);
        }
        true
    }

    /// Replace the notice shown on the login page.
    pub fn set_notice(&self, notice: Option<LoginNotice>) {
        let _generation = self.lock_generation();
        self.state.send_modify(|state| state.notice = notice);
    }

    /// Write the role marker outside the generation lock. Writes are
    /// serialized and skipped once a newer generation exists, so the marker
    /// always matches the latest sign-in or sign-out.
    fn persist_role(&self, generation: u64, role: Option<Role>) {
        let _writer = self.role_writes.lock().unwrap_or_else(|e| e.into_inner());
        let current = self.generation();
        if current != generation {
            debug!(generation, current, "skipping superseded role marker write");
            return;
        }
        let result = match role {
            Some(role) => self.roles.save(role),
            None => self.roles.clear(),
        };
        if let Err(err) = result {
            warn!(error = %err, role = ?role, "could not update role marker");
        }
    }

    fn lock_generation(&self) -> MutexGuard<'_, u64> {
        self.generation.lock().unwrap_or_else(|e| e.into_inner())
    }
}
