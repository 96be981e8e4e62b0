//! Route guard evaluation.
//!
//! `RouteGuard` loads a `RouteConfig` and decides, for a region and a
//! session view, whether a protected path renders or where to send the
//! user instead. Checks run in a fixed order:
//!
//! 1. Session still loading → `Loading`.
//! 2. Not authenticated, or authenticated for another role → login page.
//! 3. Inactive account → force logout with the "blocked" message.
//! 4. Not yet approved → review-pending page, unless the path is on the
//!    region's allow-list for the current status.
//! 5. Approved account on the review-pending page or the region root →
//!    dashboard.
//! 6. Otherwise render.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, warn};

use medgate_contracts::{
    error::{MedgateError, MedgateResult},
    identity::Identity,
    review::ReviewStatus,
    role::Role,
};

use crate::routes::{normalize, RegionRoutes, RouteConfig};

/// Message shown on the login page after a forced logout.
pub const BLOCKED_MESSAGE: &str = "blocked";

/// What the guard needs to know about the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionView {
    pub loading: bool,
    pub is_authenticated: bool,
    pub is_active: bool,
    pub role: Option<Role>,
    pub review_status: ReviewStatus,
}

impl SessionView {
    pub fn loading() -> Self {
        Self {
            loading: true,
            is_authenticated: false,
            is_active: false,
            role: None,
            review_status: ReviewStatus::Pending,
        }
    }

    pub fn signed_out() -> Self {
        Self {
            loading: false,
            ..Self::loading()
        }
    }

    pub fn signed_in(identity: &Identity) -> Self {
        Self {
            loading: false,
            is_authenticated: true,
            is_active: identity.is_active(),
            role: Some(identity.role()),
            review_status: identity.review_status(),
        }
    }
}

/// The guard's verdict for one navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session state is not known yet; show a placeholder.
    Loading,
    Render,
    RedirectToLogin { to: String },
    /// Clear the session, then show the login page with `message`.
    ForceLogout { to: String, message: String },
    RedirectToReviewPending {
        to: String,
        status: ReviewStatus,
        message: String,
    },
    RedirectToDashboard { to: String },
}

impl GuardDecision {
    /// Where the user ends up, if not on the requested path.
    pub fn redirect(&self) -> Option<&str> {
        match self {
            GuardDecision::Loading | GuardDecision::Render => None,
            GuardDecision::RedirectToLogin { to }
            | GuardDecision::ForceLogout { to, .. }
            | GuardDecision::RedirectToReviewPending { to, .. }
            | GuardDecision::RedirectToDashboard { to } => Some(to),
        }
    }
}

/// Text for the review-pending page.
pub fn review_message(status: ReviewStatus) -> &'static str {
    match status {
        ReviewStatus::Pending => {
            "Your account is under review. You will get access once an administrator approves it."
        }
        ReviewStatus::Revision => {
            "Your application needs changes. Update your profile and reapply."
        }
        ReviewStatus::Rejected => "Your application was rejected. You may reapply.",
        ReviewStatus::Approved => "Your account is approved.",
    }
}

/// Per-role route guard built from a TOML route table.
///
/// ```rust,ignore
/// let guard = RouteGuard::from_file(Path::new("routes/hospital.toml"))?;
/// let decision = guard.evaluate(Role::Doctor, &view, "/doctor/patients");
/// ```
#[derive(Debug, Clone)]
pub struct RouteGuard {
    regions: BTreeMap<Role, RegionRoutes>,
}

impl RouteGuard {
    /// Build a guard from a parsed config.
    ///
    /// Returns `ConfigError` if a role has no region or more than one, or a
    /// reviewed role has no review-pending page.
    pub fn new(config: RouteConfig) -> MedgateResult<Self> {
        let mut regions = BTreeMap::new();
        for region in config.regions {
            let role = region.role;
            if role.is_reviewed() && region.review_pending.is_none() {
                return Err(MedgateError::ConfigError {
                    reason: format!("region '{}' needs a review_pending page", role),
                });
            }
            if regions.insert(role, region).is_some() {
                return Err(MedgateError::ConfigError {
                    reason: format!("region '{}' is declared more than once", role),
                });
            }
        }
        if let Some(missing) = Role::ALL.iter().find(|role| !regions.contains_key(role)) {
            return Err(MedgateError::ConfigError {
                reason: format!("no region declared for role '{}'", missing),
            });
        }
        Ok(Self { regions })
    }

    pub fn from_toml_str(s: &str) -> MedgateResult<Self> {
        let config: RouteConfig = toml::from_str(s).map_err(|e| MedgateError::ConfigError {
            reason: format!("failed to parse route TOML: {}", e),
        })?;
        Self::new(config)
    }

    pub fn from_file(path: &Path) -> MedgateResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| MedgateError::ConfigError {
            reason: format!("failed to read route file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    /// The built-in hospital route table.
    pub fn hospital() -> MedgateResult<Self> {
        Self::from_toml_str(include_str!("../routes/hospital.toml"))
    }

    pub fn region(&self, role: Role) -> Option<&RegionRoutes> {
        self.regions.get(&role)
    }

    /// Decide what happens when the user opens `path` inside `region`.
    pub fn evaluate(&self, region: Role, view: &SessionView, path: &str) -> GuardDecision {
        let Some(routes) = self.regions.get(&region) else {
            // Unreachable after `new`, kept total for callers holding a stale role.
            return GuardDecision::Loading;
        };
        let path = normalize(path);

        if view.loading {
            return GuardDecision::Loading;
        }

        if !view.is_authenticated {
            debug!(region = %region, path, "unauthenticated navigation");
            return GuardDecision::RedirectToLogin {
                to: routes.login.clone(),
            };
        }

        if view.role != Some(region) {
            debug!(region = %region, path, role = ?view.role, "session belongs to another role");
            return GuardDecision::RedirectToLogin {
                to: routes.login.clone(),
            };
        }

        if !view.is_active {
            warn!(region = %region, path, "inactive account, forcing logout");
            return GuardDecision::ForceLogout {
                to: routes.login.clone(),
                message: BLOCKED_MESSAGE.to_string(),
            };
        }

        let status = view.review_status;
        if !status.is_approved() {
            if routes.is_review_pending(path) || routes.allows(status, path) {
                return GuardDecision::Render;
            }
            debug!(region = %region, path, status = %status, "account awaiting review");
            return GuardDecision::RedirectToReviewPending {
                to: routes.review_pending.clone().unwrap_or_else(|| routes.login.clone()),
                status,
                message: review_message(status).to_string(),
            };
        }

        if routes.is_review_pending(path) || routes.is_root(path) {
            return GuardDecision::RedirectToDashboard {
                to: routes.dashboard.clone(),
            };
        }

        GuardDecision::Render
    }
}
