//! Route table types.
//!
//! A `RouteConfig` is deserialized from TOML and holds one `RegionRoutes`
//! per role. Each region names the pages the guard redirects to and the
//! explicit allow-list of paths a not-yet-approved account may open.

use serde::{Deserialize, Serialize};

use medgate_contracts::{review::ReviewStatus, role::Role};

/// A path opened to reviewed accounts in the listed statuses.
///
/// ```toml
/// [[regions.allow]]
/// path = "/doctor/edit-profile"
/// statuses = ["revision"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowEntry {
    /// Exact path, or a prefix that matches at a `/` boundary.
    pub path: String,
    /// Statuses for which the path renders.
    pub statuses: Vec<ReviewStatus>,
}

impl AllowEntry {
    pub fn permits(&self, status: ReviewStatus, path: &str) -> bool {
        self.statuses.contains(&status) && path_matches(&self.path, path)
    }
}

/// The pages of one role's protected region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRoutes {
    pub role: Role,
    pub login: String,
    pub dashboard: String,
    /// Required for reviewed roles.
    #[serde(default)]
    pub review_pending: Option<String>,
    /// Landing path of the region; approved accounts are sent on to the dashboard.
    pub root: String,
    #[serde(default)]
    pub allow: Vec<AllowEntry>,
}

impl RegionRoutes {
    pub fn is_review_pending(&self, path: &str) -> bool {
        self.review_pending
            .as_deref()
            .is_some_and(|page| normalize(page) == path)
    }

    pub fn is_root(&self, path: &str) -> bool {
        normalize(&self.root) == path
    }

    pub fn allows(&self, status: ReviewStatus, path: &str) -> bool {
        self.allow.iter().any(|entry| entry.permits(status, path))
    }
}

/// Top-level structure of a route file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    pub regions: Vec<RegionRoutes>,
}

/// Drop any query string and trailing slash (except for `/` itself).
pub fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

/// `pattern` matches `path` exactly or as a `/`-delimited prefix.
fn path_matches(pattern: &str, path: &str) -> bool {
    let pattern = normalize(pattern);
    let path = normalize(path);
    path == pattern
        || path
            .strip_prefix(pattern)
            .is_some_and(|rest| rest.starts_with('/'))
}
