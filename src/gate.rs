//! Access Gate
//!
//! Per-request authorization that runs in front of every application route.
//! The rules themselves live in [`decide`], a pure function over the route
//! table, the request path and what is known about the viewer. [`AccessGate`]
//! performs the two external reads (session, profile) in order and folds every
//! collaborator failure into a decision, so the gate never surfaces an error.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{IdentityState, RefreshedCredentials, SessionCredentials},
    models::{Profile, UserType},
    repository::RepositoryState,
};

const SITE_ROOT: &str = "/";

/// ModuleRule
///
/// A top-level functional area (e.g. HR, Learning) and the user types allowed into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleRule {
    pub prefix: String,
    pub allowed: Vec<UserType>,
}

impl ModuleRule {
    pub fn new(prefix: &str, allowed: &[UserType]) -> Self {
        Self {
            prefix: prefix.to_string(),
            allowed: allowed.to_vec(),
        }
    }

    pub fn permits(&self, user_type: UserType) -> bool {
        self.allowed.contains(&user_type)
    }
}

/// RouteTable
///
/// The gate's static configuration. Passed into [`AccessGate::new`] rather than
/// held in module-level state so tests can swap in alternate tables.
///
/// Module prefixes must be kept mutually exclusive; overlaps are not checked
/// at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTable {
    /// Reachable with no session at all (sign-in page, OAuth callback, OTP confirmation).
    pub public_prefixes: Vec<String>,
    /// Framework-internal asset directories.
    pub asset_prefixes: Vec<String>,
    /// Where unauthenticated requests are sent, with `next=<original path>`.
    pub sign_in_path: String,
    /// Always reachable once authenticated, and the target for users who need induction.
    pub induction_prefix: String,
    /// The one page a user pending induction may still see (exact match).
    pub limited_view_path: String,
    /// Target for denied module access and for the site root once inducted.
    pub landing_path: String,
    pub modules: Vec<ModuleRule>,
}

impl Default for RouteTable {
    fn default() -> Self {
        use UserType::{PathwaysCoordinator, Staff};

        Self {
            public_prefixes: vec![
                "/login".to_string(),
                "/auth/callback".to_string(),
                "/auth/confirm".to_string(),
            ],
            asset_prefixes: vec!["/_next".to_string(), "/static".to_string()],
            sign_in_path: "/login".to_string(),
            induction_prefix: "/intranet/induction".to_string(),
            limited_view_path: "/dashboard".to_string(),
            landing_path: "/dashboard".to_string(),
            modules: vec![
                ModuleRule::new("/hr", &[Staff]),
                ModuleRule::new("/sign-in", &[Staff]),
                ModuleRule::new("/learning", &[Staff, PathwaysCoordinator]),
                ModuleRule::new("/intranet", &[Staff, PathwaysCoordinator]),
            ],
        }
    }
}

impl RouteTable {
    pub fn is_public(&self, path: &str) -> bool {
        self.public_prefixes.iter().any(|prefix| is_under(path, prefix))
    }

    /// Asset heuristic: an asset directory, or a last path segment carrying a
    /// file extension (`/favicon.ico`, `/images/logo.png`).
    pub fn is_asset(&self, path: &str) -> bool {
        if self.asset_prefixes.iter().any(|prefix| is_under(path, prefix)) {
            return true;
        }

        let last_segment = path.rsplit('/').next().unwrap_or_default();
        match last_segment.rfind('.') {
            Some(dot) => dot + 1 < last_segment.len(),
            None => false,
        }
    }

    /// Paths the gate lets through before any session or profile lookup.
    pub fn bypasses_gate(&self, path: &str) -> bool {
        self.is_public(path) || self.is_asset(path)
    }

    pub fn is_induction_flow(&self, path: &str) -> bool {
        is_under(path, &self.induction_prefix)
    }

    /// First module rule whose prefix covers `path` and which does not admit `user_type`.
    pub fn denied_module(&self, path: &str, user_type: UserType) -> Option<&ModuleRule> {
        self.modules
            .iter()
            .find(|rule| is_under(path, &rule.prefix) && !rule.permits(user_type))
    }
}

/// Segment-aware prefix match: `/hr` covers `/hr` and `/hr/leave`, not `/hrx`.
fn is_under(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// Canonical form of a request path: duplicate slashes collapsed, `.` and
/// `..` segments resolved, no trailing slash except on the site root.
/// `..` never climbs above the root.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    format!("{SITE_ROOT}{}", segments.join("/"))
}

/// RedirectTarget
///
/// Where a redirect points. `next` carries the originally requested path for
/// the sign-in redirect so the client can return there after authenticating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub path: String,
    pub next: Option<String>,
}

impl RedirectTarget {
    pub fn to(path: &str) -> Self {
        Self {
            path: path.to_string(),
            next: None,
        }
    }

    pub fn with_next(path: &str, next: &str) -> Self {
        Self {
            path: path.to_string(),
            next: Some(next.to_string()),
        }
    }

    /// Value for the `Location` header, with `next` URL-encoded.
    pub fn location(&self) -> String {
        match &self.next {
            Some(next) => format!("{}?next={}", self.path, urlencoding::encode(next)),
            None => self.path.clone(),
        }
    }
}

/// Decision
///
/// The gate's verdict for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(RedirectTarget),
}

/// Viewer
///
/// What the gate knows about the requester once lookups are done.
#[derive(Debug, Clone, Copy)]
pub enum Viewer<'a> {
    /// No session, an invalid one, or the identity provider could not be reached.
    Anonymous,
    /// Valid session. `None` when no profile row exists yet or it could not be read.
    Authenticated(Option<&'a Profile>),
}

/// decide
///
/// Evaluates the gate rules in strict order, first match wins:
///
/// 1. public prefix → allow
/// 2. asset path → allow
/// 3. anonymous → sign-in with `next`
/// 4. no profile → allow
/// 5. induction flow → allow
/// 6. needs induction and not the limited view → induction flow
/// 7. module not permitted for the user type → landing page
/// 8. site root → induction flow or landing page
/// 9. allow
///
/// `path` is classified in its [`normalize_path`] form, which is also what
/// `next` carries.
pub fn decide(routes: &RouteTable, path: &str, viewer: Viewer<'_>) -> Decision {
    let path = normalize_path(path);
    let path = path.as_str();

    if routes.bypasses_gate(path) {
        return Decision::Allow;
    }

    let profile = match viewer {
        Viewer::Anonymous => {
            return Decision::Redirect(RedirectTarget::with_next(&routes.sign_in_path, path));
        }
        Viewer::Authenticated(None) => return Decision::Allow,
        Viewer::Authenticated(Some(profile)) => profile,
    };

    if routes.is_induction_flow(path) {
        return Decision::Allow;
    }

    let needs_induction = profile.needs_induction();
    if needs_induction && path != routes.limited_view_path {
        return Decision::Redirect(RedirectTarget::to(&routes.induction_prefix));
    }

    if routes.denied_module(path, profile.user_type).is_some() {
        return Decision::Redirect(RedirectTarget::to(&routes.landing_path));
    }

    if path == SITE_ROOT {
        let target = if needs_induction {
            &routes.induction_prefix
        } else {
            &routes.landing_path
        };
        return Decision::Redirect(RedirectTarget::to(target));
    }

    Decision::Allow
}

/// AuthContext
///
/// The authenticated identity resolved by the gate. Attached to the request
/// extensions on pass-through so handlers can read it without a second lookup.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub profile: Option<Profile>,
}

/// GateOutcome
///
/// A decision plus the side outputs of evaluation. `refreshed` must be merged
/// into whichever response the caller builds, redirect or pass-through.
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub decision: Decision,
    pub refreshed: Option<RefreshedCredentials>,
    pub viewer: Option<AuthContext>,
}

impl GateOutcome {
    fn bypass() -> Self {
        Self {
            decision: Decision::Allow,
            refreshed: None,
            viewer: None,
        }
    }
}

/// AccessGate
///
/// Holds the route table and the two collaborators the gate reads from. Cheap
/// to clone; evaluation keeps no state between requests.
#[derive(Clone)]
pub struct AccessGate {
    routes: Arc<RouteTable>,
    identity: IdentityState,
    profiles: RepositoryState,
}

impl AccessGate {
    pub fn new(routes: RouteTable, identity: IdentityState, profiles: RepositoryState) -> Self {
        Self {
            routes: Arc::new(routes),
            identity,
            profiles,
        }
    }

    /// evaluate
    ///
    /// Runs the gate for one request. Performs at most two sequential reads:
    /// session validation, then the profile lookup. Neither read happens for
    /// public or asset paths.
    ///
    /// Identity provider errors are treated as "no valid session". Profile
    /// store errors are logged and treated as "profile absent".
    pub async fn evaluate(&self, path: &str, credentials: &SessionCredentials) -> GateOutcome {
        let path = normalize_path(path);
        let path = path.as_str();

        if self.routes.bypasses_gate(path) {
            return GateOutcome::bypass();
        }

        let session = match self.identity.validate_session(credentials).await {
            Ok(Some(session)) => session,
            Ok(None) => return self.anonymous(path),
            Err(e) => {
                tracing::warn!(error = %e, path, "session validation failed, treating request as signed out");
                return self.anonymous(path);
            }
        };

        let profile = match self.profiles.get_profile(session.user_id).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::error!(error = %e, user_id = %session.user_id, "profile lookup failed, allowing without profile rules");
                None
            }
        };

        let decision = decide(&self.routes, path, Viewer::Authenticated(profile.as_ref()));
        if let Decision::Redirect(target) = &decision {
            tracing::debug!(user_id = %session.user_id, path, location = %target.location(), "gate redirect");
        }

        GateOutcome {
            decision,
            refreshed: session.refreshed,
            viewer: Some(AuthContext {
                user_id: session.user_id,
                profile,
            }),
        }
    }

    fn anonymous(&self, path: &str) -> GateOutcome {
        let decision = decide(&self.routes, path, Viewer::Anonymous);
        tracing::debug!(path, "no valid session, redirecting to sign-in");
        GateOutcome {
            decision,
            refreshed: None,
            viewer: None,
        }
    }
}
