//! Access view decision

use crate::gate::{AuthGate, Identity};
use crate::resolver::RoleResolver;
use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "Admin";
pub const MEMBER_ROLE: &str = "Member";

/// What the application shows a caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessView {
    /// Not authenticated; send to login
    Login,
    /// Authenticated but holds no roles
    NoRoles,
    Admin,
    Member,
    /// Holds roles, none of which is Admin or Member
    Limited,
}

impl AccessView {
    /// View for an authenticated caller holding `roles`
    pub fn from_roles(roles: &[String]) -> Self {
        if roles.is_empty() {
            AccessView::NoRoles
        } else if roles.iter().any(|r| r == ADMIN_ROLE) {
            AccessView::Admin
        } else if roles.iter().any(|r| r == MEMBER_ROLE) {
            AccessView::Member
        } else {
            AccessView::Limited
        }
    }
}

/// Outcome of [`decide`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    pub view: AccessView,
    pub identity: Option<Identity>,
    pub roles: Vec<String>,
}

/// Decide the view for the caller behind `gate`
pub async fn decide(gate: &dyn AuthGate, resolver: &RoleResolver) -> AccessDecision {
    let Some(identity) = gate.current_identity() else {
        return AccessDecision {
            view: AccessView::Login,
            identity: None,
            roles: Vec::new(),
        };
    };

    let roles = resolver.resolve(&identity.stable_username, false).await;
    AccessDecision {
        view: AccessView::from_roles(&roles),
        identity: Some(identity),
        roles,
    }
}
