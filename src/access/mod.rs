//! Role and visibility tiers plus the per-request access decisions built
//! on them.
//!
//! Tiers compare by explicit numeric rank, never by enum declaration order.
//! Decisions come back as data; callers map [`Decision::Denied`] to a
//! uniform 403 and log the reason, so the denial cause never leaks to the
//! client.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User role ladder: USER < ADMIN < SUPERADMIN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
    Superadmin,
}

impl Role {
    pub fn rank(&self) -> u8 {
        match self {
            Role::User => 0,
            Role::Admin => 1,
            Role::Superadmin => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
            Role::Superadmin => "SUPERADMIN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(Role::User),
            "ADMIN" => Some(Role::Admin),
            "SUPERADMIN" => Some(Role::Superadmin),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.rank() >= Role::Admin.rank()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Setting visibility ladder: USER < ADMIN < SYSTEM.
///
/// Deliberately a separate type from [`Role`]: the tiers are compared only
/// through `rank()`, never by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Visibility {
    User,
    Admin,
    System,
}

impl Visibility {
    pub fn rank(&self) -> u8 {
        match self {
            Visibility::User => 0,
            Visibility::Admin => 1,
            Visibility::System => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::User => "USER",
            Visibility::Admin => "ADMIN",
            Visibility::System => "SYSTEM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(Visibility::User),
            "ADMIN" => Some(Visibility::Admin),
            "SYSTEM" => Some(Visibility::System),
            _ => None,
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why an access check said no. Feeds the log line, not the response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The setting's visibility tier outranks the requester's role.
    VisibilityAboveRole,
    /// USER-visibility settings belong to their owner; a plain USER cannot
    /// reach someone else's.
    OwnerOnly,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::VisibilityAboveRole => f.write_str("visibility tier above requester role"),
            DenyReason::OwnerOnly => f.write_str("user-tier setting owned by another user"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }
}

/// CREATE rule: a requester may only create settings at a visibility tier
/// their role rank covers. Checked before anything is persisted.
pub fn can_create(role: Role, visibility: Visibility) -> bool {
    visibility.rank() <= role.rank()
}

/// READ/UPDATE/DELETE rule for an existing setting.
///
/// Ownership is an orthogonal allow path: the owning user passes regardless
/// of tiers. Otherwise the requester's role rank must cover the setting's
/// visibility rank, and USER-tier settings additionally stay private to
/// their owner below ADMIN. `owner` is `None` once the owning user has been
/// deleted, which closes the ownership path but leaves the tier path open.
pub fn resolve_access(
    role: Role,
    requester: Uuid,
    owner: Option<Uuid>,
    visibility: Visibility,
) -> Decision {
    if owner == Some(requester) {
        return Decision::Allowed;
    }
    if role.rank() < visibility.rank() {
        return Decision::Denied(DenyReason::VisibilityAboveRole);
    }
    if visibility == Visibility::User && role.rank() == Role::User.rank() {
        return Decision::Denied(DenyReason::OwnerOnly);
    }
    Decision::Allowed
}

/// Account-management rule: ADMIN and above may manage other users, but
/// never one whose role outranks their own.
pub fn can_manage_user(actor: Role, target: Role) -> bool {
    actor.is_admin() && target.rank() <= actor.rank()
}
