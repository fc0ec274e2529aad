// src/utils/permissions.rs
//
// Central allow/deny decision for every request, as a pure function of
// (actor, action, resource kind, resource owner). Handlers and middleware
// call into this instead of re-implementing role checks.

use crate::error::AppError;
use crate::models::user::Role;

/// The authenticated actor, injected into request extensions by the auth
/// middleware. `role` is the effective role, already derived from the
/// stored (role, is_staff) pair.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Category, Genre, Title.
    Catalog,
    /// Account management (the /users/me self-service path is routed
    /// separately and only requires authentication).
    Account,
    Review,
    Comment,
}

/// Decides whether `actor` may perform `action` on a resource of `kind`
/// owned by `owner_id` (if any).
///
/// * Catalog: reads are open to everyone including anonymous; writes
///   require admin.
/// * Account: admin only.
/// * Review/Comment: reads open; writes allowed to the resource's author,
///   moderators and admins.
pub fn check_permission(
    actor: Option<&CurrentUser>,
    action: Action,
    kind: ResourceKind,
    owner_id: Option<i64>,
) -> Result<(), AppError> {
    match (kind, action) {
        (ResourceKind::Catalog | ResourceKind::Review | ResourceKind::Comment, Action::Read) => {
            Ok(())
        }
        (ResourceKind::Catalog, Action::Write) => require_admin(actor),
        (ResourceKind::Account, _) => require_admin(actor),
        (ResourceKind::Review | ResourceKind::Comment, Action::Write) => {
            let actor = actor.ok_or_else(|| {
                AppError::AuthError("Authentication required.".to_string())
            })?;
            match actor.role {
                Role::Admin | Role::Moderator => Ok(()),
                Role::User if owner_id == Some(actor.id) => Ok(()),
                Role::User => Err(AppError::Forbidden(
                    "You do not have permission to modify this content.".to_string(),
                )),
            }
        }
    }
}

fn require_admin(actor: Option<&CurrentUser>) -> Result<(), AppError> {
    let actor =
        actor.ok_or_else(|| AppError::AuthError("Authentication required.".to_string()))?;
    if actor.role == Role::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Administrator rights required.".to_string(),
        ))
    }
}
