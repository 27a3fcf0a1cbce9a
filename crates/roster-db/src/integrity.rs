//! # Position → Employee Integrity
//!
//! The two checks that keep employees from pointing at missing positions.
//!
//! ```text
//! Employee create/update ──► PositionRepository::get(position_id)
//!                              ├── Ok         → write proceeds
//!                              ├── NotFound   → ReferenceInvalid (no write)
//!                              └── other err  → propagated, prefixed
//!
//! Position delete ─────────► EmployeeLookup::get_by_position(id)
//!                              ├── Ok         → ReferenceInUse (no delete)
//!                              ├── NotFound   → delete proceeds
//!                              └── other err  → propagated
//! ```
//!
//! The Postgres and MongoDB backends call these helpers; the memory backend
//! performs the same checks inline while holding its store lock.

use roster_core::{EmployeeLookup, PositionRepository, RepoError, RepoResult};

/// Fails unless `position_id` resolves through `positions`.
///
/// `action` is `"create"` or `"update"` and ends up in the error message.
pub async fn ensure_position_exists(
    positions: &dyn PositionRepository,
    action: &'static str,
    position_id: &str,
) -> RepoResult<()> {
    match positions.get(position_id).await {
        Ok(_) => Ok(()),
        Err(err) if err.is_not_found() => Err(RepoError::ReferenceInvalid {
            action,
            position_id: position_id.to_string(),
        }),
        Err(err) => Err(err.context(&format!("error to {} employee", action))),
    }
}

/// Fails with `ReferenceInUse` while any employee holds `position_id`.
pub async fn ensure_position_unreferenced(
    employees: &dyn EmployeeLookup,
    position_id: &str,
) -> RepoResult<()> {
    match employees.get_by_position(position_id).await {
        Ok(_) => Err(RepoError::ReferenceInUse {
            position_id: position_id.to_string(),
        }),
        Err(err) if err.is_not_found() => Ok(()),
        Err(err) => Err(err.context("error to delete position")),
    }
}
