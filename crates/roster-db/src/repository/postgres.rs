//! # PostgreSQL Repositories
//!
//! Positions and employees stored in two tables created by the embedded
//! migrations (see [`crate::migrations`]).
//!
//! ## Update Semantics
//! ```text
//! UPDATE ... WHERE id = $1 AND (col IS DISTINCT FROM $n OR ...)
//!      │
//!      ├── 1 row  → Ok
//!      └── 0 rows → SELECT EXISTS(id)
//!                      ├── true  → NothingChanged
//!                      └── false → NotFound
//! ```
//!
//! Queries are built at runtime with `query_as::<_, T>` so the crate compiles
//! without a live database.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use roster_core::validation::{validate_employee, validate_id, validate_position};
use roster_core::{
    Employee, EmployeeLookup, EmployeeRepository, Page, Position, PositionRepository, RepoError,
    RepoResult,
};
use sqlx::PgPool;
use tracing::debug;

use crate::error::DbError;
use crate::integrity::{ensure_position_exists, ensure_position_unreferenced};
use crate::timeout::bounded;

const POSITION: &str = "position";
const EMPLOYEE: &str = "employee";

/// `(LIMIT, OFFSET)` bind values for a page.
fn limit_offset(page: Page) -> (i64, i64) {
    page.signed_window()
}

async fn row_exists(pool: &PgPool, sql: &str, id: &str) -> RepoResult<bool> {
    let exists: bool = sqlx::query_scalar(sql)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(DbError::from)?;
    Ok(exists)
}

// =============================================================================
// Positions
// =============================================================================

/// Positions stored in PostgreSQL.
#[derive(Clone)]
pub struct PgPositionRepository {
    pool: PgPool,
    employees: Arc<dyn EmployeeLookup>,
    timeout: Duration,
}

impl PgPositionRepository {
    /// Creates the repository.
    ///
    /// `employees` backs the delete guard; pass a [`PgEmployeeLookup`] over
    /// the same pool.
    pub fn new(pool: PgPool, employees: Arc<dyn EmployeeLookup>, timeout: Duration) -> Self {
        PgPositionRepository {
            pool,
            employees,
            timeout,
        }
    }
}

#[async_trait]
impl PositionRepository for PgPositionRepository {
    async fn create(&self, position: Position) -> RepoResult<Position> {
        validate_position(&position)?;

        bounded("create position", self.timeout, async {
            debug!(id = %position.id, "Inserting position");

            let result = sqlx::query(
                r#"
                INSERT INTO positions (id, name, salary)
                VALUES ($1, $2, $3)
                "#,
            )
            .bind(&position.id)
            .bind(&position.name)
            .bind(position.salary)
            .execute(&self.pool)
            .await;

            match result.map_err(DbError::from) {
                Ok(_) => Ok(position),
                Err(DbError::UniqueViolation(_)) => {
                    Err(RepoError::already_exists(POSITION, &position.id))
                }
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn get(&self, id: &str) -> RepoResult<Position> {
        validate_id("id", id)?;

        bounded("get position", self.timeout, async {
            sqlx::query_as::<_, Position>("SELECT id, name, salary FROM positions WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(DbError::from)?
                .ok_or_else(|| RepoError::not_found(POSITION, id))
        })
        .await
    }

    async fn update(&self, position: Position) -> RepoResult<()> {
        validate_position(&position)?;

        bounded("update position", self.timeout, async {
            let result = sqlx::query(
                r#"
                UPDATE positions
                SET name = $2, salary = $3, updated_at = NOW()
                WHERE id = $1
                  AND (name IS DISTINCT FROM $2 OR salary IS DISTINCT FROM $3)
                "#,
            )
            .bind(&position.id)
            .bind(&position.name)
            .bind(position.salary)
            .execute(&self.pool)
            .await
            .map_err(DbError::from)?;

            if result.rows_affected() > 0 {
                return Ok(());
            }

            let exists = row_exists(
                &self.pool,
                "SELECT EXISTS(SELECT 1 FROM positions WHERE id = $1)",
                &position.id,
            )
            .await?;

            if exists {
                Err(RepoError::nothing_changed(POSITION, &position.id))
            } else {
                Err(RepoError::not_found(POSITION, &position.id))
            }
        })
        .await
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        validate_id("id", id)?;

        bounded("delete position", self.timeout, async {
            ensure_position_unreferenced(self.employees.as_ref(), id).await?;

            let result = sqlx::query("DELETE FROM positions WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(DbError::from);

            match result {
                Ok(done) if done.rows_affected() == 0 => Err(RepoError::not_found(POSITION, id)),
                Ok(_) => Ok(()),
                // An employee was attached between the guard and the delete.
                Err(DbError::ForeignKeyViolation(_)) => Err(RepoError::ReferenceInUse {
                    position_id: id.to_string(),
                }),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn get_all(&self, page: Page) -> RepoResult<Vec<Position>> {
        let (limit, offset) = limit_offset(page);

        bounded("get all positions", self.timeout, async {
            let positions = sqlx::query_as::<_, Position>(
                "SELECT id, name, salary FROM positions ORDER BY id LIMIT $1 OFFSET $2",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::from)?;

            debug!(count = positions.len(), page = page.number(), "Listed positions");
            Ok(positions)
        })
        .await
    }
}

// =============================================================================
// Employees
// =============================================================================

/// `get_by_position` over the employees table.
///
/// Handed to [`PgPositionRepository`] for its delete guard.
#[derive(Debug, Clone)]
pub struct PgEmployeeLookup {
    pool: PgPool,
    timeout: Duration,
}

impl PgEmployeeLookup {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        PgEmployeeLookup { pool, timeout }
    }
}

#[async_trait]
impl EmployeeLookup for PgEmployeeLookup {
    async fn get_by_position(&self, position_id: &str) -> RepoResult<Employee> {
        validate_id("position_id", position_id)?;

        bounded("get employee by position", self.timeout, async {
            sqlx::query_as::<_, Employee>(
                r#"
                SELECT id, first_name, last_name, position_id
                FROM employees
                WHERE position_id = $1
                LIMIT 1
                "#,
            )
            .bind(position_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| RepoError::not_found(EMPLOYEE, format!("position_id={}", position_id)))
        })
        .await
    }
}

/// Employees stored in PostgreSQL.
#[derive(Clone)]
pub struct PgEmployeeRepository {
    lookup: PgEmployeeLookup,
    positions: Arc<dyn PositionRepository>,
}

impl PgEmployeeRepository {
    /// Creates the repository.
    ///
    /// `positions` resolves `position_id` before every write and may be a
    /// cached repository.
    pub fn new(pool: PgPool, positions: Arc<dyn PositionRepository>, timeout: Duration) -> Self {
        PgEmployeeRepository {
            lookup: PgEmployeeLookup::new(pool, timeout),
            positions,
        }
    }

    fn pool(&self) -> &PgPool {
        &self.lookup.pool
    }

    fn timeout(&self) -> Duration {
        self.lookup.timeout
    }

    /// Translates an FK violation on insert/update into the integrity error.
    fn map_write_error(err: DbError, action: &'static str, employee: &Employee) -> RepoError {
        match err {
            DbError::UniqueViolation(_) => RepoError::already_exists(EMPLOYEE, &employee.id),
            DbError::ForeignKeyViolation(_) => RepoError::ReferenceInvalid {
                action,
                position_id: employee.position_id.clone(),
            },
            other => RepoError::from(other).context(&format!("error to {} employee", action)),
        }
    }
}

#[async_trait]
impl EmployeeLookup for PgEmployeeRepository {
    async fn get_by_position(&self, position_id: &str) -> RepoResult<Employee> {
        self.lookup.get_by_position(position_id).await
    }
}

#[async_trait]
impl EmployeeRepository for PgEmployeeRepository {
    async fn create(&self, employee: Employee) -> RepoResult<Employee> {
        validate_employee(&employee)?;

        bounded("create employee", self.timeout(), async {
            ensure_position_exists(self.positions.as_ref(), "create", &employee.position_id)
                .await?;

            debug!(id = %employee.id, position_id = %employee.position_id, "Inserting employee");

            sqlx::query(
                r#"
                INSERT INTO employees (id, first_name, last_name, position_id)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&employee.id)
            .bind(&employee.first_name)
            .bind(&employee.last_name)
            .bind(&employee.position_id)
            .execute(self.pool())
            .await
            .map_err(|e| Self::map_write_error(DbError::from(e), "create", &employee))?;

            Ok(employee)
        })
        .await
    }

    async fn get(&self, id: &str) -> RepoResult<Employee> {
        validate_id("id", id)?;

        bounded("get employee", self.timeout(), async {
            sqlx::query_as::<_, Employee>(
                "SELECT id, first_name, last_name, position_id FROM employees WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(DbError::from)?
            .ok_or_else(|| RepoError::not_found(EMPLOYEE, id))
        })
        .await
    }

    async fn update(&self, employee: Employee) -> RepoResult<()> {
        validate_employee(&employee)?;

        bounded("update employee", self.timeout(), async {
            ensure_position_exists(self.positions.as_ref(), "update", &employee.position_id)
                .await?;

            let result = sqlx::query(
                r#"
                UPDATE employees
                SET first_name = $2, last_name = $3, position_id = $4, updated_at = NOW()
                WHERE id = $1
                  AND (first_name IS DISTINCT FROM $2
                       OR last_name IS DISTINCT FROM $3
                       OR position_id IS DISTINCT FROM $4)
                "#,
            )
            .bind(&employee.id)
            .bind(&employee.first_name)
            .bind(&employee.last_name)
            .bind(&employee.position_id)
            .execute(self.pool())
            .await
            .map_err(|e| Self::map_write_error(DbError::from(e), "update", &employee))?;

            if result.rows_affected() > 0 {
                return Ok(());
            }

            let exists = row_exists(
                self.pool(),
                "SELECT EXISTS(SELECT 1 FROM employees WHERE id = $1)",
                &employee.id,
            )
            .await?;

            if exists {
                Err(RepoError::nothing_changed(EMPLOYEE, &employee.id))
            } else {
                Err(RepoError::not_found(EMPLOYEE, &employee.id))
            }
        })
        .await
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        validate_id("id", id)?;

        bounded("delete employee", self.timeout(), async {
            let result = sqlx::query("DELETE FROM employees WHERE id = $1")
                .bind(id)
                .execute(self.pool())
                .await
                .map_err(DbError::from)?;

            if result.rows_affected() == 0 {
                return Err(RepoError::not_found(EMPLOYEE, id));
            }
            Ok(())
        })
        .await
    }

    async fn get_all(&self, page: Page) -> RepoResult<Vec<Employee>> {
        let (limit, offset) = limit_offset(page);

        bounded("get all employees", self.timeout(), async {
            let employees = sqlx::query_as::<_, Employee>(
                r#"
                SELECT id, first_name, last_name, position_id
                FROM employees
                ORDER BY id
                LIMIT $1 OFFSET $2
                "#,
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool())
            .await
            .map_err(DbError::from)?;

            debug!(count = employees.len(), page = page.number(), "Listed employees");
            Ok(employees)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_offset() {
        assert_eq!(limit_offset(Page::new(1, 50).unwrap()), (50, 0));
        assert_eq!(limit_offset(Page::new(3, 10).unwrap()), (10, 20));
        assert_eq!(
            limit_offset(Page::new(i64::MAX, 1000).unwrap()),
            (1000, i64::MAX)
        );
    }
}
