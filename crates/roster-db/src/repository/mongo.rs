//! # MongoDB Repositories
//!
//! One collection per entity (names come from config). Documents carry
//! `created_at`, and `updated_at` once they have been modified.
//!
//! ## Document Shape
//! ```text
//! positions:  { id, name, salary, created_at, updated_at? }
//! employees:  { id, first_name, last_name, position_id, created_at, updated_at? }
//! ```
//!
//! A unique index on `id` (see [`crate::pool::connect_mongo`]) turns duplicate
//! creates into `E11000`, which maps to `AlreadyExists`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{doc, DateTime, Document};
use mongodb::{Collection, Database};
use roster_core::validation::{validate_employee, validate_id, validate_position};
use roster_core::{
    Employee, EmployeeLookup, EmployeeRepository, Page, Position, PositionRepository, RepoError,
    RepoResult,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DbError;
use crate::integrity::{ensure_position_exists, ensure_position_unreferenced};
use crate::timeout::bounded;

const POSITION: &str = "position";
const EMPLOYEE: &str = "employee";

// =============================================================================
// Documents
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct PositionDocument {
    id: String,
    name: String,
    salary: i64,
    created_at: DateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime>,
}

impl From<&Position> for PositionDocument {
    fn from(p: &Position) -> Self {
        PositionDocument {
            id: p.id.clone(),
            name: p.name.clone(),
            salary: p.salary,
            created_at: DateTime::now(),
            updated_at: None,
        }
    }
}

impl From<PositionDocument> for Position {
    fn from(d: PositionDocument) -> Self {
        Position {
            id: d.id,
            name: d.name,
            salary: d.salary,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EmployeeDocument {
    id: String,
    first_name: String,
    last_name: String,
    position_id: String,
    created_at: DateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime>,
}

impl From<&Employee> for EmployeeDocument {
    fn from(e: &Employee) -> Self {
        EmployeeDocument {
            id: e.id.clone(),
            first_name: e.first_name.clone(),
            last_name: e.last_name.clone(),
            position_id: e.position_id.clone(),
            created_at: DateTime::now(),
            updated_at: None,
        }
    }
}

impl From<EmployeeDocument> for Employee {
    fn from(d: EmployeeDocument) -> Self {
        Employee {
            id: d.id,
            first_name: d.first_name,
            last_name: d.last_name,
            position_id: d.position_id,
        }
    }
}

/// `(skip, limit)` for a page; `skip` never exceeds `i64::MAX`, which is
/// the most the server accepts.
fn skip_limit(page: Page) -> (u64, i64) {
    let (limit, offset) = page.signed_window();
    (offset as u64, limit)
}

/// Lists one page of `collection` ordered by `id`.
async fn find_page<T>(collection: &Collection<T>, page: Page) -> RepoResult<Vec<T>>
where
    T: serde::de::DeserializeOwned + Send + Sync,
{
    let (skip, limit) = skip_limit(page);
    let cursor = collection
        .find(doc! {})
        .sort(doc! { "id": 1 })
        .skip(skip)
        .limit(limit)
        .await
        .map_err(DbError::from)?;

    let docs: Vec<T> = cursor.try_collect().await.map_err(DbError::from)?;
    Ok(docs)
}

/// Resolves a zero-match update into NotFound or NothingChanged.
async fn unmatched_update<T>(
    collection: &Collection<T>,
    entity: &'static str,
    id: &str,
) -> RepoResult<()>
where
    T: Send + Sync,
{
    let count = collection
        .count_documents(doc! { "id": id })
        .await
        .map_err(DbError::from)?;

    if count > 0 {
        Err(RepoError::nothing_changed(entity, id))
    } else {
        Err(RepoError::not_found(entity, id))
    }
}

// =============================================================================
// Positions
// =============================================================================

/// Positions stored in a MongoDB collection.
#[derive(Clone)]
pub struct MongoPositionRepository {
    collection: Collection<PositionDocument>,
    employees: Arc<dyn EmployeeLookup>,
    timeout: Duration,
}

impl MongoPositionRepository {
    /// Creates the repository over `db.<collection>`.
    ///
    /// `employees` backs the delete guard; pass a [`MongoEmployeeLookup`].
    pub fn new(
        db: &Database,
        collection: &str,
        employees: Arc<dyn EmployeeLookup>,
        timeout: Duration,
    ) -> Self {
        MongoPositionRepository {
            collection: db.collection(collection),
            employees,
            timeout,
        }
    }
}

#[async_trait]
impl PositionRepository for MongoPositionRepository {
    async fn create(&self, position: Position) -> RepoResult<Position> {
        validate_position(&position)?;

        bounded("create position", self.timeout, async {
            debug!(id = %position.id, "Inserting position document");

            match self
                .collection
                .insert_one(PositionDocument::from(&position))
                .await
                .map_err(DbError::from)
            {
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
            self.collection
                .find_one(doc! { "id": id })
                .await
                .map_err(DbError::from)?
                .map(Position::from)
                .ok_or_else(|| RepoError::not_found(POSITION, id))
        })
        .await
    }

    async fn update(&self, position: Position) -> RepoResult<()> {
        validate_position(&position)?;

        bounded("update position", self.timeout, async {
            let filter = doc! {
                "id": position.id.as_str(),
                "$or": [
                    { "name": { "$ne": position.name.as_str() } },
                    { "salary": { "$ne": position.salary } },
                ],
            };
            let update = doc! {
                "$set": { "name": position.name.as_str(), "salary": position.salary },
                "$currentDate": { "updated_at": true },
            };

            let result = self
                .collection
                .update_one(filter, update)
                .await
                .map_err(DbError::from)?;

            if result.matched_count > 0 {
                return Ok(());
            }
            unmatched_update(&self.collection, POSITION, &position.id).await
        })
        .await
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        validate_id("id", id)?;

        bounded("delete position", self.timeout, async {
            ensure_position_unreferenced(self.employees.as_ref(), id).await?;

            let result = self
                .collection
                .delete_one(doc! { "id": id })
                .await
                .map_err(DbError::from)?;

            if result.deleted_count == 0 {
                return Err(RepoError::not_found(POSITION, id));
            }
            Ok(())
        })
        .await
    }

    async fn get_all(&self, page: Page) -> RepoResult<Vec<Position>> {
        bounded("get all positions", self.timeout, async {
            let docs = find_page(&self.collection, page).await?;
            Ok(docs.into_iter().map(Position::from).collect())
        })
        .await
    }
}

// =============================================================================
// Employees
// =============================================================================

/// `get_by_position` over the employees collection.
#[derive(Debug, Clone)]
pub struct MongoEmployeeLookup {
    collection: Collection<EmployeeDocument>,
    timeout: Duration,
}

impl MongoEmployeeLookup {
    pub fn new(db: &Database, collection: &str, timeout: Duration) -> Self {
        MongoEmployeeLookup {
            collection: db.collection(collection),
            timeout,
        }
    }
}

#[async_trait]
impl EmployeeLookup for MongoEmployeeLookup {
    async fn get_by_position(&self, position_id: &str) -> RepoResult<Employee> {
        validate_id("position_id", position_id)?;

        bounded("get employee by position", self.timeout, async {
            self.collection
                .find_one(doc! { "position_id": position_id })
                .await
                .map_err(DbError::from)?
                .map(Employee::from)
                .ok_or_else(|| {
                    RepoError::not_found(EMPLOYEE, format!("position_id={}", position_id))
                })
        })
        .await
    }
}

/// Employees stored in a MongoDB collection.
#[derive(Clone)]
pub struct MongoEmployeeRepository {
    lookup: MongoEmployeeLookup,
    positions: Arc<dyn PositionRepository>,
}

impl MongoEmployeeRepository {
    pub fn new(
        db: &Database,
        collection: &str,
        positions: Arc<dyn PositionRepository>,
        timeout: Duration,
    ) -> Self {
        MongoEmployeeRepository {
            lookup: MongoEmployeeLookup::new(db, collection, timeout),
            positions,
        }
    }

    fn collection(&self) -> &Collection<EmployeeDocument> {
        &self.lookup.collection
    }

    fn timeout(&self) -> Duration {
        self.lookup.timeout
    }
}

fn employee_changes(employee: &Employee) -> Document {
    doc! {
        "first_name": employee.first_name.as_str(),
        "last_name": employee.last_name.as_str(),
        "position_id": employee.position_id.as_str(),
    }
}

#[async_trait]
impl EmployeeLookup for MongoEmployeeRepository {
    async fn get_by_position(&self, position_id: &str) -> RepoResult<Employee> {
        self.lookup.get_by_position(position_id).await
    }
}

#[async_trait]
impl EmployeeRepository for MongoEmployeeRepository {
    async fn create(&self, employee: Employee) -> RepoResult<Employee> {
        validate_employee(&employee)?;

        bounded("create employee", self.timeout(), async {
            ensure_position_exists(self.positions.as_ref(), "create", &employee.position_id)
                .await?;

            debug!(id = %employee.id, position_id = %employee.position_id, "Inserting employee document");

            match self
                .collection()
                .insert_one(EmployeeDocument::from(&employee))
                .await
                .map_err(DbError::from)
            {
                Ok(_) => Ok(employee),
                Err(DbError::UniqueViolation(_)) => {
                    Err(RepoError::already_exists(EMPLOYEE, &employee.id))
                }
                Err(e) => Err(RepoError::from(e).context("error to create employee")),
            }
        })
        .await
    }

    async fn get(&self, id: &str) -> RepoResult<Employee> {
        validate_id("id", id)?;

        bounded("get employee", self.timeout(), async {
            self.collection()
                .find_one(doc! { "id": id })
                .await
                .map_err(DbError::from)?
                .map(Employee::from)
                .ok_or_else(|| RepoError::not_found(EMPLOYEE, id))
        })
        .await
    }

    async fn update(&self, employee: Employee) -> RepoResult<()> {
        validate_employee(&employee)?;

        bounded("update employee", self.timeout(), async {
            ensure_position_exists(self.positions.as_ref(), "update", &employee.position_id)
                .await?;

            let filter = doc! {
                "id": employee.id.as_str(),
                "$or": [
                    { "first_name": { "$ne": employee.first_name.as_str() } },
                    { "last_name": { "$ne": employee.last_name.as_str() } },
                    { "position_id": { "$ne": employee.position_id.as_str() } },
                ],
            };
            let update = doc! {
                "$set": employee_changes(&employee),
                "$currentDate": { "updated_at": true },
            };

            let result = self
                .collection()
                .update_one(filter, update)
                .await
                .map_err(|e| RepoError::from(DbError::from(e)).context("error to update employee"))?;

            if result.matched_count > 0 {
                return Ok(());
            }
            unmatched_update(self.collection(), EMPLOYEE, &employee.id).await
        })
        .await
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        validate_id("id", id)?;

        bounded("delete employee", self.timeout(), async {
            let result = self
                .collection()
                .delete_one(doc! { "id": id })
                .await
                .map_err(DbError::from)?;

            if result.deleted_count == 0 {
                return Err(RepoError::not_found(EMPLOYEE, id));
            }
            Ok(())
        })
        .await
    }

    async fn get_all(&self, page: Page) -> RepoResult<Vec<Employee>> {
        bounded("get all employees", self.timeout(), async {
            let docs = find_page(self.collection(), page).await?;
            Ok(docs.into_iter().map(Employee::from).collect())
        })
        .await
    }
}
