//! # In-Memory Repositories
//!
//! Both entity maps live in one [`MemoryStore`] behind a single mutex, so the
//! integrity checks and the writes they guard happen atomically.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  MemoryStore (Arc<Mutex<Tables>>)                                       │
//! │                                                                         │
//! │   ┌──────────────────────────────┐  ┌──────────────────────────────┐   │
//! │   │ positions: BTreeMap<id, Pos> │  │ employees: BTreeMap<id, Emp> │   │
//! │   └──────────────────────────────┘  └──────────────────────────────┘   │
//! │        ▲                                  ▲                             │
//! │        │ MemoryPositionRepository         │ MemoryEmployeeRepository    │
//! │        └──────────── same lock ───────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The lock is never held across an `.await`; every method does its work in
//! one synchronous critical section. Values are cloned in and out.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use roster_core::validation::{validate_employee, validate_id, validate_position};
use roster_core::{
    Employee, EmployeeLookup, EmployeeRepository, Page, Position, PositionRepository, RepoError,
    RepoResult,
};
use tracing::debug;

const POSITION: &str = "position";
const EMPLOYEE: &str = "employee";

#[derive(Debug, Default)]
struct Tables {
    positions: BTreeMap<String, Position>,
    employees: BTreeMap<String, Employee>,
}

/// Shared in-memory storage for one server instance.
///
/// ## Usage
/// ```rust
/// use roster_db::repository::memory::MemoryStore;
///
/// let store = MemoryStore::new();
/// let positions = store.positions();
/// let employees = store.employees();
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position repository over this store.
    pub fn positions(&self) -> MemoryPositionRepository {
        MemoryPositionRepository {
            store: self.clone(),
        }
    }

    /// Employee repository over this store.
    pub fn employees(&self) -> MemoryEmployeeRepository {
        MemoryEmployeeRepository {
            store: self.clone(),
        }
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| RepoError::Internal("memory store lock poisoned".to_string()))
    }
}

fn page_of<T: Clone>(map: &BTreeMap<String, T>, page: Page) -> Vec<T> {
    let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let take = usize::try_from(page.size()).unwrap_or(usize::MAX);
    map.values().skip(skip).take(take).cloned().collect()
}

// =============================================================================
// Positions
// =============================================================================

/// Positions stored in a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryPositionRepository {
    store: MemoryStore,
}

#[async_trait]
impl PositionRepository for MemoryPositionRepository {
    async fn create(&self, position: Position) -> RepoResult<Position> {
        validate_position(&position)?;
        let mut tables = self.store.lock()?;

        if tables.positions.contains_key(&position.id) {
            return Err(RepoError::already_exists(POSITION, &position.id));
        }

        debug!(id = %position.id, "Storing position in memory");
        tables
            .positions
            .insert(position.id.clone(), position.clone());
        Ok(position)
    }

    async fn get(&self, id: &str) -> RepoResult<Position> {
        validate_id("id", id)?;
        let tables = self.store.lock()?;
        tables
            .positions
            .get(id)
            .cloned()
            .ok_or_else(|| RepoError::not_found(POSITION, id))
    }

    async fn update(&self, position: Position) -> RepoResult<()> {
        validate_position(&position)?;
        let mut tables = self.store.lock()?;

        let stored = tables
            .positions
            .get_mut(&position.id)
            .ok_or_else(|| RepoError::not_found(POSITION, &position.id))?;

        if *stored == position {
            return Err(RepoError::nothing_changed(POSITION, &position.id));
        }

        *stored = position;
        Ok(())
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        validate_id("id", id)?;
        let mut tables = self.store.lock()?;

        if !tables.positions.contains_key(id) {
            return Err(RepoError::not_found(POSITION, id));
        }

        if tables.employees.values().any(|e| e.position_id == id) {
            return Err(RepoError::ReferenceInUse {
                position_id: id.to_string(),
            });
        }

        tables.positions.remove(id);
        Ok(())
    }

    async fn get_all(&self, page: Page) -> RepoResult<Vec<Position>> {
        let tables = self.store.lock()?;
        Ok(page_of(&tables.positions, page))
    }
}

// =============================================================================
// Employees
// =============================================================================

/// Employees stored in a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryEmployeeRepository {
    store: MemoryStore,
}

fn ensure_position(tables: &Tables, action: &'static str, position_id: &str) -> RepoResult<()> {
    if tables.positions.contains_key(position_id) {
        Ok(())
    } else {
        Err(RepoError::ReferenceInvalid {
            action,
            position_id: position_id.to_string(),
        })
    }
}

#[async_trait]
impl EmployeeLookup for MemoryEmployeeRepository {
    async fn get_by_position(&self, position_id: &str) -> RepoResult<Employee> {
        validate_id("position_id", position_id)?;
        let tables = self.store.lock()?;
        tables
            .employees
            .values()
            .find(|e| e.position_id == position_id)
            .cloned()
            .ok_or_else(|| RepoError::not_found(EMPLOYEE, format!("position_id={}", position_id)))
    }
}

#[async_trait]
impl EmployeeRepository for MemoryEmployeeRepository {
    async fn create(&self, employee: Employee) -> RepoResult<Employee> {
        validate_employee(&employee)?;
        let mut tables = self.store.lock()?;

        ensure_position(&tables, "create", &employee.position_id)?;
        if tables.employees.contains_key(&employee.id) {
            return Err(RepoError::already_exists(EMPLOYEE, &employee.id));
        }

        debug!(id = %employee.id, position_id = %employee.position_id, "Storing employee in memory");
        tables
            .employees
            .insert(employee.id.clone(), employee.clone());
        Ok(employee)
    }

    async fn get(&self, id: &str) -> RepoResult<Employee> {
        validate_id("id", id)?;
        let tables = self.store.lock()?;
        tables
            .employees
            .get(id)
            .cloned()
            .ok_or_else(|| RepoError::not_found(EMPLOYEE, id))
    }

    async fn update(&self, employee: Employee) -> RepoResult<()> {
        validate_employee(&employee)?;
        let mut tables = self.store.lock()?;

        ensure_position(&tables, "update", &employee.position_id)?;
        let stored = tables
            .employees
            .get_mut(&employee.id)
            .ok_or_else(|| RepoError::not_found(EMPLOYEE, &employee.id))?;

        if *stored == employee {
            return Err(RepoError::nothing_changed(EMPLOYEE, &employee.id));
        }

        *stored = employee;
        Ok(())
    }

    async fn delete(&self, id: &str) -> RepoResult<()> {
        validate_id("id", id)?;
        let mut tables = self.store.lock()?;
        tables
            .employees
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepoError::not_found(EMPLOYEE, id))
    }

    async fn get_all(&self, page: Page) -> RepoResult<Vec<Employee>> {
        let tables = self.store.lock()?;
        Ok(page_of(&tables.employees, page))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn page(number: i64, size: i64) -> Page {
        Page::new(number, size).unwrap()
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let store = MemoryStore::new();
        let positions = store.positions();

        let created = positions
            .create(Position::new("Engineer", 1000))
            .await
            .unwrap();
        assert!(!created.id.is_empty());

        let all = positions.get_all(page(1, 50)).await.unwrap();
        assert_eq!(all, vec![created]);
    }

    #[tokio::test]
    async fn test_dangling_position_rejected_and_not_persisted() {
        let store = MemoryStore::new();
        let employees = store.employees();

        let err = employees
            .create(Employee::new("Ada", "Lovelace", "missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::ReferenceInvalid { action: "create", .. }));
        assert!(employees.get_all(page(1, 50)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_guard() {
        let store = MemoryStore::new();
        let positions = store.positions();
        let employees = store.employees();

        let p1 = positions.create(Position::new("Engineer", 1000)).await.unwrap();
        let e1 = employees
            .create(Employee::new("Ada", "Lovelace", &p1.id))
            .await
            .unwrap();

        let err = positions.delete(&p1.id).await.unwrap_err();
        assert!(matches!(err, RepoError::ReferenceInUse { .. }));
        assert_eq!(positions.get(&p1.id).await.unwrap(), p1);

        employees.delete(&e1.id).await.unwrap();
        positions.delete(&p1.id).await.unwrap();
        assert!(positions.get(&p1.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_missing_and_unchanged() {
        let store = MemoryStore::new();
        let positions = store.positions();

        let err = positions
            .update(Position::new("Ghost", 1))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        let p = positions.create(Position::new("Engineer", 1000)).await.unwrap();
        let err = positions.update(p.clone()).await.unwrap_err();
        assert!(matches!(err, RepoError::NothingChanged { .. }));

        let mut raised = p.clone();
        raised.salary = 1200;
        positions.update(raised.clone()).await.unwrap();
        assert_eq!(positions.get(&p.id).await.unwrap(), raised);
    }

    #[tokio::test]
    async fn test_employee_update_to_missing_position() {
        let store = MemoryStore::new();
        let p = store.positions().create(Position::new("Engineer", 1000)).await.unwrap();
        let employees = store.employees();
        let mut e = employees
            .create(Employee::new("Ada", "Lovelace", &p.id))
            .await
            .unwrap();

        e.position_id = "missing".to_string();
        let err = employees.update(e.clone()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "error to update employee: position missing does not exist"
        );
        assert_eq!(employees.get(&e.id).await.unwrap().position_id, p.id);
    }

    #[tokio::test]
    async fn test_duplicate_id() {
        let store = MemoryStore::new();
        let positions = store.positions();
        let p = positions.create(Position::new("Engineer", 1000)).await.unwrap();

        let err = positions.create(p).await.unwrap_err();
        assert!(matches!(err, RepoError::AlreadyExists { .. }));
    }

    #[tokio::test]
    async fn test_pagination_is_ordered_and_bounded() {
        let store = MemoryStore::new();
        let positions = store.positions();
        for i in 0..5 {
            let mut p = Position::new(format!("P{}", i), i);
            p.id = format!("id-{}", i);
            positions.create(p).await.unwrap();
        }

        let second = positions.get_all(page(2, 2)).await.unwrap();
        let ids: Vec<_> = second.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["id-2", "id-3"]);

        assert!(positions.get_all(page(4, 2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_by_position() {
        let store = MemoryStore::new();
        let p = store.positions().create(Position::new("Engineer", 1000)).await.unwrap();
        let employees = store.employees();

        assert!(employees.get_by_position(&p.id).await.unwrap_err().is_not_found());

        let e = employees
            .create(Employee::new("Ada", "Lovelace", &p.id))
            .await
            .unwrap();
        assert_eq!(employees.get_by_position(&p.id).await.unwrap(), e);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates() {
        let store = MemoryStore::new();

        let handles: Vec<_> = (0..64)
            .map(|i| {
                let positions = store.positions();
                tokio::spawn(async move {
                    positions
                        .create(Position::new(format!("Role {}", i), i * 10))
                        .await
                })
            })
            .collect();

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }

        let all = store.positions().get_all(page(1, 1000)).await.unwrap();
        assert_eq!(succeeded, 64);
        assert_eq!(all.len(), succeeded);
    }
}
