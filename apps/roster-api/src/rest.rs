//! REST transport.
//!
//! | Route | Methods | Success |
//! |-------|---------|---------|
//! | `/health` | GET | 200, no auth |
//! | `/positions` | GET `?page=&size=`, POST | 200, 201 |
//! | `/positions/{id}` | GET, PUT, DELETE | 200, 200, 204 |
//! | `/employees` | GET `?page=&size=`, POST | 200, 201 |
//! | `/employees/{id}` | GET, PUT, DELETE | 200, 200, 204 |
//!
//! IDs are generated on create; an `id` in a request body is ignored.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use roster_core::{generate_id, Employee, Page, Position, RepoError, DEFAULT_PAGE_SIZE};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::{MiddlewareChain, Stage};
use crate::AppState;

/// Builds the REST router with the standard middleware chain on every
/// entity route and the response cache on the `/{id}` routes.
pub fn router(state: AppState) -> Router {
    let chain = MiddlewareChain::standard(state.jwt.clone());
    let item_chain = chain
        .clone()
        .with_optional(state.response_cache.clone().map(Stage::ResponseCache));
    let open = MiddlewareChain::new().with(Stage::Correlation).with(Stage::Logging);

    Router::new()
        .route("/health", open.apply(get(health)))
        .route(
            "/positions",
            chain.apply(get(list_positions).post(create_position)),
        )
        .route(
            "/positions/{id}",
            item_chain.apply(get(get_position).put(update_position).delete(delete_position)),
        )
        .route(
            "/employees",
            chain.apply(get(list_employees).post(create_employee)),
        )
        .route(
            "/employees/{id}",
            item_chain.apply(get(get_employee).put(update_employee).delete(delete_employee)),
        )
        .with_state(state)
}

/// `?page=&size=`, both optional.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

impl PageQuery {
    fn into_page(self) -> Result<Page, ApiError> {
        Page::new(
            self.page.unwrap_or(1),
            self.size.unwrap_or(DEFAULT_PAGE_SIZE as i64),
        )
        .map_err(|e| ApiError::from(RepoError::from(e)))
    }
}

fn page_from(query: Result<Query<PageQuery>, QueryRejection>) -> Result<Page, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    query.into_page()
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// =============================================================================
// Positions
// =============================================================================

async fn list_positions(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Vec<Position>>, ApiError> {
    let page = page_from(query)?;
    Ok(Json(state.positions.get_all(page).await?))
}

async fn create_position(
    State(state): State<AppState>,
    payload: Result<Json<Position>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut position = body(payload)?;
    position.id = generate_id();

    let stored = state.positions.create(position).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn get_position(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Position>, ApiError> {
    Ok(Json(state.positions.get(&id).await?))
}

async fn update_position(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Position>, JsonRejection>,
) -> Result<Json<Position>, ApiError> {
    let mut position = body(payload)?;
    position.id = id;

    state.positions.update(position.clone()).await?;
    Ok(Json(position))
}

async fn delete_position(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.positions.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Employees
// =============================================================================

async fn list_employees(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Vec<Employee>>, ApiError> {
    let page = page_from(query)?;
    Ok(Json(state.employees.get_all(page).await?))
}

async fn create_employee(
    State(state): State<AppState>,
    payload: Result<Json<Employee>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let mut employee = body(payload)?;
    employee.id = generate_id();

    let stored = state.employees.create(employee).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn get_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Employee>, ApiError> {
    Ok(Json(state.employees.get(&id).await?))
}

async fn update_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Employee>, JsonRejection>,
) -> Result<Json<Employee>, ApiError> {
    let mut employee = body(payload)?;
    employee.id = id;

    state.employees.update(employee.clone()).await?;
    Ok(Json(employee))
}

async fn delete_employee(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.employees.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Unit Tests
// =============================================================================
