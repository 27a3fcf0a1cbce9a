//! gRPC transport.
//!
//! ```text
//! client ──► AuthInterceptor ──► PositionGrpc / EmployeeGrpc ──► repositories
//!            (correlation ID,      (RpcCall: log method, correlation ID,
//!             bearer JWT)           duration, outcome)
//! ```

pub mod employee_service;
pub mod interceptor;
pub mod position_service;

use std::time::Instant;

use roster_core::{Employee, Page, Position, RepoError, DEFAULT_PAGE_SIZE};
use tonic::metadata::{Ascii, MetadataValue};
use tonic::service::interceptor::InterceptedService;
use tonic::{Request, Response, Status};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::middleware::{CorrelationId, CORRELATION_HEADER};
use crate::proto;
use crate::proto::employee_service_server::EmployeeServiceServer;
use crate::proto::position_service_server::PositionServiceServer;
use crate::AppState;

pub use employee_service::EmployeeGrpc;
pub use interceptor::AuthInterceptor;
pub use position_service::PositionGrpc;

/// Position service behind the auth interceptor.
pub fn position_server(state: &AppState) -> InterceptedService<PositionServiceServer<PositionGrpc>, AuthInterceptor> {
    PositionServiceServer::with_interceptor(
        PositionGrpc::new(state.clone()),
        AuthInterceptor::new(state.jwt.clone()),
    )
}

/// Employee service behind the auth interceptor.
pub fn employee_server(state: &AppState) -> InterceptedService<EmployeeServiceServer<EmployeeGrpc>, AuthInterceptor> {
    EmployeeServiceServer::with_interceptor(
        EmployeeGrpc::new(state.clone()),
        AuthInterceptor::new(state.jwt.clone()),
    )
}

// =============================================================================
// Per-call logging
// =============================================================================

/// Tracks one RPC from arrival to response.
pub(crate) struct RpcCall {
    method: &'static str,
    correlation_id: String,
    started: Instant,
}

impl RpcCall {
    pub(crate) fn start<T>(method: &'static str, request: &Request<T>) -> Self {
        let correlation_id = request
            .extensions()
            .get::<CorrelationId>()
            .cloned()
            .unwrap_or_else(|| CorrelationId::from_incoming(None))
            .0;

        info!(method, correlation_id = %correlation_id, "RPC received");
        RpcCall {
            method,
            correlation_id,
            started: Instant::now(),
        }
    }

    /// Logs the outcome and converts it into a tonic response.
    pub(crate) fn finish<T>(self, result: Result<T, ApiError>) -> Result<Response<T>, Status> {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let echoed = self.correlation_id.parse::<MetadataValue<Ascii>>().ok();

        match result {
            Ok(message) => {
                info!(
                    method = self.method,
                    correlation_id = %self.correlation_id,
                    elapsed_ms,
                    outcome = "ok",
                    "RPC completed"
                );
                let mut response = Response::new(message);
                if let Some(value) = echoed {
                    response.metadata_mut().insert(CORRELATION_HEADER, value);
                }
                Ok(response)
            }
            Err(err) => {
                warn!(
                    method = self.method,
                    correlation_id = %self.correlation_id,
                    elapsed_ms,
                    outcome = err.code(),
                    "RPC failed"
                );
                let mut status = Status::from(err);
                if let Some(value) = echoed {
                    status.metadata_mut().insert(CORRELATION_HEADER, value);
                }
                Err(status)
            }
        }
    }
}

/// Zero page or page size means the default.
pub(crate) fn page_of(request: &proto::GetAllRequest) -> Result<Page, ApiError> {
    let number = if request.page == 0 { 1 } else { request.page };
    let size = if request.page_size == 0 {
        DEFAULT_PAGE_SIZE as i64
    } else {
        request.page_size
    };
    Page::new(number, size).map_err(|e| ApiError::from(RepoError::from(e)))
}

// =============================================================================
// Message conversions
// =============================================================================

impl From<Position> for proto::Position {
    fn from(p: Position) -> Self {
        proto::Position {
            id: p.id,
            name: p.name,
            salary: p.salary,
        }
    }
}

impl From<proto::Position> for Position {
    fn from(p: proto::Position) -> Self {
        Position {
            id: p.id,
            name: p.name,
            salary: p.salary,
        }
    }
}

impl From<Employee> for proto::Employee {
    fn from(e: Employee) -> Self {
        proto::Employee {
            id: e.id,
            first_name: e.first_name,
            last_name: e.last_name,
            position_id: e.position_id,
        }
    }
}

impl From<proto::Employee> for Employee {
    fn from(e: proto::Employee) -> Self {
        Employee {
            id: e.id,
            first_name: e.first_name,
            last_name: e.last_name,
            position_id: e.position_id,
        }
    }
}
