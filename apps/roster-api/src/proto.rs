//! Generated gRPC code for the Roster API.
//!
//! This module includes the Rust code generated from `proto/roster.proto`.
//!
//! ## Services Available
//! - `PositionService` - CRUD over positions
//! - `EmployeeService` - CRUD over employees

tonic::include_proto!("roster.v1");
