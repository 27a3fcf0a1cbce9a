//! Employee gRPC service implementation.

use roster_core::{generate_id, Employee};
use tonic::{Request, Response, Status};

use super::{page_of, RpcCall};
use crate::error::ApiError;
use crate::proto::{
    employee_service_server::EmployeeService,
    DeleteResponse, Employee as EmployeeMessage,
    EmployeeList, GetAllRequest, Id,
};
use crate::AppState;

/// Employee service implementation.
pub struct EmployeeGrpc {
    state: AppState,
}

impl EmployeeGrpc {
    pub fn new(state: AppState) -> Self {
        EmployeeGrpc { state }
    }

    /// Keeps `GET /{id}` on the REST side from serving a stale body.
    async fn forget_response(&self, id: &str) {
        if let Some(cache) = &self.state.response_cache {
            cache.invalidate(id).await;
        }
    }

    async fn list(&self, request: GetAllRequest) -> Result<EmployeeList, ApiError> {
        let page = page_of(&request)?;
        let employees = self.state.employees.get_all(page).await?;
        Ok(EmployeeList {
            employees: employees.into_iter().map(Into::into).collect(),
        })
    }

    async fn store(&self, message: EmployeeMessage) -> Result<EmployeeMessage, ApiError> {
        let mut employee = Employee::from(message);
        employee.id = generate_id();
        Ok(self.state.employees.create(employee).await?.into())
    }

    async fn replace(&self, message: EmployeeMessage) -> Result<EmployeeMessage, ApiError> {
        let employee = Employee::from(message);
        self.state.employees.update(employee.clone()).await?;
        self.forget_response(&employee.id).await;
        Ok(employee.into())
    }

    async fn remove(&self, id: &str) -> Result<DeleteResponse, ApiError> {
        self.state.employees.delete(id).await?;
        self.forget_response(id).await;
        Ok(DeleteResponse {
            status: "deleted".to_string(),
        })
    }
}

#[tonic::async_trait]
impl EmployeeService for EmployeeGrpc {
    async fn get(&self, request: Request<Id>) -> Result<Response<EmployeeMessage>, Status> {
        let call = RpcCall::start("roster.v1.EmployeeService/Get", &request);
        let id = request.into_inner().id;

        let result = self.state.employees.get(&id).await.map(Into::into);
        call.finish(result.map_err(ApiError::from))
    }

    async fn get_all(&self, request: Request<GetAllRequest>) -> Result<Response<EmployeeList>, Status> {
        let call = RpcCall::start("roster.v1.EmployeeService/GetAll", &request);
        call.finish(self.list(request.into_inner()).await)
    }

    async fn create(&self, request: Request<EmployeeMessage>) -> Result<Response<EmployeeMessage>, Status> {
        let call = RpcCall::start("roster.v1.EmployeeService/Create", &request);
        call.finish(self.store(request.into_inner()).await)
    }

    async fn update(&self, request: Request<EmployeeMessage>) -> Result<Response<EmployeeMessage>, Status> {
        let call = RpcCall::start("roster.v1.EmployeeService/Update", &request);
        call.finish(self.replace(request.into_inner()).await)
    }

    async fn delete(&self, request: Request<Id>) -> Result<Response<DeleteResponse>, Status> {
        let call = RpcCall::start("roster.v1.EmployeeService/Delete", &request);
        let id = request.into_inner().id;
        call.finish(self.remove(&id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grpc::position_service::PositionGrpc;
    use crate::grpc::test_support::{authed, cached_state, state};
    use crate::proto::position_service_server::PositionService;
    use crate::proto::Position as PositionMessage;
    use tonic::Code;

    fn employee(position_id: &str) -> EmployeeMessage {
        EmployeeMessage {
            id: String::new(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            position_id: position_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_dangling_position_is_failed_precondition() {
        let service = EmployeeGrpc::new(state());

        let status = service
            .create(authed(employee(&generate_id())))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::FailedPrecondition);

        let list = service
            .get_all(authed(GetAllRequest::default()))
            .await
            .unwrap()
            .into_inner();
        assert!(list.employees.is_empty());
    }

    #[tokio::test]
    async fn test_delete_guard_across_services() {
        let state = state();
        let positions = PositionGrpc::new(state.clone());
        let employees = EmployeeGrpc::new(state);

        let position = positions
            .create(authed(PositionMessage {
                id: String::new(),
                name: "Manager".to_string(),
                salary: 2000,
            }))
            .await
            .unwrap()
            .into_inner();
        let hired = employees
            .create(authed(employee(&position.id)))
            .await
            .unwrap()
            .into_inner();

        let status = positions
            .delete(authed(Id { id: position.id.clone() }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::FailedPrecondition);

        let renamed = EmployeeMessage {
            last_name: "Murray Hopper".to_string(),
            ..hired.clone()
        };
        let updated = employees.update(authed(renamed.clone())).await.unwrap().into_inner();
        assert_eq!(updated, renamed);

        employees.delete(authed(Id { id: hired.id })).await.unwrap();
        let deleted = positions
            .delete(authed(Id { id: position.id }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(deleted.status, "deleted");
    }

    #[tokio::test]
    async fn test_writes_drop_cached_rest_response() {
        let (state, cache) = cached_state();
        let positions = PositionGrpc::new(state.clone());
        let employees = EmployeeGrpc::new(state);

        let position = positions
            .create(authed(PositionMessage {
                id: String::new(),
                name: "Analyst".to_string(),
                salary: 1200,
            }))
            .await
            .unwrap()
            .into_inner();
        let hired = employees
            .create(authed(employee(&position.id)))
            .await
            .unwrap()
            .into_inner();
        cache.put(&hired.id, b"{\"lastName\":\"Hopper\"}");

        let renamed = EmployeeMessage {
            last_name: "Murray Hopper".to_string(),
            ..hired.clone()
        };
        employees.update(authed(renamed)).await.unwrap();
        assert!(!cache.contains(&hired.id));

        cache.put(&hired.id, b"{}");
        employees.delete(authed(Id { id: hired.id.clone() })).await.unwrap();
        assert!(!cache.contains(&hired.id));
    }
}
