//! Position gRPC service implementation.

use roster_core::{generate_id, Position};
use tonic::{Request, Response, Status};

use super::{page_of, RpcCall};
use crate::error::ApiError;
use crate::proto::{
    position_service_server::PositionService,
    DeleteResponse, GetAllRequest, Id,
    Position as PositionMessage,
    PositionList,
};
use crate::AppState;

/// Position service implementation.
pub struct PositionGrpc {
    state: AppState,
}

impl PositionGrpc {
    pub fn new(state: AppState) -> Self {
        PositionGrpc { state }
    }

    /// Keeps `GET /{id}` on the REST side from serving a stale body.
    async fn forget_response(&self, id: &str) {
        if let Some(cache) = &self.state.response_cache {
            cache.invalidate(id).await;
        }
    }

    async fn list(&self, request: GetAllRequest) -> Result<PositionList, ApiError> {
        let page = page_of(&request)?;
        let positions = self.state.positions.get_all(page).await?;
        Ok(PositionList {
            positions: positions.into_iter().map(Into::into).collect(),
        })
    }

    async fn store(&self, message: PositionMessage) -> Result<PositionMessage, ApiError> {
        let mut position = Position::from(message);
        position.id = generate_id();
        Ok(self.state.positions.create(position).await?.into())
    }

    async fn replace(&self, message: PositionMessage) -> Result<PositionMessage, ApiError> {
        let position = Position::from(message);
        self.state.positions.update(position.clone()).await?;
        self.forget_response(&position.id).await;
        Ok(position.into())
    }

    async fn remove(&self, id: &str) -> Result<DeleteResponse, ApiError> {
        self.state.positions.delete(id).await?;
        self.forget_response(id).await;
        Ok(DeleteResponse {
            status: "deleted".to_string(),
        })
    }
}

#[tonic::async_trait]
impl PositionService for PositionGrpc {
    async fn get(&self, request: Request<Id>) -> Result<Response<PositionMessage>, Status> {
        let call = RpcCall::start("roster.v1.PositionService/Get", &request);
        let id = request.into_inner().id;

        let result = self.state.positions.get(&id).await.map(Into::into);
        call.finish(result.map_err(ApiError::from))
    }

    async fn get_all(&self, request: Request<GetAllRequest>) -> Result<Response<PositionList>, Status> {
        let call = RpcCall::start("roster.v1.PositionService/GetAll", &request);
        call.finish(self.list(request.into_inner()).await)
    }

    async fn create(&self, request: Request<PositionMessage>) -> Result<Response<PositionMessage>, Status> {
        let call = RpcCall::start("roster.v1.PositionService/Create", &request);
        call.finish(self.store(request.into_inner()).await)
    }

    async fn update(&self, request: Request<PositionMessage>) -> Result<Response<PositionMessage>, Status> {
        let call = RpcCall::start("roster.v1.PositionService/Update", &request);
        call.finish(self.replace(request.into_inner()).await)
    }

    async fn delete(&self, request: Request<Id>) -> Result<Response<DeleteResponse>, Status> {
        let call = RpcCall::start("roster.v1.PositionService/Delete", &request);
        let id = request.into_inner().id;
        call.finish(self.remove(&id).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grpc::test_support::{authed, cached_state, state};
    use tonic::Code;

    fn message(name: &str, salary: i64) -> PositionMessage {
        PositionMessage {
            id: String::new(),
            name: name.to_string(),
            salary,
        }
    }

    #[tokio::test]
    async fn test_create_get_list() {
        let service = PositionGrpc::new(state());

        let created = service
            .create(authed(message("Engineer", 1000)))
            .await
            .unwrap()
            .into_inner();
        assert!(!created.id.is_empty());

        let fetched = service
            .get(authed(Id { id: created.id.clone() }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(fetched, created);

        let list = service
            .get_all(authed(GetAllRequest { page: 0, page_size: 0 }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(list.positions, vec![created]);
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let service = PositionGrpc::new(state());
        let mut ghost = message("Ghost", 1);
        ghost.id = generate_id();

        let status = service.update(authed(ghost)).await.unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn test_invalid_input_is_invalid_argument() {
        let service = PositionGrpc::new(state());

        let status = service.create(authed(message("", 10))).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);

        let status = service
            .get_all(authed(GetAllRequest { page: 1, page_size: -5 }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
    }

    #[tokio::test]
    async fn test_writes_drop_cached_rest_response() {
        let (state, cache) = cached_state();
        let service = PositionGrpc::new(state);

        let created = service
            .create(authed(message("Engineer", 1000)))
            .await
            .unwrap()
            .into_inner();
        cache.put(&created.id, b"{\"salary\":1000}");

        let raised = PositionMessage {
            salary: 1500,
            ..created.clone()
        };
        service.update(authed(raised)).await.unwrap();
        assert!(!cache.contains(&created.id));

        cache.put(&created.id, b"{\"salary\":1500}");
        service.delete(authed(Id { id: created.id.clone() })).await.unwrap();
        assert!(!cache.contains(&created.id));
    }

    #[tokio::test]
    async fn test_failed_update_keeps_cached_response() {
        let (state, cache) = cached_state();
        let service = PositionGrpc::new(state);
        let mut ghost = message("Ghost", 1);
        ghost.id = generate_id();
        cache.put(&ghost.id, b"{}");

        service.update(authed(ghost.clone())).await.unwrap_err();
        assert!(cache.contains(&ghost.id));
    }
}
