use testing_service::TestService;
use testing_service::pb::{
    Empty, SimpleRequest, SimpleResponse, StreamingInputCallRequest, StreamingInputCallResponse,
    StreamingOutputCallRequest, StreamingOutputCallResponse,
};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

// Only `EmptyCall` is answered, the rest report `Unimplemented` although reflection lists them.
// `EmptyCall` rejects `authorization: denied` so header forwarding can be observed.
pub struct TestServiceImpl;

#[tonic::async_trait]
impl TestService for TestServiceImpl {
    type StreamingOutputCallStream = ReceiverStream<Result<StreamingOutputCallResponse, Status>>;
    type FullDuplexCallStream = ReceiverStream<Result<StreamingOutputCallResponse, Status>>;
    type HalfDuplexCallStream = ReceiverStream<Result<StreamingOutputCallResponse, Status>>;

    async fn empty_call(&self, request: Request<Empty>) -> Result<Response<Empty>, Status> {
        let denied = request
            .metadata()
            .get("authorization")
            .is_some_and(|value| value.to_str().is_ok_and(|value| value == "denied"));

        if denied {
            return Err(Status::permission_denied("access denied"));
        }

        Ok(Response::new(Empty {}))
    }

    async fn unary_call(
        &self,
        _request: Request<SimpleRequest>,
    ) -> Result<Response<SimpleResponse>, Status> {
        Err(Status::unimplemented("UnaryCall is not implemented"))
    }

    async fn streaming_output_call(
        &self,
        _request: Request<StreamingOutputCallRequest>,
    ) -> Result<Response<Self::StreamingOutputCallStream>, Status> {
        Err(Status::unimplemented("StreamingOutputCall is not implemented"))
    }

    async fn streaming_input_call(
        &self,
        _request: Request<Streaming<StreamingInputCallRequest>>,
    ) -> Result<Response<StreamingInputCallResponse>, Status> {
        Err(Status::unimplemented("StreamingInputCall is not implemented"))
    }

    async fn full_duplex_call(
        &self,
        _request: Request<Streaming<StreamingOutputCallRequest>>,
    ) -> Result<Response<Self::FullDuplexCallStream>, Status> {
        Err(Status::unimplemented("FullDuplexCall is not implemented"))
    }

    async fn half_duplex_call(
        &self,
        _request: Request<Streaming<StreamingOutputCallRequest>>,
    ) -> Result<Response<Self::HalfDuplexCallStream>, Status> {
        Err(Status::unimplemented("HalfDuplexCall is not implemented"))
    }
}
