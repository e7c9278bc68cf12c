//! The `RpcTransport` trait.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// Anything that can carry a JSON-RPC request to a node and bring back the
/// reply.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Endpoint identifier, used in logs.
    fn url(&self) -> &str;

    /// Call `method` and deserialize the result into `T`.
    async fn call<T: DeserializeOwned>(
        &self,
        id: u64,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, TransportError> {
        let resp = self.send(JsonRpcRequest::new(id, method, params)).await?;
        let result = resp.into_result().map_err(TransportError::Rpc)?;
        Ok(serde_json::from_value(result)?)
    }
}
