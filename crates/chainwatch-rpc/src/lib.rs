//! chainwatch-rpc: Ethereum JSON-RPC ledger source for ChainWatch.
//!
//! [`HttpRpcClient`] moves JSON-RPC envelopes over HTTP and retries
//! transient failures with exponential backoff. [`EthLedgerSource`] maps the
//! four ledger reads the engine needs onto `eth_*` calls.
//!
//! ```rust,no_run
//! use chainwatch_rpc::{EthLedgerSource, HttpClientConfig, HttpRpcClient};
//!
//! # fn main() -> Result<(), chainwatch_rpc::TransportError> {
//! let client = HttpRpcClient::new("https://ethereum-rpc.publicnode.com", HttpClientConfig::default())?;
//! let source = EthLedgerSource::new(client);
//! # let _ = source;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod eth;
pub mod http;
pub mod request;
pub mod retry;
pub mod transport;

pub use error::TransportError;
pub use eth::EthLedgerSource;
pub use http::{HttpClientConfig, HttpRpcClient};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use retry::{RetryConfig, RetryPolicy};
pub use transport::RpcTransport;
