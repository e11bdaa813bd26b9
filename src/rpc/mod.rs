pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::{PAGE_SIZE, RpcClient};
pub use error::RpcError;
pub use models::{RpcFault, RpcMethod, RpcReply, RpcRequest};
pub use transport::{HttpTransport, Transport};
