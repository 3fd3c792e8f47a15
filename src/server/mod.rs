pub mod mcp;
pub mod tcp;

pub use mcp::{
    resource_definitions, JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpServer,
    ResourceDefinition, BALANCES_URI, POOLS_URI, PROTOCOL_VERSION,
};
pub use tcp::{handle_connection, serve};
