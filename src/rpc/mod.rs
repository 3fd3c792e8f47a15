pub mod client;

pub use client::{ChainProvider, NetworkStatus, RpcClient};
