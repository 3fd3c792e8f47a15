pub mod amm;
pub mod assistant;
pub mod background;
pub mod client;
pub mod config;
pub mod error;
pub mod ledger;
pub mod llm;
pub mod pools;
pub mod precision;
pub mod rpc;
pub mod seed;
pub mod server;
pub mod settings;
pub mod tools;
pub mod wallet;

pub use client::McpClient;
pub use config::Config;
pub use error::{Result, WalletError};
pub use rpc::RpcClient;
pub use server::McpServer;
pub use wallet::WalletState;
