use serde_json::{json, Value};
use std::io::{self, Write};
use std::sync::Arc;
use swap_send_mcp_server::background::{Background, MessageResponse};
use swap_send_mcp_server::llm::OpenAiClient;
use swap_send_mcp_server::server::{BALANCES_URI, POOLS_URI};
use swap_send_mcp_server::settings::{FileSettings, MemorySettings, SettingsStore};
use swap_send_mcp_server::{Config, McpClient, RpcClient};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    println!("╔═══════════════════════════════════════════════════════╗");
    println!("║      Swap & Send MCP Server - Test Client v1.0       ║");
    println!("╚═══════════════════════════════════════════════════════╝\n");

    let config = Config::from_env().unwrap_or_default();

    println!("Connecting to server at {}...", config.listen_addr);
    let client = Arc::new(McpClient::tcp(&config.listen_addr, config.request_timeout()).await?);

    let settings: Arc<dyn SettingsStore> = match &config.settings_file {
        Some(path) => Arc::new(FileSettings::open(path.clone(), &config).await?),
        None => Arc::new(MemorySettings::from_config(&config)),
    };
    let background = Background::new(
        client,
        Arc::new(OpenAiClient::from_config(&config)?),
        settings,
        Arc::new(RpcClient::new(config.rpc_url.clone(), config.request_timeout())?),
    );

    if !background.on_installed().await {
        eyre::bail!("MCP handshake with {} failed", config.listen_addr);
    }
    println!("✓ Connected successfully!\n");

    loop {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║ Available Commands:                                  ║");
        println!("║ 1. swap           - Swap tokens through a pool       ║");
        println!("║ 2. send           - Send tokens to a recipient       ║");
        println!("║ 3. getBalances    - Show wallet balances             ║");
        println!("║ 4. balances       - Read wallet://balances           ║");
        println!("║ 5. pools          - Read dex://pools                 ║");
        println!("║ 6. tools/list     - List available tools             ║");
        println!("║ 7. chat           - Ask the assistant                ║");
        println!("║ 8. network        - Chain id, block, native balance  ║");
        println!("║ 9. exit           - Close connection                 ║");
        println!("╚═══════════════════════════════════════════════════════╝");

        let choice = prompt("\nEnter command number (1-9): ")?;

        let message = match choice.as_str() {
            "1" => swap_message()?,
            "2" => send_message()?,
            "3" => json!({"action": "callTool", "toolName": "getBalances", "args": {}}),
            "4" => json!({"action": "readResource", "uri": BALANCES_URI}),
            "5" => json!({"action": "readResource", "uri": POOLS_URI}),
            "6" => json!({"action": "getTools"}),
            "7" => {
                if let Some(api_key) = non_empty(prompt("OpenAI API key (press Enter to keep current): ")?) {
                    print_response(
                        &background
                            .handle_value(json!({"action": "setApiKey", "apiKey": api_key}))
                            .await,
                    )?;
                }
                json!({"action": "sendMessage", "message": prompt("\nYou: ")?})
            }
            "8" => {
                let address = non_empty(prompt("\nAddress (press Enter to skip balance): ")?);
                json!({"action": "getNetworkStatus", "address": address})
            }
            "9" => {
                println!("\nGoodbye!");
                break;
            }
            _ => {
                println!("Invalid choice. Please enter 1-9.");
                continue;
            }
        };

        print_response(&background.handle_value(message).await)?;
    }

    Ok(())
}

fn swap_message() -> eyre::Result<Value> {
    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║ Swap Tool                                            ║");
    println!("╚═══════════════════════════════════════════════════════╝");

    let token_in = prompt("\nEnter input token (e.g., USDC): ")?;
    let token_out = prompt("Enter output token (e.g., USDT): ")?;
    let amount_in = number(&prompt("Enter amount to swap: ")?);
    let slippage = prompt("Enter slippage tolerance (press Enter for 0.005): ")?;

    let mut args = json!({
        "tokenIn": token_in,
        "tokenOut": token_out,
        "amountIn": amount_in,
    });
    if let Some(slippage) = non_empty(slippage) {
        args["slippage"] = number(&slippage);
    }

    Ok(json!({"action": "callTool", "toolName": "swap", "args": args}))
}

fn send_message() -> eyre::Result<Value> {
    println!("\n╔═══════════════════════════════════════════════════════╗");
    println!("║ Send Tool                                            ║");
    println!("╚═══════════════════════════════════════════════════════╝");

    let token = prompt("\nEnter token (e.g., LINK): ")?;
    let amount = number(&prompt("Enter amount to send: ")?);
    let recipient = prompt("Enter recipient address: ")?;

    Ok(json!({
        "action": "callTool",
        "toolName": "send",
        "args": {
            "token": token,
            "amount": amount,
            "recipient": recipient,
        }
    }))
}

fn prompt(label: &str) -> eyre::Result<String> {
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn non_empty(value: String) -> Option<String> {
    Some(value).filter(|v| !v.is_empty())
}

/// A JSON number when `raw` parses as one, the raw string otherwise.
fn number(raw: &str) -> Value {
    serde_json::from_str::<serde_json::Number>(raw)
        .map(Value::Number)
        .unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Prints a router reply, unpacking tool output from its text envelope.
fn print_response(response: &MessageResponse) -> eyre::Result<()> {
    println!("\n← Response received:");

    if let Some(text) = response
        .result
        .as_ref()
        .and_then(|result| result["content"][0]["text"].as_str())
    {
        match serde_json::from_str::<Value>(text) {
            Ok(payload) => println!("{}", serde_json::to_string_pretty(&payload)?),
            Err(_) => println!("{}", text),
        }
        if response.result.as_ref().and_then(|r| r["isError"].as_bool()) == Some(true) {
            println!("\n⚠️  The tool reported an error.");
        }
        return Ok(());
    }

    if let Some(reply) = &response.response {
        println!("Assistant: {}", reply);
        return Ok(());
    }

    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(())
}
