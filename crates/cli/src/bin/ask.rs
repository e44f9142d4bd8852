use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    ask_cli::main_entry().await
}
