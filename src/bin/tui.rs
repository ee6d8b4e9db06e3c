use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    taskfeed::tui::run().await
}
