use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    geyser_ingest_indexer::run().await?;
    Ok(())
}
