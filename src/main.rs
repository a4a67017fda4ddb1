use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    gh_invoicer::app::run().await
}
