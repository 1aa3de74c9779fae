#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ar_cli::run().await
}
