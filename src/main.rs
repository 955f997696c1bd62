#[tokio::main]
async fn main() -> anyhow::Result<()> {
    log_sieve::run().await
}
