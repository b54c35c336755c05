#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dutchlend_lib::run().await
}
