#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fleetview::telemetry::init_tracing();
    fleetview::run().await
}
