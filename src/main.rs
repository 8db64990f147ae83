use komikita_api::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let subscriber = get_subscriber("komikita-api".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber)?;
    std::panic::set_hook(Box::new(tracing_panic::panic_hook));

    komikita_api::run().await
}
