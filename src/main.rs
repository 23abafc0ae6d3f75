use anyhow::Context;
use bookstore_app::Application;
use bookstore_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookstore settings")?;

    bookstore_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.display_target(),
        "bookstore-app bootstrap starting"
    );

    Application::build(settings).await?.run().await
}
