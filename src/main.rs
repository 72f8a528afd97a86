use insider::{app, auth::seed::seed_users, state::AppState, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    let state = AppState::init().await?;
    if state.config.seed_users {
        let created = seed_users(state.users.as_ref()).await?;
        tracing::info!(created, "user seeding done");
    }

    app::serve(app::build_app(state)).await
}
