use std::sync::Arc;
use std::time::Duration;

use passdesk_backend::{
    config::{Config, StoreBackend},
    db::create_pool,
    repositories::{
        InMemoryDirectory, InMemoryRequestStore, PgRecipientDirectory, PgRequestRepository,
        RecipientDirectory, RequestStore,
    },
    routes::build_router,
    services::{
        DisabledTransport, DocumentGenerator, DocumentSettings, FcmTransport,
        NotificationGateway, PushTransport, VerificationService, WorkflowEngine,
    },
    state::AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.len())
}

fn mask_database_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            let _ = parsed.set_password(Some("***"));
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "passdesk_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        database_url = %mask_database_url(&config.database_url),
        store_backend = ?config.store_backend,
        public_base_url = %config.public_base_url,
        documents_dir = %config.documents_dir.display(),
        letterhead_path = %config.letterhead_path.display(),
        time_zone = %config.time_zone,
        leave_max_days = config.leave_max_days,
        push_endpoint = ?config.push_endpoint.as_ref().map(|u| u.as_str()),
        push_access_token = %mask_secret(&config.push_access_token),
        "Loaded configuration from environment/.env"
    );

    let (store, directory): (Arc<dyn RequestStore>, Arc<dyn RecipientDirectory>) =
        match config.store_backend {
            StoreBackend::Postgres => {
                let pool = create_pool(&config.database_url).await?;
                sqlx::migrate!("./migrations").run(&pool).await?;
                (
                    Arc::new(PgRequestRepository::new(pool.clone())),
                    Arc::new(PgRecipientDirectory::new(pool)),
                )
            }
            StoreBackend::Memory => {
                tracing::warn!("using the in-memory store; data is lost on restart");
                (
                    Arc::new(InMemoryRequestStore::new()),
                    Arc::new(InMemoryDirectory::new()),
                )
            }
        };

    let transport: Arc<dyn PushTransport> = match &config.push_endpoint {
        Some(endpoint) => Arc::new(FcmTransport::new(
            endpoint.clone(),
            config.push_access_token.clone(),
            Duration::from_secs(config.push_timeout_secs),
        )?),
        None => {
            tracing::warn!("PUSH_ENDPOINT not set; notifications will be skipped");
            Arc::new(DisabledTransport)
        }
    };

    let notifier = NotificationGateway::new(directory, transport);
    let documents = DocumentGenerator::new(DocumentSettings::from_config(&config));
    let engine = WorkflowEngine::new(
        store.clone(),
        notifier.clone(),
        documents,
        config.leave_max_days,
    );
    let verifier = VerificationService::new(store);

    let app = build_router(AppState::new(engine, verifier, notifier));

    tracing::info!("Server listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
