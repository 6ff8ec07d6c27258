use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

use hrm_attendance::attendance::store::MySqlAttendanceStore;
use hrm_attendance::config::Config;
use hrm_attendance::db::init_db;
use hrm_attendance::directory::{CachedEmployeeDirectory, MySqlEmployeeDirectory};
use hrm_attendance::docs::ApiDoc;
use hrm_attendance::routes;
use hrm_attendance::state::AppState;

use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi; // needed for ApiDoc::openapi()
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Attendance service is running"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await?;

    let store = Arc::new(MySqlAttendanceStore::new(pool.clone()));
    let directory = Arc::new(CachedEmployeeDirectory::new(
        MySqlEmployeeDirectory::new(pool),
        config.directory_cache_ttl,
    ));
    let state = Data::new(AppState::new(
        store,
        directory,
        config.day_boundary,
        config.read_retry,
        config.limits,
    ));
    let limiter = Arc::new(routes::build_limiter(config.rate_protected_per_min)?);

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);

    info!(addr = %server_addr, "Listening");

    HttpServer::new(move || {
        let api_prefix = config_data.api_prefix.clone();
        let limiter = limiter.clone();
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard {_:.*} so the UI's JS/CSS files match
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(config_data.clone())
            .app_data(state.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &api_prefix, limiter))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
