//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::{AppState, Settings};
use crate::middleware::auth::{admin_guard, auth_guard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env()?;
    let app_state = AppState::new(&settings).await?;

    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("Database migrations applied");

    app_state
        .auth_service
        .ensure_admin(
            &app_state.db_pool,
            settings.admin_email.as_deref(),
            settings.admin_password.as_deref(),
        )
        .await?;

    let app = router(app_state);

    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(app_state: AppState) -> Router {
    // Public
    let auth_routes = Router::new().route("/login", post(handlers::auth::login));

    let me_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    // Administration
    let admin_routes = Router::new()
        .route("/users", post(handlers::auth::create_user))
        .route(
            "/customers",
            get(handlers::customers::list_customers).post(handlers::customers::create_customer),
        )
        .route(
            "/customers/{id}",
            get(handlers::customers::get_customer)
                .put(handlers::customers::update_customer)
                .delete(handlers::customers::delete_customer),
        )
        .route(
            "/employees",
            get(handlers::employees::list_employees).post(handlers::employees::create_employee),
        )
        .route(
            "/employees/{id}",
            get(handlers::employees::get_employee)
                .put(handlers::employees::update_employee)
                .delete(handlers::employees::delete_employee),
        )
        .route(
            "/solutions",
            get(handlers::solutions::list_solutions).post(handlers::solutions::create_solution),
        )
        .route(
            "/solutions/{id}",
            get(handlers::solutions::get_solution)
                .put(handlers::solutions::update_solution)
                .delete(handlers::solutions::delete_solution),
        )
        .route("/records", get(handlers::records::list_records))
        .route("/records/export", get(handlers::records::export_records))
        .route("/records/export/email", post(handlers::records::email_records))
        .route("/records/{id}", get(handlers::records::get_record))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), admin_guard));

    // Field work
    let workflow_routes = Router::new()
        .route("/", post(handlers::workflows::start_workflow))
        .route("/catalog/employees", get(handlers::workflows::catalog_employees))
        .route("/catalog/customers", get(handlers::workflows::catalog_customers))
        .route("/catalog/solutions", get(handlers::workflows::catalog_solutions))
        .route(
            "/{id}",
            get(handlers::workflows::get_workflow)
                .patch(handlers::workflows::update_workflow)
                .delete(handlers::workflows::discard_workflow),
        )
        .route("/{id}/next", post(handlers::workflows::next_step))
        .route("/{id}/back", post(handlers::workflows::previous_step))
        .route("/{id}/finish", post(handlers::workflows::finish_workflow))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    let mail_routes = Router::new()
        .route("/send-email", post(handlers::mail::send_email))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", docs::ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/users", me_routes)
        .nest("/api", admin_routes)
        .nest("/api/workflows", workflow_routes)
        .nest("/api/mail", mail_routes)
        .with_state(app_state)
}
