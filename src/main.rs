use anyhow::Context;
use axum::{
    extract::State,
    http::{HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use clap::Parser;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use table_rest::api;
use table_rest::config::{self, AppConfig};
use table_rest::database::{catalog, manager, PgExecutor};
use table_rest::resource::ResourceSpec;

#[derive(Parser)]
#[command(name = "table-rest")]
#[command(about = "Serve every table of a PostgreSQL schema as a REST resource")]
#[command(version)]
struct Args {
    #[arg(long, help = "Port to listen on (overrides API_PORT)")]
    port: Option<u16>,

    #[arg(long, value_delimiter = ',', help = "Only serve these tables")]
    tables: Vec<String>,

    #[arg(long, help = "Column driving the /R/active route (overrides API_ACTIVE_COLUMN)")]
    active_column: Option<String>,

    #[arg(long, help = "Print the discovered routes and exit")]
    list_routes: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so DATABASE_URL and friends are picked up
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = apply_args(config::config().clone(), &args);
    tracing::info!("Starting table-rest in {:?} mode", config.environment);

    let pool = manager::connect(&config.database).await.context("failed to connect to database")?;
    let executor = Arc::new(PgExecutor::new(pool.clone(), config.database.enable_query_logging));

    let tables = executor.describe_tables().await.context("failed to read catalog")?;
    let specs = catalog::resource_specs(
        &tables,
        &config.api.active_column,
        &config.api.primary_keys,
        &config.api.tables,
    );

    if args.list_routes {
        for spec in &specs {
            print_routes(spec);
        }
        return Ok(());
    }

    let resources = api::mount(&specs, executor, &config.filter);
    let app = app(&config, pool, resources, &specs);

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Serving {} resources on http://{}", specs.len(), bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}

fn apply_args(mut config: AppConfig, args: &Args) -> AppConfig {
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if !args.tables.is_empty() {
        config.api.tables = args.tables.clone();
    }
    if let Some(column) = &args.active_column {
        config.api.active_column = column.to_lowercase();
    }
    config
}

fn app(config: &AppConfig, pool: PgPool, resources: Router, specs: &[ResourceSpec]) -> Router {
    let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
    let index = json!({
        "success": true,
        "data": {
            "name": "table-rest",
            "version": env!("CARGO_PKG_VERSION"),
            "resources": names,
        }
    });

    let mut app = Router::new()
        .route(
            "/",
            get(move || {
                let index = index.clone();
                async move { Json(index) }
            }),
        )
        .route("/health", get(health).with_state(pool))
        .merge(resources);

    if config.security.enable_cors {
        if table_rest::is_production!() && config.security.cors_origins.is_empty() {
            tracing::warn!("No CORS origins configured in production; allowing any origin");
        }
        app = app.layer(cors(&config.security.cors_origins));
    }
    if config.api.enable_request_logging {
        app = app.layer(TraceLayer::new_for_http());
    }
    app
}

fn cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn health(State(pool): State<PgPool>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match manager::health_check(&pool).await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}

fn print_routes(spec: &ResourceSpec) {
    let base = format!("/{}", spec.name);
    println!("{} ({})", base, spec.table);
    println!("  GET    {}", base);
    if spec.active_column.is_some() {
        println!("  GET    {}/active", base);
    }
    let id_route = spec.id_route();
    if let Some(id) = &id_route {
        println!("  GET    {}{}", base, id);
    }
    if spec.writable {
        println!("  POST   {}", base);
        if let Some(id) = &id_route {
            println!("  PUT    {}{}", base, id);
            println!("  DELETE {}{}", base, id);
        }
    }
}
