use anyhow::Result;
use axum::{Router, routing};
use medimart_server::{app_state::AppState, config, middleware, routes, swagger};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    dotenvy::dotenv().ok();

    let config = config::load()?;
    let port = config.port;
    middleware::init(&config.jwt_secret);

    tracing::info!("Connecting to the database...");
    let state = AppState::init(config).await?;

    let routes = routes::users::routes_with_openapi()
        .merge(routes::medicines::routes_with_openapi())
        .merge(routes::categories::routes_with_openapi())
        .merge(routes::advertisements::routes_with_openapi())
        .merge(routes::payments::routes_with_openapi())
        .merge(routes::carts::routes_with_openapi())
        .merge(routes::orders::routes_with_openapi())
        .merge(routes::reviews::routes_with_openapi())
        .merge(routes::faqs::routes_with_openapi())
        .merge(routes::newsletter::routes_with_openapi())
        .merge(routes::locations::routes_with_openapi());

    let mut openapi = routes.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("MediMart API")
        .version("1.0.0")
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi)?;

    let app = Router::new()
        .merge(routes)
        .merge(swagger_ui)
        .route("/", routing::get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!("MediMart server running on port {port}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> &'static str {
    "Medicine E-commerce Server is Running"
}
