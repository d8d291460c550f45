pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::error::Error;
use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::{OrderOperations, OrderService};
use domain::delivery::DeliveryEstimator;
use errors::AppError;
use infrastructure::DieselOrderStore;

pub use db::{create_pool, DbPool, PoolOptions};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::orders::place_order,
        handlers::orders::my_orders,
        handlers::orders::get_order,
        handlers::orders::list_orders,
        handlers::orders::update_order_status,
        handlers::orders::cancel_order,
    ),
    components(schemas(
        handlers::orders::CartItemRequest,
        handlers::orders::ShippingInfoDto,
        handlers::orders::PlaceOrderRequest,
        handlers::orders::UpdateStatusRequest,
        handlers::orders::OrderItemResponse,
        handlers::orders::OrderResponse,
        handlers::orders::OrderSummaryResponse,
    )),
    tags((name = "orders", description = "Order placement, history and fulfilment"))
)]
pub struct ApiDoc;

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut conn = pool.get()?;
    for version in conn.run_pending_migrations(MIGRATIONS)? {
        log::info!("Applied migration {}", version);
    }
    Ok(())
}

/// Order service backed by Postgres, with randomized delivery lead times.
pub fn order_service(pool: DbPool) -> Arc<dyn OrderOperations> {
    Arc::new(OrderService::new(
        DieselOrderStore::new(pool),
        DeliveryEstimator::default(),
    ))
}

/// Registers the `/orders` routes. The app must provide
/// `web::Data<dyn OrderOperations>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .service(
        web::scope("/orders")
            .route("", web::post().to(handlers::orders::place_order))
            .route("", web::get().to(handlers::orders::list_orders))
            .route("/myorders", web::get().to(handlers::orders::my_orders))
            .route("/{id}", web::get().to(handlers::orders::get_order))
            .route(
                "/{id}/status",
                web::put().to(handlers::orders::update_order_status),
            )
            .route("/{id}/cancel", web::put().to(handlers::orders::cancel_order)),
    );
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    service: Arc<dyn OrderOperations>,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let openapi = ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::from(service.clone()))
            .wrap(Logger::default())
            .configure(configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_order_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/orders",
            "/orders/myorders",
            "/orders/{id}",
            "/orders/{id}/status",
            "/orders/{id}/cancel",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
