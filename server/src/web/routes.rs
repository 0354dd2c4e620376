// crm_server/src/web/routes.rs

use actix_web::web;

use crate::web::handlers::{customer_handlers, health_handlers, order_handlers, product_handlers, query_handlers};

// Called from `main.rs` and from the HTTP tests to mount every service.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_handlers::health_check_handler))
      // Filtered, cursor-paginated listing for any entity kind. Must stay
      // ahead of the entity scopes.
      .route("/{kind}/query", web::post().to(query_handlers::query_handler))
      .service(
        web::scope("/customers")
          .route("", web::post().to(customer_handlers::create_customer_handler))
          .route("/bulk", web::post().to(customer_handlers::bulk_create_customers_handler))
          .route("/{customer_id}", web::get().to(customer_handlers::get_customer_handler)),
      )
      .service(web::scope("/products").route("", web::post().to(product_handlers::create_product_handler)))
      .service(
        web::scope("/orders")
          .route("", web::post().to(order_handlers::create_order_handler))
          .route("/{order_id}/totals", web::get().to(order_handlers::order_totals_handler)),
      ),
  );
}
