pub mod cors;
pub mod middleware;

pub use cors::CorsPolicy;
pub use middleware::security_middleware;
