pub mod auth_middleware;
pub mod security_headers;
