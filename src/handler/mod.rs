pub mod currency_handler;
pub mod health_handler;
pub mod quotation_handler;
