pub mod currency_service;
pub mod lifecycle;
pub mod quotation_service;
