pub mod health_router;
pub mod quotation_router;
