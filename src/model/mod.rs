pub mod quotation;
pub mod quote_status;
