pub mod error;
pub mod exchange_rate;
pub mod google_docs;
pub mod jwt;
pub mod logger;
pub mod price_table;
pub mod uptime;
