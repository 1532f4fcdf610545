//! Quotation management backend.
//!
//! Stores sales quotations with tiered part pricing, enforces the quotation
//! status lifecycle, renders price tables, generates PDFs from a Google Docs
//! template and serves a cached currency conversion rate.

pub mod app;
pub mod config;
pub mod dto;
pub mod handler;
pub mod middlewares;
pub mod model;
pub mod repository;
pub mod router;
pub mod service;
pub mod util;
