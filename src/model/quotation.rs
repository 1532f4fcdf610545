use bson::{doc, oid::ObjectId, Document};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::model::quote_status::QuoteStatus;

/// Currency a quotation is priced in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "INR")]
    Inr,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Inr => "INR",
            Currency::Usd => "USD",
        }
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INR" => Ok(Currency::Inr),
            "USD" => Ok(Currency::Usd),
            other => Err(format!("Unsupported currency: {}", other)),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A (quantity, unit price) breakpoint of a part.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceTier {
    pub quantity: f64,
    pub price: f64,
}

/// A line item of a quotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    pub part_name: String,
    pub moq: u32,
    #[serde(default)]
    pub price_quantities: Vec<PriceTier>,
}

impl Part {
    /// Price of the first tier whose quantity equals `quantity` exactly.
    pub fn price_at(&self, quantity: f64) -> Option<f64> {
        self.price_quantities
            .iter()
            .find(|tier| tier.quantity == quantity)
            .map(|tier| tier.price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quotation {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    /// Caller-supplied business identifier (`Q-...`), not unique.
    #[serde(rename = "id")]
    pub quote_id: String,
    pub client_name: String,
    /// Unique across all quotations, immutable after creation.
    pub quote_number: String,
    pub currency: Currency,
    pub valid_until: String,
    #[serde(default)]
    pub status: QuoteStatus,
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Field set applied by a full-field update.
///
/// Has no `quote_number` (immutable) and no `status` (changed only through a
/// lifecycle transition).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotationUpdate {
    #[serde(rename = "id", skip_serializing_if = "Option::is_none")]
    pub quote_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<Part>>,
}

impl QuotationUpdate {
    /// `$set` body for this update, stamped with `updated_at`.
    pub fn to_set_document(&self, updated_at: &str) -> Result<Document, bson::ser::Error> {
        let mut set = bson::to_document(self)?;
        set.insert("updatedAt", updated_at);
        Ok(set)
    }

    pub fn apply_to(&self, quotation: &mut Quotation) {
        if let Some(quote_id) = &self.quote_id {
            quotation.quote_id = quote_id.clone();
        }
        if let Some(client_name) = &self.client_name {
            quotation.client_name = client_name.clone();
        }
        if let Some(currency) = self.currency {
            quotation.currency = currency;
        }
        if let Some(valid_until) = &self.valid_until {
            quotation.valid_until = valid_until.clone();
        }
        if let Some(parts) = &self.parts {
            quotation.parts = parts.clone();
        }
    }
}

/// Listing filter: exact status and case-insensitive client name pattern.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuotationFilter {
    pub status: Option<QuoteStatus>,
    pub client_name: Option<String>,
}

impl QuotationFilter {
    pub fn to_document(&self) -> Document {
        let mut filter = Document::new();
        if let Some(status) = self.status {
            filter.insert("status", status.as_str());
        }
        if let Some(client_name) = &self.client_name {
            filter.insert("clientName", doc! { "$regex": client_name, "$options": "i" });
        }
        filter
    }
}
