//! Shapes the core consumes from its collaborators.
//!
//! The document pipeline, bank providers and the certificate store live
//! outside the engine; these are the contracts they must satisfy.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Extracted document data handed in by the document pipeline for posting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentData {
    pub document_id: Option<i32>,
    pub supplier_name: String,
    pub invoice_number: String,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub total_amount: Decimal,
    pub vat_amount: Option<Decimal>,
    pub net_amount: Option<Decimal>,
    pub currency: String,
    pub matched_party_id: Option<i32>,
    pub matched_open_item_id: Option<i32>,
}

/// One bank transaction in the normalized shape the importer consumes.
/// The column-mapping layer (CSV profiles, PSD2 adapters) produces these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBankTransaction {
    pub booking_date: NaiveDate,
    pub amount: Decimal,
    pub currency: String,
    pub counterparty_name: Option<String>,
    pub counterparty_iban: Option<String>,
    pub description: String,
    pub reference: Option<String>,
}

/// A source of normalized bank transactions (statement file, PSD2 feed).
#[async_trait]
pub trait BankFeed: Send + Sync {
    async fn fetch_transactions(
        &self,
        iban: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<NormalizedBankTransaction>>;
}

/// Certificate material resolved by the store. The core checks the validity
/// window and requests signatures; private keys never cross this boundary
/// in any other way.
#[derive(Debug, Clone)]
pub struct CertificateMaterial {
    pub subject: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

#[async_trait]
pub trait CertificateStore: Send + Sync {
    async fn resolve(&self, reference: &str) -> anyhow::Result<CertificateMaterial>;

    /// Sign a submission payload with the referenced certificate.
    async fn sign(&self, reference: &str, payload: &[u8]) -> anyhow::Result<Vec<u8>>;
}
