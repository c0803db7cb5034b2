//! Synthetic payment transactions sent by virtual users.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use strum::{Display, EnumIter, EnumString};

use super::IterationContext;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Currency {
    Czk,
    Eur,
}

/// Body of `POST /api/middleware/v1/transaction`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub internal_order_id: String,
    pub amount: u32,
    pub currency_code: Currency,
    pub service_type: String,
    #[serde(with = "iso_millis")]
    pub requested_at: DateTime<Utc>,
}

/// Fixed parts of every generated request plus the ranges the random parts
/// are drawn from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadTemplate {
    pub order_prefix: String,
    pub amount: RangeInclusive<u32>,
    pub currencies: Vec<Currency>,
    pub service_type: String,
}

impl Default for PayloadTemplate {
    fn default() -> Self {
        Self {
            order_prefix: "TEST".to_string(),
            amount: 1..=1000,
            currencies: vec![Currency::Czk, Currency::Eur],
            service_type: "PAYMENT".to_string(),
        }
    }
}

impl PayloadTemplate {
    /// `{prefix}-{unix millis}-{vu}-{iteration}`, unique per VU and iteration.
    pub fn order_id(&self, ctx: &IterationContext) -> String {
        format!(
            "{}-{}-{}-{}",
            self.order_prefix,
            ctx.timestamp.timestamp_millis(),
            ctx.vu_id,
            ctx.iteration
        )
    }

    pub fn build<R: Rng + ?Sized>(&self, ctx: &IterationContext, rng: &mut R) -> TransactionRequest {
        let amount = rng.gen_range(self.amount.clone());
        // currencies is validated non-empty when the config is loaded
        let currency_code = self
            .currencies
            .choose(rng)
            .copied()
            .unwrap_or(Currency::Czk);

        TransactionRequest {
            internal_order_id: self.order_id(ctx),
            amount,
            currency_code,
            service_type: self.service_type.clone(),
            requested_at: ctx.timestamp,
        }
    }
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-05-01T12:00:00.123Z`.
mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(de::Error::custom)
    }
}
