//! Interpretation of the publisher backend's `/check-balance` payload.
//!
//! The backend answers with one of two shapes:
//! - `{"tokens": 950}` when the balance covered the cost, or
//! - `{"Offers": [...], "ExternalUserID": "..."}` when it did not.
//!
//! Parsing is tolerant: absent or mistyped fields fall back to defaults.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One alternate offer surfaced when the balance is insufficient.
///
/// Well-known keys are typed; everything else is kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    #[serde(rename = "AppID", default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(rename = "AppName", default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    /// Coins granted for completing the offer.
    #[serde(rename = "Coins", default, skip_serializing_if = "Option::is_none")]
    pub coins: Option<i64>,
    /// Opaque token identifying the offer upstream.
    #[serde(rename = "Token", default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(rename = "IsRecommended", default, skip_serializing_if = "Option::is_none")]
    pub is_recommended: Option<bool>,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Offer {
    /// Build an offer from one element of the `Offers` array.
    ///
    /// Objects whose well-known keys carry unexpected types are kept whole in
    /// `extra`. A non-object element is kept under `extra["value"]`.
    pub fn from_value(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            tracing::debug!("Offer entry is not a JSON object; keeping raw");
            let mut extra = Map::new();
            extra.insert("value".to_string(), value.clone());
            return Self {
                extra,
                ..Self::default()
            };
        };
        match serde_json::from_value::<Offer>(value.clone()) {
            Ok(offer) => offer,
            Err(e) => {
                tracing::debug!(error = %e, "Offer has unexpected field types; keeping raw");
                Self {
                    extra: object.clone(),
                    ..Self::default()
                }
            }
        }
    }
}

/// Interpreted balance-check outcome.
///
/// `Default` is the "balance unknown" result: no tokens, no offers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceCheck {
    /// Remaining token balance. `None` when the balance was insufficient or
    /// the service did not report one.
    pub tokens: Option<i64>,
    /// Alternate offers; non-empty only when the balance was insufficient.
    pub offers: Vec<Offer>,
    /// User identifier assigned by the upstream offer provider.
    pub external_user_id: Option<String>,
}

impl BalanceCheck {
    /// Interpret a decoded response body.
    pub fn from_payload(payload: &Value) -> Self {
        let Some(object) = payload.as_object() else {
            tracing::debug!("Balance payload is not a JSON object; treating as empty");
            return Self::default();
        };

        let external_user_id = object
            .get("ExternalUserID")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        let offers: Vec<Offer> = object
            .get("Offers")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(Offer::from_value).collect())
            .unwrap_or_default();

        if !offers.is_empty() {
            return Self {
                tokens: None,
                offers,
                external_user_id,
            };
        }

        Self {
            tokens: object.get("tokens").and_then(Value::as_i64),
            offers,
            external_user_id,
        }
    }

    /// Decode and interpret a raw response body.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        let payload: Value = serde_json::from_slice(body)?;
        Ok(Self::from_payload(&payload))
    }

    /// True when the service reported offers instead of a balance.
    pub fn is_insufficient(&self) -> bool {
        !self.offers.is_empty()
    }

    /// True when nothing usable came back (fallback result).
    pub fn is_unknown(&self) -> bool {
        self.tokens.is_none() && self.offers.is_empty()
    }

    pub fn balance_or_zero(&self) -> i64 {
        self.tokens.unwrap_or(0)
    }
}
