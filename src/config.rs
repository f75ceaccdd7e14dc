// Engine configuration

use crate::pricing::{Adjustments, PricingError, BOOKING_TAX_RATE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    // ISO 4217 code printed on invoice documents
    pub currency: String,
    pub booking_tax_rate: f64,
    // Defaults for the standalone invoice flow, overridable per invoice
    pub default_invoice_tax_rate: f64,
    pub default_discount: f64,
    pub max_stay_nights: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            currency: "USD".to_string(),
            booking_tax_rate: BOOKING_TAX_RATE,
            default_invoice_tax_rate: BOOKING_TAX_RATE,
            default_discount: 0.0,
            max_stay_nights: 90,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ConfigError::InvalidValue {
                field: "currency",
                message: format!("expected a 3-letter ISO code, got '{}'", self.currency),
            });
        }
        if self.max_stay_nights == 0 {
            return Err(ConfigError::InvalidValue {
                field: "maxStayNights",
                message: "must be at least 1".to_string(),
            });
        }
        self.booking_adjustments()
            .map_err(|e| invalid("bookingTaxRate", e))?;
        self.invoice_adjustments(None, None)
            .map_err(|e| invalid("defaultInvoiceTaxRate", e))?;
        Ok(())
    }

    pub fn booking_adjustments(&self) -> Result<Adjustments, PricingError> {
        Adjustments::new(self.booking_tax_rate, 0.0)
    }

    // Adjustments for the standalone invoice flow, falling back to defaults
    pub fn invoice_adjustments(
        &self,
        tax_rate: Option<f64>,
        discount: Option<f64>,
    ) -> Result<Adjustments, PricingError> {
        Adjustments::new(
            tax_rate.unwrap_or(self.default_invoice_tax_rate),
            discount.unwrap_or(self.default_discount),
        )
    }
}

fn invalid(field: &'static str, err: PricingError) -> ConfigError {
    ConfigError::InvalidValue {
        field,
        message: err.to_string(),
    }
}
