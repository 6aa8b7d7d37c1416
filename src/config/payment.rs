//! Payment provider configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentConfig {
    /// Stripe API key
    pub stripe_api_key: String,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,

    /// Price ID for the Basic plan, monthly cadence
    pub price_basic_month: Option<String>,

    /// Price ID for the Basic plan, yearly cadence
    pub price_basic_year: Option<String>,

    /// Price ID for the Pro plan, monthly cadence
    pub price_pro_month: Option<String>,

    /// Price ID for the Pro plan, yearly cadence
    pub price_pro_year: Option<String>,

    /// Reject test-mode webhook events (enable in production)
    #[serde(default)]
    pub require_livemode: bool,
}

impl PaymentConfig {
    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.stripe_api_key.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_API_KEY"));
        }
        if self.stripe_webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"));
        }

        // Verify key prefixes for safety
        if !self.stripe_api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.stripe_webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }

        if self.price_basic_month.is_none()
            && self.price_basic_year.is_none()
            && self.price_pro_month.is_none()
            && self.price_pro_year.is_none()
        {
            return Err(ValidationError::EmptyPriceTable);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: "sk_test_abcd1234".to_string(),
            stripe_webhook_secret: "whsec_xyz789".to_string(),
            price_pro_month: Some("price_pro_m".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn missing_api_key_is_rejected() {
        let config = PaymentConfig::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_webhook_secret_is_rejected() {
        let config = PaymentConfig {
            stripe_webhook_secret: String::new(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::MissingRequired("STRIPE_WEBHOOK_SECRET"))
        ));
    }

    #[test]
    fn wrong_api_key_prefix_is_rejected() {
        let config = PaymentConfig {
            stripe_api_key: "pk_test_xxx".to_string(),
            ..valid_config()
        };
        assert!(matches!(config.validate(), Err(ValidationError::InvalidStripeKey)));
    }

    #[test]
    fn wrong_webhook_secret_prefix_is_rejected() {
        let config = PaymentConfig {
            stripe_webhook_secret: "secret_xxx".to_string(),
            ..valid_config()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        ));
    }

    #[test]
    fn empty_price_table_is_rejected() {
        let config = PaymentConfig {
            price_pro_month: None,
            ..valid_config()
        };
        assert!(matches!(config.validate(), Err(ValidationError::EmptyPriceTable)));
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }
}
