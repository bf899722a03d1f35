//! Payment Application Service
//!
//! Opens checkout orders with the payment gateway and settles verified
//! payments exactly once.

use std::sync::Arc;

use chrono::Utc;
use rand::distr::{Alphanumeric, SampleString};

use legal_repo::security::verify_payment_signature;
use legal_types::{
    AccountId, AccountStore, AppError, CreateOrderResponse, Currency, GatewayError, Money,
    OrderNotes, OrderRequest, PaymentGateway, PaymentKind, PaymentRecord, VerifyPaymentRequest,
    VerifyPaymentResponse,
};

use super::require_fields;

/// Pricing and credentials for payments.
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    /// Gateway API secret, also the signature key
    pub key_secret: String,
    pub currency: Currency,
    /// Subscription price in minor units
    pub subscription_price: i64,
    /// Consultation charge in major units for lawyers without their own
    pub default_consultation_charge: i64,
}

/// Application service for payment operations.
pub struct PaymentService<R: AccountStore> {
    repo: Arc<R>,
    gateway: Arc<dyn PaymentGateway>,
    settings: PaymentSettings,
}

impl<R: AccountStore> PaymentService<R> {
    pub fn new(repo: Arc<R>, gateway: Arc<dyn PaymentGateway>, settings: PaymentSettings) -> Self {
        Self {
            repo,
            gateway,
            settings,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Order Creation
    // ─────────────────────────────────────────────────────────────────────────────

    /// Opens an order for the PREMIUM subscription.
    pub async fn create_subscription_order(
        &self,
        payer: AccountId,
    ) -> Result<CreateOrderResponse, AppError> {
        self.repo
            .find_account_by_id(payer)
            .await?
            .ok_or_else(|| AppError::AccountNotFound(payer.to_string()))?;

        let amount = Money::new(self.settings.subscription_price, self.settings.currency)?;
        self.open_order(payer, PaymentKind::Subscription, amount)
            .await
    }

    /// Opens an order for a consultation with the lawyer `target`.
    pub async fn create_consultation_order(
        &self,
        payer: AccountId,
        target: &str,
    ) -> Result<CreateOrderResponse, AppError> {
        let not_found = || AppError::AccountNotFound(target.to_string());

        let lawyer_id: AccountId = target.parse().map_err(|_| not_found())?;
        let lawyer = self
            .repo
            .find_account_by_id(lawyer_id)
            .await?
            .filter(|account| account.is_lawyer())
            .ok_or_else(not_found)?;

        let charge = self
            .repo
            .find_lawyer_profile(lawyer.id)
            .await?
            .map_or(self.settings.default_consultation_charge, |profile| {
                profile.consultation_charge(self.settings.default_consultation_charge)
            });
        let amount = Money::from_major(charge, self.settings.currency)?;

        self.open_order(payer, PaymentKind::Consultation { payee: lawyer.id }, amount)
            .await
    }

    async fn open_order(
        &self,
        payer: AccountId,
        kind: PaymentKind,
        amount: Money,
    ) -> Result<CreateOrderResponse, AppError> {
        let request = OrderRequest {
            amount,
            receipt: receipt_token(),
            notes: OrderNotes { payer, kind },
        };

        let order = self
            .gateway
            .create_order(&request)
            .await
            .map_err(upstream)?;

        tracing::info!(order_id = %order.id, %payer, purpose = %kind.purpose(), %amount, "Order created");

        Ok(CreateOrderResponse {
            success: true,
            order_id: order.id,
            amount: order.amount.amount(),
            currency: order.amount.currency(),
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Verification
    // ─────────────────────────────────────────────────────────────────────────────

    /// Verifies a checkout confirmation and applies its effect once.
    pub async fn verify(
        &self,
        payer: AccountId,
        req: VerifyPaymentRequest,
    ) -> Result<VerifyPaymentResponse, AppError> {
        let order_id = req.razorpay_order_id.unwrap_or_default();
        let payment_id = req.razorpay_payment_id.unwrap_or_default();
        let signature = req.razorpay_signature.unwrap_or_default();

        require_fields(&[
            ("razorpay_order_id", &order_id),
            ("razorpay_payment_id", &payment_id),
            ("razorpay_signature", &signature),
        ])?;

        if !verify_payment_signature(&order_id, &payment_id, &signature, &self.settings.key_secret)
        {
            tracing::warn!(%order_id, %payment_id, "Payment signature mismatch");
            return Err(AppError::InvalidSignature);
        }

        if let Some(existing) = self.repo.find_payment_by_gateway_id(&payment_id).await? {
            if existing.sender_id != payer {
                return Err(AppError::Forbidden(
                    "Payment belongs to another account".into(),
                ));
            }
            return Ok(replayed(payment_id));
        }

        let order = self
            .gateway
            .fetch_order(&order_id)
            .await
            .map_err(upstream)?;
        let notes = order
            .notes
            .ok_or_else(|| AppError::BadRequest("Invalid order details".into()))?;

        if notes.payer != payer {
            return Err(AppError::Forbidden(
                "Payment belongs to another account".into(),
            ));
        }

        let record =
            PaymentRecord::settled(payer, notes.kind, order.amount, order_id, payment_id.clone());
        let settlement = self.repo.settle_payment(record).await?;

        if settlement.replayed {
            return Ok(replayed(payment_id));
        }

        tracing::info!(
            %payment_id,
            %payer,
            purpose = %settlement.record.purpose,
            amount = %settlement.record.amount,
            "Payment settled"
        );

        let message = match notes.kind {
            PaymentKind::Subscription => "Subscription activated",
            PaymentKind::Consultation { .. } => "Consultation booked",
        };

        Ok(VerifyPaymentResponse {
            success: true,
            message: message.into(),
            payment_id,
            replayed: false,
        })
    }
}

fn replayed(payment_id: String) -> VerifyPaymentResponse {
    tracing::info!(%payment_id, "Payment already processed");
    VerifyPaymentResponse {
        success: true,
        message: "Payment already processed".into(),
        payment_id,
        replayed: true,
    }
}

fn upstream(err: GatewayError) -> AppError {
    tracing::error!(error = %err, "Payment gateway call failed");
    AppError::UpstreamPayment(err.to_string())
}

/// Unique receipt token: `rcpt_<millis>_<random>`.
fn receipt_token() -> String {
    format!(
        "rcpt_{}_{}",
        Utc::now().timestamp_millis(),
        Alphanumeric.sample_string(&mut rand::rng(), 8)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receipt_tokens_are_unique() {
        let a = receipt_token();
        let b = receipt_token();

        assert!(a.starts_with("rcpt_"));
        assert_eq!(a.split('_').count(), 3);
        assert_ne!(a, b);
    }
}
