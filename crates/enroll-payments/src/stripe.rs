//! Stripe Checkout Integration
//!
//! Implements the hosted Stripe Checkout flow for one-time course payments.

use async_trait::async_trait;
use stripe::{
    CheckoutSession as StripeCheckoutSession, CheckoutSessionId, CheckoutSessionMode,
    CheckoutSessionPaymentStatus, Client, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData, CreateCheckoutSessionLineItemsPriceDataProductData,
    Currency, Customer, CustomerId, ListCustomers,
};

use enroll_core::{EnrollError, Result};

use crate::processor::{CreateSessionRequest, CreatedSession, PaymentProcessor, SessionSnapshot};

/// Stripe client wrapper
pub struct StripeClient {
    client: Client,
    webhook_secret: Option<String>,
}

impl StripeClient {
    /// Create a new Stripe client
    pub fn new(secret_key: &str, webhook_secret: Option<String>) -> Self {
        Self {
            client: Client::new(secret_key),
            webhook_secret,
        }
    }

    /// Create from environment variables
    ///
    /// `STRIPE_SECRET_KEY` is required; `STRIPE_WEBHOOK_SECRET` is optional
    /// here and enforced by the server's configuration for production.
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| EnrollError::Config("STRIPE_SECRET_KEY not set".into()))?;
        let webhook_secret = std::env::var("STRIPE_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty());

        Ok(Self::new(&secret_key, webhook_secret))
    }

    /// Get the webhook signing secret, if configured
    pub fn webhook_secret(&self) -> Option<&str> {
        self.webhook_secret.as_deref()
    }
}

fn stripe_error(e: impl ToString) -> EnrollError {
    EnrollError::upstream("stripe", e)
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    async fn find_customer_by_email(&self, email: &str) -> Result<Option<String>> {
        let mut params = ListCustomers::new();
        params.email = Some(email);
        params.limit = Some(1);

        let customers = Customer::list(&self.client, &params)
            .await
            .map_err(stripe_error)?;

        Ok(customers.data.first().map(|c| c.id.to_string()))
    }

    async fn create_session(&self, request: CreateSessionRequest) -> Result<CreatedSession> {
        let customer = request
            .customer_id
            .as_deref()
            .map(str::parse::<CustomerId>)
            .transpose()
            .map_err(|e| EnrollError::InvalidRequest(format!("bad customer id: {e}")))?;

        let mut params = CreateCheckoutSession::new();
        params.success_url = Some(&request.success_url);
        params.cancel_url = Some(&request.cancel_url);
        params.mode = Some(CheckoutSessionMode::Payment);
        params.metadata = Some(request.metadata.clone());

        // Reusing a customer carries its email; Stripe rejects both at once.
        if customer.is_some() {
            params.customer = customer;
        } else {
            params.customer_email = Some(&request.customer_email);
        }

        params.line_items = Some(vec![CreateCheckoutSessionLineItems {
            quantity: Some(1),
            price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                currency: Currency::USD,
                unit_amount: Some(request.line_item.unit_amount),
                product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                    name: request.line_item.name.clone(),
                    description: Some(request.line_item.description.clone()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }]);

        let session = StripeCheckoutSession::create(&self.client, params)
            .await
            .map_err(stripe_error)?;

        let url = session
            .url
            .ok_or_else(|| stripe_error("No checkout URL returned"))?;

        Ok(CreatedSession {
            id: session.id.to_string(),
            url,
        })
    }

    async fn get_session(&self, session_id: &str) -> Result<SessionSnapshot> {
        let id: CheckoutSessionId = session_id
            .parse()
            .map_err(|e| EnrollError::InvalidRequest(format!("bad session id: {e}")))?;

        let session = StripeCheckoutSession::retrieve(&self.client, &id, &[])
            .await
            .map_err(stripe_error)?;

        Ok(SessionSnapshot {
            id: session.id.to_string(),
            paid: session.payment_status == CheckoutSessionPaymentStatus::Paid,
            amount_total: session.amount_total,
            currency: session.currency.map(|c| c.to_string()),
            payment_intent: session.payment_intent.as_ref().map(|pi| pi.id().to_string()),
            metadata: session.metadata.clone().unwrap_or_default(),
        })
    }
}
