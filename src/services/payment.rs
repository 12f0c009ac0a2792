//! Payment gateway integration via its REST API (Razorpay-compatible orders).

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::config::PaymentConfig;
use crate::error::AppError;

#[derive(Debug, Serialize)]
struct CreateOrderBody<'a> {
    /// Minor currency units
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
    notes: OrderNotes<'a>,
}

#[derive(Debug, Serialize)]
struct OrderNotes<'a> {
    booking_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

/// Whole currency units to the minor units the gateway expects.
pub fn to_minor_units(amount: i64) -> i64 {
    amount * 100
}

pub async fn create_order(
    client: &reqwest::Client,
    config: &PaymentConfig,
    amount_minor: i64,
    receipt: &str,
    booking_id: &str,
) -> Result<GatewayOrder, AppError> {
    let body = CreateOrderBody {
        amount: amount_minor,
        currency: &config.currency,
        receipt,
        notes: OrderNotes { booking_id },
    };

    let resp = client
        .post(format!("{}/v1/orders", config.api_base))
        .basic_auth(&config.key_id, Some(&config.key_secret))
        .json(&body)
        .send()
        .await
        .map_err(|e| AppError::Upstream {
            service: "Payment gateway",
            message: e.to_string(),
        })?;

    let status = resp.status();
    if !status.is_success() {
        let detail = resp.text().await.unwrap_or_default();
        return Err(AppError::Upstream {
            service: "Payment gateway",
            message: format!("create order returned {status}: {detail}"),
        });
    }

    resp.json::<GatewayOrder>().await.map_err(|e| AppError::Upstream {
        service: "Payment gateway",
        message: format!("unreadable order response: {e}"),
    })
}

/// Checkout signature: hex `HMAC-SHA256(order_id + "|" + payment_id)` keyed with the API secret.
pub fn verify_payment_signature(order_id: &str, payment_id: &str, signature: &str, secret: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = Hmac::<Sha256>::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(order_id: &str, payment_id: &str, secret: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{order_id}|{payment_id}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn accepts_signature_from_gateway() {
        let sig = sign("order_9A33XWu170gUtm", "pay_29QQoUBi66xm2f", "test_secret");
        assert!(verify_payment_signature(
            "order_9A33XWu170gUtm",
            "pay_29QQoUBi66xm2f",
            &sig,
            "test_secret"
        ));
    }

    #[test]
    fn rejects_tampered_or_malformed_signatures() {
        let sig = sign("order_1", "pay_1", "test_secret");
        assert!(!verify_payment_signature("order_1", "pay_2", &sig, "test_secret"));
        assert!(!verify_payment_signature("order_1", "pay_1", &sig, "other_secret"));
        assert!(!verify_payment_signature("order_1", "pay_1", "not-hex", "test_secret"));
        assert!(!verify_payment_signature("order_1", "pay_1", "", "test_secret"));
    }

    #[test]
    fn amounts_are_sent_in_minor_units() {
        assert_eq!(to_minor_units(12_500), 1_250_000);
    }
}
