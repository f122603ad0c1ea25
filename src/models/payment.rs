use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr, PickFirst};

/// Gateway checkout sessions expire after this many seconds.
pub const EXPIRE_AFTER_SECONDS: u32 = 320;
pub const PAYMENT_FLOW_TYPE: &str = "PG_CHECKOUT";
pub const DEFAULT_FLOW_MESSAGE: &str = "Test Payment";

// Inbound: POST /api/payment
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    /// Accepts `"9999999999"` or `9999999999`.
    #[serde(default, deserialize_with = "string_or_number")]
    pub mobile_number: Option<String>,
    /// Major units. Accepts `10`, `10.5` or `"10"`.
    #[serde_as(as = "Option<PickFirst<(_, DisplayFromStr)>>")]
    pub amount: Option<f64>,
    pub product_name: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::invalid_type(
            de::Unexpected::Other(&other.to_string()),
            &"a string or a number",
        )),
    }
}

/// Finite, non-zero and small enough that `to_minor_units` cannot saturate.
fn is_valid_amount(amount: f64) -> bool {
    amount.is_finite() && amount != 0.0 && (amount * 100.0).abs() < i64::MAX as f64
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

impl PaymentForm {
    /// Required fields that are absent, blank, or (for amount) zero or not
    /// a representable number.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if is_blank(&self.first_name) {
            missing.push("firstName");
        }
        if is_blank(&self.last_name) {
            missing.push("lastName");
        }
        if is_blank(&self.email) {
            missing.push("email");
        }
        if is_blank(&self.mobile_number) {
            missing.push("mobileNumber");
        }
        match self.amount {
            Some(amount) if is_valid_amount(amount) => {}
            _ => missing.push("amount"),
        }
        missing
    }

    pub fn full_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        )
    }
}

/// Major units to the minor units the gateway expects (× 100).
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Minor units back to major units (÷ 100).
pub fn to_major_units(amount_minor_units: i64) -> f64 {
    amount_minor_units as f64 / 100.0
}

// Outbound: PhonePe create payment
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub merchant_order_id: String,
    pub amount: i64,
    pub expire_after: u32,
    pub meta_info: MetaInfo,
    pub payment_flow: PaymentFlow,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetaInfo {
    pub merchant_user_id: String,
    pub full_name: String,
    pub mobile_number: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFlow {
    #[serde(rename = "type")]
    pub flow_type: String,
    pub message: String,
    pub merchant_urls: MerchantUrls,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MerchantUrls {
    pub redirect_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentResponse {
    pub order_id: Option<String>,
    pub state: Option<String>,
    pub redirect_url: Option<String>,
}

// Outbound response: POST /api/payment
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInitiated {
    pub success: bool,
    pub redirect_url: Option<String>,
    pub merchant_order_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentState {
    Pending,
    Completed,
    Failed,
    #[serde(other)]
    Other,
}

/// PhonePe order status. Only the fields the relay reads are modelled.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    pub state: Option<PaymentState>,
    /// Minor units.
    pub amount: Option<i64>,
}

/// What a status lookup resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusOutcome {
    Completed { redirect_url: String },
    Failed { redirect_url: String },
    Pending,
}

// Inbound: POST /api/callback
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CallbackEvent {
    pub event: String,
    pub payload: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_form() -> PaymentForm {
        serde_json::from_value(json!({
            "firstName": "A",
            "lastName": "B",
            "email": "a@b.com",
            "mobileNumber": "999",
            "amount": 10
        }))
        .unwrap()
    }

    #[test]
    fn test_complete_form_has_no_missing_fields() {
        let form = complete_form();
        assert!(form.missing_fields().is_empty());
        assert_eq!(form.full_name(), "A B");
    }

    #[test]
    fn test_amount_accepts_numeric_string() {
        let form: PaymentForm = serde_json::from_value(json!({ "amount": "12.5" })).unwrap();
        assert_eq!(form.amount, Some(12.5));
    }

    #[test]
    fn test_zero_amount_and_blank_names_are_missing() {
        let form: PaymentForm = serde_json::from_value(json!({
            "firstName": " ",
            "lastName": "B",
            "email": "a@b.com",
            "mobileNumber": "999",
            "amount": 0
        }))
        .unwrap();
        assert_eq!(form.missing_fields(), vec!["firstName", "amount"]);
    }

    #[test]
    fn test_non_finite_or_huge_amount_is_missing() {
        for amount in [json!("inf"), json!("-inf"), json!("NaN"), json!(1e300), json!("1e17")] {
            let mut body = json!({
                "firstName": "A",
                "lastName": "B",
                "email": "a@b.com",
                "mobileNumber": "999"
            });
            body["amount"] = amount.clone();
            let form: PaymentForm = serde_json::from_value(body).unwrap();
            assert_eq!(form.missing_fields(), vec!["amount"], "amount {}", amount);
        }
    }

    #[test]
    fn test_mobile_number_accepts_number() {
        let form: PaymentForm =
            serde_json::from_value(json!({ "mobileNumber": 9999999999u64 })).unwrap();
        assert_eq!(form.mobile_number.as_deref(), Some("9999999999"));

        let form: PaymentForm = serde_json::from_value(json!({ "mobileNumber": null })).unwrap();
        assert_eq!(form.mobile_number, None);

        assert!(serde_json::from_value::<PaymentForm>(json!({ "mobileNumber": [1] })).is_err());
    }

    #[test]
    fn test_empty_form_reports_every_field() {
        assert_eq!(
            PaymentForm::default().missing_fields(),
            vec!["firstName", "lastName", "email", "mobileNumber", "amount"]
        );
    }

    #[test]
    fn test_unit_conversion() {
        assert_eq!(to_minor_units(10.0), 1000);
        assert_eq!(to_minor_units(19.99), 1999);
        assert_eq!(to_major_units(1000), 10.0);
        assert_eq!(to_major_units(1050), 10.5);
    }

    #[test]
    fn test_payment_request_wire_shape() {
        let request = PaymentRequest {
            merchant_order_id: "ORD1".to_string(),
            amount: 1000,
            expire_after: EXPIRE_AFTER_SECONDS,
            meta_info: MetaInfo {
                merchant_user_id: "MUID2345".to_string(),
                full_name: "A B".to_string(),
                mobile_number: "999".to_string(),
                email: "a@b.com".to_string(),
            },
            payment_flow: PaymentFlow {
                flow_type: PAYMENT_FLOW_TYPE.to_string(),
                message: DEFAULT_FLOW_MESSAGE.to_string(),
                merchant_urls: MerchantUrls {
                    redirect_url: "http://localhost:5000/api/redirect/ORD1".to_string(),
                },
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["merchantOrderId"], "ORD1");
        assert_eq!(value["expireAfter"], 320);
        assert_eq!(value["metaInfo"]["merchantUserId"], "MUID2345");
        assert_eq!(value["paymentFlow"]["type"], "PG_CHECKOUT");
        assert_eq!(
            value["paymentFlow"]["merchantUrls"]["redirectUrl"],
            "http://localhost:5000/api/redirect/ORD1"
        );
    }

    #[test]
    fn test_unknown_state_parses_as_other() {
        let status: OrderStatusResponse =
            serde_json::from_value(json!({ "state": "CANCELLED", "amount": 100 })).unwrap();
        assert_eq!(status.state, Some(PaymentState::Other));

        let status: OrderStatusResponse = serde_json::from_value(json!({ "amount": 100 })).unwrap();
        assert_eq!(status.state, None);
    }
}
