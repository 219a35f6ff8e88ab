use std::collections::BTreeMap;

use chrono::{FixedOffset, Utc};
use serde::Serialize;

use super::hmac_sha512_hex;
use crate::config::VnPayConfig;

/// Query-string builder/verifier for the VNPay redirect flow. Parameters are
/// kept byte-ordered (VNPay signs the sorted, URL-encoded query).
#[derive(Debug, Default)]
pub struct VnPayParams {
    data: BTreeMap<String, String>,
}

fn url_encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

impl VnPayParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_query(query: &BTreeMap<String, String>) -> Self {
        let mut params = Self::new();
        for (key, value) in query {
            params.add(key, value);
        }
        params
    }

    /// Empty values are dropped, matching the gateway contract.
    pub fn add(&mut self, key: &str, value: &str) -> &mut Self {
        if !value.is_empty() {
            self.data.insert(key.to_string(), value.to_string());
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    fn sign_data(&self) -> String {
        self.data
            .iter()
            .filter(|(key, value)| {
                !value.is_empty() && key.as_str() != "vnp_SecureHash" && key.as_str() != "vnp_SecureHashType"
            })
            .map(|(key, value)| format!("{}={}", url_encode(key), url_encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Full redirect URL: sorted encoded query plus the trailing
    /// `vnp_SecureHash` computed over that query.
    pub fn build_payment_url(&self, base_url: &str, hash_secret: &str) -> String {
        let query = self.sign_data();
        let secure_hash = hmac_sha512_hex(hash_secret, &query);
        format!("{base_url}?{query}&vnp_SecureHash={secure_hash}")
    }

    /// Verify a callback (return/IPN): recompute the HMAC over all received
    /// params except the hash fields themselves.
    pub fn validate_signature(&self, received_hash: &str, hash_secret: &str) -> bool {
        let expected = hmac_sha512_hex(hash_secret, &self.sign_data());
        expected.eq_ignore_ascii_case(received_hash)
    }
}

/// VNPay timestamps are local to UTC+7 (Indochina Time), `yyyyMMddHHmmss`.
pub fn vnpay_timestamp() -> String {
    let tz = FixedOffset::east_opt(7 * 3600).expect("valid fixed offset");
    Utc::now().with_timezone(&tz).format("%Y%m%d%H%M%S").to_string()
}

/// Build the create-payment redirect URL for a booking.
pub fn build_payment_request(
    config: &VnPayConfig,
    amount_vnd: i64,
    txn_ref: &str,
    client_ip: &str,
) -> String {
    let mut params = VnPayParams::new();
    params
        .add("vnp_Version", &config.version)
        .add("vnp_Command", &config.command)
        .add("vnp_TmnCode", &config.tmn_code)
        .add("vnp_Amount", &(amount_vnd * 100).to_string())
        .add("vnp_CreateDate", &vnpay_timestamp())
        .add("vnp_CurrCode", &config.curr_code)
        .add("vnp_IpAddr", client_ip)
        .add("vnp_Locale", &config.locale)
        .add("vnp_OrderInfo", "THANH TOAN HOA DON DAT LICH KHAM")
        .add("vnp_OrderType", "270001")
        .add("vnp_ReturnUrl", &config.return_url)
        .add("vnp_TxnRef", txn_ref);

    params.build_payment_url(&config.base_url, &config.hash_secret)
}

/// IPN acknowledgement body; codes follow the VNPay IPN contract.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct VnPayIpnResponse {
    #[serde(rename = "RspCode")]
    pub rsp_code: &'static str,
    #[serde(rename = "Message")]
    pub message: &'static str,
}

impl VnPayIpnResponse {
    pub const CONFIRM_SUCCESS: Self = Self::new("00", "Confirm success");
    pub const ORDER_NOT_FOUND: Self = Self::new("01", "Order not found");
    pub const ALREADY_CONFIRMED: Self = Self::new("02", "Order already confirmed");
    pub const INVALID_AMOUNT: Self = Self::new("04", "Invalid amount");
    pub const INVALID_SIGNATURE: Self = Self::new("97", "Invalid signature");
    pub const INPUT_ERROR: Self = Self::new("99", "Input required data");

    const fn new(rsp_code: &'static str, message: &'static str) -> Self {
        Self { rsp_code, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> VnPayConfig {
        VnPayConfig {
            base_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".to_string(),
            return_url: "https://shop.example/return".to_string(),
            tmn_code: "TESTCODE".to_string(),
            hash_secret: "TESTSECRET".to_string(),
            version: "2.1.0".to_string(),
            command: "pay".to_string(),
            curr_code: "VND".to_string(),
            locale: "vn".to_string(),
        }
    }

    #[test]
    fn params_are_sorted_and_encoded() {
        let mut params = VnPayParams::new();
        params
            .add("vnp_TxnRef", "abc_1")
            .add("vnp_Amount", "1000000")
            .add("vnp_OrderInfo", "THANH TOAN HOA DON");

        let data = params.sign_data();
        assert_eq!(
            data,
            "vnp_Amount=1000000&vnp_OrderInfo=THANH+TOAN+HOA+DON&vnp_TxnRef=abc_1"
        );
    }

    #[test]
    fn empty_values_are_dropped() {
        let mut params = VnPayParams::new();
        params.add("vnp_Locale", "").add("vnp_Amount", "100");
        assert_eq!(params.sign_data(), "vnp_Amount=100");
    }

    #[test]
    fn signature_round_trip() {
        let mut params = VnPayParams::new();
        params.add("vnp_Amount", "5000000").add("vnp_TxnRef", "id_1");
        let url = params.build_payment_url("https://gw.example/pay", "secret");

        let hash = url.split("vnp_SecureHash=").nth(1).unwrap().to_string();

        // The gateway echoes the params plus the hash back to us.
        let mut echo = BTreeMap::new();
        echo.insert("vnp_Amount".to_string(), "5000000".to_string());
        echo.insert("vnp_TxnRef".to_string(), "id_1".to_string());
        echo.insert("vnp_SecureHash".to_string(), hash.clone());
        echo.insert("vnp_SecureHashType".to_string(), "HMACSHA512".to_string());

        let received = VnPayParams::from_query(&echo);
        assert!(received.validate_signature(&hash, "secret"));
        assert!(received.validate_signature(&hash.to_uppercase(), "secret"));
        assert!(!received.validate_signature(&hash, "other-secret"));
    }

    #[test]
    fn tampered_amount_fails_validation() {
        let mut params = VnPayParams::new();
        params.add("vnp_Amount", "5000000").add("vnp_TxnRef", "id_1");
        let url = params.build_payment_url("https://gw.example/pay", "secret");
        let hash = url.split("vnp_SecureHash=").nth(1).unwrap().to_string();

        let mut echo = BTreeMap::new();
        echo.insert("vnp_Amount".to_string(), "1".to_string());
        echo.insert("vnp_TxnRef".to_string(), "id_1".to_string());

        assert!(!VnPayParams::from_query(&echo).validate_signature(&hash, "secret"));
    }

    #[test]
    fn payment_url_carries_required_fields() {
        let url = build_payment_request(&test_config(), 150_000, "booking_1", "127.0.0.1");

        assert!(url.starts_with("https://sandbox.vnpayment.vn/paymentv2/vpcpay.html?"));
        assert!(url.contains("vnp_Amount=15000000"));
        assert!(url.contains("vnp_TmnCode=TESTCODE"));
        assert!(url.contains("vnp_TxnRef=booking_1"));
        assert!(url.contains("vnp_SecureHash="));
    }

    #[test]
    fn timestamp_shape() {
        let ts = vnpay_timestamp();
        assert_eq!(ts.len(), 14);
        assert!(ts.chars().all(|c| c.is_ascii_digit()));
    }
}
