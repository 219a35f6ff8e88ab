use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::hmac_sha256_hex;
use crate::config::MomoConfig;
use crate::error::ApiError;

pub const REQUEST_TYPE: &str = "captureWallet";
pub const ORDER_INFO: &str = "THANH TOAN HOA DON DAT LICH KHAM";

/// Raw string signed for the create-payment request. Momo requires this
/// exact field order.
pub fn create_raw_signature(
    config: &MomoConfig,
    amount: i64,
    order_id: &str,
    request_id: &str,
) -> String {
    format!(
        "accessKey={}&amount={}&extraData=&ipnUrl={}&orderId={}&orderInfo={}&partnerCode={}&redirectUrl={}&requestId={}&requestType={}",
        config.access_key,
        amount,
        config.ipn_url,
        order_id,
        ORDER_INFO,
        config.partner_code,
        config.return_url,
        request_id,
        REQUEST_TYPE,
    )
}

/// Call the Momo create endpoint and return the `payUrl` to redirect to.
pub async fn create_payment(
    config: &MomoConfig,
    amount: i64,
    order_id: &str,
    request_id: &str,
) -> Result<String, ApiError> {
    let raw = create_raw_signature(config, amount, order_id, request_id);
    let signature = hmac_sha256_hex(&config.secret_key, &raw);

    let body = json!({
        "partnerCode": config.partner_code,
        "partnerName": "BookingCare",
        "storeId": "BookingCareStore",
        "requestId": request_id,
        "amount": amount.to_string(),
        "orderId": order_id,
        "orderInfo": ORDER_INFO,
        "redirectUrl": config.return_url,
        "ipnUrl": config.ipn_url,
        "lang": "en",
        "extraData": "",
        "requestType": REQUEST_TYPE,
        "signature": signature,
    });

    debug!("momo create request for order {order_id}");

    let response: serde_json::Value = reqwest::Client::new()
        .post(&config.payment_url)
        .json(&body)
        .send()
        .await?
        .json()
        .await?;

    response
        .get("payUrl")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| {
            ApiError::Internal(format!(
                "momo create returned no payUrl: {}",
                response
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown error")
            ))
        })
}

/// Parameters Momo sends back on the redirect and the IPN call.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MomoCallback {
    pub partner_code: String,
    pub order_id: String,
    pub request_id: String,
    pub amount: i64,
    pub order_info: String,
    pub order_type: String,
    pub trans_id: i64,
    pub result_code: i32,
    pub message: String,
    pub pay_type: String,
    pub response_time: i64,
    #[serde(default)]
    pub extra_data: String,
    pub signature: String,
}

impl MomoCallback {
    fn raw_signature(&self, access_key: &str) -> String {
        format!(
            "accessKey={}&amount={}&extraData={}&message={}&orderId={}&orderInfo={}&orderType={}&partnerCode={}&payType={}&requestId={}&responseTime={}&resultCode={}&transId={}",
            access_key,
            self.amount,
            self.extra_data,
            self.message,
            self.order_id,
            self.order_info,
            self.order_type,
            self.partner_code,
            self.pay_type,
            self.request_id,
            self.response_time,
            self.result_code,
            self.trans_id,
        )
    }

    pub fn validate_signature(&self, access_key: &str, secret_key: &str) -> bool {
        let expected = hmac_sha256_hex(secret_key, &self.raw_signature(access_key));
        expected.eq_ignore_ascii_case(&self.signature)
    }

    pub fn succeeded(&self) -> bool {
        self.result_code == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> MomoConfig {
        MomoConfig {
            payment_url: "https://test-payment.momo.vn/v2/gateway/api/create".to_string(),
            return_url: "https://shop.example/momo-return".to_string(),
            ipn_url: "https://shop.example/momo-ipn".to_string(),
            partner_code: "PARTNER".to_string(),
            access_key: "ACCESS".to_string(),
            secret_key: "SECRET".to_string(),
        }
    }

    #[test]
    fn create_raw_signature_layout() {
        let raw = create_raw_signature(&test_config(), 150_000, "order_1", "req_1");

        assert_eq!(
            raw,
            "accessKey=ACCESS&amount=150000&extraData=&ipnUrl=https://shop.example/momo-ipn\
             &orderId=order_1&orderInfo=THANH TOAN HOA DON DAT LICH KHAM&partnerCode=PARTNER\
             &redirectUrl=https://shop.example/momo-return&requestId=req_1&requestType=captureWallet"
        );
    }

    fn callback(signature: String) -> MomoCallback {
        MomoCallback {
            partner_code: "PARTNER".to_string(),
            order_id: "order_1".to_string(),
            request_id: "req_1".to_string(),
            amount: 150_000,
            order_info: ORDER_INFO.to_string(),
            order_type: "momo_wallet".to_string(),
            trans_id: 99,
            result_code: 0,
            message: "Successful.".to_string(),
            pay_type: "qr".to_string(),
            response_time: 1_700_000_000_000,
            extra_data: String::new(),
            signature,
        }
    }

    #[test]
    fn callback_signature_round_trip() {
        let unsigned = callback(String::new());
        let signature = hmac_sha256_hex("SECRET", &unsigned.raw_signature("ACCESS"));
        let signed = callback(signature);

        assert!(signed.validate_signature("ACCESS", "SECRET"));
        assert!(!signed.validate_signature("ACCESS", "OTHER"));

        let mut tampered = callback(signed.signature.clone());
        tampered.amount = 1;
        assert!(!tampered.validate_signature("ACCESS", "SECRET"));
    }

    #[test]
    fn result_code_zero_means_success() {
        let mut cb = callback(String::new());
        assert!(cb.succeeded());
        cb.result_code = 1006;
        assert!(!cb.succeeded());
    }
}
