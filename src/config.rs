use std::env;

// Configuration is read once at startup; a missing required variable is a
// deployment error, so we fail fast.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: String,
    pub api_url: String,
    pub upload_dir: String,
    pub jwt: JwtConfig,
    pub vnpay: VnPayConfig,
    pub momo: MomoConfig,
    pub mail: MailConfig,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_validity_days: i64,
    pub refresh_token_validity_days: i64,
}

#[derive(Clone, Debug)]
pub struct VnPayConfig {
    pub base_url: String,
    pub return_url: String,
    pub tmn_code: String,
    pub hash_secret: String,
    pub version: String,
    pub command: String,
    pub curr_code: String,
    pub locale: String,
}

#[derive(Clone, Debug)]
pub struct MomoConfig {
    pub payment_url: String,
    pub return_url: String,
    pub ipn_url: String,
    pub partner_code: String,
    pub access_key: String,
    pub secret_key: String,
}

#[derive(Clone, Debug)]
pub struct MailConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub display_name: String,
}

fn require(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} must be set"))
}

fn optional(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: require("DATABASE_URL"),
            bind_addr: optional("BIND_ADDR", "127.0.0.1:8000"),
            api_url: optional("API_URL", "http://localhost:8000"),
            upload_dir: optional("UPLOAD_DIR", "uploads"),
            jwt: JwtConfig {
                secret: require("JWT_SECRET"),
                issuer: optional("JWT_ISSUER", "bookingcare"),
                audience: optional("JWT_AUDIENCE", "bookingcare"),
                token_validity_days: parse("JWT_TOKEN_VALIDITY_DAYS", 1),
                refresh_token_validity_days: parse("JWT_REFRESH_TOKEN_VALIDITY_DAYS", 7),
            },
            vnpay: VnPayConfig {
                base_url: optional(
                    "VNPAY_BASE_URL",
                    "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html",
                ),
                return_url: optional("VNPAY_RETURN_URL", ""),
                tmn_code: optional("VNPAY_TMN_CODE", ""),
                hash_secret: optional("VNPAY_HASH_SECRET", ""),
                version: optional("VNPAY_VERSION", "2.1.0"),
                command: optional("VNPAY_COMMAND", "pay"),
                curr_code: optional("VNPAY_CURR_CODE", "VND"),
                locale: optional("VNPAY_LOCALE", "vn"),
            },
            momo: MomoConfig {
                payment_url: optional(
                    "MOMO_PAYMENT_URL",
                    "https://test-payment.momo.vn/v2/gateway/api/create",
                ),
                return_url: optional("MOMO_RETURN_URL", ""),
                ipn_url: optional("MOMO_IPN_URL", ""),
                partner_code: optional("MOMO_PARTNER_CODE", ""),
                access_key: optional("MOMO_ACCESS_KEY", ""),
                secret_key: optional("MOMO_SECRET_KEY", ""),
            },
            mail: MailConfig {
                host: optional("MAIL_HOST", "localhost"),
                port: parse("MAIL_PORT", 587),
                username: optional("MAIL_USERNAME", ""),
                password: optional("MAIL_PASSWORD", ""),
                from_address: optional("MAIL_FROM", "noreply@bookingcare.local"),
                display_name: optional("MAIL_DISPLAY_NAME", "BookingCare"),
            },
        }
    }
}
