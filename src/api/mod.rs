pub mod stripe;

pub struct ApiUrls;

impl ApiUrls {
    pub fn get_payment_gateway_url() -> String {
        std::env::var("PAYMENT_GATEWAY_URL").unwrap_or("https://api.stripe.com".to_string())
    }
}
