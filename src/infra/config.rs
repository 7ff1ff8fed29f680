use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;

pub struct AppConfig {
    /// Shared secret for verifying access tokens issued by the auth service.
    pub jwt_secret: SecretString,
    pub cors_origin: HeaderValue,
    /// Frontend origin used for checkout and portal redirect URLs.
    pub client_url: String,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub stripe_secret_key: SecretString,
    /// Endpoint secret for webhook signature verification (`whsec_...`).
    pub stripe_webhook_secret: SecretString,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());

        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");

        let client_url: String =
            get_env_default("CLIENT_URL", String::from("http://localhost:3000"));

        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");

        let stripe_secret_key: SecretString =
            SecretString::new(get_env::<String>("STRIPE_SECRET_KEY").into());
        let stripe_webhook_secret: SecretString =
            SecretString::new(get_env::<String>("STRIPE_WEBHOOK_SECRET").into());

        Self {
            jwt_secret,
            cors_origin,
            client_url,
            bind_addr,
            database_url,
            stripe_secret_key,
            stripe_webhook_secret,
        }
    }
}
