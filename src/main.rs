//! Woodpress Storefront - cart and checkout pricing service

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use woodpress_storefront::{api, config::Config, coupons::CouponBook};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let config = Config::from_env()?;
    let coupons = match &config.coupons_file {
        Some(path) => CouponBook::from_file(path)?,
        None => {
            tracing::warn!("COUPONS_FILE not set, every coupon code will be rejected");
            CouponBook::default()
        }
    };
    let state = api::AppState::new(config.data_dir.clone(), config.pricing, Arc::new(coupons)).session_idle(config.session_idle);
    let app = api::router(state);

    let addr = config.socket_addr();
    tracing::info!(data_dir = %config.data_dir.display(), "🛒 Woodpress storefront listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}
