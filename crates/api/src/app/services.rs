//! Service wiring: one SQLite pool shared by the ledger and the asset store,
//! plus the login credentials and session token issuer.

use std::sync::Arc;

use almox_auth::{Credentials, Hs256SessionTokens, SessionTokens};
use almox_infra::{AssetStore, Ledger, StoreResult};

use crate::config::AppConfig;

pub struct AppServices {
    pub ledger: Ledger,
    pub assets: AssetStore,
    pub credentials: Credentials,
    pub tokens: Arc<dyn SessionTokens>,
}

pub async fn build_services(config: &AppConfig) -> StoreResult<AppServices> {
    let pool = almox_infra::connect(&config.database_url).await?;

    Ok(AppServices {
        ledger: Ledger::new(pool.clone()),
        assets: AssetStore::new(pool, config.invoice_policy),
        credentials: Credentials::new(config.admin_user.clone(), config.admin_password.clone()),
        tokens: Arc::new(Hs256SessionTokens::new(
            config.session_secret.as_bytes(),
            config.session_ttl,
        )),
    })
}
