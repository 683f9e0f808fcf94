//! Session gate: what the rest of the app reads after onboarding.
//!
//! Dashboard and module pages never talk to the wizard. They check the
//! completion flag, load the stored profile, and clear everything on
//! sign-out.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::onboarding::model::{UserProfile, storage_keys};
use crate::store::KeyValueStore;

/// Top-level views the app can navigate between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Home,
    Onboarding,
    Dashboard,
}

impl Route {
    /// Path the reference web client used for this view.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Onboarding => "/onboarding",
            Self::Dashboard => "/dashboard",
        }
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Where a visitor should land: the dashboard once onboarding has finished,
/// otherwise back into the wizard.
pub async fn entry_route(store: &dyn KeyValueStore) -> Result<Route> {
    let flag = store.get(storage_keys::ONBOARDING_COMPLETE).await?;
    let route = match flag.as_deref() {
        Some("true") => Route::Dashboard,
        _ => Route::Onboarding,
    };
    debug!(%route, "Resolved entry route");
    Ok(route)
}

/// Load the stored profile, if any.
pub async fn load_profile(store: &dyn KeyValueStore) -> Result<Option<UserProfile>> {
    match store.get(storage_keys::USER).await? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Forget everything and return to the landing view.
pub async fn sign_out(store: &dyn KeyValueStore) -> Result<Route> {
    store.clear().await?;
    info!("Signed out; local state cleared");
    Ok(Route::Home)
}
