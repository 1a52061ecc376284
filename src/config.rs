//! Configuration file handling.
//!
//! `config.json` carries two sections: the Xero OAuth2 parameters (including
//! the persisted token state) and the Syncro credentials. The file is owned
//! by the operator; we only ever rewrite the three token fields, so loading
//! and saving must round-trip every other field untouched. Unknown fields at
//! any level are captured in flatten maps for that reason.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::error::{Error, Result};

/// Xero OAuth2 parameters and token state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XeroSettings {
    #[serde(rename = "ClientID")]
    pub client_id: String,
    #[serde(rename = "Secret")]
    pub secret: String,
    #[serde(rename = "RedirectUri")]
    pub redirect_uri: String,
    #[serde(rename = "AuthorizeUri")]
    pub authorize_uri: String,
    #[serde(rename = "Scope")]
    pub scope: String,
    #[serde(rename = "OrganizationID")]
    pub organization_id: String,
    #[serde(rename = "AccessToken", default)]
    pub access_token: String,
    #[serde(rename = "RefreshToken", default)]
    pub refresh_token: String,
    /// RFC 3339 timestamp, or empty when no expiry is on record.
    #[serde(rename = "TokenExpiration", default)]
    pub token_expiration: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl XeroSettings {
    /// Parses the recorded token expiration, if any.
    #[must_use]
    pub fn token_expires_at(&self) -> Option<OffsetDateTime> {
        if self.token_expiration.is_empty() {
            return None;
        }
        OffsetDateTime::parse(&self.token_expiration, &Rfc3339).ok()
    }
}

/// Syncro API credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncroSettings {
    #[serde(rename = "APIKey")]
    pub api_key: String,
    #[serde(rename = "Subdomain")]
    pub subdomain: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "Xero")]
    pub xero: XeroSettings,
    #[serde(rename = "Syncro")]
    pub syncro: SyncroSettings,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Settings plus the path they were loaded from, so token updates can be
/// written back in place.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    pub settings: Settings,
}

impl SettingsStore {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let settings: Settings = serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid JSON in {}: {e}", path.display())))?;
        if settings.xero.client_id.is_empty() {
            return Err(Error::Config(format!(
                "Xero.ClientID is empty in {}",
                path.display()
            )));
        }
        if settings.syncro.api_key.is_empty() || settings.syncro.subdomain.is_empty() {
            return Err(Error::Config(format!(
                "Syncro.APIKey and Syncro.Subdomain are required in {}",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
            settings,
        })
    }

    /// Replaces the three token fields. Callers persist with [`Self::save`].
    pub fn update_tokens(
        &mut self,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Option<OffsetDateTime>,
    ) {
        let xero = &mut self.settings.xero;
        xero.access_token = access_token.to_string();
        if let Some(refresh_token) = refresh_token {
            xero.refresh_token = refresh_token.to_string();
        }
        xero.token_expiration = expires_at
            .and_then(|t| t.format(&Rfc3339).ok())
            .unwrap_or_default();
    }

    /// Writes the settings back to the file they were loaded from.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)
            .map_err(|e| Error::Config(format!("failed to serialize settings: {e}")))?;
        fs::write(&self.path, json).map_err(Error::Persistence)
    }
}
