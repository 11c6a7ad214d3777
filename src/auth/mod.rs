// Copyright 2025 Webmobix Solutions AG
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUTHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Credential handling for the Google Drive and Sheets APIs.
//!
//! The credential file is the stored authorized-user JSON (client id and
//! secret plus a refresh token, optionally the last access token and its
//! expiry). It is resolved from an explicit path, the environment, or the
//! home directory, and rewritten in place whenever the access token is
//! refreshed.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use google_sheets4::hyper_rustls;
use google_sheets4::yup_oauth2::{self, authenticator::Authenticator};
use hyper_util::client::legacy::connect::HttpConnector;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Scopes required for full spreadsheet access
/// (Drive is needed for listing, moving, and sharing files).
pub(crate) const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

/// Environment variable naming the credential file.
pub const CREDENTIALS_ENV_VAR: &str = "SHEETWORK_CREDENTIALS";

const HOME_CREDENTIALS_DIR: &str = ".sheetwork";
const HOME_CREDENTIALS_FILE: &str = "credentials.json";

pub(crate) type Connector = hyper_rustls::HttpsConnector<HttpConnector>;

/// The on-disk credential: an access/refresh token pair plus the client
/// metadata needed to refresh it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCredential {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl StoredCredential {
    /// A credential without an access token, or whose expiry has passed,
    /// needs a refresh before use.
    pub fn is_expired(&self) -> bool {
        match (&self.token, self.expiry) {
            (None, _) => true,
            (Some(_), Some(expiry)) => expiry <= Utc::now(),
            (Some(_), None) => false,
        }
    }
}

/// Locates, parses, and rewrites the credential file.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Resolves a usable credential file.
    ///
    /// Search order:
    /// 1. `path_override` (if provided)
    /// 2. The path named by `SHEETWORK_CREDENTIALS`
    /// 3. `~/.sheetwork/credentials.json`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Auth`] when no candidate exists on disk.
    pub fn resolve(path_override: Option<PathBuf>) -> Result<Self> {
        if let Some(path) = path_override {
            if !path.exists() {
                return Err(Error::Auth(format!(
                    "credential file not found: {}",
                    path.display()
                )));
            }
            info!("🔐 Using credentials at: {}", path.display());
            return Ok(Self { path });
        }

        if let Ok(configured) = std::env::var(CREDENTIALS_ENV_VAR) {
            let path = PathBuf::from(configured);
            if !path.exists() {
                return Err(Error::Auth(format!(
                    "{} points at a missing file: {}",
                    CREDENTIALS_ENV_VAR,
                    path.display()
                )));
            }
            info!("🔐 Using credentials from {}: {}", CREDENTIALS_ENV_VAR, path.display());
            return Ok(Self { path });
        }

        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            let path = PathBuf::from(home)
                .join(HOME_CREDENTIALS_DIR)
                .join(HOME_CREDENTIALS_FILE);
            if path.exists() {
                info!("🔐 Using credentials at: {}", path.display());
                return Ok(Self { path });
            }
        }

        Err(Error::Auth(format!(
            "no credential file configured; pass a path, set {CREDENTIALS_ENV_VAR}, \
             or place one at ~/{HOME_CREDENTIALS_DIR}/{HOME_CREDENTIALS_FILE}"
        )))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parses the credential file.
    ///
    /// # Errors
    ///
    /// [`Error::Auth`] when the file cannot be read or is not a stored
    /// authorized-user credential.
    pub fn load(&self) -> Result<StoredCredential> {
        let raw = fs::read_to_string(&self.path).map_err(|err| {
            Error::Auth(format!(
                "failed to read credential file {}: {err}",
                self.path.display()
            ))
        })?;

        serde_json::from_str(&raw).map_err(|err| {
            Error::Auth(format!(
                "credential file {} could not be parsed: {err}",
                self.path.display()
            ))
        })
    }

    /// Rewrites the credential file in place.
    pub(crate) fn store(&self, credential: &StoredCredential) -> Result<()> {
        let rendered = serde_json::to_string_pretty(credential)
            .map_err(|err| Error::Auth(format!("failed to serialize credential: {err}")))?;

        fs::write(&self.path, rendered).map_err(|err| {
            Error::Auth(format!(
                "failed to rewrite credential file {}: {err}",
                self.path.display()
            ))
        })
    }

    /// Builds the authorized-user authenticator and primes a token for the
    /// required scopes, forcing a refresh against the token endpoint when
    /// the stored access token is missing or expired. The refreshed token
    /// and its expiry are written back to the credential file.
    pub(crate) async fn authenticator(&self) -> Result<Authenticator<Connector>> {
        let credential = self.load()?;

        let secret = yup_oauth2::read_authorized_user_secret(&self.path)
            .await
            .map_err(|err| {
                Error::Auth(format!(
                    "credential file {} is not an authorized-user credential: {err}",
                    self.path.display()
                ))
            })?;

        let auth = yup_oauth2::AuthorizedUserAuthenticator::builder(secret)
            .build()
            .await
            .map_err(|err| Error::Auth(format!("failed to build authenticator: {err}")))?;

        debug!("🔍 Priming access token for scopes: {:?}", SCOPES);
        let token = auth
            .token(SCOPES)
            .await
            .map_err(|err| Error::Auth(format!("failed to obtain access token: {err}")))?;

        if credential.is_expired() {
            let refreshed = StoredCredential {
                token: token.token().map(str::to_string),
                expiry: token
                    .expiration_time()
                    .and_then(|at| DateTime::<Utc>::from_timestamp(at.unix_timestamp(), 0)),
                ..credential
            };
            self.store(&refreshed)?;
            info!("💾 Refreshed credential written back to {}", self.path.display());
        }

        Ok(auth)
    }
}
