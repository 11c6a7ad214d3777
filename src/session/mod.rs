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

//! The authenticated session: one credential, one HTTP client, a Drive hub
//! and a Sheets hub, and the single retrying executor every remote call
//! funnels through.

use crate::auth::{Connector, CredentialStore};
use crate::error::{Error, Result};
use crate::sheets::workbook::Workbook;
use google_drive3::DriveHub;
use google_drive3::api::File;
use google_sheets4::Sheets;
use google_sheets4::hyper_rustls;
use hyper_util::rt::TokioExecutor;
use std::future::Future;
use tokio::time::{Duration, sleep};
use tracing::{debug, info, warn};

pub(crate) type ApiError = google_sheets4::Error;

const TRANSIENT_MAX_ATTEMPTS: usize = 3;
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(10);

/// One Drive file or folder discovered by [`Session::list_drive_entries`].
#[derive(Debug, Clone, PartialEq)]
pub struct DriveEntry {
    pub title: String,
    pub parents: Vec<String>,
    pub id: String,
}

/// The session-wide cache of discovered Drive entries, classified by MIME
/// type. Accumulation is additive; callers wanting a logical refresh call
/// [`DriveListing::clear`] (or [`Session::clear_drive_listing`]) first.
#[derive(Debug, Clone, Default)]
pub struct DriveListing {
    pub sheets: Vec<DriveEntry>,
    pub folders: Vec<DriveEntry>,
}

impl DriveListing {
    /// Folds one page of Drive results into the cache. Entries whose MIME
    /// type is neither folder nor spreadsheet are skipped.
    pub(crate) fn absorb(&mut self, files: Vec<File>) {
        for file in files {
            let (Some(id), Some(title)) = (file.id, file.name) else {
                continue;
            };
            let mime = file.mime_type.unwrap_or_default();
            let entry = DriveEntry {
                title,
                parents: file.parents.unwrap_or_default(),
                id,
            };

            if mime.ends_with("folder") {
                self.folders.push(entry);
            } else if mime.ends_with("spreadsheet") {
                self.sheets.push(entry);
            } else {
                debug!("🔍 Skipping drive entry '{}' with MIME type {}", entry.title, mime);
            }
        }
    }

    pub fn clear(&mut self) {
        self.sheets.clear();
        self.folders.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty() && self.folders.is_empty()
    }

    /// First spreadsheet entry with exactly this title. Duplicate titles
    /// resolve to whichever Drive listed first.
    pub fn find_sheet(&self, title: &str) -> Option<&DriveEntry> {
        self.sheets.iter().find(|entry| entry.title == title)
    }
}

fn is_rate_limited(error: &ApiError) -> bool {
    match error {
        ApiError::Failure(response) => response.status().as_u16() == 429,
        ApiError::BadRequest(details) => {
            details.pointer("/error/code").and_then(serde_json::Value::as_i64) == Some(429)
        }
        other => {
            let message = other.to_string().to_lowercase();
            message.contains("rate limit") || message.contains("too many requests")
        }
    }
}

fn is_transient(error: &ApiError) -> bool {
    matches!(error, ApiError::HttpError(_) | ApiError::Io(_))
}

/// An authenticated connection to the Drive and Sheets APIs.
pub struct Session {
    sheets: Sheets<Connector>,
    drive: DriveHub<Connector>,
    listing: DriveListing,
}

impl Session {
    /// Authenticates and opens both API hubs over one HTTP client.
    ///
    /// Loads the credential from the store, refreshing it against the
    /// token endpoint (and rewriting the file) when expired.
    ///
    /// # Errors
    ///
    /// [`Error::Auth`] when the credential is missing, unparseable, or
    /// cannot be refreshed.
    pub async fn connect(credentials: &CredentialStore) -> Result<Self> {
        info!("🔑 Connecting to the Google Drive and Sheets APIs...");

        let auth = credentials.authenticator().await?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|err| Error::Auth(format!("failed to load native TLS roots: {err}")))?
            .https_or_http()
            .enable_http1()
            .build();
        let client =
            hyper_util::client::legacy::Client::builder(TokioExecutor::new()).build(connector);

        let sheets = Sheets::new(client.clone(), auth.clone());
        let drive = DriveHub::new(client, auth);

        info!("✅ Google API connection established");
        Ok(Self {
            sheets,
            drive,
            listing: DriveListing::default(),
        })
    }

    /// The single chokepoint for remote calls.
    ///
    /// Transport-level transient failures are retried up to three
    /// attempts. An HTTP 429 sleeps a fixed ten seconds and retries
    /// exactly once more; a second 429 surfaces as [`Error::RateLimit`].
    /// Every other failure propagates unchanged as [`Error::Transport`].
    pub(crate) async fn execute<T, F, Fut>(operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, ApiError>>,
    {
        let mut attempt = 1usize;
        let mut rate_limit_retried = false;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if is_rate_limited(&error) => {
                    if rate_limit_retried {
                        warn!("⛔ {} is still rate limited after backoff", operation);
                        return Err(Error::RateLimit {
                            operation: operation.to_string(),
                            source: error,
                        });
                    }
                    rate_limit_retried = true;
                    attempt = 1;
                    warn!(
                        "🔁 {} hit the rate limit, backing off for {:?}",
                        operation, RATE_LIMIT_BACKOFF
                    );
                    sleep(RATE_LIMIT_BACKOFF).await;
                }
                Err(error) if is_transient(&error) && attempt < TRANSIENT_MAX_ATTEMPTS => {
                    warn!(
                        "🔁 {} failed in transit (attempt {}/{}), retrying: {}",
                        operation, attempt, TRANSIENT_MAX_ATTEMPTS, error
                    );
                    attempt += 1;
                }
                Err(error) => {
                    return Err(Error::Transport {
                        operation: operation.to_string(),
                        source: error,
                    });
                }
            }
        }
    }

    /// Pages through the Drive listing of non-trashed files, folding every
    /// page into the session cache, until the server stops returning a
    /// continuation token.
    pub async fn list_drive_entries(&mut self) -> Result<&DriveListing> {
        info!("📁 Listing Drive files and folders");

        let drive = &self.drive;
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let token = page_token.take();
            let list = Session::execute("list drive files", || {
                let token = token.clone();
                async move {
                    let mut call = drive
                        .files()
                        .list()
                        .q("trashed = false")
                        .param("fields", "nextPageToken, files(id, name, parents, mimeType)");
                    if let Some(token) = token.as_deref() {
                        call = call.page_token(token);
                    }
                    call.doit().await.map(|(_, list)| list)
                }
            })
            .await?;

            self.listing.absorb(list.files.unwrap_or_default());
            pages += 1;
            page_token = list.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        debug!(
            "🔍 Absorbed {} Drive page(s): {} spreadsheets, {} folders",
            pages,
            self.listing.sheets.len(),
            self.listing.folders.len()
        );
        Ok(&self.listing)
    }

    pub fn drive_listing(&self) -> &DriveListing {
        &self.listing
    }

    pub fn clear_drive_listing(&mut self) {
        self.listing.clear();
    }

    /// Opens a spreadsheet by exact title match against the Drive cache,
    /// populating the cache first when it is empty.
    ///
    /// Duplicate titles resolve to the first cached match.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when no cached spreadsheet carries the title.
    pub async fn open_spreadsheet_by_title(&mut self, title: &str) -> Result<Workbook> {
        if self.listing.sheets.is_empty() {
            self.list_drive_entries().await?;
        }

        let id = self
            .listing
            .find_sheet(title)
            .map(|entry| entry.id.clone())
            .ok_or_else(|| Error::NotFound(format!("spreadsheet titled '{title}'")))?;

        debug!("📊 Resolved '{}' to spreadsheet {}", title, id);
        self.open_spreadsheet_by_id(&id).await
    }

    /// Fetches a full spreadsheet snapshot by id and mirrors it.
    pub async fn open_spreadsheet_by_id(&self, spreadsheet_id: &str) -> Result<Workbook> {
        info!("📊 Opening spreadsheet {}", spreadsheet_id);

        let sheets = &self.sheets;
        let snapshot = Session::execute("fetch spreadsheet snapshot", || {
            let sheets = sheets;
            async move {
                sheets
                    .spreadsheets()
                    .get(spreadsheet_id)
                    .doit()
                    .await
                    .map(|(_, snapshot)| snapshot)
            }
        })
        .await?;

        Workbook::from_snapshot(snapshot)
    }

    /// Moves a file into a folder: reads its current parent set, then adds
    /// the destination and removes all previous parents in one update.
    pub async fn move_file(&self, file_id: &str, folder_id: &str) -> Result<()> {
        info!("📦 Moving file {} into folder {}", file_id, folder_id);

        let drive = &self.drive;
        let file = Session::execute("read file parents", || {
            let drive = drive;
            async move {
                drive
                    .files()
                    .get(file_id)
                    .param("fields", "parents")
                    .doit()
                    .await
                    .map(|(_, file)| file)
            }
        })
        .await?;

        let previous_parents = file.parents.unwrap_or_default().join(",");

        Session::execute("move file", || {
            let drive = drive;
            let previous_parents = previous_parents.clone();
            async move {
                drive
                    .files()
                    .update(File::default(), file_id)
                    .add_parents(folder_id)
                    .remove_parents(&previous_parents)
                    .param("fields", "id, parents")
                    .doit_without_upload()
                    .await
                    .map(|(_, file)| file)
            }
        })
        .await?;

        Ok(())
    }

    pub(crate) fn sheets_hub(&self) -> &Sheets<Connector> {
        &self.sheets
    }

    pub(crate) fn drive_hub(&self) -> &DriveHub<Connector> {
        &self.drive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    fn drive_file(id: &str, name: &str, mime: &str) -> File {
        File {
            id: Some(id.to_string()),
            name: Some(name.to_string()),
            mime_type: Some(mime.to_string()),
            parents: Some(vec!["root".to_string()]),
            ..Default::default()
        }
    }

    fn rate_limit_error() -> ApiError {
        ApiError::BadRequest(json!({
            "error": { "code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED" }
        }))
    }

    fn server_error() -> ApiError {
        ApiError::BadRequest(json!({
            "error": { "code": 500, "message": "Internal error", "status": "INTERNAL" }
        }))
    }

    #[test]
    fn absorb_classifies_by_mime_suffix() {
        let mut listing = DriveListing::default();
        listing.absorb(vec![
            drive_file("s1", "Budget", "application/vnd.google-apps.spreadsheet"),
            drive_file("f1", "Reports", "application/vnd.google-apps.folder"),
            drive_file("d1", "Notes", "application/vnd.google-apps.document"),
        ]);

        assert_eq!(listing.sheets.len(), 1);
        assert_eq!(listing.folders.len(), 1);
        assert_eq!(listing.sheets[0].id, "s1");
        assert_eq!(listing.folders[0].title, "Reports");
    }

    #[test]
    fn absorb_is_additive_until_cleared() {
        let mut listing = DriveListing::default();
        let page = vec![drive_file(
            "s1",
            "Budget",
            "application/vnd.google-apps.spreadsheet",
        )];

        listing.absorb(page.clone());
        listing.absorb(page);
        assert_eq!(listing.sheets.len(), 2);

        listing.clear();
        assert!(listing.is_empty());
    }

    #[test]
    fn find_sheet_takes_the_first_duplicate() {
        let mut listing = DriveListing::default();
        listing.absorb(vec![
            drive_file("first", "Budget", "application/vnd.google-apps.spreadsheet"),
            drive_file("second", "Budget", "application/vnd.google-apps.spreadsheet"),
        ]);

        assert_eq!(listing.find_sheet("Budget").unwrap().id, "first");
        assert!(listing.find_sheet("Missing").is_none());
    }

    #[test]
    fn entries_without_id_or_name_are_skipped() {
        let mut listing = DriveListing::default();
        listing.absorb(vec![File {
            mime_type: Some("application/vnd.google-apps.spreadsheet".to_string()),
            ..Default::default()
        }]);

        assert!(listing.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_call_succeeds_on_the_single_retry() {
        let attempts = Cell::new(0usize);
        let result = Session::execute("test operation", || {
            attempts.set(attempts.get() + 1);
            let attempt = attempts.get();
            async move {
                if attempt == 1 {
                    Err(rate_limit_error())
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(attempts.get(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn persistent_rate_limit_surfaces_after_one_retry() {
        let attempts = Cell::new(0usize);
        let result: Result<()> = Session::execute("test operation", || {
            attempts.set(attempts.get() + 1);
            async move { Err(rate_limit_error()) }
        })
        .await;

        assert_eq!(attempts.get(), 2);
        assert!(matches!(result, Err(Error::RateLimit { .. })));
    }

    #[tokio::test]
    async fn non_rate_limit_errors_are_not_retried() {
        let attempts = Cell::new(0usize);
        let result: Result<()> = Session::execute("test operation", || {
            attempts.set(attempts.get() + 1);
            async move { Err(server_error()) }
        })
        .await;

        assert_eq!(attempts.get(), 1);
        assert!(matches!(result, Err(Error::Transport { .. })));
    }

    #[test]
    fn rate_limit_detection_reads_the_error_payload() {
        assert!(is_rate_limited(&rate_limit_error()));
        assert!(!is_rate_limited(&server_error()));
    }
}
