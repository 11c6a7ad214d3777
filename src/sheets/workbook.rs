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

//! The local mirror of one remote spreadsheet and its sheet list.

use crate::error::{Error, Result};
use crate::session::Session;
use crate::sheets::grid::GridConfig;
use crate::sheets::worksheet::Worksheet;
use google_drive3::api::Permission;
use google_sheets4::api::{
    AddSheetRequest, BatchUpdateSpreadsheetRequest, CellFormat, Request, Sheet, SheetProperties,
    Spreadsheet, SpreadsheetProperties, SpreadsheetTheme,
};
use std::fmt;
use tracing::{debug, info};

/// Title given to the initial sheet of a created spreadsheet.
pub const DEFAULT_SHEET_TITLE: &str = "Data";

/// How to pick a worksheet out of a workbook: by exact title or by index.
#[derive(Debug, Clone, Copy)]
pub enum SheetSelector<'a> {
    Title(&'a str),
    Index(i32),
}

impl<'a> From<&'a str> for SheetSelector<'a> {
    fn from(title: &'a str) -> Self {
        SheetSelector::Title(title)
    }
}

impl From<i32> for SheetSelector<'_> {
    fn from(index: i32) -> Self {
        SheetSelector::Index(index)
    }
}

/// Mirror of one remote spreadsheet: its properties and the ordered list
/// of worksheets, appended to as sheets are created server-side.
///
/// The id is assigned by the remote service and stable for the mirror's
/// lifetime. Mirrors are updated only from successful responses; a failed
/// request leaves them unchanged.
pub struct Workbook {
    id: String,
    title: Option<String>,
    locale: Option<String>,
    auto_recalc: Option<String>,
    time_zone: Option<String>,
    default_format: Option<CellFormat>,
    theme: Option<SpreadsheetTheme>,
    sheets: Vec<Worksheet>,
}

impl Workbook {
    /// Builds the mirror from a full API snapshot.
    pub(crate) fn from_snapshot(snapshot: Spreadsheet) -> Result<Self> {
        let id = snapshot
            .spreadsheet_id
            .ok_or_else(|| Error::Data("spreadsheet snapshot is missing its id".to_string()))?;
        let properties = snapshot.properties.unwrap_or_default();

        let sheets = snapshot
            .sheets
            .unwrap_or_default()
            .into_iter()
            .map(|sheet| Worksheet::from_properties(&id, sheet.properties.unwrap_or_default()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id,
            title: properties.title,
            locale: properties.locale,
            auto_recalc: properties.auto_recalc,
            time_zone: properties.time_zone,
            default_format: properties.default_format,
            theme: properties.spreadsheet_theme,
            sheets,
        })
    }

    /// Creates a spreadsheet with one default "Data" sheet of 1000x26.
    pub async fn create(session: &Session, title: &str) -> Result<Self> {
        Self::create_with(session, title, DEFAULT_SHEET_TITLE, GridConfig::default()).await
    }

    /// Creates a spreadsheet with one initial sheet of the given title and
    /// grid dimensions.
    pub async fn create_with(
        session: &Session,
        title: &str,
        sheet_title: &str,
        grid: GridConfig,
    ) -> Result<Self> {
        info!("➕ Creating spreadsheet '{}'", title);

        let body = Spreadsheet {
            properties: Some(SpreadsheetProperties {
                title: Some(title.to_string()),
                ..Default::default()
            }),
            sheets: Some(vec![Sheet {
                properties: Some(SheetProperties {
                    title: Some(sheet_title.to_string()),
                    grid_properties: Some(grid.properties()),
                    ..Default::default()
                }),
                ..Default::default()
            }]),
            ..Default::default()
        };

        let hub = session.sheets_hub();
        let snapshot = Session::execute("create spreadsheet", || {
            let hub = hub;
            let body = body.clone();
            async move {
                hub.spreadsheets()
                    .create(body)
                    .doit()
                    .await
                    .map(|(_, snapshot)| snapshot)
            }
        })
        .await?;

        let workbook = Self::from_snapshot(snapshot)?;
        info!("✅ Created spreadsheet '{}' ({})", title, workbook.id);
        Ok(workbook)
    }

    /// ID of the spreadsheet.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Title of the spreadsheet.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Shareable URL of the spreadsheet.
    pub fn url(&self) -> String {
        format!("https://docs.google.com/spreadsheets/d/{}", self.id)
    }

    pub fn sheets(&self) -> &[Worksheet] {
        &self.sheets
    }

    /// Direct access to the first worksheet.
    pub fn sheet1(&self) -> Option<&Worksheet> {
        self.sheets.first()
    }

    fn find_position(&self, selector: &SheetSelector<'_>) -> Option<usize> {
        match selector {
            SheetSelector::Title(title) => {
                self.sheets.iter().position(|sheet| sheet.title() == *title)
            }
            SheetSelector::Index(index) => {
                self.sheets.iter().position(|sheet| sheet.index() == *index)
            }
        }
    }

    /// Returns the worksheet matching the selector.
    ///
    /// A miss is not an error: the workbook implicitly creates a new
    /// worksheet titled by the selector (an index miss uses its decimal
    /// rendering) with default grid dimensions, so a failed lookup has a
    /// creation side effect.
    pub async fn worksheet<'a>(
        &mut self,
        session: &Session,
        selector: impl Into<SheetSelector<'a>>,
    ) -> Result<&Worksheet> {
        let selector = selector.into();

        if let Some(position) = self.find_position(&selector) {
            return Ok(&self.sheets[position]);
        }

        let title = match selector {
            SheetSelector::Title(title) => title.to_string(),
            SheetSelector::Index(index) => index.to_string(),
        };
        debug!("➕ No worksheet matched, creating '{}'", title);
        self.add_worksheet(session, &title, GridConfig::default())
            .await
    }

    /// Adds a worksheet via one `addSheet` batch update and appends the
    /// resulting mirror.
    ///
    /// # Returns
    ///
    /// The new worksheet, built from the server's reply (which carries
    /// the assigned sheet id and index).
    ///
    /// # Errors
    ///
    /// [`Error::Data`] when the reply omits the created sheet's
    /// properties.
    pub async fn add_worksheet(
        &mut self,
        session: &Session,
        title: &str,
        grid: GridConfig,
    ) -> Result<&Worksheet> {
        info!("➕ Adding worksheet '{}' to {}", title, self.id);

        let request = BatchUpdateSpreadsheetRequest {
            requests: Some(vec![Request {
                add_sheet: Some(AddSheetRequest {
                    properties: Some(SheetProperties {
                        title: Some(title.to_string()),
                        grid_properties: Some(grid.properties()),
                        ..Default::default()
                    }),
                }),
                ..Default::default()
            }]),
            ..Default::default()
        };

        let hub = session.sheets_hub();
        let spreadsheet_id = self.id.clone();
        let response = Session::execute("add worksheet", || {
            let hub = hub;
            let request = request.clone();
            let spreadsheet_id = spreadsheet_id.clone();
            async move {
                hub.spreadsheets()
                    .batch_update(request, &spreadsheet_id)
                    .doit()
                    .await
                    .map(|(_, response)| response)
            }
        })
        .await?;

        let properties = response
            .replies
            .and_then(|replies| replies.into_iter().next())
            .and_then(|reply| reply.add_sheet)
            .and_then(|added| added.properties)
            .ok_or_else(|| {
                Error::Data("addSheet reply did not include sheet properties".to_string())
            })?;

        let worksheet = Worksheet::from_properties(&self.id, properties)?;
        info!(
            "✅ Added worksheet '{}' (id {})",
            worksheet.title(),
            worksheet.id()
        );

        let position = self.sheets.len();
        self.sheets.push(worksheet);
        Ok(&self.sheets[position])
    }

    /// Shares the spreadsheet with one user via a Drive permission,
    /// optionally attaching a notification email body.
    pub async fn share_with(
        &self,
        session: &Session,
        email: &str,
        role: &str,
        message: Option<&str>,
    ) -> Result<Permission> {
        info!("🔗 Sharing {} with {} as {}", self.id, email, role);

        let permission = Permission {
            kind: Some("drive#permission".to_string()),
            type_: Some("user".to_string()),
            role: Some(role.to_string()),
            email_address: Some(email.to_string()),
            ..Default::default()
        };

        let hub = session.drive_hub();
        let file_id = self.id.clone();
        let message = message.map(str::to_string);
        Session::execute("share spreadsheet", || {
            let hub = hub;
            let permission = permission.clone();
            let file_id = file_id.clone();
            let message = message.clone();
            async move {
                let mut call = hub.permissions().create(permission, &file_id);
                if let Some(message) = message.as_deref() {
                    call = call.email_message(message);
                }
                call.doit().await.map(|(_, permission)| permission)
            }
        })
        .await
    }

    /// The API-shaped snapshot rebuilt purely from mirror state, including
    /// the derived URL. For display and debugging; never sent back.
    pub fn snapshot(&self) -> Spreadsheet {
        Spreadsheet {
            spreadsheet_id: Some(self.id.clone()),
            spreadsheet_url: Some(self.url()),
            properties: Some(SpreadsheetProperties {
                title: self.title.clone(),
                locale: self.locale.clone(),
                auto_recalc: self.auto_recalc.clone(),
                time_zone: self.time_zone.clone(),
                default_format: self.default_format.clone(),
                spreadsheet_theme: self.theme.clone(),
                ..Default::default()
            }),
            sheets: Some(
                self.sheets
                    .iter()
                    .map(|sheet| Sheet {
                        properties: Some(sheet.properties()),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }
    }

    /// [`Workbook::snapshot`] rendered to JSON.
    pub fn serialize(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for Workbook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(&self.snapshot()) {
            Ok(rendered) => f.write_str(&rendered),
            Err(_) => f.write_str("<unserializable workbook>"),
        }
    }
}
