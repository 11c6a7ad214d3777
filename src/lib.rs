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

//! High-level client for the Google Drive and Sheets APIs.
//!
//! A [`Session`] authenticates once and owns both API hubs plus the Drive
//! listing cache. Spreadsheets open into a [`Workbook`] mirror whose
//! [`Worksheet`]s read and write tabular ranges; every read/write returns
//! a [`DataRange`] that doubles as the source for pivot table and slicer
//! builders. All remote calls funnel through one retrying executor:
//! transient transport failures are retried up to three attempts, and an
//! HTTP 429 backs off ten seconds and retries exactly once.
//!
//! ```no_run
//! use sheetwork::{
//!     CredentialStore, FieldSpec, PivotLayout, Session, Table, ValueInput, ValueSpec,
//! };
//!
//! # async fn run() -> sheetwork::Result<()> {
//! let credentials = CredentialStore::resolve(None)?;
//! let mut session = Session::connect(&credentials).await?;
//!
//! let mut workbook = session.open_spreadsheet_by_title("Quarterly numbers").await?;
//! let sheet = workbook.worksheet(&session, "Data").await?;
//!
//! let table = Table::new(
//!     vec!["Region".into(), "Units".into()],
//!     vec![
//!         vec!["West".into(), 12.into()],
//!         vec!["East".into(), 7.into()],
//!     ],
//! )?;
//! let range = sheet.write_values(&session, &table, "A1", ValueInput::Raw).await?;
//!
//! let layout = PivotLayout::new(
//!     vec![FieldSpec::ordered("Region")],
//!     vec![ValueSpec::field("Units")],
//! )
//! .at_cell("E1");
//! sheet.add_pivot_table(&session, &layout, &range).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod error;
pub mod range;
pub mod session;
pub mod sheets;

pub use auth::{CREDENTIALS_ENV_VAR, CredentialStore, StoredCredential};
pub use error::{Error, Result};
pub use range::{
    CellValue, DataRange, Table, column_index_to_letters, column_letters_to_index, parse_cell,
    render_cell,
};
pub use session::{DriveEntry, DriveListing, Session};
pub use sheets::grid::{Grid, GridConfig};
pub use sheets::pivot::{FieldSpec, GroupOptions, PivotLayout, SlicerParams, ValueSpec};
pub use sheets::workbook::{DEFAULT_SHEET_TITLE, SheetSelector, Workbook};
pub use sheets::worksheet::{ValueInput, Worksheet};
