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

use crate::error::{Error, Result};
use crate::range::{DataRange, Table};
use crate::session::Session;
use crate::sheets::grid::Grid;
use crate::sheets::pivot::{self, PivotLayout, SlicerParams};
use google_sheets4::api::{
    BatchUpdateSpreadsheetRequest, BatchUpdateSpreadsheetResponse, ClearValuesRequest,
    ClearValuesResponse, Color, Request, SheetProperties, ValueRange,
};
use tracing::{debug, info};

/// How written values are interpreted by the service: verbatim, or parsed
/// as though typed into the UI (formulas, dates, numbers).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum ValueInput {
    #[default]
    Raw,
    UserEntered,
}

impl ValueInput {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ValueInput::Raw => "RAW",
            ValueInput::UserEntered => "USER_ENTERED",
        }
    }
}

/// Mirror of one sheet (tab) within a workbook. Carries the parent
/// spreadsheet id so operations can be issued without the workbook in
/// hand; the title is not re-synced after construction.
pub struct Worksheet {
    spreadsheet_id: String,
    sheet_id: i32,
    title: String,
    index: i32,
    sheet_type: Option<String>,
    hidden: Option<bool>,
    tab_color: Option<Color>,
    right_to_left: Option<bool>,
    grid: Grid,
}

impl Worksheet {
    pub(crate) fn from_properties(
        spreadsheet_id: &str,
        properties: SheetProperties,
    ) -> Result<Self> {
        let sheet_id = properties
            .sheet_id
            .ok_or_else(|| Error::Data("sheet properties are missing the sheet id".to_string()))?;

        Ok(Self {
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_id,
            title: properties.title.unwrap_or_default(),
            index: properties.index.unwrap_or_default(),
            sheet_type: properties.sheet_type,
            hidden: properties.hidden,
            tab_color: properties.tab_color,
            right_to_left: properties.right_to_left,
            grid: Grid::from_properties(properties.grid_properties.unwrap_or_default()),
        })
    }

    /// Server-assigned numeric id of the worksheet.
    pub fn id(&self) -> i32 {
        self.sheet_id
    }

    /// Title of the worksheet.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Index of the worksheet within its workbook.
    pub fn index(&self) -> i32 {
        self.index
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The API-shaped sheet properties rebuilt from the mirror.
    pub(crate) fn properties(&self) -> SheetProperties {
        SheetProperties {
            sheet_id: Some(self.sheet_id),
            title: Some(self.title.clone()),
            index: Some(self.index),
            sheet_type: self.sheet_type.clone(),
            hidden: self.hidden,
            tab_color: self.tab_color.clone(),
            right_to_left: self.right_to_left,
            grid_properties: Some(self.grid.properties()),
            ..Default::default()
        }
    }

    fn qualified(&self, range: &str) -> String {
        format!("{}!{}", self.title, range)
    }

    /// Fills this worksheet's id into request entries that target a sheet
    /// but left it unspecified. Recognized shapes: cell-repeat,
    /// sheet-property-update, auto-resize, dimension-property-update.
    fn stamp_sheet_id(&self, requests: &mut [Request]) {
        for request in requests.iter_mut() {
            if let Some(repeat) = request.repeat_cell.as_mut() {
                repeat
                    .range
                    .get_or_insert_with(Default::default)
                    .sheet_id
                    .get_or_insert(self.sheet_id);
            }
            if let Some(update) = request.update_sheet_properties.as_mut() {
                update
                    .properties
                    .get_or_insert_with(Default::default)
                    .sheet_id
                    .get_or_insert(self.sheet_id);
            }
            if let Some(resize) = request.auto_resize_dimensions.as_mut() {
                resize
                    .dimensions
                    .get_or_insert_with(Default::default)
                    .sheet_id
                    .get_or_insert(self.sheet_id);
            }
            if let Some(update) = request.update_dimension_properties.as_mut() {
                update
                    .range
                    .get_or_insert_with(Default::default)
                    .sheet_id
                    .get_or_insert(self.sheet_id);
            }
        }
    }

    /// Sends the requests as one atomic batch update against the owning
    /// spreadsheet, stamping this worksheet's id where it was omitted.
    pub async fn batch_update(
        &self,
        session: &Session,
        mut requests: Vec<Request>,
    ) -> Result<BatchUpdateSpreadsheetResponse> {
        self.stamp_sheet_id(&mut requests);
        debug!(
            "🚀 Batch updating '{}' with {} request(s)",
            self.title,
            requests.len()
        );

        let body = BatchUpdateSpreadsheetRequest {
            requests: Some(requests),
            ..Default::default()
        };

        let hub = session.sheets_hub();
        let spreadsheet_id = self.spreadsheet_id.clone();
        Session::execute("batch update worksheet", || {
            let hub = hub;
            let body = body.clone();
            let spreadsheet_id = spreadsheet_id.clone();
            async move {
                hub.spreadsheets()
                    .batch_update(body, &spreadsheet_id)
                    .doit()
                    .await
                    .map(|(_, response)| response)
            }
        })
        .await
    }

    /// Writes a table starting at `start`, header row first.
    ///
    /// # Arguments
    ///
    /// * `table` - The tabular payload; its column names become row one
    /// * `start` - Cell address of the top-left corner (e.g. `"A1"`)
    /// * `input` - Whether the service stores values verbatim or parses them
    ///
    /// # Returns
    ///
    /// The range the server reported as updated, carrying the written
    /// payload coerced the same way a subsequent read would be.
    pub async fn write_values(
        &self,
        session: &Session,
        table: &Table,
        start: &str,
        input: ValueInput,
    ) -> Result<DataRange> {
        let target = self.qualified(start);
        info!(
            "💾 Writing {}x{} values to {}",
            table.rows().len() + 1,
            table.columns().len(),
            target
        );

        let body = ValueRange {
            range: Some(target.clone()),
            major_dimension: Some("ROWS".to_string()),
            values: Some(table.to_grid()),
            ..Default::default()
        };

        let hub = session.sheets_hub();
        let spreadsheet_id = self.spreadsheet_id.clone();
        let input_option = input.as_str();
        let response = Session::execute("update worksheet values", || {
            let hub = hub;
            let body = body.clone();
            let spreadsheet_id = spreadsheet_id.clone();
            let target = target.clone();
            async move {
                hub.spreadsheets()
                    .values_update(body, &spreadsheet_id, &target)
                    .value_input_option(input_option)
                    .doit()
                    .await
                    .map(|(_, response)| response)
            }
        })
        .await?;

        let updated_range = response
            .updated_range
            .ok_or_else(|| Error::Data("values update reply had no updatedRange".to_string()))?;

        DataRange::from_grid(
            response.spreadsheet_id,
            self.sheet_id,
            &updated_range,
            &table.to_grid(),
        )
    }

    /// Reads a range of values; the first row becomes the header and the
    /// rest the coerced body.
    pub async fn read_values(&self, session: &Session, range: &str) -> Result<DataRange> {
        let target = self.qualified(range);
        debug!("📖 Reading values from {}", target);

        let hub = session.sheets_hub();
        let spreadsheet_id = self.spreadsheet_id.clone();
        let response = Session::execute("read worksheet values", || {
            let hub = hub;
            let spreadsheet_id = spreadsheet_id.clone();
            let target = target.clone();
            async move {
                hub.spreadsheets()
                    .values_get(&spreadsheet_id, &target)
                    .doit()
                    .await
                    .map(|(_, response)| response)
            }
        })
        .await?;

        let address = response.range.unwrap_or(target);
        let values = response.values.unwrap_or_default();
        DataRange::from_grid(None, self.sheet_id, &address, &values)
    }

    /// Clears the addressed region. The local mirror is untouched.
    pub async fn clear_values(
        &self,
        session: &Session,
        range: &str,
    ) -> Result<ClearValuesResponse> {
        let target = self.qualified(range);
        info!("🧹 Clearing values in {}", target);

        let hub = session.sheets_hub();
        let spreadsheet_id = self.spreadsheet_id.clone();
        Session::execute("clear worksheet values", || {
            let hub = hub;
            let spreadsheet_id = spreadsheet_id.clone();
            let target = target.clone();
            async move {
                hub.spreadsheets()
                    .values_clear(ClearValuesRequest::default(), &spreadsheet_id, &target)
                    .doit()
                    .await
                    .map(|(_, response)| response)
            }
        })
        .await
    }

    /// Embeds a pivot table on this worksheet, summarizing the given
    /// source range. Field names in the layout are resolved to column
    /// offsets within `source`.
    pub async fn add_pivot_table(
        &self,
        session: &Session,
        layout: &PivotLayout,
        source: &DataRange,
    ) -> Result<BatchUpdateSpreadsheetResponse> {
        let request = pivot::build_pivot_request(layout, source, self.sheet_id)?;
        info!(
            "📈 Adding pivot table to '{}' at {}",
            self.title, layout.position
        );
        self.batch_update(session, vec![request]).await
    }

    /// Adds a slicer bound to one field of the source range, anchored on
    /// this worksheet and applying to all its pivot tables by default.
    pub async fn add_slicer(
        &self,
        session: &Session,
        params: &SlicerParams,
        source: &DataRange,
    ) -> Result<BatchUpdateSpreadsheetResponse> {
        let request = pivot::build_slicer_request(params, source, self.sheet_id)?;
        info!("🎚️ Adding slicer for '{}' on '{}'", params.field, self.title);
        self.batch_update(session, vec![request]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use google_sheets4::api::{
        AutoResizeDimensionsRequest, DimensionRange, GridRange, RepeatCellRequest,
        UpdateDimensionPropertiesRequest, UpdateSheetPropertiesRequest,
    };

    fn worksheet() -> Worksheet {
        Worksheet::from_properties(
            "abc123",
            SheetProperties {
                sheet_id: Some(42),
                title: Some("Data".to_string()),
                index: Some(0),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[test]
    fn properties_without_sheet_id_are_rejected() {
        let result = Worksheet::from_properties("abc123", SheetProperties::default());
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn ranges_are_addressed_through_the_sheet_title() {
        assert_eq!(worksheet().qualified("A1:C3"), "Data!A1:C3");
    }

    #[test]
    fn value_input_renders_the_api_keywords() {
        assert_eq!(ValueInput::Raw.as_str(), "RAW");
        assert_eq!(ValueInput::UserEntered.as_str(), "USER_ENTERED");
        assert_eq!(ValueInput::default(), ValueInput::Raw);
    }

    #[test]
    fn stamping_fills_missing_sheet_ids_on_recognized_requests() {
        let sheet = worksheet();
        let mut requests = vec![
            Request {
                repeat_cell: Some(RepeatCellRequest::default()),
                ..Default::default()
            },
            Request {
                update_sheet_properties: Some(UpdateSheetPropertiesRequest::default()),
                ..Default::default()
            },
            Request {
                auto_resize_dimensions: Some(AutoResizeDimensionsRequest::default()),
                ..Default::default()
            },
            Request {
                update_dimension_properties: Some(UpdateDimensionPropertiesRequest::default()),
                ..Default::default()
            },
        ];

        sheet.stamp_sheet_id(&mut requests);

        assert_eq!(
            requests[0]
                .repeat_cell
                .as_ref()
                .and_then(|r| r.range.as_ref())
                .and_then(|r| r.sheet_id),
            Some(42)
        );
        assert_eq!(
            requests[1]
                .update_sheet_properties
                .as_ref()
                .and_then(|r| r.properties.as_ref())
                .and_then(|p| p.sheet_id),
            Some(42)
        );
        assert_eq!(
            requests[2]
                .auto_resize_dimensions
                .as_ref()
                .and_then(|r| r.dimensions.as_ref())
                .and_then(|d| d.sheet_id),
            Some(42)
        );
        assert_eq!(
            requests[3]
                .update_dimension_properties
                .as_ref()
                .and_then(|r| r.range.as_ref())
                .and_then(|r| r.sheet_id),
            Some(42)
        );
    }

    #[test]
    fn stamping_preserves_explicit_sheet_ids() {
        let sheet = worksheet();
        let mut requests = vec![Request {
            repeat_cell: Some(RepeatCellRequest {
                range: Some(GridRange {
                    sheet_id: Some(7),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }];

        sheet.stamp_sheet_id(&mut requests);

        assert_eq!(
            requests[0]
                .repeat_cell
                .as_ref()
                .and_then(|r| r.range.as_ref())
                .and_then(|r| r.sheet_id),
            Some(7)
        );
    }

    #[test]
    fn stamping_ignores_unrelated_requests() {
        let sheet = worksheet();
        let mut requests = vec![Request {
            update_dimension_properties: Some(UpdateDimensionPropertiesRequest {
                range: Some(DimensionRange {
                    dimension: Some("COLUMNS".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }];

        sheet.stamp_sheet_id(&mut requests);

        let stamped = requests[0]
            .update_dimension_properties
            .as_ref()
            .and_then(|r| r.range.as_ref())
            .unwrap();
        assert_eq!(stamped.sheet_id, Some(42));
        assert_eq!(stamped.dimension.as_deref(), Some("COLUMNS"));
    }

    #[test]
    fn mirror_rebuilds_its_sheet_properties() {
        let sheet = worksheet();
        let properties = sheet.properties();

        assert_eq!(properties.sheet_id, Some(42));
        assert_eq!(properties.title.as_deref(), Some("Data"));
        assert_eq!(properties.index, Some(0));
        assert!(properties.grid_properties.is_some());
    }
}
