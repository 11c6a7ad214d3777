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

//! Builders for pivot table and slicer requests: field names are resolved
//! to column offsets within a source [`DataRange`] and assembled into the
//! API's nested request shapes.

use crate::error::Result;
use crate::range::{self, DataRange};
use google_sheets4::FieldMask;
use google_sheets4::api::{
    AddSlicerRequest, CellData, EmbeddedObjectPosition, FilterCriteria, GridCoordinate,
    OverlayPosition, PivotFilterCriteria, PivotGroup, PivotTable, PivotValue, Request, RowData,
    Slicer, SlicerSpec, UpdateCellsRequest,
};
use std::collections::HashMap;

const SORT_ASCENDING: &str = "ASCENDING";

/// A row or column grouping field of a pivot table.
#[derive(Debug, Clone)]
pub enum FieldSpec {
    /// Named field with defaults: ascending sort, totals shown for row
    /// fields only.
    Ordered(String),
    /// Named field with overrides merged into the generated group.
    Configured(String, GroupOptions),
}

impl FieldSpec {
    pub fn ordered(name: impl Into<String>) -> Self {
        FieldSpec::Ordered(name.into())
    }

    pub fn configured(name: impl Into<String>, options: GroupOptions) -> Self {
        FieldSpec::Configured(name.into(), options)
    }

    pub fn name(&self) -> &str {
        match self {
            FieldSpec::Ordered(name) | FieldSpec::Configured(name, _) => name,
        }
    }
}

/// Overrides for a [`FieldSpec::Configured`] group.
#[derive(Debug, Clone, Default)]
pub struct GroupOptions {
    /// `"ASCENDING"` or `"DESCENDING"`; ascending when unset.
    pub sort_order: Option<String>,
    /// Totals are hidden when unset.
    pub show_totals: Option<bool>,
    pub label: Option<String>,
    pub repeat_headings: Option<bool>,
}

/// A summarized output of a pivot table.
#[derive(Debug, Clone)]
pub enum ValueSpec {
    /// Named field summarized with SUM.
    Field(String),
    /// Named output with an explicit summarize function keyword, or a
    /// formula when `how` starts with `=` (which forces CUSTOM — a
    /// string-prefix heuristic, unvalidated before sending).
    Summarized { name: String, how: String },
}

impl ValueSpec {
    pub fn field(name: impl Into<String>) -> Self {
        ValueSpec::Field(name.into())
    }

    pub fn summarized(name: impl Into<String>, how: impl Into<String>) -> Self {
        ValueSpec::Summarized {
            name: name.into(),
            how: how.into(),
        }
    }
}

/// The layout of a pivot table: grouping fields, summarized values,
/// visible-value filters, and the anchor cell ("A1" by default).
#[derive(Debug, Clone)]
pub struct PivotLayout {
    pub rows: Vec<FieldSpec>,
    pub columns: Vec<FieldSpec>,
    pub values: Vec<ValueSpec>,
    pub filters: Vec<(String, Vec<String>)>,
    pub position: String,
}

impl PivotLayout {
    pub fn new(rows: Vec<FieldSpec>, values: Vec<ValueSpec>) -> Self {
        Self {
            rows,
            columns: Vec::new(),
            values,
            filters: Vec::new(),
            position: "A1".to_string(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<FieldSpec>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_filters(mut self, filters: Vec<(String, Vec<String>)>) -> Self {
        self.filters = filters;
        self
    }

    pub fn at_cell(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }
}

/// A slicer bound to one field of a source range.
#[derive(Debug, Clone)]
pub struct SlicerParams {
    pub field: String,
    /// Anchor cell on the worksheet, "A1" by default.
    pub position: String,
    /// Defaults to the field name.
    pub title: Option<String>,
    /// Passed through to the API untouched.
    pub filter_criteria: Option<FilterCriteria>,
}

impl SlicerParams {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            position: "A1".to_string(),
            title: None,
            filter_criteria: None,
        }
    }

    pub fn at_cell(mut self, position: impl Into<String>) -> Self {
        self.position = position.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_filter_criteria(mut self, criteria: FilterCriteria) -> Self {
        self.filter_criteria = Some(criteria);
        self
    }
}

fn pivot_group(
    spec: &FieldSpec,
    source: &DataRange,
    totals_when_ordered: bool,
) -> Result<PivotGroup> {
    let offset = source.get_loc(spec.name())? as i32;

    match spec {
        FieldSpec::Ordered(_) => Ok(PivotGroup {
            source_column_offset: Some(offset),
            sort_order: Some(SORT_ASCENDING.to_string()),
            show_totals: Some(totals_when_ordered),
            ..Default::default()
        }),
        FieldSpec::Configured(_, options) => Ok(PivotGroup {
            source_column_offset: Some(offset),
            sort_order: Some(
                options
                    .sort_order
                    .clone()
                    .unwrap_or_else(|| SORT_ASCENDING.to_string()),
            ),
            show_totals: Some(options.show_totals.unwrap_or(false)),
            label: options.label.clone(),
            repeat_headings: options.repeat_headings,
            ..Default::default()
        }),
    }
}

fn pivot_value(spec: &ValueSpec, source: &DataRange) -> Result<PivotValue> {
    match spec {
        ValueSpec::Field(name) => Ok(PivotValue {
            name: Some(name.clone()),
            source_column_offset: Some(source.get_loc(name)? as i32),
            summarize_function: Some("SUM".to_string()),
            ..Default::default()
        }),
        ValueSpec::Summarized { name, how } if how.starts_with('=') => Ok(PivotValue {
            name: Some(name.clone()),
            summarize_function: Some("CUSTOM".to_string()),
            formula: Some(how.clone()),
            ..Default::default()
        }),
        ValueSpec::Summarized { name, how } => Ok(PivotValue {
            name: Some(name.clone()),
            source_column_offset: Some(source.get_loc(name)? as i32),
            summarize_function: Some(how.clone()),
            ..Default::default()
        }),
    }
}

fn pivot_table(layout: &PivotLayout, source: &DataRange) -> Result<PivotTable> {
    let rows = layout
        .rows
        .iter()
        .map(|spec| pivot_group(spec, source, true))
        .collect::<Result<Vec<_>>>()?;
    let columns = layout
        .columns
        .iter()
        .map(|spec| pivot_group(spec, source, false))
        .collect::<Result<Vec<_>>>()?;
    let values = layout
        .values
        .iter()
        .map(|spec| pivot_value(spec, source))
        .collect::<Result<Vec<_>>>()?;

    let mut criteria = HashMap::new();
    for (field, visible) in &layout.filters {
        criteria.insert(
            source.get_loc(field)?.to_string(),
            PivotFilterCriteria {
                visible_values: Some(visible.clone()),
                ..Default::default()
            },
        );
    }

    Ok(PivotTable {
        source: Some(source.grid_range()),
        rows: Some(rows),
        columns: Some(columns),
        values: Some(values),
        criteria: Some(criteria),
        value_layout: Some("HORIZONTAL".to_string()),
        ..Default::default()
    })
}

/// One `updateCells` request embedding the pivot spec at the layout's
/// anchor cell on the given worksheet.
pub(crate) fn build_pivot_request(
    layout: &PivotLayout,
    source: &DataRange,
    anchor_sheet_id: i32,
) -> Result<Request> {
    let (row, column) = range::parse_cell(&layout.position)?;

    Ok(Request {
        update_cells: Some(UpdateCellsRequest {
            rows: Some(vec![RowData {
                values: Some(vec![CellData {
                    pivot_table: Some(pivot_table(layout, source)?),
                    ..Default::default()
                }]),
                ..Default::default()
            }]),
            start: Some(GridCoordinate {
                sheet_id: Some(anchor_sheet_id),
                row_index: Some(row as i32),
                column_index: Some(column as i32),
                ..Default::default()
            }),
            fields: Some(FieldMask::new(&["pivotTable"])),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// One `addSlicer` request anchored at the params' cell on the given
/// worksheet, applying to all pivot tables there by default.
pub(crate) fn build_slicer_request(
    params: &SlicerParams,
    source: &DataRange,
    anchor_sheet_id: i32,
) -> Result<Request> {
    let (row, column) = range::parse_cell(&params.position)?;
    let title = params
        .title
        .clone()
        .unwrap_or_else(|| params.field.clone());

    Ok(Request {
        add_slicer: Some(AddSlicerRequest {
            slicer: Some(Slicer {
                spec: Some(SlicerSpec {
                    data_range: Some(source.grid_range()),
                    column_index: Some(source.get_loc(&params.field)? as i32),
                    apply_to_pivot_tables: Some(true),
                    title: Some(title),
                    filter_criteria: params.filter_criteria.clone(),
                    ..Default::default()
                }),
                position: Some(EmbeddedObjectPosition {
                    overlay_position: Some(OverlayPosition {
                        anchor_cell: Some(GridCoordinate {
                            sheet_id: Some(anchor_sheet_id),
                            row_index: Some(row as i32),
                            column_index: Some(column as i32),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
        }),
        ..Default::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    fn source() -> DataRange {
        DataRange::from_grid(
            None,
            7,
            "Data!A1:C4",
            &[
                vec![json!("Region"), json!("Units"), json!("Price")],
                vec![json!("West"), json!(12), json!(3.5)],
                vec![json!("East"), json!(7), json!(4.0)],
                vec![json!("North"), json!(3), json!(2.25)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn ordered_row_fields_sort_ascending_and_show_totals() {
        let layout = PivotLayout::new(
            vec![FieldSpec::ordered("Region")],
            vec![ValueSpec::field("Units")],
        );

        let request = build_pivot_request(&layout, &source(), 42).unwrap();
        let rendered = serde_json::to_value(&request).unwrap();
        let pivot = &rendered["updateCells"]["rows"][0]["values"][0]["pivotTable"];

        assert_eq!(pivot["rows"][0]["sourceColumnOffset"], 0);
        assert_eq!(pivot["rows"][0]["sortOrder"], "ASCENDING");
        assert_eq!(pivot["rows"][0]["showTotals"], true);
        assert_eq!(pivot["values"][0]["sourceColumnOffset"], 1);
        assert_eq!(pivot["values"][0]["summarizeFunction"], "SUM");
        assert_eq!(pivot["valueLayout"], "HORIZONTAL");

        assert_eq!(pivot["source"]["sheetId"], 7);
        assert_eq!(pivot["source"]["startRowIndex"], 0);
        assert_eq!(pivot["source"]["endRowIndex"], 4);
        assert_eq!(pivot["source"]["startColumnIndex"], 0);
        assert_eq!(pivot["source"]["endColumnIndex"], 3);

        assert_eq!(rendered["updateCells"]["start"]["sheetId"], 42);
        assert_eq!(rendered["updateCells"]["start"]["rowIndex"], 0);
        assert_eq!(rendered["updateCells"]["start"]["columnIndex"], 0);
        assert_eq!(rendered["updateCells"]["fields"], "pivotTable");
    }

    #[test]
    fn configured_fields_merge_their_overrides() {
        let layout = PivotLayout::new(
            vec![FieldSpec::configured(
                "Region",
                GroupOptions {
                    sort_order: Some("DESCENDING".to_string()),
                    label: Some("By region".to_string()),
                    ..Default::default()
                },
            )],
            vec![ValueSpec::field("Units")],
        )
        .with_columns(vec![FieldSpec::ordered("Price")]);

        let request = build_pivot_request(&layout, &source(), 42).unwrap();
        let rendered = serde_json::to_value(&request).unwrap();
        let pivot = &rendered["updateCells"]["rows"][0]["values"][0]["pivotTable"];

        assert_eq!(pivot["rows"][0]["sortOrder"], "DESCENDING");
        assert_eq!(pivot["rows"][0]["showTotals"], false);
        assert_eq!(pivot["rows"][0]["label"], "By region");

        // Column fields never show totals by default.
        assert_eq!(pivot["columns"][0]["sourceColumnOffset"], 2);
        assert_eq!(pivot["columns"][0]["showTotals"], false);
    }

    #[test]
    fn summarize_keyword_and_formula_values() {
        let layout = PivotLayout::new(
            vec![FieldSpec::ordered("Region")],
            vec![
                ValueSpec::summarized("Units", "AVERAGE"),
                ValueSpec::summarized("Revenue", "=Units*Price"),
            ],
        );

        let request = build_pivot_request(&layout, &source(), 42).unwrap();
        let rendered = serde_json::to_value(&request).unwrap();
        let values = &rendered["updateCells"]["rows"][0]["values"][0]["pivotTable"]["values"];

        assert_eq!(values[0]["name"], "Units");
        assert_eq!(values[0]["sourceColumnOffset"], 1);
        assert_eq!(values[0]["summarizeFunction"], "AVERAGE");

        assert_eq!(values[1]["name"], "Revenue");
        assert_eq!(values[1]["summarizeFunction"], "CUSTOM");
        assert_eq!(values[1]["formula"], "=Units*Price");
        assert!(values[1].get("sourceColumnOffset").is_none());
    }

    #[test]
    fn filters_are_keyed_by_column_offset() {
        let layout = PivotLayout::new(
            vec![FieldSpec::ordered("Region")],
            vec![ValueSpec::field("Units")],
        )
        .with_filters(vec![(
            "Region".to_string(),
            vec!["West".to_string(), "East".to_string()],
        )]);

        let request = build_pivot_request(&layout, &source(), 42).unwrap();
        let rendered = serde_json::to_value(&request).unwrap();
        let criteria =
            &rendered["updateCells"]["rows"][0]["values"][0]["pivotTable"]["criteria"];

        assert_eq!(criteria["0"]["visibleValues"], json!(["West", "East"]));
    }

    #[test]
    fn pivot_position_is_translated_to_grid_coordinates() {
        let layout = PivotLayout::new(
            vec![FieldSpec::ordered("Region")],
            vec![ValueSpec::field("Units")],
        )
        .at_cell("E2");

        let request = build_pivot_request(&layout, &source(), 42).unwrap();
        let rendered = serde_json::to_value(&request).unwrap();

        assert_eq!(rendered["updateCells"]["start"]["rowIndex"], 1);
        assert_eq!(rendered["updateCells"]["start"]["columnIndex"], 4);
    }

    #[test]
    fn unknown_fields_fail_resolution() {
        let layout = PivotLayout::new(
            vec![FieldSpec::ordered("Nope")],
            vec![ValueSpec::field("Units")],
        );

        let result = build_pivot_request(&layout, &source(), 42);
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn slicer_binds_the_field_offset_and_anchor() {
        let params = SlicerParams::new("Units").at_cell("D1");
        let request = build_slicer_request(&params, &source(), 42).unwrap();
        let rendered = serde_json::to_value(&request).unwrap();
        let slicer = &rendered["addSlicer"]["slicer"];

        assert_eq!(slicer["spec"]["columnIndex"], 1);
        assert_eq!(slicer["spec"]["applyToPivotTables"], true);
        assert_eq!(slicer["spec"]["title"], "Units");
        assert_eq!(slicer["spec"]["dataRange"]["sheetId"], 7);
        assert_eq!(slicer["spec"]["dataRange"]["endRowIndex"], 4);

        let anchor = &slicer["position"]["overlayPosition"]["anchorCell"];
        assert_eq!(anchor["sheetId"], 42);
        assert_eq!(anchor["rowIndex"], 0);
        assert_eq!(anchor["columnIndex"], 3);
    }

    #[test]
    fn slicer_title_defaults_to_the_field_name() {
        let titled = SlicerParams::new("Units").with_title("Unit filter");
        let request = build_slicer_request(&titled, &source(), 42).unwrap();
        let rendered = serde_json::to_value(&request).unwrap();
        assert_eq!(rendered["addSlicer"]["slicer"]["spec"]["title"], "Unit filter");
    }
}
