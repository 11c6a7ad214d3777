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

use google_sheets4::api::GridProperties;

/// Descriptive mirror of one sheet's grid: dimensions, frozen counts, and
/// display flags. No identity of its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    pub row_count: Option<i32>,
    pub column_count: Option<i32>,
    pub frozen_row_count: Option<i32>,
    pub frozen_column_count: Option<i32>,
    pub hide_gridlines: Option<bool>,
    pub row_group_control_after: Option<bool>,
    pub column_group_control_after: Option<bool>,
}

impl Grid {
    pub(crate) fn from_properties(properties: GridProperties) -> Self {
        Self {
            row_count: properties.row_count,
            column_count: properties.column_count,
            frozen_row_count: properties.frozen_row_count,
            frozen_column_count: properties.frozen_column_count,
            hide_gridlines: properties.hide_gridlines,
            row_group_control_after: properties.row_group_control_after,
            column_group_control_after: properties.column_group_control_after,
        }
    }

    /// The API-shaped grid properties rebuilt from the mirror.
    pub(crate) fn properties(&self) -> GridProperties {
        GridProperties {
            row_count: self.row_count,
            column_count: self.column_count,
            frozen_row_count: self.frozen_row_count,
            frozen_column_count: self.frozen_column_count,
            hide_gridlines: self.hide_gridlines,
            row_group_control_after: self.row_group_control_after,
            column_group_control_after: self.column_group_control_after,
            ..Default::default()
        }
    }
}

/// Grid dimensions for a sheet being created: 1000x26 by default, with an
/// optional `(rows, cols)` pair of frozen counts.
#[derive(Debug, Clone)]
pub struct GridConfig {
    pub rows: i32,
    pub cols: i32,
    pub freeze: Option<(i32, i32)>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 1000,
            cols: 26,
            freeze: None,
        }
    }
}

impl GridConfig {
    pub(crate) fn properties(&self) -> GridProperties {
        let mut properties = GridProperties {
            row_count: Some(self.rows),
            column_count: Some(self.cols),
            ..Default::default()
        };

        if let Some((frozen_rows, frozen_cols)) = self.freeze {
            properties.frozen_row_count = Some(frozen_rows);
            properties.frozen_column_count = Some(frozen_cols);
        }

        properties
    }
}
