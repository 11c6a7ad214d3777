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

use thiserror::Error;

/// Result type for all sheetwork operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by this crate.
///
/// Rate limiting is the only condition retried internally; everything else
/// propagates to the caller unchanged. A failed request never touches the
/// local workbook mirror.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing, unreadable, unparseable, or unrefreshable credential.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A title, index, or field lookup found no match.
    #[error("{0} not found")]
    NotFound(String),

    /// The remote service was still rate limiting after the single
    /// internal backoff-and-retry.
    #[error("{operation} is still rate limited after one retry: {source}")]
    RateLimit {
        operation: String,
        #[source]
        source: google_sheets4::Error,
    },

    /// Any other API failure, propagated unchanged.
    #[error("{operation} failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: google_sheets4::Error,
    },

    /// Malformed tabular input: empty value sets, ragged rows, or an
    /// unparseable cell address.
    #[error("invalid tabular data: {0}")]
    Data(String),
}
