// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Domain errors surfaced to the submitting user. Everything here is
/// terminal for the current request; nothing is retried.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Rows that do not exist and rows owned by someone else are reported
    /// identically.
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid amount '{0}': must be at least 0.01")]
    InvalidAmount(String),

    #[error("Category '{category}' is an {category_kind} category but the entry is {entry_kind}")]
    KindMismatch {
        category: String,
        category_kind: String,
        entry_kind: String,
    },

    #[error("Category '{0}' is inactive")]
    InactiveCategory(String),

    #[error("Refusing to delete without --yes: would remove {0}")]
    ConfirmationRequired(String),
}
