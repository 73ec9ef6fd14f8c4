//! TTL Module
//!
//! Turns entry options into the row lifetime handed to `USING TTL`.

use chrono::{DateTime, Duration, Utc};

use crate::cache::EntryOptions;
use crate::error::{CacheError, Result};

/// Lifetime in seconds of an entry written without any expiration.
pub const DEFAULT_TTL_SECONDS: i32 = 3600;

// == Resolve Expiration ==
/// Resolves the absolute point in time an entry expires at, if any.
///
/// An absolute expiration must lie strictly after `creation_time`. When a
/// relative expiration is also present it is applied afterwards and wins, so
/// the validated absolute value is discarded.
pub fn resolve_expiration(
    creation_time: DateTime<Utc>,
    options: &EntryOptions,
) -> Result<Option<DateTime<Utc>>> {
    if let Some(absolute) = options.absolute_expiration {
        if absolute <= creation_time {
            return Err(CacheError::OutOfRange {
                field: "absolute_expiration",
                message: format!(
                    "The absolute expiration value must be in the future (got {}).",
                    absolute.to_rfc3339()
                ),
            });
        }
    }

    let mut expiration = options.absolute_expiration;

    if let Some(relative) = options.absolute_expiration_relative_to_now {
        if relative.is_zero() {
            return Err(relative_out_of_range("The relative expiration value must be positive."));
        }
        let relative = Duration::from_std(relative)
            .map_err(|_| relative_out_of_range("The relative expiration value is too large."))?;
        let absolute = creation_time
            .checked_add_signed(relative)
            .ok_or_else(|| relative_out_of_range("The relative expiration value is too large."))?;
        expiration = Some(absolute);
    }

    Ok(expiration)
}

fn relative_out_of_range(message: &str) -> CacheError {
    CacheError::OutOfRange {
        field: "absolute_expiration_relative_to_now",
        message: message.to_string(),
    }
}

// == TTL Seconds ==
/// Whole seconds between creation and expiration, or the default lifetime.
///
/// Fractions of a second are truncated. A lifetime under one second therefore
/// yields 0, which the store treats as "no TTL": such an entry never expires.
pub fn ttl_seconds(creation_time: DateTime<Utc>, expiration: Option<DateTime<Utc>>) -> Result<i32> {
    let Some(expiration) = expiration else {
        return Ok(DEFAULT_TTL_SECONDS);
    };

    let seconds = (expiration - creation_time).num_seconds();
    i32::try_from(seconds).map_err(|_| CacheError::OutOfRange {
        field: "absolute_expiration",
        message: format!("A lifetime of {} seconds exceeds the maximum TTL.", seconds),
    })
}
