//! Canonical types shared across the platform

use chrono::{DateTime, Utc};

/// Database DateTime type used across all Renva crates
///
/// This is the canonical datetime type for TIMESTAMPTZ columns and for
/// API responses (serializes as ISO 8601 with 'Z' suffix).
pub type DBDateTime = DateTime<Utc>;
