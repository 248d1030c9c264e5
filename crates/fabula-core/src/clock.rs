//! Timestamp source.

use chrono::{DateTime, SubsecRound, Utc};

/// Current time truncated to microseconds, the finest resolution every
/// supported store keeps. Entities stamped with it compare equal after a
/// round trip through storage.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
