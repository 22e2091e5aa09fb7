//! Wall-clock helpers.

use chrono::{DateTime, Utc};

/// Current time in UTC. A thin wrapper so call sites read `nimbus_utils::now()`
/// rather than importing `chrono` directly everywhere.
#[must_use]
pub fn now() -> DateTime<Utc> {
    Utc::now()
}
