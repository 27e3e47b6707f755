use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 100 ns ticks between 1601-01-01 and 1970-01-01.
const UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;

const TICKS_PER_SECOND: i64 = 10_000_000;

/// OPC UA `DateTime`: signed count of 100 ns ticks since 1601-01-01T00:00:00Z.
///
/// Encoded on the wire as a little-endian `i64`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UaDateTime(i64);

impl UaDateTime {
    /// 1601-01-01T00:00:00Z.
    pub const MIN: UaDateTime = UaDateTime(0);

    pub const fn from_ticks(ticks: i64) -> Self {
        Self(ticks)
    }

    pub const fn ticks(self) -> i64 {
        self.0
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    /// Convert to `SystemTime`. `None` if the value is out of the platform's range.
    pub fn to_system_time(self) -> Option<SystemTime> {
        let since_unix = self.0.checked_sub(UNIX_EPOCH_TICKS)?;
        let secs = since_unix.div_euclid(TICKS_PER_SECOND);
        let nanos = (since_unix.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
        if secs >= 0 {
            UNIX_EPOCH.checked_add(Duration::new(secs as u64, nanos))
        } else {
            UNIX_EPOCH
                .checked_sub(Duration::from_secs(secs.unsigned_abs()))?
                .checked_add(Duration::from_nanos(nanos as u64))
        }
    }
}

impl From<SystemTime> for UaDateTime {
    fn from(time: SystemTime) -> Self {
        let ticks = match time.duration_since(UNIX_EPOCH) {
            Ok(after) => UNIX_EPOCH_TICKS.saturating_add(duration_ticks(after)),
            Err(err) => UNIX_EPOCH_TICKS.saturating_sub(duration_ticks(err.duration())),
        };
        Self(ticks)
    }
}

/// Unix seconds with a seven-digit tick fraction. Values too far before 1970
/// to offset print as raw ticks with a `ticks:` prefix.
impl fmt::Display for UaDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.checked_sub(UNIX_EPOCH_TICKS) {
            Some(since_unix) => write!(
                f,
                "{}.{:07}",
                since_unix.div_euclid(TICKS_PER_SECOND),
                since_unix.rem_euclid(TICKS_PER_SECOND)
            ),
            None => write!(f, "ticks:{}", self.0),
        }
    }
}

fn duration_ticks(duration: Duration) -> i64 {
    let ticks = duration.as_nanos() / 100;
    i64::try_from(ticks).unwrap_or(i64::MAX)
}
