//! Per-hook timing records for startup and shutdown reports.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

use super::CallerFrame;

/// How long one hook action took, and where the hook came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HookRecord {
    pub function: String,
    pub caller: CallerFrame,
    pub runtime: Duration,
}

impl fmt::Display for HookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} took {:?} from {}", self.function, self.runtime, self.caller)
    }
}

/// Records of one start or stop phase, in execution order until sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HookRecords(Vec<HookRecord>);

impl HookRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    pub(crate) fn push(&mut self, record: HookRecord) {
        self.0.push(record);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HookRecord> {
        self.0.iter()
    }

    /// Slowest first. Ties keep execution order.
    pub fn sort_by_runtime(&mut self) {
        self.0.sort_by(|a, b| b.runtime.cmp(&a.runtime));
    }

    pub fn total_runtime(&self) -> Duration {
        self.0.iter().map(|r| r.runtime).sum()
    }
}

impl<'a> IntoIterator for &'a HookRecords {
    type Item = &'a HookRecord;
    type IntoIter = std::slice::Iter<'a, HookRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<HookRecord>> for HookRecords {
    fn from(records: Vec<HookRecord>) -> Self {
        Self(records)
    }
}

impl fmt::Display for HookRecords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, record) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(function: &str, millis: u64) -> HookRecord {
        HookRecord {
            function: function.to_string(),
            caller: CallerFrame {
                file: "src/app.rs",
                line: 10,
                column: 5,
            },
            runtime: Duration::from_millis(millis),
        }
    }

    #[test]
    fn test_sort_slowest_first() {
        let mut records = HookRecords::from(vec![
            record("fast", 1),
            record("slow", 30),
            record("medium", 10),
            record("also_fast", 1),
        ]);
        records.sort_by_runtime();

        let order: Vec<_> = records.iter().map(|r| r.function.as_str()).collect();
        assert_eq!(order, vec!["slow", "medium", "fast", "also_fast"]);
        assert_eq!(records.total_runtime(), Duration::from_millis(42));
    }

    #[test]
    fn test_display() {
        let records = HookRecords::from(vec![record("db::connect", 3), record("http::listen", 1)]);
        assert_eq!(
            records.to_string(),
            "db::connect took 3ms from src/app.rs:10:5\nhttp::listen took 1ms from src/app.rs:10:5"
        );
        assert_eq!(HookRecords::new().to_string(), "");
    }

    #[test]
    fn test_serialize() {
        let records = HookRecords::from(vec![record("db::connect", 3)]);
        let json = serde_json::to_value(&records).unwrap();
        assert_eq!(json[0]["function"], "db::connect");
        assert_eq!(json[0]["caller"]["line"], 10);
        assert_eq!(json[0]["runtime"]["nanos"], 3_000_000);
    }
}
