use crate::clock::Clock;
use crate::domain::{CommandEntry, HistoryRow};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Single-pass group-by over history rows, keyed by command text.
///
/// Entries live in first-seen order so a stable sort leaves ties in that
/// order too.
#[derive(Debug)]
pub struct Aggregator {
    include_deleted: bool,
    clock: Clock,
    index: HashMap<String, usize>,
    entries: Vec<CommandEntry>,
}

impl Aggregator {
    pub fn new(include_deleted: bool, clock: Clock) -> Self {
        Self {
            include_deleted,
            clock,
            index: HashMap::new(),
            entries: Vec::new(),
        }
    }

    /// Fold one row in. `row_no` only feeds error messages.
    pub fn push(&mut self, row: HistoryRow, row_no: u64) -> Result<()> {
        // The query already filters these; rows from a looser query still must not count.
        if row.deleted_at.is_some() && !self.include_deleted {
            return Ok(());
        }

        if let Some(&i) = self.index.get(&row.command) {
            let newer = if row.timestamp > self.entries[i].last_used {
                Some(self.format(row.timestamp, row_no)?)
            } else {
                None
            };
            let entry = &mut self.entries[i];
            entry.count += 1;
            if let Some(formatted) = newer {
                entry.last_used = row.timestamp;
                entry.last_used_str = formatted;
            }
            return Ok(());
        }

        let last_used_str = self.format(row.timestamp, row_no)?;
        self.index.insert(row.command.clone(), self.entries.len());
        self.entries.push(CommandEntry {
            command: row.command,
            count: 1,
            last_used: row.timestamp,
            last_used_str,
        });
        Ok(())
    }

    fn format(&self, timestamp: i64, row_no: u64) -> Result<String> {
        self.clock.format(timestamp).ok_or(Error::BadTimestamp {
            row: row_no,
            value: timestamp,
        })
    }

    /// Number of distinct commands seen so far.
    pub fn distinct(&self) -> usize {
        self.entries.len()
    }

    pub fn finish(self) -> Vec<CommandEntry> {
        self.entries
    }
}
