use std::io::{self, Write};

use serde::Serialize;

/// Errors shown in a human summary; the rest are only counted.
pub const DISPLAYED_ERRORS: usize = 5;

/// Counters accumulated over one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStatistics {
    /// Records fetched from the database.
    pub records_seen: usize,
    /// Records whose member identifier resolved.
    pub with_identifier: usize,
    /// Records skipped because no identifier resolved.
    pub without_identifier: usize,
    /// Resolved members that belong to at least one category.
    pub members_with_categories: usize,
    /// Records written (or that would be written in simulation mode).
    pub updated: usize,
    /// Records whose tags already matched.
    pub unchanged: usize,
    /// Records whose write was rejected.
    pub failed: usize,
    pub tags_added: usize,
    pub tags_removed: usize,
    /// Options appended to the tag column schema.
    pub schema_options_added: Vec<String>,
    pub simulated: bool,
    pub errors: Vec<String>,
}

impl RunStatistics {
    #[must_use]
    pub fn new(simulated: bool) -> Self {
        Self {
            simulated,
            ..Self::default()
        }
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.failed += 1;
        self.errors.push(message.into());
    }

    /// Write the end-of-run summary for humans.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `w` fails.
    pub fn write_summary(&self, w: &mut dyn Write) -> io::Result<()> {
        writeln!(w, "{:=<50}", "")?;
        writeln!(w, "SUMMARY")?;
        writeln!(w, "{:=<50}", "")?;
        writeln!(w, "Total records processed: {}", self.records_seen)?;
        writeln!(
            w,
            "Records {}: {}",
            if self.simulated { "to update" } else { "updated" },
            self.updated
        )?;
        writeln!(w, "Records unchanged: {}", self.unchanged)?;
        writeln!(w, "Records without identifier: {}", self.without_identifier)?;
        writeln!(w, "Identifiers found: {}", self.with_identifier)?;
        writeln!(w, "Identifiers with categories: {}", self.members_with_categories)?;
        writeln!(w, "Total tags added: {}", self.tags_added)?;
        writeln!(w, "Total tags removed: {}", self.tags_removed)?;
        if !self.schema_options_added.is_empty() {
            writeln!(
                w,
                "Schema options added: {}",
                self.schema_options_added.join(", ")
            )?;
        }

        if !self.errors.is_empty() {
            writeln!(w)?;
            writeln!(w, "Errors encountered: {}", self.errors.len())?;
            for error in self.errors.iter().take(DISPLAYED_ERRORS) {
                writeln!(w, "  - {error}")?;
            }
            if self.errors.len() > DISPLAYED_ERRORS {
                writeln!(w, "  ... and {} more", self.errors.len() - DISPLAYED_ERRORS)?;
            }
        }

        if self.simulated {
            writeln!(w)?;
            writeln!(w, "** DRY RUN - no changes were made **")?;
        }
        Ok(())
    }
}
