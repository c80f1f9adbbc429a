use anyhow::Result;
use std::io::Write;

use crate::application::StatementReport;

/// Writes statements in machine readable formats.
pub struct Exporter<'a> {
    report: &'a StatementReport,
}

impl<'a> Exporter<'a> {
    pub fn new(report: &'a StatementReport) -> Self {
        Self { report }
    }

    /// Export statement lines to CSV format. Returns the number of lines written.
    pub fn export_statement_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record([
            "id",
            "date",
            "reason",
            "text",
            "reference",
            "tax",
            "debit",
            "credit",
            "balance",
        ])?;

        let mut count = 0;
        for line in &self.report.lines {
            csv_writer.write_record(&[
                line.id.to_string(),
                line.date.clone(),
                line.reason.to_string(),
                line.text.clone(),
                line.reference.clone().unwrap_or_default(),
                line.tax.map(|t| t.to_string()).unwrap_or_default(),
                line.debit().map(|d| d.to_string()).unwrap_or_default(),
                line.credit().map(|c| c.to_string()).unwrap_or_default(),
                line.balance.to_string(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the whole statement report as pretty printed JSON
    pub fn export_statement_json<W: Write>(&self, mut writer: W) -> Result<usize> {
        let json = serde_json::to_string_pretty(self.report)?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(self.report.lines.len())
    }
}
