// src/formatting.rs

use crate::config::OutputFormat;
use crate::core::{MultiQueryResult, QueryResult, Record};
use anyhow::Result;
use hickory_resolver::proto::rr::RecordType;

/// Renders query results for stdout.
pub trait ResultFormatter: Send + Sync {
    fn format_single(&self, result: &QueryResult) -> Result<String>;
    fn format_multi(&self, result: &MultiQueryResult) -> Result<String>;
}

/// Returns the formatter for an output format.
pub fn formatter_for(format: OutputFormat) -> Box<dyn ResultFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::PlainText => Box::new(PlainTextFormatter),
    }
}

pub struct JsonFormatter;

impl ResultFormatter for JsonFormatter {
    fn format_single(&self, result: &QueryResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(result)?)
    }

    fn format_multi(&self, result: &MultiQueryResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(result)?)
    }
}

/// A human-readable formatter, one line per record.
pub struct PlainTextFormatter;

impl PlainTextFormatter {
    fn format_record(&self, record: &Record) -> String {
        format!(
            "  {}\t{}\t{}\t{}",
            record.name,
            record.ttl,
            RecordType::from(record.record_type),
            record.value
        )
    }

    fn format_server(&self, result: &QueryResult) -> Vec<String> {
        let mut lines = Vec::new();
        match &result.error {
            Some(err) => lines.push(format!("[{}] error: {}", result.server, err)),
            None if result.records.is_empty() => lines.push(format!("[{}] no records", result.server)),
            None => {
                lines.push(format!("[{}] {} record(s)", result.server, result.records.len()));
                lines.extend(result.records.iter().map(|r| self.format_record(r)));
            }
        }
        lines
    }
}

impl ResultFormatter for PlainTextFormatter {
    fn format_single(&self, result: &QueryResult) -> Result<String> {
        let mut lines = vec![format!(";; {} {}", result.domain, result.query_type())];
        lines.extend(self.format_server(result));
        Ok(lines.join("\n"))
    }

    fn format_multi(&self, result: &MultiQueryResult) -> Result<String> {
        let succeeded = result.results.iter().filter(|r| r.is_success()).count();
        let mut lines = vec![format!(
            ";; {} {} ({}/{} servers answered)",
            result.domain,
            result.query_type(),
            succeeded,
            result.results.len()
        )];
        for server_result in &result.results {
            lines.extend(self.format_server(server_result));
        }
        if !result.all_ips.is_empty() {
            lines.push(format!(";; unique addresses: {}", result.all_ips.join(", ")));
        }
        Ok(lines.join("\n"))
    }
}
