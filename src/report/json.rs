use std::io::{self, Write};

use crate::model::ComparisonResult;

use super::ReportWriter;

/// The full `ComparisonResult` serialized verbatim as pretty JSON.
pub struct JsonWriter;

impl ReportWriter for JsonWriter {
    fn write(&self, result: &ComparisonResult, out: &mut dyn Write) -> io::Result<()> {
        let json = serde_json::to_string_pretty(result)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(out, "{json}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Summary;

    #[test]
    fn writes_valid_json() {
        let result = ComparisonResult {
            comparisons: Vec::new(),
            summary: Summary::default(),
            status: "noDrift".to_string(),
            exit_code: 0,
            compared_at: "now".to_string(),
            tenant_id: String::new(),
            message: "no drift detected".to_string(),
            threshold_configuration: Default::default(),
        };
        let mut buf = Vec::new();
        JsonWriter.write(&result, &mut buf).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        assert_eq!(parsed["status"], "noDrift");
    }
}
