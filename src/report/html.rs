use std::io::{self, Write};

use crate::model::ComparisonResult;

use super::ReportWriter;

/// A minimal, dependency-free HTML report: one table row per compared
/// policy.
pub struct HtmlWriter;

impl ReportWriter for HtmlWriter {
    fn write(&self, result: &ComparisonResult, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "<!DOCTYPE html><html><head><title>Policy Drift Report</title></head><body>")?;
        writeln!(out, "<h1>{}</h1>", escape(&result.status))?;
        writeln!(out, "<p>{}</p>", escape(&result.message))?;
        writeln!(out, "<table border=\"1\"><tr><th>Policy</th><th>Status</th><th>Differences</th></tr>")?;
        for comparison in &result.comparisons {
            writeln!(
                out,
                "<tr><td>{}</td><td>{:?}</td><td>{}</td></tr>",
                escape(&comparison.display_name),
                comparison.status,
                comparison.differences.len(),
            )?;
        }
        writeln!(out, "</table></body></html>")
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Summary;

    #[test]
    fn escapes_html_special_characters() {
        assert_eq!(escape("<script>"), "&lt;script&gt;");
    }

    #[test]
    fn writes_a_well_formed_document() {
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
        HtmlWriter.write(&result, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("<!DOCTYPE html>"));
        assert!(text.trim_end().ends_with("</html>"));
    }
}
