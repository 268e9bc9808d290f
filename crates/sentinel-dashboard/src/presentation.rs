//! # Presentation Mapper
//!
//! Pure derivation of marker color, status label and popup body from the
//! threat verdict and report of a telemetry entry.

use sentinel_domain::ThreatLevel;

/// Marker color for units whose last report was classified `THREAT`
pub const ALERT_COLOR: &str = "#ff003c";

/// Marker color for everything else
pub const NOMINAL_COLOR: &str = "#00f3ff";

/// Status shown while no verdict is available
pub const SCANNING_LABEL: &str = "Scanning...";

/// Report line shown while no report is available
pub const NO_REPORT: &str = "No visual";

/// Visual attributes of one marker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Presentation {
    pub color: &'static str,
    pub label: String,
    pub popup_content: String,
}

impl Presentation {
    pub fn is_alert(&self) -> bool {
        self.color == ALERT_COLOR
    }
}

/// Map `(threat_level, report)` to marker presentation. Never panics.
pub fn present(threat_level: Option<&str>, report: Option<&str>) -> Presentation {
    let verdict = threat_level.map(str::trim).filter(|v| !v.is_empty());

    let color = match verdict.map(ThreatLevel::parse) {
        Some(ThreatLevel::Threat) => ALERT_COLOR,
        _ => NOMINAL_COLOR,
    };
    let label = verdict.map_or_else(|| SCANNING_LABEL.to_string(), str::to_ascii_uppercase);
    let report = report
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map_or_else(|| NO_REPORT.to_string(), escape_html);

    let popup_content = format!(
        "Status: <b>{}</b><br>Report: <i>{report}</i>",
        escape_html(&label)
    );

    Presentation {
        color,
        label,
        popup_content,
    }
}

/// Full popup for a marker: call-sign header followed by the body.
pub fn popup_for(call_sign: &str, presentation: &Presentation) -> String {
    format!(
        "<b>{}</b><br>{}",
        escape_html(call_sign),
        presentation.popup_content
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
