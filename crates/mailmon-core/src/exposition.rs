//! Prometheus text exposition (format 0.0.4) for gauge snapshots.

use std::fmt::Write;

use crate::error::{MailmonError, Result};
use crate::gauge::GaugeSample;

/// Media type scrapers expect for the text format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Help text escapes backslash and newline only.
fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".into()
    } else if v.is_infinite() {
        if v.is_sign_positive() { "+Inf".into() } else { "-Inf".into() }
    } else {
        // f64 Display is shortest round-trip and drops a zero fraction.
        format!("{v}")
    }
}

/// Render samples as `# HELP`, `# TYPE`, then the value line, one block per gauge.
pub fn render(samples: &[GaugeSample]) -> Result<String> {
    let mut out = String::with_capacity(samples.len() * 96);
    for s in samples {
        write_sample(&mut out, s).map_err(|e| MailmonError::Encoding(format!("{}: {e}", s.name)))?;
    }
    Ok(out)
}

fn write_sample(out: &mut String, s: &GaugeSample) -> std::fmt::Result {
    writeln!(out, "# HELP {} {}", s.name, escape_help(s.help))?;
    writeln!(out, "# TYPE {} gauge", s.name)?;
    writeln!(out, "{} {}", s.name, format_value(s.value))
}
