//! CLI output formatting for the build and check commands.
//!
//! Each piece has a `format_*` function (returns strings) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are
//! pure. File progress looks like:
//!
//! ```text
//! photos/dawn.jpg → 6 derivatives
//! notes.txt → passthrough
//! photos/broken.jpg → FAILED: Decode error: ...
//! ```
//!
//! and the check command prints the rule inventory:
//!
//! ```text
//! Config OK: 2 rules
//! 001 match: photos/**/*.jpg, (max-width: 1024px)
//!     formats: jpg, webp
//!     widths: 1, 0.5, 480
//! 002 match: (all supported images)
//!     formats: (source format)
//!     widths: (native size)
//! ```

use crate::config::SrcsetConfig;
use crate::pipeline::{BuildSummary, ProcessEvent};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn count(n: usize, singular: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {singular}s")
    }
}

/// One line per completed file.
pub fn format_process_event(event: &ProcessEvent) -> String {
    match event {
        ProcessEvent::FileDone {
            path,
            matched: true,
            outputs,
        } => format!("{} → {}", path.display(), count(*outputs, "derivative")),
        ProcessEvent::FileDone { path, .. } => format!("{} → passthrough", path.display()),
        ProcessEvent::FileFailed { path, error } => {
            format!("{} → FAILED: {}", path.display(), error)
        }
    }
}

/// Aggregate lines printed after the build loop finishes.
pub fn format_summary(summary: &BuildSummary) -> Vec<String> {
    let mut lines = vec![format!(
        "Processed {}: {} matched, {} passed through, {} written",
        count(summary.files, "file"),
        summary.matched,
        summary.passthrough,
        count(summary.outputs, "output"),
    )];
    if !summary.failures.is_empty() {
        lines.push(format!("{}:", count(summary.failures.len(), "failure")));
        for (path, error) in &summary.failures {
            lines.push(format!("    {}: {}", path.display(), error));
        }
    }
    lines
}

pub fn print_summary(summary: &BuildSummary) {
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

fn format_list(values: &[String], empty: &str) -> String {
    if values.is_empty() {
        empty.to_string()
    } else {
        values.join(", ")
    }
}

/// Rule inventory for the `check` command.
pub fn format_check_output(config: &SrcsetConfig) -> Vec<String> {
    let mut lines = vec![format!("Config OK: {}", count(config.rules.len(), "rule"))];
    for (index, rule) in config.rules.iter().enumerate() {
        lines.push(format!(
            "{} match: {}",
            format_index(index + 1),
            format_list(&rule.matchers.to_vec(), "(all supported images)"),
        ));
        lines.push(format!(
            "    formats: {}",
            format_list(&rule.format.to_vec(), "(source format)"),
        ));
        let widths: Vec<String> = rule.width.to_vec().iter().map(f64::to_string).collect();
        lines.push(format!(
            "    widths: {}",
            format_list(&widths, "(native size)"),
        ));
    }
    lines
}

pub fn print_check_output(config: &SrcsetConfig) {
    for line in format_check_output(config) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn event_lines_cover_all_outcomes() {
        assert_eq!(
            format_process_event(&ProcessEvent::FileDone {
                path: PathBuf::from("pics/a.jpg"),
                matched: true,
                outputs: 6,
            }),
            "pics/a.jpg → 6 derivatives"
        );
        assert_eq!(
            format_process_event(&ProcessEvent::FileDone {
                path: PathBuf::from("pics/a.jpg"),
                matched: true,
                outputs: 1,
            }),
            "pics/a.jpg → 1 derivative"
        );
        assert_eq!(
            format_process_event(&ProcessEvent::FileDone {
                path: PathBuf::from("notes.txt"),
                matched: false,
                outputs: 1,
            }),
            "notes.txt → passthrough"
        );
        assert_eq!(
            format_process_event(&ProcessEvent::FileFailed {
                path: PathBuf::from("bad.jpg"),
                error: "boom".into(),
            }),
            "bad.jpg → FAILED: boom"
        );
    }

    #[test]
    fn summary_without_failures_is_a_single_line() {
        let summary = BuildSummary {
            files: 3,
            matched: 2,
            passthrough: 1,
            outputs: 7,
            failures: vec![],
        };
        assert_eq!(
            format_summary(&summary),
            vec!["Processed 3 files: 2 matched, 1 passed through, 7 outputs written"]
        );
    }

    #[test]
    fn summary_lists_failures_indented() {
        let summary = BuildSummary {
            files: 1,
            failures: vec![(PathBuf::from("bad.gif"), "unsupported".into())],
            ..Default::default()
        };
        let lines = format_summary(&summary);
        assert_eq!(lines[1], "1 failure:");
        assert_eq!(lines[2], "    bad.gif: unsupported");
    }

    #[test]
    fn check_output_shows_defaults_for_empty_fields() {
        let config: SrcsetConfig = toml::from_str(
            r#"
            [[rules]]
            match = ["photos/**", "(max-width: 1024px)"]
            format = ["jpg", "webp"]
            width = [1, 0.5]

            [[rules]]
            "#,
        )
        .unwrap();
        let lines = format_check_output(&config);
        assert_eq!(lines[0], "Config OK: 2 rules");
        assert_eq!(lines[1], "001 match: photos/**, (max-width: 1024px)");
        assert_eq!(lines[2], "    formats: jpg, webp");
        assert_eq!(lines[3], "    widths: 1, 0.5");
        assert_eq!(lines[4], "002 match: (all supported images)");
        assert_eq!(lines[5], "    formats: (source format)");
        assert_eq!(lines[6], "    widths: (native size)");
    }
}
