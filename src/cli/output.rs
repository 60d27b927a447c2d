use clap::ValueEnum;
use colored::Colorize;

use crate::capture::stage::StagingReport;
use crate::core::presentation::{FileNode, LineNumbering};
use crate::core::session::FocusedLine;
use crate::utils::truncate;

/// Maximum code width shown per line
const CODE_WIDTH: usize = 80;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable terminal output with colors
    #[default]
    Pretty,
    /// JSON output for machine consumption
    Json,
}

/// Format the marked-files tree
pub fn format_nodes(nodes: &[FileNode], format: OutputFormat) -> String {
    match format {
        OutputFormat::Pretty => format_nodes_pretty(nodes),
        OutputFormat::Json => format_nodes_json(nodes),
    }
}

fn format_nodes_pretty(nodes: &[FileNode]) -> String {
    if nodes.is_empty() {
        return "No marked lines.\n".to_string();
    }

    let mut output = String::new();
    for node in nodes {
        output.push_str(&format!(
            "{} {}\n",
            node.path.bold(),
            format!("({} lines)", node.line_count).dimmed()
        ));
        let last = node.ranges.len().saturating_sub(1);
        for (i, item) in node.ranges.iter().enumerate() {
            let branch = if i == last { "└─" } else { "├─" };
            output.push_str(&format!("  {} {}\n", branch.dimmed(), item.label.yellow()));
        }
    }

    let total: usize = nodes.iter().map(|n| n.line_count).sum();
    output.push_str(&format!(
        "{}\n",
        format!("{} marked lines in {} files", total, nodes.len()).dimmed()
    ));
    output
}

fn format_nodes_json(nodes: &[FileNode]) -> String {
    serde_json::to_string_pretty(&serde_json::json!({ "files": nodes }))
        .unwrap_or_else(|_| "{}".to_string())
}

/// Format lines returned for a navigation request
pub fn format_focus(path: &str, lines: &[FocusedLine], numbering: LineNumbering) -> String {
    let mut output = format!("{}\n", path.bold());
    if lines.is_empty() {
        output.push_str(&format!("{}\n", "(range is past the end of the file)".dimmed()));
        return output;
    }

    for line in lines {
        let number = format!("{:>5}", numbering.line(line.row));
        let marker = if line.marked {
            "✕".red().bold().to_string()
        } else {
            " ".to_string()
        };
        let code = truncate(&line.text, CODE_WIDTH);
        let code = if line.marked {
            code.dimmed().to_string()
        } else {
            code
        };
        output.push_str(&format!("{} {} │ {}\n", number.dimmed(), marker, code));
    }
    output
}

/// Format the outcome of a staging pass
pub fn format_report(report: &StagingReport, format: OutputFormat) -> String {
    match format {
        OutputFormat::Pretty => format_report_pretty(report),
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .unwrap_or_else(|_| "{}".to_string()),
    }
}

fn format_report_pretty(report: &StagingReport) -> String {
    let mut output = String::new();

    for file in &report.staged {
        output.push_str(&format!(
            "{} {} {}\n",
            "staged".green(),
            file.path,
            format!("(left out {} marked lines)", file.excluded_lines).dimmed()
        ));
    }
    for failure in &report.failed {
        output.push_str(&format!(
            "{} {}: {}\n",
            "failed".red().bold(),
            failure.path,
            failure.error
        ));
    }

    if report.staged.is_empty() && report.failed.is_empty() {
        output.push_str("No marked files to stage.\n");
    }
    output
}
