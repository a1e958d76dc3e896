use std::fmt::Write;

use crate::age::AgeBracket;
use crate::models::DashboardReport;

pub fn render_markdown(report: &DashboardReport) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Student Dashboard");
    let _ = writeln!(output, "Reference date: {}", report.reference_date);
    if let Some(total) = report.total_students {
        let _ = writeln!(output, "Students counted: {total}");
    }
    if let Some(notice) = &report.notice {
        let _ = writeln!(output);
        let _ = writeln!(output, "> {notice}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Age Brackets");

    if report.age_brackets.is_empty() {
        let _ = writeln!(output, "No age data available.");
    } else {
        for bracket in AgeBracket::ALL {
            let count = report.age_brackets.get(&bracket).copied().unwrap_or(0);
            let _ = writeln!(output, "- {bracket}: {count}");
        }
    }

    if let Some(professors) = &report.by_professor {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Students per Professor");

        if professors.is_empty() {
            let _ = writeln!(output, "No professors registered.");
        } else {
            let _ = writeln!(output, "| Professor | Instrument | Students |");
            let _ = writeln!(output, "|---|---|---|");
            for professor in professors {
                let _ = writeln!(
                    output,
                    "| {} | {} | {} |",
                    professor.name, professor.instrument, professor.total_students
                );
            }
        }
    }

    output
}
