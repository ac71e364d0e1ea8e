//! Console rendering for run reports

use colored::{ColoredString, Colorize};

use headspec_core::console::{ConsoleLine, LineKind};
use headspec_core::report::TargetReport;
use headspec_core::Target;

/// Print every report line of a run, colored by line kind.
pub fn print_reports(reports: &[(Target, TargetReport)]) {
    for (_, report) in reports {
        for line in &report.lines {
            println!("{}", paint(line, report.passed));
        }
    }
}

fn paint(line: &ConsoleLine, passed: bool) -> ColoredString {
    let text = line.render();
    match line.kind {
        LineKind::Suite => text.bold(),
        LineKind::SpecPassed => text.green(),
        LineKind::SpecFailed => text.red(),
        LineKind::SpecPending => text.yellow(),
        LineKind::ErrorDetail => text.red(),
        LineKind::Log => text.dimmed(),
        LineKind::Summary => {
            if passed {
                text.green()
            } else {
                text.red()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paint_keeps_indentation() {
        let line = ConsoleLine::new(LineKind::SpecPassed, 4, "✔ works");
        let painted = paint(&line, true);
        assert!(painted.to_string().contains("    ✔ works"));
    }
}
