//! Error output for the `calc-share` binary.

use calc_share_core::ShareError;

/// Render a command failure for stderr.
///
/// The first line is the full context chain. When the chain holds a
/// [`ShareError`], its user message and suggestion follow as hints.
pub fn error_report(error: &anyhow::Error) -> String {
    let mut report = format!("error: {error:#}");
    let share_error = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<ShareError>());
    if let Some(share_error) = share_error {
        report.push_str("\nhint: ");
        report.push_str(&share_error.user_message());
        if let Some(suggestion) = share_error.suggestion() {
            report.push_str("\nhint: ");
            report.push_str(&suggestion);
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, anyhow};

    #[test]
    fn test_plain_error_has_no_hint() {
        let error = anyhow!("failed to clear shared data");
        assert_eq!(error_report(&error), "error: failed to clear shared data");
    }

    #[test]
    fn test_share_error_under_context_adds_hints() {
        let error = Err::<(), _>(ShareError::UnknownCalculator("unit-converter".into()))
            .context("list connections")
            .unwrap_err();
        let report = error_report(&error);
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("error: list connections: "));
        assert_eq!(lines[1], "hint: There is no calculator named 'unit-converter'.");
        assert_eq!(
            lines[2],
            "hint: Run `calc-share calculators` to list registered ids."
        );
    }
}
