//! Console reporting of benchmark results.

use crate::driver::RunResult;
use filter_bench_mongodb::StrategyKind;
use std::fmt::Write;

const RULE: &str = "===============================================";

/// Block printed as soon as one grid cell finishes.
pub fn format_run_result(result: &RunResult) -> String {
    let shape = &result.shape;
    let mut out = String::new();
    let _ = writeln!(out, "Outer objects: {}", shape.outer_count());
    let _ = writeln!(out, "Inner elements: {}", shape.element_count());
    let _ = writeln!(out, "Deleted percentage: {}", shape.deletion_ratio());
    let _ = writeln!(
        out,
        "{}: {:.2} ms",
        StrategyKind::Server.label(),
        result.server_ms
    );
    let _ = writeln!(
        out,
        "{}: {:.2} ms",
        StrategyKind::Client.label(),
        result.client_ms
    );
    out
}

/// Table of every grid cell, framed by rules.
pub fn format_summary(results: &[RunResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(
        out,
        "{:>8} {:>9} {:>8} {:>12} {:>12}",
        "Outer", "Elements", "Deleted", "Server (ms)", "Client (ms)"
    );
    for result in results {
        let shape = &result.shape;
        let _ = writeln!(
            out,
            "{:>8} {:>9} {:>8} {:>12.2} {:>12.2}",
            shape.outer_count(),
            shape.element_count(),
            shape.deletion_ratio(),
            result.server_ms,
            result.client_ms
        );
    }
    let _ = writeln!(out, "{RULE}");
    out
}

/// All results as pretty-printed JSON.
pub fn summary_json(results: &[RunResult]) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(results)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::LatencySamples;
    use nested_docs_generator::DatasetShape;
    use std::time::Duration;

    fn result(outer: usize, elements: usize, ratio: f64, server: u64, client: u64) -> RunResult {
        let mut server_samples = LatencySamples::default();
        server_samples.push(Duration::from_millis(server));
        let mut client_samples = LatencySamples::default();
        client_samples.push(Duration::from_millis(client));

        RunResult::new(
            DatasetShape::new(outer, elements, ratio).unwrap(),
            &server_samples,
            &client_samples,
        )
    }

    #[test]
    fn test_format_run_result() {
        let text = format_run_result(&result(1000, 100, 0.5, 12, 30));
        assert_eq!(
            text,
            "Outer objects: 1000\n\
             Inner elements: 100\n\
             Deleted percentage: 0.5\n\
             Server-side filter: 12.00 ms\n\
             Client-side filter: 30.00 ms\n"
        );
    }

    #[test]
    fn test_format_summary() {
        let text = format_summary(&[result(1000, 100, 0.5, 12, 30), result(100, 10000, 1.0, 7, 9)]);
        let lines: Vec<_> = text.lines().collect();

        assert_eq!(lines.len(), 5);
        assert_eq!(lines[0], RULE);
        assert_eq!(
            lines[1],
            "   Outer  Elements  Deleted  Server (ms)  Client (ms)"
        );
        assert_eq!(
            lines[2],
            "    1000       100      0.5        12.00        30.00"
        );
        assert_eq!(
            lines[3],
            "     100     10000        1         7.00         9.00"
        );
        assert_eq!(lines[4], RULE);
    }

    #[test]
    fn test_summary_json() {
        let json = summary_json(&[result(2, 3, 1.0, 5, 6)]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let first = &value[0];
        assert_eq!(first["shape"]["outer_count"], 2);
        assert_eq!(first["shape"]["element_count"], 3);
        assert_eq!(first["conditions"], "Outer: 2\tElements: 3\tPercentage: 1");
        assert_eq!(first["server_ms"], 5.0);
        assert_eq!(first["client_samples_ms"][0], 6.0);
    }
}
