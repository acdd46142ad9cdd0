//! Domain-specific assertion macros for logmill harnesses.
//!
//! These wrap `pretty_assertions` and add failure messages that say which
//! report or plan broke, and how.

// ---------------------------------------------------------------------------
// Plan assertions
// ---------------------------------------------------------------------------

/// Assert the stage names of a compiled plan.
///
/// ```rust
/// assert_stages!(plan, ["match", "sort", "limit"]);
/// ```
#[macro_export]
macro_rules! assert_stages {
    ($plan:expr, [$($stage:expr),* $(,)?]) => {{
        let plan: &logmill_core::criteria::QueryPlan = &$plan;
        let expected: Vec<&str> = vec![$($stage),*];
        pretty_assertions::assert_eq!(
            plan.stage_names(),
            expected,
            "assert_stages! failed: stage order differs"
        );
    }};
}

// ---------------------------------------------------------------------------
// Report assertions
// ---------------------------------------------------------------------------

/// Assert the exact path counts of a schema report.
///
/// ```rust
/// assert_schema!(report, {"a.b" => 1, "d" => 2});
/// ```
#[macro_export]
macro_rules! assert_schema {
    ($report:expr, {$($path:expr => $count:expr),* $(,)?}) => {{
        let report: &logmill_core::schema::SchemaReport = &$report;
        let expected: std::collections::BTreeMap<String, u64> =
            [$(($path.to_string(), $count as u64)),*].into_iter().collect();
        pretty_assertions::assert_eq!(
            report.schema,
            expected,
            "assert_schema! failed: path counts differ (total = {})",
            report.total
        );
    }};
}

/// Assert a dashboard KPI's total and percentage.
///
/// ```rust
/// assert_kpi!(overview.errors, 3, 30.0);
/// ```
#[macro_export]
macro_rules! assert_kpi {
    ($kpi:expr, $total:expr, $percentage:expr) => {{
        let kpi: &logmill_core::dashboard::Kpi = &$kpi;
        let total: u64 = $total;
        let percentage: f64 = $percentage;
        if kpi.total != total || (kpi.percentage - percentage).abs() > 1e-9 {
            panic!(
                "assert_kpi! failed:\n  expected: total={} percentage={}\n  actual:   total={} percentage={}",
                total, percentage, kpi.total, kpi.percentage
            );
        }
    }};
}

/// Assert that every log in a result set satisfies a predicate.
#[macro_export]
macro_rules! assert_results_all {
    ($results:expr, $pred:expr) => {{
        let results: &[logmill_core::ParsedLog] = &$results;
        let pred = $pred;
        let failing: Vec<_> = results.iter().filter(|l| !pred(*l)).map(|l| &l.raw).collect();
        if !failing.is_empty() {
            panic!(
                "assert_results_all! failed: {} of {} logs did not satisfy predicate: {:?}",
                failing.len(),
                results.len(),
                failing
            );
        }
    }};
}
