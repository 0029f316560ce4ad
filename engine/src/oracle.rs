//! Assertion oracle.
//!
//! Every check serializes both sides to JSON and compares them
//! structurally, so key order and map iteration order never matter. A
//! mismatch is returned as [`ExpectationFailed`], which the runner tells
//! apart from protocol and I/O errors.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use lspcheck_types::{Counter, Diagnostic, Location, PublishReport, Range};
use lspcheck_utils::{Difference, format_unified_diff, structural_diff, to_sorted_pretty};

use crate::report;

/// A failed assertion, carrying both sides and their differences.
#[derive(Debug, Clone)]
pub struct ExpectationFailed {
    /// 1-based assertion number within the run.
    pub index: usize,
    pub description: String,
    pub expected: Value,
    pub actual: Value,
    pub differences: Vec<Difference>,
}

impl fmt::Display for ExpectationFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[{}] {}: expectation failed", self.index, self.description)?;
        writeln!(f, "\tExpected {}", self.expected)?;
        writeln!(f, "\tbut got  {}", self.actual)?;
        for difference in &self.differences {
            writeln!(f, "\t{difference}")?;
        }
        let diff = format_unified_diff(
            &to_sorted_pretty(&self.expected),
            &to_sorted_pretty(&self.actual),
        );
        for line in diff.lines() {
            writeln!(f, "\t{line}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ExpectationFailed {}

/// Counts assertions and performs the comparisons.
#[derive(Debug, Default)]
pub struct Assertions {
    counter: Counter,
    print_assertions: bool,
}

impl Assertions {
    /// With `print_assertions`, passing checks are printed too. Failures are
    /// always printed.
    pub fn new(print_assertions: bool) -> Self {
        Self {
            counter: Counter::default(),
            print_assertions,
        }
    }

    pub fn counter(&self) -> Counter {
        self.counter
    }

    /// Deep equality of the serialized forms of `actual` and `expected`.
    pub fn expect_equal<A, E>(
        &mut self,
        actual: &A,
        expected: &E,
        description: &str,
    ) -> Result<(), ExpectationFailed>
    where
        A: Serialize + ?Sized,
        E: Serialize + ?Sized,
    {
        let actual = to_json(actual);
        let expected = to_json(expected);
        let differences = structural_diff(&actual, &expected);
        let passed = differences.is_empty();

        self.counter.record(passed);
        let index = self.counter.total;
        if passed {
            if self.print_assertions {
                report::assertion(index, description, true);
            }
            return Ok(());
        }

        report::assertion(index, description, false);
        Err(ExpectationFailed {
            index,
            description: description.to_string(),
            expected,
            actual,
            differences,
        })
    }

    /// Check the code, then the range, of one diagnostic.
    pub fn expect_diagnostic(
        &mut self,
        diagnostic: &Diagnostic,
        code: i64,
        range: Range,
    ) -> Result<(), ExpectationFailed> {
        self.expect_equal(&diagnostic.code, &Some(code), &format!("diagnostic: {code}"))?;
        self.expect_equal(&diagnostic.range, &range, "diagnostic: check range")
    }

    /// Check a location's URI, then each coordinate of its single-line range.
    pub fn expect_location(
        &mut self,
        location: &Location,
        uri: &str,
        line: u32,
        (start_character, end_character): (u32, u32),
    ) -> Result<(), ExpectationFailed> {
        let range = &location.range;
        self.expect_equal(location.uri.as_str(), uri, "location: uri")?;
        self.expect_equal(&range.start.line, &line, "location: start line")?;
        self.expect_equal(&range.start.character, &start_character, "location: start character")?;
        self.expect_equal(&range.end.line, &line, "location: end line")?;
        self.expect_equal(&range.end.character, &end_character, "location: end character")
    }

    /// Exactly one report, without any diagnostics.
    pub fn expect_empty_diagnostics(
        &mut self,
        reports: &[PublishReport],
    ) -> Result<(), ExpectationFailed> {
        self.expect_equal(&reports.len(), &1, "one publish diagnostics notification")?;
        self.expect_equal(
            &reports[0].diagnostics.len(),
            &0,
            "should not contain diagnostics",
        )
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value)
        .unwrap_or_else(|e| Value::String(format!("<unserializable: {e}>")))
}
