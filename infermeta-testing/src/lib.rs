//! Internal testing utilities for the infermeta crates.

use std::fmt::Debug;
use std::panic::AssertUnwindSafe;

/// Run a table-driven test over a collection of cases.
///
/// Each case is passed to `test` inside a panic guard; after all cases have
/// run, the function panics with a summary naming the failed cases, or
/// returns if every case passed. This makes it possible to see *all* failing
/// entries of a case table in one test run rather than just the first.
///
/// ```
/// use infermeta_testing::eval_cases;
///
/// #[derive(Debug)]
/// struct Case {
///     a: u32,
///     b: u32,
///     sum: u32,
/// }
///
/// let cases = [Case { a: 1, b: 2, sum: 3 }, Case { a: 0, b: 7, sum: 7 }];
/// eval_cases(cases, |case| assert_eq!(case.a + case.b, case.sum));
/// ```
pub fn eval_cases<C: Debug>(cases: impl IntoIterator<Item = C>, test: impl Fn(&C)) {
    let mut failures = Vec::new();
    let mut total = 0;

    for case in cases {
        total += 1;
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| test(&case)));
        if outcome.is_err() {
            failures.push(format!("{:?}", case));
        }
    }

    if !failures.is_empty() {
        panic!(
            "{} of {} cases failed:\n{}",
            failures.len(),
            total,
            failures.join("\n")
        );
    }
}

/// Variant of [`eval_cases`] which passes each case to `test` by value.
///
/// Useful when the test body wants to consume fields of the case.
pub fn eval_cases_owned<C: Debug>(cases: impl IntoIterator<Item = C>, test: impl Fn(C)) {
    let mut failures = Vec::new();
    let mut total = 0;

    for case in cases {
        total += 1;
        let desc = format!("{:?}", case);
        let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| test(case)));
        if outcome.is_err() {
            failures.push(desc);
        }
    }

    if !failures.is_empty() {
        panic!(
            "{} of {} cases failed:\n{}",
            failures.len(),
            total,
            failures.join("\n")
        );
    }
}
