//! Test suites for the watchdog supervisor and process lifecycle.

mod support;
