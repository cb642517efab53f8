//! Behavioural harness binding feature files to the shared fixtures.

mod scenarios;
pub mod steps;
