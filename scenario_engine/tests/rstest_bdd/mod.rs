//! `rstest-bdd` behaviour tests for `scenario_engine`.
//!
//! Fixtures live in [`fixtures`], step implementations under
//! [`behaviour::steps`], and [`behaviour`] binds the feature files.

mod behaviour;
mod fixtures;
