//! Behavioural step modules registered with `rstest-bdd`.

pub mod http_steps;
pub mod record_steps;
