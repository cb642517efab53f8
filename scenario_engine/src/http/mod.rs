//! HTTP simulation and response verification.

mod simulator;
mod verify;

pub use simulator::{
    ApplicationFactory, CapturedResponse, Exchange, HttpSimulator, RecordedRequest, abort_request,
};
