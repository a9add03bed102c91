#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod question_set;
pub mod scoring;
pub mod status;
pub mod time;

pub use error::Error;
pub use time::{Clock, Countdown, Tick};
