#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod logging;
mod mock;
mod recorder;

pub use logging::init_tracing;
pub use mock::MockValidator;
pub use recorder::{CallCounter, EventLog};
