use super::args::*;

pub mod dispatch;
pub mod profiles;
pub(crate) mod report;
pub mod resolve;
pub(crate) mod settings;
pub mod validate;

pub use dispatch::dispatch;
