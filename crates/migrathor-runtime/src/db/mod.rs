mod diagnostics;
mod pool;

pub use diagnostics::describe_driver_error;
pub use pool::{connect_options, Database};
