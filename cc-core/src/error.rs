//! Error types shared with the rest of the workspace

pub use cc_error::{CoolingError, Result};
