//! Error types re-exported from qm-error

pub use qm_error::{QuadroError, Result};
