//! Task records and the shared task stream.

pub mod record;
pub mod source;

pub use record::TaskRecord;
pub use source::TaskSource;
