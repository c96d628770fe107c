pub mod asserts;
pub mod dispatchers;
pub mod fixtures;

pub use asserts::*;
pub use dispatchers::*;
pub use fixtures::*;
