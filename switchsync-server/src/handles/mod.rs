pub mod switch_handle;
pub mod unit_handle;

pub use switch_handle::*;
pub use unit_handle::*;
