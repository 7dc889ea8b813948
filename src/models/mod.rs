pub mod attempt;
pub mod request;
pub mod scan_result;

pub use attempt::*;
pub use request::*;
pub use scan_result::*;
