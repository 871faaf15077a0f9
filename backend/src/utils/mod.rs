pub mod html;
pub mod time;

pub use time::*;
