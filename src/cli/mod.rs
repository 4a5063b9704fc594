pub mod capacity;
pub mod decode;
pub mod encode;
pub mod info;
mod paths;

pub use capacity::*;
pub use decode::*;
pub use encode::*;
pub use info::*;
