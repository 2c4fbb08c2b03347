//! Systems: logic that queries and updates components.

mod navigation;

pub use navigation::*;
