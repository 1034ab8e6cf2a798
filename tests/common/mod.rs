// Not every test binary uses every helper.
#![allow(dead_code)]

pub mod nodes;
pub mod testing;

pub use nodes::*;
pub use testing::*;
