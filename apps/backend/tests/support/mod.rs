// Not every test binary uses every helper.
#![allow(dead_code)]

pub mod agents;
pub mod db;
pub mod envs;
pub mod factory;
pub mod fakes;
pub mod logging;

// Re-export only what current tests actually import
pub use db::build_test_state;
