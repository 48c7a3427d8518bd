#![cfg(test)]

//! Shared bootstrap for unit tests.

pub mod logging;
