//! Integration test crate for SceneCut.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It depends on every scenecut crate to verify they work together.

#[cfg(test)]
mod support;

#[cfg(test)]
mod analysis;

#[cfg(test)]
mod pipeline;
