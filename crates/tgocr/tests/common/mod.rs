//! Shared test utilities for tgocr integration tests.
//!
//! This module provides:
//! - `TestHarness` for runs against a temporary output file
//! - Scripted message sources and extractors standing in for Telegram and Tesseract

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::*;
