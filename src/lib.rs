//! Subtitle Reader - stabilizes per-frame OCR results for narration
//!
//! A recognizer reads subtitles from camera frames a few times per second.
//! This crate turns that noisy stream into phrases worth speaking: each
//! frame is scored for plausibility, matched against the phrase on screen,
//! and emitted once when the phrase changes or has been stable long enough.

pub mod app;
pub mod capture;
pub mod config;
pub mod narration;
pub mod stabilizer;
pub mod storage;
pub mod vision;
