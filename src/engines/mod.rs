// src/engines/mod.rs

pub mod adaptive;
pub mod autosave;
pub mod scoring;
