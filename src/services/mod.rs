// src/services/mod.rs
//
// Exam engine: pure selection, scheduling, ordering and grading logic.
// Nothing here touches the network; only `ExamScheduler` talks to a `Store`.

pub mod delivery;
pub mod directory;
pub mod schedule;
pub mod scoring;
pub mod sequencer;
