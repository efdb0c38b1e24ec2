//! Implementation of the phases of a render run.
//!
//! ## Overview
//!
//! A run follows these phases:
//! 1. Root - Render the app-of-apps chart once and resolve its applications
//! 2. Render - For each application: clone (or reuse a clone), render its chart
//! 3. Write - Save each rendered manifest under the output partitions
//!
//! Phase 1 is sequential. Phases 2 and 3 run per application on a bounded
//! worker pool driven by the orchestrator, which shares a single clone cache
//! between workers.

pub mod orchestrator;
pub mod render;
pub mod root;
pub mod write;
