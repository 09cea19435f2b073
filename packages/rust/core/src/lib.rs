//! Core pipeline orchestration and domain logic for drivesite.
//!
//! This crate ties together remote listing, selection, naming, conversion,
//! and site assembly into the end-to-end [`pipeline::run`].

pub mod naming;
pub mod pipeline;
pub mod planner;
pub mod site;
