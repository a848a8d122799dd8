//! Build orchestration for doku.
//!
//! This crate stages a package's sources and prose into a DocFX project,
//! synthesizes missing navigation, runs DocFX under supervision and
//! publishes the rendered site (see [`pipeline::build`]).

pub mod context;
pub mod docfx;
pub mod fsops;
pub mod init;
pub mod pipeline;
pub mod project;
pub mod stage;
pub mod supervisor;
pub mod title;
pub mod toc;
