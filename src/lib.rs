//! Core library for the bse-screener command line application.
//!
//! The library turns cached per-company reference data for BSE-listed stocks
//! into flat tables for screening. Responsibilities are kept narrow: the
//! nested record representation lives in [`bse::screener::model`], the
//! schema/column/row flattening in [`bse::screener::flatten`], file adapters
//! under [`bse::screener::io`], screening extraction in
//! [`bse::screener::screen`], and the orchestration used by the binary in
//! [`bse::screener::sync`].

pub mod bse;

pub use bse::screener::{
    Result, ScreenerError, collect, config, error, flatten, io, model, screen, sync,
};
