//! Small tools for crunching tab-separated (or otherwise delimited) text:
//! `remap`, `aggregate`, `groupby` and `qplot`. The binaries under
//! `src/bin` are thin command-line layers over the modules here.

pub mod aggregate;
pub mod app;
pub mod cli;
pub mod color;
pub mod data;
pub mod error;
pub mod groupby;
pub mod plot;
pub mod remap;
pub mod state;
pub mod stats;
pub mod ui;
