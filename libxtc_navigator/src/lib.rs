//! # xtc_navigator
//!
//! xtc_navigator is a navigation layer for recorded (and live) instrument data, written
//! in Rust. Experiment data is a sequence of runs, each divided into acquisition steps,
//! each holding timestamped events which carry a variable set of keyed detector records.
//! xtc_navigator presents a single "current event" over the three ways such data can be
//! read, and reconstructs from the configuration records which detectors took part in
//! a run, what they are called and how they were triggered.
//!
//! ## Installation
//!
//! The only method of install is from source, which is laid out below.
//!
//! ### Rust
//!
//! If you have not used Rust before, you will most likely need to install the Rust tool
//! chain. See the [Rust docs](https://www.rust-lang.org/tools/install) for installation
//! instructions.
//!
//! ### Building & Install
//!
//! To build and install the CLI use `cargo install --path ./xtc_navigator_cli` from the
//! top level xtc_navigator repository. The binary will be installed to your cargo
//! install location (typically something like `~/.cargo/bin/`). To use the CLI see the
//! `xtc_navigator_cli` README.
//!
//! ## Data sources
//!
//! Data is selected with a data source string:
//!
//! - `exp=xpptut15:run=54:idx` loads the run fully indexed. Events can be reached by
//! index or by time, steps are not modeled. Several runs can be given (`run=54,56` or
//! `run=54-56`) and are visited one after the other.
//! - `exp=xpptut15:run=54:smd` streams the run's small data step by step. Iterating
//! events crosses step boundaries transparently; the source configuration is rebuilt at
//! every step. Jumps are supported through an index which is built on first use.
//! - `shmem=psana.0` follows a live feed. There is no index, no steps and no jumps.
//!
//! ## Source graphs
//!
//! Every event is bound to the [`graph::SourceGraph`] valid when it was read: the
//! detector sources, their aliases, their readout group and the event code they are
//! triggered on. Graphs are built by the [`resolver::ConfigResolver`] from the Partition,
//! Alias, EvrData, ControlData and Epics configuration records.
//!
//! ## Configuration
//!
//! The CLI is driven by a YAML configuration file. The format is as follows:
//!
//! ```yml
//! data_source: exp=xpptut15:run=54:smd
//! archive_path: /path/to/xpptut15.yaml
//! force_indexed: false
//! live_poll_ms: 100
//! max_events: null
//! build_scan_table: true
//! alias_defaults: {}
//! ```
//!
//! `archive_path` points to a run archive, a YAML file holding the recorded runs of an
//! experiment (see [`archive::RunArchive`]). If `force_indexed` is set, `smd` data
//! sources are loaded indexed. `alias_defaults` maps source strings to the alias they
//! should get when no Alias record names them.
//!
//! ## Scan tables
//!
//! For runs recorded as a scan, the [`scan::ScanTable`] lists for each step the range of
//! events it covers and the values of the scanned control variables.
pub mod archive;
pub mod config;
pub mod cursor;
pub mod data_source_spec;
pub mod datasource;
pub mod error;
pub mod event;
pub mod event_time;
pub mod graph;
pub mod indexed_cursor;
pub mod live_cursor;
pub mod output_map;
pub mod process;
pub mod record;
pub mod registry;
pub mod resolver;
pub mod scan;
pub mod source;
pub mod step_cursor;
pub mod store;
pub mod worker_status;
