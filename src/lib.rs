//! A Redcode compiler and MARS (Memory Array Redcode Simulator) built for
//! benchmarking Core War warriors.
//!
//! Source text is compiled by the [`parser`] into a [`load_file::Warrior`].
//! Warriors battle in a [`core::Core`]; [`bench`] runs seeded multi-round
//! sessions and adds up a [`bench::Score`], while [`optimize`] scores a
//! candidate against fixed references with as little overhead as possible.
//!
//! ```
//! use corebench::bench::{benchmark, BenchConfig};
//! use corebench::parser;
//!
//! let imp = parser::parse("mov 0, 1").unwrap();
//! let stone = parser::parse("dat #0, #0").unwrap();
//!
//! let score = benchmark(&[imp, stone], &BenchConfig::default()).unwrap();
//! assert_eq!(score.tallies[0].wins, 100);
//! ```

pub mod bench;
pub mod core;
pub mod load_file;
pub mod optimize;
pub mod parser;
