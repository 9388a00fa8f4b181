//! # hashudr-cli — Command-Line Front End
//!
//! Drives the same call path a database host would, against the in-memory
//! host: the connection is bound, the value travels as an input message
//! (inline VARCHAR for `--text`, a blob for `--file`) and the key comes back
//! through the function's result.
//!
//! ## Subcommands
//!
//! ```bash
//! hashudr key md5 --text abc
//! hashudr key 23 --file image.bin --json
//! hashudr algorithms --json
//! ```

pub mod algorithms;
pub mod key;
