//! # `hashudr algorithms`
//!
//! Lists every selector with its canonical name, family and whether it is
//! implemented.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use hashudr_core::HashAlgorithm;

#[derive(Args, Debug)]
pub struct AlgorithmsArgs {
    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// One catalogue row.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct AlgorithmInfo {
    pub selector: i16,
    pub name: &'static str,
    pub family: &'static str,
    pub supported: bool,
}

/// The full catalogue in selector order.
pub fn catalogue() -> Vec<AlgorithmInfo> {
    HashAlgorithm::ALL
        .iter()
        .map(|alg| AlgorithmInfo {
            selector: alg.selector(),
            name: alg.name(),
            family: alg.family(),
            supported: alg.is_supported(),
        })
        .collect()
}

pub fn run_algorithms(args: &AlgorithmsArgs) -> Result<u8> {
    let rows = catalogue();
    if args.json {
        let json = serde_json::to_string_pretty(&rows).context("serializing catalogue")?;
        println!("{json}");
        return Ok(0);
    }
    println!("{:>8}  {:<14} {:<10} SUPPORTED", "SELECTOR", "NAME", "FAMILY");
    for row in &rows {
        println!(
            "{:>8}  {:<14} {:<10} {}",
            row.selector,
            row.name,
            row.family,
            if row.supported { "yes" } else { "no" }
        );
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_is_in_selector_order() {
        let rows = catalogue();
        assert_eq!(rows.len(), 43);
        assert!(rows.windows(2).all(|w| w[0].selector + 1 == w[1].selector));
        assert_eq!(rows[0].selector, 1);
    }

    #[test]
    fn unsupported_rows_are_flagged() {
        let unsupported = catalogue().into_iter().filter(|r| !r.supported).count();
        assert_eq!(unsupported, 6);
    }

    #[test]
    fn json_shape() {
        let json = serde_json::to_value(catalogue()).unwrap();
        let md5 = json
            .as_array()
            .unwrap()
            .iter()
            .find(|row| row["name"] == "md5")
            .unwrap();
        assert_eq!(md5["selector"], 15);
        assert_eq!(md5["supported"], true);
    }
}
