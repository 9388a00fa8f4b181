//! # `hashudr key`
//!
//! Computes one key through the full call path. The algorithm is given by
//! canonical name (`sha3-256`) or by raw selector (`29`); raw selectors are
//! passed through unchecked so invalid ones surface the same error a host
//! would see.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use serde::Serialize;

use hashudr_core::{HashAlgorithm, UdrConfig, UdrError};
use hashudr_host::{MemoryHost, MessageWriter, RecordingStatus};
use hashudr_udr::{HashUdr, KeyFunction};

/// Attachment id reported by the CLI's in-memory host.
const CLI_ATTACHMENT_ID: u64 = 1;

/// Largest inline value; longer text must go through `--file`.
const MAX_INLINE_LEN: usize = u16::MAX as usize - 2;

#[derive(Args, Debug)]
pub struct KeyArgs {
    /// Algorithm name (e.g. md5, sha2-256) or numeric selector.
    pub algorithm: String,

    /// Hash this text, passed inline as VARCHAR.
    #[arg(long, conflicts_with = "file", required_unless_present = "file")]
    pub text: Option<String>,

    /// Hash the contents of this file, passed as a BLOB.
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// Emit JSON.
    #[arg(long)]
    pub json: bool,
}

/// Result of one `key` call.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct KeyOutput {
    pub selector: i16,
    pub algorithm: Option<&'static str>,
    pub input_bytes: usize,
    pub key: Option<String>,
}

/// Resolve the algorithm argument to a raw selector.
pub fn parse_selector(raw: &str) -> Result<i16> {
    if let Ok(selector) = raw.trim().parse::<i16>() {
        return Ok(selector);
    }
    HashAlgorithm::from_str(raw)
        .map(HashAlgorithm::selector)
        .map_err(|e| anyhow!("{e}"))
}

/// Compute a key for `args` against a fresh in-memory host.
pub fn compute_key(args: &KeyArgs, config: UdrConfig) -> Result<KeyOutput> {
    let selector = parse_selector(&args.algorithm)?;
    let module = HashUdr::with_config(config).context("invalid configuration")?;
    let host = Arc::new(MemoryHost::new(CLI_ATTACHMENT_ID));
    let status = Arc::new(RecordingStatus::new());

    let (layout, message, input_bytes) = match (&args.text, &args.file) {
        (Some(text), _) => {
            if text.len() > MAX_INLINE_LEN {
                bail!("inline text exceeds {MAX_INLINE_LEN} bytes; use --file");
            }
            let layout = KeyFunction::varchar_input(text.len().max(1));
            let mut writer = MessageWriter::new(&layout);
            writer.write_short(0, selector)?.write_text(1, text.as_bytes())?;
            let bytes = writer.into_bytes();
            (layout, bytes, text.len())
        }
        (None, Some(path)) => {
            let data = std::fs::read(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let len = data.len();
            let blob = host.add_blob(data);
            let layout = KeyFunction::blob_input();
            let mut writer = MessageWriter::new(&layout);
            writer.write_short(0, selector)?.write_blob_id(1, blob)?;
            let bytes = writer.into_bytes();
            (layout, bytes, len)
        }
        (None, None) => bail!("either --text or --file is required"),
    };

    // Prefer what the host was told over the internal error text.
    let reported = |err: UdrError| match status.last() {
        Some(vector) => anyhow!("{vector}"),
        None => anyhow!(err),
    };
    let function = module
        .key_function(status.clone(), host.clone(), layout)
        .map_err(reported)?;
    let key = function
        .execute(status.clone(), host, &message)
        .map_err(reported)?;
    tracing::debug!(selector, input_bytes, "key computed");

    Ok(KeyOutput {
        selector,
        algorithm: HashAlgorithm::from_selector(Some(selector)).ok().map(HashAlgorithm::name),
        input_bytes,
        key,
    })
}

pub fn run_key(args: &KeyArgs) -> Result<u8> {
    let config = UdrConfig::from_env().context("loading HASHUDR_* environment")?;
    let output = compute_key(args, config)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{}", output.key.as_deref().unwrap_or("<null>"));
    }
    Ok(0)
}
