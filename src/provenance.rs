//! Self-describing provenance for every output this crate produces.
//!
//! Each run renders its effective configuration as a comment block: a banner
//! naming the destination, the invoking tool, then one line per recognized
//! option. Re-runs against the same destination accumulate blocks
//! (new-then-prior) rather than replacing them, so the full history of how an
//! output came to be stays attached to it. Text destinations carry the block
//! as leading `#` lines ahead of the header row; relational destinations use
//! a sibling `<stem>.log` file.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::utils::constants::PROVENANCE_BANNER_WIDTH;

/// The value of one configuration option as it should render.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Str(Option<String>),
    Int(Option<i64>),
    Flag(bool),
}

/// One recognized option: name as it appears on the command line, plus its
/// effective value. Options marked private by the caller are simply never
/// included in the list.
#[derive(Debug, Clone)]
pub struct ConfigOption {
    pub name: &'static str,
    pub value: OptionValue,
}

impl ConfigOption {
    pub fn str(name: &'static str, value: Option<&str>) -> Self {
        Self {
            name,
            value: OptionValue::Str(value.map(|v| v.to_string())),
        }
    }

    pub fn int(name: &'static str, value: Option<i64>) -> Self {
        Self {
            name,
            value: OptionValue::Int(value),
        }
    }

    pub fn flag(name: &'static str, value: bool) -> Self {
        Self {
            name,
            value: OptionValue::Flag(value),
        }
    }
}

/// Render one run's provenance block. Deterministic and order-preserving:
/// options appear exactly as listed. Absent options and unset flags render
/// nothing.
pub fn render_block(destination: Option<&str>, tool: &str, options: &[ConfigOption]) -> String {
    let mut block = String::new();

    match destination {
        Some(label) => {
            let centred = format!("{:#^width$}", format!(" {} ", label), width = PROVENANCE_BANNER_WIDTH);
            block.push_str(&centred);
        }
        None => block.push_str(&"#".repeat(PROVENANCE_BANNER_WIDTH)),
    }
    block.push('\n');

    block.push_str(&format!("# bom-processor {}\n", tool));

    for option in options {
        match &option.value {
            OptionValue::Str(Some(value)) => {
                block.push_str(&format!("#     --{}=\"{}\"\n", option.name, value));
            }
            OptionValue::Int(Some(value)) => {
                block.push_str(&format!("#     --{}={}\n", option.name, value));
            }
            OptionValue::Flag(true) => {
                block.push_str(&format!("#     --{}\n", option.name));
            }
            OptionValue::Str(None) | OptionValue::Int(None) | OptionValue::Flag(false) => {}
        }
    }

    block.push_str(&"#".repeat(PROVENANCE_BANNER_WIDTH));
    block.push('\n');

    block
}

/// History is additive: the new block goes first, any prior text follows.
pub fn merge(new_block: &str, prior: &str) -> String {
    let mut merged = String::with_capacity(new_block.len() + prior.len());
    merged.push_str(new_block);
    merged.push_str(prior);
    merged
}

/// Read the leading comment block of a delimited-text file. A missing file or
/// a file without comments yields the empty string: no prior provenance is
/// not an error.
pub fn read_comment_block(path: &Path) -> Result<String> {
    if !path.exists() {
        return Ok(String::new());
    }

    let reader = BufReader::new(fs::File::open(path)?);
    let mut block = String::new();
    for line in reader.lines() {
        let line = line?;
        if !line.starts_with('#') {
            break;
        }
        block.push_str(&line);
        block.push('\n');
    }
    Ok(block)
}

/// Sibling log file for a relational destination.
pub fn log_path(db_path: &Path) -> PathBuf {
    db_path.with_extension("log")
}

/// Prior provenance of a relational destination; absent log file means none.
pub fn read_log(path: &Path) -> Result<String> {
    if !path.exists() {
        return Ok(String::new());
    }
    Ok(fs::read_to_string(path)?)
}

pub fn write_log(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text)?;
    Ok(())
}
