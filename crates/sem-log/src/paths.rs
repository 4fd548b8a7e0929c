//! Run file naming.
//!
//! Every log owns one stem, `<base>/<program>-<label>-<tag>-<stamp>`, and
//! three files hanging off it: `.csv` for the exported table, `.out` for the
//! console mirror and `.cpt`, which is reserved for checkpoint writers.

use rand::Rng;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

pub const CSV_SUFFIX: &str = ".csv";
pub const OUT_SUFFIX: &str = ".out";
pub const CHECKPOINT_SUFFIX: &str = ".cpt";

/// The fixed set of paths for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    stem: PathBuf,
    csv: PathBuf,
    out: PathBuf,
    checkpoint: PathBuf,
}

impl RunPaths {
    pub fn new(base_dir: &Path, program: &str, label: &str, tag: &str, stamp: &str) -> Self {
        let stem = base_dir.join(format!("{program}-{label}-{tag}-{stamp}"));
        Self::from_stem(stem)
    }

    pub fn from_stem(stem: PathBuf) -> Self {
        // The stem may itself contain dots (`train.py-...`), so suffixes are
        // appended rather than set with `with_extension`.
        Self {
            csv: append_suffix(&stem, CSV_SUFFIX),
            out: append_suffix(&stem, OUT_SUFFIX),
            checkpoint: append_suffix(&stem, CHECKPOINT_SUFFIX),
            stem,
        }
    }

    pub fn stem(&self) -> &Path {
        &self.stem
    }

    pub fn csv(&self) -> &Path {
        &self.csv
    }

    pub fn out(&self) -> &Path {
        &self.out
    }

    pub fn checkpoint(&self) -> &Path {
        &self.checkpoint
    }
}

impl fmt::Display for RunPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} + {}/{}/{}",
            self.stem.display(),
            CSV_SUFFIX,
            OUT_SUFFIX,
            CHECKPOINT_SUFFIX
        )
    }
}

fn append_suffix(stem: &Path, suffix: &str) -> PathBuf {
    let mut raw = OsString::from(stem.as_os_str());
    raw.push(suffix);
    PathBuf::from(raw)
}

/// Last `segments` components of the program path, joined with `-`.
pub fn program_fragment(program: &str, segments: usize) -> String {
    let parts: Vec<&str> = program.split(['/', '\\']).collect();
    let start = parts.len().saturating_sub(segments);
    parts[start..].join("-")
}

/// Random lowercase ASCII tag of `len` characters.
pub fn random_tag<R: Rng + ?Sized>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
        .collect()
}
