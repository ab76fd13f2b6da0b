//! `compare` subcommand

use super::Cmd;
use crate::config::FiestaConfig;
use clap::Parser;
use eyre::WrapErr;
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};
use yansi::Paint;

/// `compare` subcommand
#[derive(Debug, Clone, Parser)]
pub struct CompareCmd {
    /// A json array of selectors
    pub a: PathBuf,
    /// Another json array of selectors
    pub b: PathBuf,
}

/// Set sizes of two selector lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comparison {
    pub a: usize,
    pub b: usize,
    pub union: usize,
    pub intersection: usize,
    /// `a \ b`
    pub only_a: usize,
    /// `b \ a`
    pub only_b: usize,
}

impl Comparison {
    pub fn new(a: &BTreeSet<String>, b: &BTreeSet<String>) -> Self {
        Self {
            a: a.len(),
            b: b.len(),
            union: a.union(b).count(),
            intersection: a.intersection(b).count(),
            only_a: a.difference(b).count(),
            only_b: b.difference(a).count(),
        }
    }
}

fn load(path: &Path) -> eyre::Result<BTreeSet<String>> {
    let content = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read \"{}\"", path.display()))?;
    serde_json::from_str(&content)
        .wrap_err_with(|| format!("\"{}\" is not a json array of strings", path.display()))
}

impl Cmd for CompareCmd {
    fn run(self, _: FiestaConfig) -> eyre::Result<()> {
        let (a, b) = (load(&self.a)?, load(&self.b)?);
        let cmp = Comparison::new(&a, &b);
        let (name_a, name_b) = (self.a.display(), self.b.display());
        println!("{name_a} {} -- {name_b} {}", cmp.a, cmp.b);
        println!("{} {}", Paint::magenta("Union"), cmp.union);
        println!("{} {}", Paint::magenta("Intersection"), cmp.intersection);
        println!("{name_a} \\ {name_b} {}", cmp.only_a);
        println!("{name_b} \\ {name_a} {}", cmp.only_b);
        Ok(())
    }
}
