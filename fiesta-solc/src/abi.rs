//! Extraction of function selectors from compiler output

use crate::artifacts::{CompilerOutput, Contract};
use fiesta_core::{
    abi::FunctionExt,
    types::Selector,
};
use std::collections::{BTreeMap, BTreeSet};

/// A canonical function signature found in a compiled contract
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionSelector {
    /// The hash of the artifact the contract was compiled from
    pub hash: String,
    /// The source file the contract is declared in
    pub file: String,
    pub contract: String,
    /// e.g. `transfer(address,uint256)`
    pub signature: String,
}

impl FunctionSelector {
    /// The 4-byte dispatch id of this signature
    pub fn selector(&self) -> Selector {
        fiesta_core::utils::id(&self.signature)
    }
}

/// Extracts the selectors of every contract declared in `file`.
///
/// Contracts without an ABI, or with an ABI that can not be parsed, contribute nothing. Items
/// that are not functions are skipped, as are functions whose signature can not be rendered.
pub fn extract_file(
    hash: &str,
    file: &str,
    contracts: &BTreeMap<String, Contract>,
) -> BTreeSet<FunctionSelector> {
    let mut selectors = BTreeSet::new();
    for (name, contract) in contracts {
        let abi = match contract.abi() {
            Some(Ok(abi)) => abi,
            Some(Err(err)) => {
                tracing::warn!("{hash}: unreadable abi of {file}:{name}: {err}");
                continue
            }
            None => {
                tracing::trace!("{hash}: no abi for {file}:{name}");
                continue
            }
        };
        for function in abi.functions() {
            match function.abi_signature() {
                Ok(signature) => {
                    selectors.insert(FunctionSelector {
                        hash: hash.to_string(),
                        file: file.to_string(),
                        contract: name.clone(),
                        signature,
                    });
                }
                Err(err) => tracing::warn!("{hash}: skipping function of {file}:{name}: {err}"),
            }
        }
    }
    selectors
}

/// Extracts the selectors of all files of the output
pub fn extract(hash: &str, output: &CompilerOutput) -> BTreeSet<FunctionSelector> {
    output
        .contracts
        .iter()
        .flat_map(|(file, contracts)| extract_file(hash, file, contracts))
        .collect()
}
