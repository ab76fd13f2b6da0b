//! Standard json input and output types, reduced to what the ABI index needs

use fiesta_core::abi::RawAbi;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Solidity files are made up of multiple `source units`, a solidity contract is such a `source
/// unit`, therefore a solidity file can contain multiple contracts: (1-N*) relationship.
///
/// This types represents this mapping as `file name -> (contract name -> T)`
pub type FileToContractsMap<T> = BTreeMap<String, BTreeMap<String, T>>;

/// file -> (contract name -> Contract)
pub type Contracts = FileToContractsMap<Contract>;

const SOLIDITY: &str = "Solidity";

/// Input type `solc` expects
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompilerInput {
    pub language: String,
    pub sources: BTreeMap<String, Source>,
    pub settings: Settings,
}

impl CompilerInput {
    /// A single solidity file input that only selects the ABI of every contract
    pub fn single_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            language: SOLIDITY.to_string(),
            sources: BTreeMap::from([(name.into(), Source::new(content))]),
            settings: Settings::new(OutputSelection::abi_only()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub content: String,
}

impl Source {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub output_selection: OutputSelection,
}

impl Settings {
    pub fn new(output_selection: impl Into<OutputSelection>) -> Self {
        Self { output_selection: output_selection.into() }
    }
}

/// `file -> (contract -> [outputs])`, `*` matches everything
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputSelection(pub BTreeMap<String, BTreeMap<String, Vec<String>>>);

impl OutputSelection {
    /// `{"*": {"*": ["abi"]}}`
    pub fn abi_only() -> Self {
        let contracts = BTreeMap::from([("*".to_string(), vec!["abi".to_string()])]);
        Self(BTreeMap::from([("*".to_string(), contracts)]))
    }
}

/// Output type `solc` produces
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct CompilerOutput {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<Error>,
    #[serde(default)]
    pub contracts: Contracts,
}

impl CompilerOutput {
    /// Whether the output contains a compiler error
    pub fn has_error(&self) -> bool {
        self.errors.iter().any(Error::is_error)
    }

    /// Iterate over all contracts and their names
    pub fn contracts_iter(&self) -> impl Iterator<Item = (&String, &Contract)> {
        self.contracts.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.values().all(BTreeMap::is_empty)
    }
}

/// A compiled contract, only the ABI is selected
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Default)]
pub struct Contract {
    /// Kept as plain json so one odd ABI does not invalidate the whole output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<serde_json::Value>,
}

impl Contract {
    /// The parsed ABI, `None` if the compiler emitted none
    pub fn abi(&self) -> Option<serde_json::Result<RawAbi>> {
        self.abi.as_ref().map(|abi| serde_json::from_value(abi.clone()))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Error {
    #[serde(default)]
    pub severity: String,
    #[serde(default, rename = "type")]
    pub r#type: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_message: Option<String>,
}

impl Error {
    pub fn is_error(&self) -> bool {
        self.severity.eq_ignore_ascii_case("error")
    }
}
