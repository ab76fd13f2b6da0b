//! Raw ABI items and their canonical signatures.
//!
//! Signatures are rendered in the form used to derive the 4-byte dispatch id of a function: the
//! function name followed by its parameter types in declaration order, without parameter names,
//! whitespace or return types, e.g. `transfer(address,uint256)`.

use crate::{types::Selector, utils::id};

mod error;
pub use error::AbiError;

mod raw;
pub use raw::{Component, Item, RawAbi};

/// Extension trait for raw ABI items
pub trait FunctionExt {
    /// Compute the method signature in the standard ABI format. This does not
    /// include the output types.
    fn abi_signature(&self) -> Result<String, AbiError>;

    /// Compute the Keccak256 function selector used by contract ABIs.
    fn selector(&self) -> Result<Selector, AbiError> {
        Ok(id(self.abi_signature()?))
    }
}

impl FunctionExt for Item {
    fn abi_signature(&self) -> Result<String, AbiError> {
        if !self.is_function() {
            return Err(AbiError::NotAFunction(self.type_field.clone()))
        }
        let name = self.name.as_deref().map(str::trim).filter(|name| !name.is_empty());
        let name = name.ok_or(AbiError::MissingName)?;
        let inputs = self.inputs.iter().map(canonical_type).collect::<Result<Vec<_>, _>>()?;
        Ok(format!("{name}({})", inputs.join(",")))
    }
}

/// Renders the canonical type of a single parameter.
///
/// Tuples are expanded into their component types, keeping any array suffix of the tuple:
/// `tuple[2][]` with components `address` and `uint` becomes `(address,uint256)[2][]`.
pub fn canonical_type(param: &Component) -> Result<String, AbiError> {
    let ty: String = param.type_field.chars().filter(|c| !c.is_whitespace()).collect();
    if ty.is_empty() {
        return Err(AbiError::InvalidType(param.type_field.clone()))
    }

    let (base, suffix) = split_array_suffix(&ty)?;
    let base = if base == "tuple" {
        if param.components.is_empty() {
            return Err(AbiError::EmptyTuple(param.name.clone()))
        }
        let inner = param.components.iter().map(canonical_type).collect::<Result<Vec<_>, _>>()?;
        format!("({})", inner.join(","))
    } else {
        normalize_elementary(base).to_string()
    };
    Ok(format!("{base}{suffix}"))
}

/// Splits `uint256[2][]` into `("uint256", "[2][]")`
fn split_array_suffix(ty: &str) -> Result<(&str, &str), AbiError> {
    let idx = ty.find('[').unwrap_or(ty.len());
    let (base, suffix) = ty.split_at(idx);
    let well_formed = suffix.split_inclusive(']').all(|dim| {
        dim.strip_prefix('[')
            .and_then(|dim| dim.strip_suffix(']'))
            .map_or(false, |len| len.chars().all(|c| c.is_ascii_digit()))
    });
    if base.is_empty() || !well_formed {
        return Err(AbiError::InvalidType(ty.to_string()))
    }
    Ok((base, suffix))
}

/// `uint` and `int` are aliases of their 256 bit variants
fn normalize_elementary(ty: &str) -> &str {
    match ty {
        "uint" => "uint256",
        "int" => "int256",
        "fixed" => "fixed128x18",
        "ufixed" => "ufixed128x18",
        "byte" => "bytes1",
        other => other,
    }
}
