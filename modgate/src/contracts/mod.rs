//! Module contracts.
//!
//! - [`ContractExtractor`] scans declaration text for named blocks
//! - [`validate_contract`] diffs the declarations against a [`ModuleContract`]

mod extractor;
mod validator;

pub use extractor::{
    ContractExtractor, DeclaredSymbol, ExtractionResult, INPUT_KEYWORD, OUTPUT_KEYWORD,
};
pub use validator::{
    validate_contract, ContractReport, ContractViolation, DeclarationsFile, ModuleContract,
};
