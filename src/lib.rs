//! Typed Rust bindings for smart contracts, generated from their ABI.
//!
//! [`generate`] takes parallel lists of contract names, ABI texts and
//! deployment bytecodes and returns the source of one module binding every
//! contract through `ethers`. Generation is a pure transform; reading
//! compiler output is left to [`artifacts`] and [`config`].

pub mod abi_parser;
pub mod artifacts;
pub mod binding;
pub mod config;
pub mod error;
pub mod ident;
pub mod linker;
pub mod normalizer;
pub mod render;
pub mod signature;
pub mod structs;
pub mod typemap;
pub mod types;

use std::collections::HashSet;

use tracing::info;

pub use crate::binding::{AbiFormat, BindingDescriptor, ContractSource};
pub use crate::error::{BindError, Result};
pub use crate::types::{ContractInterface, TypeDescriptor};

use crate::abi_parser::{human_readable_lines, InterfaceParser};
use crate::binding::{contract_type_name, mark_libraries, BindingBuilder};
use crate::ident::is_module_ident;
use crate::linker::{LibraryCatalogue, Linker};
use crate::normalizer::normalize;
use crate::structs::StructRegistry;

/// Generate bindings for a batch of contracts.
///
/// The three slices are parallel: entry `i` of each describes one contract.
/// An empty bytecode (after trimming and removing `0x`) means the contract
/// gets no deploy function.
pub fn generate<S: AsRef<str>>(
    type_names: &[S],
    abi_texts: &[S],
    bytecode_hexes: &[S],
    package_name: &str,
) -> Result<String> {
    if type_names.len() != abi_texts.len() || type_names.len() != bytecode_hexes.len() {
        return Err(BindError::ArityMismatch {
            names: type_names.len(),
            abis: abi_texts.len(),
            bins: bytecode_hexes.len(),
        });
    }

    let mut generator = Generator::new(package_name);
    for ((name, abi), bin) in type_names.iter().zip(abi_texts).zip(bytecode_hexes) {
        generator = generator.contract(name.as_ref(), abi.as_ref(), bin.as_ref());
    }
    generator.generate()
}

/// Batch builder for callers that need more than [`generate`] offers
#[derive(Debug, Clone)]
pub struct Generator {
    package: String,
    contracts: Vec<ContractSource>,
    libraries: Vec<String>,
}

impl Generator {
    pub fn new(package: &str) -> Self {
        Self {
            package: package.to_string(),
            contracts: Vec::new(),
            libraries: Vec::new(),
        }
    }

    pub fn contract(mut self, type_name: &str, abi_text: &str, bytecode_hex: &str) -> Self {
        self.contracts.push(ContractSource {
            type_name: type_name.to_string(),
            abi_text: abi_text.to_string(),
            bytecode_hex: bytecode_hex.to_string(),
        });
        self
    }

    /// Name a library (plain or fully qualified, e.g. `src/Math.sol:Math`)
    /// so its link placeholders resolve to that name.
    pub fn library(mut self, name: &str) -> Self {
        self.libraries.push(name.to_string());
        self
    }

    /// Build the descriptor tree of every contract without rendering it
    pub fn bindings(&self) -> Result<(Vec<BindingDescriptor>, StructRegistry)> {
        if !is_module_ident(&self.package) {
            return Err(BindError::InvalidIdentifier {
                name: self.package.clone(),
            });
        }

        let mut catalogue = LibraryCatalogue::new();
        for library in &self.libraries {
            catalogue.insert(library);
        }

        let mut parsed = Vec::with_capacity(self.contracts.len());
        let mut seen = HashSet::new();
        for source in &self.contracts {
            let type_name = contract_type_name(&source.type_name)?;
            if !seen.insert(type_name.clone()) {
                return Err(BindError::DuplicateContract { name: type_name });
            }
            let interface = InterfaceParser::new(&type_name).parse(&source.abi_text)?;
            let normalized = normalize(&type_name, &interface)?;
            catalogue.insert(&source.type_name);

            let (abi_format, abi_text) = match human_readable_lines(&source.abi_text) {
                Some(lines) => (AbiFormat::HumanReadable, lines.join("\n")),
                None => (AbiFormat::Json, source.abi_text.clone()),
            };
            let source = ContractSource {
                abi_text,
                ..source.clone()
            };
            parsed.push((source, abi_format, normalized));
        }

        // every tuple of the batch is named before any binding is built
        let mut structs = StructRegistry::new();
        for (source, _, _) in &parsed {
            structs.reserve_name(&contract_type_name(&source.type_name)?);
        }
        for (_, _, interface) in &parsed {
            structs.register_interface(interface);
        }

        let linker = Linker::new();
        let builder = BindingBuilder::new(&structs, &linker, &catalogue);
        let mut bindings = parsed
            .iter()
            .map(|(source, format, interface)| builder.build(source, *format, interface))
            .collect::<Result<Vec<_>>>()?;
        mark_libraries(&mut bindings);

        Ok((bindings, structs))
    }

    pub fn generate(&self) -> Result<String> {
        let (bindings, structs) = self.bindings()?;
        let code = render::render(&bindings, structs.structs(), &self.package);
        info!(
            "Generated package {} with {} contract(s) and {} struct(s)",
            self.package,
            bindings.len(),
            structs.len()
        );
        Ok(code)
    }
}
