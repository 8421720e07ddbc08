//! Render-ready descriptors for one contract.
//!
//! Every decision the renderer needs (identifiers, Rust types, call vs.
//! transaction, structured returns, link placeholders) is made here so the
//! renderer only walks the tree and prints.

use std::collections::HashSet;

use tracing::{debug, info};

use crate::error::{BindError, Result};
use crate::ident::{constant_ident, is_type_ident, snake_ident};
use crate::linker::{LibraryCatalogue, LibraryPlaceholder, Linker};
use crate::normalizer::{exported_name, NormalizedEvent, NormalizedInterface, NormalizedMethod, NormalizedParam};
use crate::signature::to_hex_prefixed;
use crate::structs::{StructDescriptor, StructRegistry};
use crate::typemap::{rust_type, topic_type};
use crate::types::{StateMutability, TypeDescriptor};

/// Helper names every generated contract type already defines
const RESERVED_METHODS: &[&str] = &["new", "abi", "address", "contract", "deploy", "fallback", "receive", "unpack_log"];

/// Names `deploy` already binds before the constructor arguments
const DEPLOY_LOCALS: &[&str] = &["client", "bytecode", "factory"];

/// How the ABI constant is loaded back at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbiFormat {
    Json,
    /// One human-readable signature per line
    HumanReadable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundParam {
    /// Exported name
    pub name: String,
    pub ident: String,
    pub ty: TypeDescriptor,
    pub rust_type: String,
    pub indexed: bool,
    /// Indexed value only present as its keccak256 hash
    pub hashed: bool,
    pub synthetic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundMethod {
    pub normalized: NormalizedMethod,
    pub ident: String,
    pub inputs: Vec<BoundParam>,
    pub outputs: Vec<BoundParam>,
    /// Outputs are returned as one record instead of a tuple
    pub structured: bool,
    pub selector: [u8; 4],
}

impl BoundMethod {
    pub fn name(&self) -> &str {
        &self.normalized.name
    }

    pub fn selector_hex(&self) -> String {
        hex::encode(self.selector)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundEvent {
    pub normalized: NormalizedEvent,
    pub ident: String,
    pub inputs: Vec<BoundParam>,
    pub topic: Option<[u8; 32]>,
}

impl BoundEvent {
    pub fn name(&self) -> &str {
        &self.normalized.name
    }

    pub fn topic_hex(&self) -> Option<String> {
        self.topic.map(|t| to_hex_prefixed(&t))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundConstructor {
    pub inputs: Vec<BoundParam>,
    pub payable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingDescriptor {
    /// Rust type name of the contract binding
    pub type_name: String,
    /// Prefix of the contract's generated constants
    pub const_prefix: String,
    pub abi_text: String,
    pub abi_format: AbiFormat,
    /// Bytecode without `0x`; `None` means no deploy function
    pub bytecode_hex: Option<String>,
    pub calls: Vec<BoundMethod>,
    pub transacts: Vec<BoundMethod>,
    pub events: Vec<BoundEvent>,
    pub constructor: Option<BoundConstructor>,
    /// Structs reachable from this contract, dependencies first
    pub structs_used: Vec<StructDescriptor>,
    pub libraries: Vec<LibraryPlaceholder>,
    /// Another contract of the batch links against this one
    pub is_library: bool,
    /// Selector hex -> canonical signature, in declaration order
    pub func_sigs: Vec<(String, String)>,
    pub has_fallback: bool,
    pub has_receive: bool,
}

/// Raw inputs for one contract of a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractSource {
    pub type_name: String,
    pub abi_text: String,
    pub bytecode_hex: String,
}

/// Outputs are bundled into a record when there are at least two and the
/// descriptor named every one of them.
pub fn is_structured(outputs: &[NormalizedParam]) -> bool {
    outputs.len() >= 2 && outputs.iter().all(|o| !o.synthetic)
}

/// Strip whitespace and `0x`; empty bytecode means "not deployable"
pub fn normalize_bytecode(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    (!hex.is_empty()).then(|| hex.to_string())
}

/// Contract type name in exported form, rejected if unusable in Rust
pub fn contract_type_name(raw: &str) -> Result<String> {
    let name = exported_name(raw);
    if is_type_ident(&name) {
        Ok(name)
    } else {
        Err(BindError::InvalidIdentifier { name: raw.to_string() })
    }
}

pub struct BindingBuilder<'a> {
    structs: &'a StructRegistry,
    linker: &'a Linker,
    catalogue: &'a LibraryCatalogue,
}

impl<'a> BindingBuilder<'a> {
    pub fn new(structs: &'a StructRegistry, linker: &'a Linker, catalogue: &'a LibraryCatalogue) -> Self {
        Self {
            structs,
            linker,
            catalogue,
        }
    }

    /// Assemble the descriptor of one contract.
    ///
    /// The struct registry must already hold every tuple of the batch.
    pub fn build(
        &self,
        source: &ContractSource,
        abi_format: AbiFormat,
        interface: &NormalizedInterface,
    ) -> Result<BindingDescriptor> {
        let type_name = contract_type_name(&source.type_name)?;

        let mut used_idents: HashSet<String> = RESERVED_METHODS.iter().map(|s| s.to_string()).collect();
        let mut calls = Vec::new();
        let mut transacts = Vec::new();
        for method in &interface.methods {
            let bound = self.bind_method(method, &mut used_idents);
            if method.original.state_mutability.is_read_only() {
                calls.push(bound);
            } else {
                transacts.push(bound);
            }
        }

        let events = interface.events.iter().map(|e| self.bind_event(e)).collect();

        let bytecode_hex = normalize_bytecode(&source.bytecode_hex);
        let libraries = bytecode_hex
            .as_deref()
            .map(|bin| self.linker.find_placeholders(bin, self.catalogue))
            .unwrap_or_default();

        let constructor = interface.constructor.as_ref().map(|c| {
            // `deploy` takes the client and library addresses and binds two locals
            let mut deploy_idents: HashSet<String> = DEPLOY_LOCALS.iter().map(|s| s.to_string()).collect();
            deploy_idents.extend(libraries.iter().map(library_ident));
            let mut inputs = self.bind_params(&c.inputs);
            for input in inputs.iter_mut() {
                while deploy_idents.contains(&input.ident) {
                    input.ident.push('_');
                }
                deploy_idents.insert(input.ident.clone());
            }
            BoundConstructor {
                inputs,
                payable: c.original.state_mutability == StateMutability::Payable,
            }
        });

        let func_sigs = interface
            .methods
            .iter()
            .map(|m| (hex::encode(m.original.selector()), m.original.signature()))
            .collect();

        let descriptor = BindingDescriptor {
            const_prefix: constant_ident(&type_name),
            type_name,
            abi_text: source.abi_text.clone(),
            abi_format,
            bytecode_hex,
            calls,
            transacts,
            events,
            constructor,
            structs_used: self.structs.reachable(interface),
            libraries,
            is_library: false,
            func_sigs,
            has_fallback: interface.has_fallback,
            has_receive: interface.has_receive,
        };

        info!(
            "Bound {}: {} call(s), {} transaction(s), {} event(s), {} struct(s), {} library link(s)",
            descriptor.type_name,
            descriptor.calls.len(),
            descriptor.transacts.len(),
            descriptor.events.len(),
            descriptor.structs_used.len(),
            descriptor.libraries.len()
        );

        Ok(descriptor)
    }

    fn bind_method(&self, method: &NormalizedMethod, used_idents: &mut HashSet<String>) -> BoundMethod {
        let mut ident = snake_ident(&method.name);
        while used_idents.contains(&ident) {
            ident.push('_');
        }
        used_idents.insert(ident.clone());

        BoundMethod {
            ident,
            inputs: self.bind_params(&method.inputs),
            outputs: self.bind_params(&method.outputs),
            structured: is_structured(&method.outputs),
            selector: method.original.selector(),
            normalized: method.clone(),
        }
    }

    fn bind_event(&self, event: &NormalizedEvent) -> BoundEvent {
        let inputs = self
            .bind_params(&event.inputs)
            .into_iter()
            .map(|mut p| {
                // the log struct keeps the undecoded log in `raw`
                if p.ident == "raw" {
                    p.ident.push('_');
                }
                if p.indexed && p.ty.is_hashed_when_indexed() {
                    debug!("Indexed {} {} decodes to its hash", p.ty, p.name);
                    p.hashed = true;
                    p.rust_type = topic_type(&p.ty, self.structs);
                }
                p
            })
            .collect();

        BoundEvent {
            ident: snake_ident(&event.name),
            inputs,
            topic: event.original.topic(),
            normalized: event.clone(),
        }
    }

    fn bind_params(&self, params: &[NormalizedParam]) -> Vec<BoundParam> {
        params
            .iter()
            .map(|p| BoundParam {
                name: p.name.clone(),
                ident: snake_ident(&p.name),
                ty: p.ty.clone(),
                rust_type: rust_type(&p.ty, self.structs),
                indexed: p.indexed,
                hashed: false,
                synthetic: p.synthetic,
            })
            .collect()
    }
}

/// Parameter name of a library address in the generated `deploy`
pub fn library_ident(library: &LibraryPlaceholder) -> String {
    snake_ident(&format!("{}Library", exported_name(&library.library_name)))
}

/// Flag every contract whose name another contract of the batch links to
pub fn mark_libraries(bindings: &mut [BindingDescriptor]) {
    let linked: HashSet<String> = bindings
        .iter()
        .flat_map(|b| b.libraries.iter().map(|l| exported_name(&l.library_name)))
        .collect();
    for binding in bindings.iter_mut() {
        binding.is_library = linked.contains(&binding.type_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi_parser::InterfaceParser;
    use crate::linker::link_pattern;
    use crate::normalizer::normalize;

    fn build(abi: &str, bytecode: &str) -> BindingDescriptor {
        let parsed = InterfaceParser::new("Token").parse(abi).unwrap();
        let interface = normalize("Token", &parsed).unwrap();
        let mut structs = StructRegistry::new();
        structs.register_interface(&interface);
        let linker = Linker::new();
        let mut catalogue = LibraryCatalogue::new();
        catalogue.insert("Math");
        let source = ContractSource {
            type_name: "Token".into(),
            abi_text: abi.into(),
            bytecode_hex: bytecode.into(),
        };
        BindingBuilder::new(&structs, &linker, &catalogue)
            .build(&source, AbiFormat::Json, &interface)
            .unwrap()
    }

    fn outputs(names: &[&str]) -> Vec<NormalizedParam> {
        names
            .iter()
            .map(|n| NormalizedParam {
                name: if n.is_empty() { "Arg0".into() } else { exported_name(n) },
                ty: crate::abi_parser::parse_type("uint256").unwrap(),
                indexed: false,
                synthetic: n.is_empty(),
            })
            .collect()
    }

    #[test]
    fn structured_return_rule() {
        assert!(is_structured(&outputs(&["a", "b"])));
        assert!(!is_structured(&outputs(&["", ""])));
        assert!(!is_structured(&outputs(&["a", ""])));
        assert!(!is_structured(&outputs(&["a"])));
        assert!(!is_structured(&outputs(&[])));
    }

    #[test]
    fn methods_split_by_mutability() {
        let abi = r#"[
            {"type": "function", "name": "name", "stateMutability": "pure", "inputs": [], "outputs": [{"name": "", "type": "string"}]},
            {"type": "function", "name": "balanceOf", "stateMutability": "view", "inputs": [{"name": "", "type": "address"}], "outputs": [{"name": "", "type": "uint256"}]},
            {"type": "function", "name": "transfer", "stateMutability": "nonpayable", "inputs": [], "outputs": []},
            {"type": "function", "name": "deposit", "stateMutability": "payable", "inputs": [], "outputs": []}
        ]"#;
        let binding = build(abi, "");
        let calls: Vec<&str> = binding.calls.iter().map(|m| m.name()).collect();
        let transacts: Vec<&str> = binding.transacts.iter().map(|m| m.name()).collect();
        assert_eq!(calls, vec!["Name", "BalanceOf"]);
        assert_eq!(transacts, vec!["Transfer", "Deposit"]);
        assert_eq!(binding.bytecode_hex, None);
        assert_eq!(binding.func_sigs[1], ("70a08231".to_string(), "balanceOf(address)".to_string()));
    }

    #[test]
    fn helper_names_are_not_shadowed() {
        let abi = r#"[{"type": "function", "name": "deploy", "stateMutability": "nonpayable", "inputs": [], "outputs": []}]"#;
        let binding = build(abi, "");
        assert_eq!(binding.transacts[0].ident, "deploy_");
    }

    #[test]
    fn constructor_inputs_avoid_deploy_names() {
        let abi = r#"[{"type": "constructor", "stateMutability": "nonpayable", "inputs": [
            {"name": "_factory", "type": "address"},
            {"name": "_WETH", "type": "address"},
            {"name": "bytecode", "type": "bytes"},
            {"name": "client", "type": "address"},
            {"name": "mathLibrary", "type": "address"}
        ]}]"#;
        let bin = format!("0x6080{}6000", format!("__${}$__", link_pattern("Math")));
        let binding = build(abi, &bin);
        assert_eq!(library_ident(&binding.libraries[0]), "math_library");

        let idents: Vec<&str> = binding
            .constructor
            .as_ref()
            .unwrap()
            .inputs
            .iter()
            .map(|p| p.ident.as_str())
            .collect();
        assert_eq!(idents, vec!["factory_", "weth", "bytecode_", "client_", "math_library_"]);
    }

    #[test]
    fn indexed_dynamic_event_fields_are_hashes() {
        let abi = r#"[{"type": "event", "name": "Registered", "anonymous": false, "inputs": [
            {"name": "label", "type": "string", "indexed": true},
            {"name": "owner", "type": "address", "indexed": true},
            {"name": "note", "type": "string", "indexed": false}
        ]}]"#;
        let binding = build(abi, "");
        let fields = &binding.events[0].inputs;
        assert!(fields[0].hashed);
        assert_eq!(fields[0].rust_type, "H256");
        assert!(!fields[1].hashed);
        assert_eq!(fields[1].rust_type, "Address");
        assert!(!fields[2].hashed);
        assert_eq!(fields[2].rust_type, "String");
    }

    #[test]
    fn bytecode_placeholders_become_libraries() {
        let token = format!("__${}$__", link_pattern("Math"));
        let binding = build("[]", &format!("0x6080{}6000", token));
        assert_eq!(binding.libraries.len(), 1);
        assert_eq!(binding.libraries[0].library_name, "Math");
        assert_eq!(binding.libraries[0].link_pattern, token);
        assert!(binding.bytecode_hex.as_deref().unwrap().starts_with("6080"));

        let plain = build("[]", "0x60806040");
        assert!(plain.libraries.is_empty());
    }

    #[test]
    fn linked_contracts_are_marked_as_libraries() {
        let mut bindings = vec![build("[]", ""), build("[]", "")];
        bindings[1].type_name = "Math".into();
        bindings[0].libraries.push(LibraryPlaceholder {
            link_pattern: format!("__${}$__", link_pattern("Math")),
            library_name: "Math".into(),
        });
        mark_libraries(&mut bindings);
        assert!(!bindings[0].is_library);
        assert!(bindings[1].is_library);
    }

    #[test]
    fn contract_names_must_be_identifiers() {
        assert_eq!(contract_type_name("erc20").unwrap(), "Erc20");
        assert!(matches!(contract_type_name("1inch"), Err(BindError::InvalidIdentifier { .. })));
        assert!(matches!(contract_type_name(""), Err(BindError::InvalidIdentifier { .. })));
    }
}
