//! Exported names for methods, events and their parameters.
//!
//! Every anonymous parameter gets a synthetic `argN` name, every name is
//! converted to its exported (PascalCase) form and overloaded functions are
//! given collision-free names. All naming state is local to the call; nothing
//! here keeps counters between invocations.

use std::collections::{HashMap, HashSet};

use inflector::cases::pascalcase::to_pascal_case;
use tracing::debug;

use crate::error::{BindError, Result};
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedParam {
    /// Exported name, unique within its parameter list
    pub name: String,
    pub ty: TypeDescriptor,
    pub indexed: bool,
    /// The descriptor did not name this parameter
    pub synthetic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMethod {
    pub name: String,
    pub inputs: Vec<NormalizedParam>,
    pub outputs: Vec<NormalizedParam>,
    pub original: Method,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub name: String,
    pub inputs: Vec<NormalizedParam>,
    pub original: Event,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedConstructor {
    pub inputs: Vec<NormalizedParam>,
    pub original: Constructor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedInterface {
    pub methods: Vec<NormalizedMethod>,
    pub events: Vec<NormalizedEvent>,
    pub constructor: Option<NormalizedConstructor>,
    pub has_fallback: bool,
    pub has_receive: bool,
}

/// Convert a raw Solidity identifier to its exported form (`balanceOf` ->
/// `BalanceOf`, `_owner` -> `Owner`).
pub fn exported_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    to_pascal_case(&cleaned)
}

/// Name parameters of one list: `argN` for anonymous ones (N is the position),
/// exported form for all, position suffix on clashes.
pub fn normalize_params(params: &[Parameter]) -> Vec<NormalizedParam> {
    let mut taken: HashSet<String> = HashSet::new();

    params
        .iter()
        .enumerate()
        .map(|(position, param)| {
            let declared = param.name.as_deref().map(exported_name).filter(|n| !n.is_empty());
            let synthetic = declared.is_none();
            let mut name = declared.unwrap_or_else(|| exported_name(&format!("arg{}", position)));
            while taken.contains(&name) {
                name = format!("{}{}", name, position);
            }
            taken.insert(name.clone());

            NormalizedParam {
                name,
                ty: param.ty.clone(),
                indexed: param.indexed,
                synthetic,
            }
        })
        .collect()
}

/// Assign collision-free names to functions in source order.
///
/// The first function with a given exported name keeps it, later ones get a
/// 0-based suffix (`Transfer`, `Transfer0`, `Transfer1`). A suffixed name that
/// is already in use by another function is skipped.
pub fn resolve_overloads(exported: &[String]) -> Vec<String> {
    let taken_bare: HashSet<&str> = exported.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut next_suffix: HashMap<&str, usize> = HashMap::new();
    let mut assigned: HashSet<String> = HashSet::new();

    exported
        .iter()
        .map(|base| {
            if seen.insert(base.as_str()) && !assigned.contains(base) {
                assigned.insert(base.clone());
                return base.clone();
            }
            let suffix = next_suffix.entry(base.as_str()).or_insert(0);
            loop {
                let candidate = format!("{}{}", base, suffix);
                *suffix += 1;
                if !taken_bare.contains(candidate.as_str()) && !assigned.contains(&candidate) {
                    assigned.insert(candidate.clone());
                    return candidate;
                }
            }
        })
        .collect()
}

/// Normalize every entry of a parsed interface
pub fn normalize(contract: &str, interface: &ContractInterface) -> Result<NormalizedInterface> {
    let exported: Vec<String> = interface.methods.iter().map(|m| exported_name(&m.name)).collect();
    let names = resolve_overloads(&exported);

    let methods = interface
        .methods
        .iter()
        .zip(names)
        .map(|(method, name)| {
            if name != exported_name(&method.name) {
                debug!("Overloaded {}.{} exported as {}", contract, method.signature(), name);
            }
            NormalizedMethod {
                name,
                inputs: normalize_params(&method.inputs),
                outputs: normalize_params(&method.outputs),
                original: method.clone(),
            }
        })
        .collect();

    let mut events: Vec<NormalizedEvent> = Vec::new();
    for event in &interface.events {
        let name = exported_name(&event.name);
        if let Some(existing) = events.iter().find(|e| e.name == name) {
            if existing.original.signature() == event.signature() {
                debug!("Merging repeated event {} in {}", event.signature(), contract);
                continue;
            }
            return Err(BindError::DuplicateEventName {
                contract: contract.to_string(),
                name,
            });
        }
        events.push(NormalizedEvent {
            name,
            inputs: normalize_params(&event.inputs),
            original: event.clone(),
        });
    }

    let constructor = interface.constructor.as_ref().map(|c| NormalizedConstructor {
        inputs: normalize_params(&c.inputs),
        original: c.clone(),
    });

    Ok(NormalizedInterface {
        methods,
        events,
        constructor,
        has_fallback: interface.has_fallback,
        has_receive: interface.has_receive,
    })
}
