//! Batch-wide registry of tuple types bound as named structs.
//!
//! Tuples are keyed by their canonical field-type sequence, so two tuples
//! that differ only in field names share one struct. The field names of the
//! first instance seen are kept.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::ident::snake_ident;
use crate::normalizer::{exported_name, normalize_params, NormalizedInterface};
use crate::typemap::rust_type;
use crate::types::{Parameter, TypeDescriptor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    /// Exported field name
    pub name: String,
    /// Field identifier in generated code
    pub ident: String,
    pub ty: TypeDescriptor,
    /// Rust type of the field in generated code
    pub rust_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDescriptor {
    pub name: String,
    /// Canonical field-type sequence, e.g. `(uint256,address)`
    pub key: String,
    pub fields: Vec<StructField>,
}

#[derive(Debug, Default)]
pub struct StructRegistry {
    /// Registration order: every struct comes after the structs it uses
    structs: Vec<StructDescriptor>,
    by_key: HashMap<String, usize>,
    names: HashSet<String>,
}

impl StructRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.structs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }

    pub fn structs(&self) -> &[StructDescriptor] {
        &self.structs
    }

    /// The struct bound to a tuple type, if registered
    pub fn lookup(&self, ty: &TypeDescriptor) -> Option<&StructDescriptor> {
        self.by_key.get(&ty.canonical()).map(|&i| &self.structs[i])
    }

    /// Keep `name` free for another item of the generated module
    pub fn reserve_name(&mut self, name: &str) {
        self.names.insert(name.to_string());
    }

    /// Register every tuple nested in `ty`, children before parents
    pub fn register_type(&mut self, ty: &TypeDescriptor) {
        let mut tuples = Vec::new();
        ty.walk_tuples(&mut |t| tuples.push(t));
        for tuple in tuples {
            self.register_tuple(tuple);
        }
    }

    /// Register the tuples of every method, event and constructor parameter
    pub fn register_interface(&mut self, interface: &NormalizedInterface) {
        for ty in interface_types(interface) {
            self.register_type(ty);
        }
    }

    /// Structs reachable from one interface, in registration order
    pub fn reachable(&self, interface: &NormalizedInterface) -> Vec<StructDescriptor> {
        let mut used: HashSet<String> = HashSet::new();
        for ty in interface_types(interface) {
            ty.walk_tuples(&mut |t| {
                used.insert(t.canonical());
            });
        }
        self.structs
            .iter()
            .filter(|s| used.contains(&s.key))
            .cloned()
            .collect()
    }

    fn register_tuple(&mut self, tuple: &TypeDescriptor) {
        let TypeDescriptor::Tuple { fields, struct_name } = tuple else {
            return;
        };
        let key = tuple.canonical();
        if self.by_key.contains_key(&key) {
            return;
        }

        let ordinal = self.structs.len();
        let name = self.pick_name(struct_name.as_deref(), ordinal);

        let params: Vec<Parameter> = fields
            .iter()
            .map(|f| Parameter::new(f.name.as_deref(), f.ty.clone()))
            .collect();
        let registry: &StructRegistry = self;
        let fields = normalize_params(&params)
            .into_iter()
            .map(|p| StructField {
                rust_type: rust_type(&p.ty, registry),
                ident: snake_ident(&p.name),
                name: p.name,
                ty: p.ty,
            })
            .collect();

        debug!("Registered struct {} for {}", name, key);
        self.names.insert(name.clone());
        self.by_key.insert(key.clone(), ordinal);
        self.structs.push(StructDescriptor { name, key, fields });
    }

    /// Source-supplied name when free, otherwise one derived from the ordinal
    fn pick_name(&self, preferred: Option<&str>, ordinal: usize) -> String {
        let base = preferred.map(exported_name).filter(|n| !n.is_empty());
        let mut candidate = match &base {
            Some(name) if !self.names.contains(name) => return name.clone(),
            Some(name) => format!("{}{}", name, ordinal),
            None => format!("Struct{}", ordinal),
        };
        let mut bump = ordinal;
        while self.names.contains(&candidate) {
            bump += 1;
            candidate = format!("{}{}", base.as_deref().unwrap_or("Struct"), bump);
        }
        candidate
    }
}

fn interface_types(interface: &NormalizedInterface) -> Vec<&TypeDescriptor> {
    let mut types = Vec::new();
    for method in &interface.methods {
        types.extend(method.inputs.iter().map(|p| &p.ty));
        types.extend(method.outputs.iter().map(|p| &p.ty));
    }
    for event in &interface.events {
        types.extend(event.inputs.iter().map(|p| &p.ty));
    }
    if let Some(constructor) = &interface.constructor {
        types.extend(constructor.inputs.iter().map(|p| &p.ty));
    }
    types
}
