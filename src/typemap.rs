//! ABI type -> Rust type mapping for generated code

use crate::structs::StructRegistry;
use crate::types::{Elementary, TypeDescriptor};

/// Rust type used for a value of the given ABI type.
///
/// Tuples resolve to their registered struct; a tuple the registry has never
/// seen falls back to a plain Rust tuple.
pub fn rust_type(ty: &TypeDescriptor, structs: &StructRegistry) -> String {
    match ty {
        TypeDescriptor::Elementary(kind) => elementary_type(kind),
        TypeDescriptor::DynamicArray(elem) => format!("Vec<{}>", rust_type(elem, structs)),
        TypeDescriptor::FixedArray(elem, len) => format!("[{}; {}]", fixed_array_element(elem, structs), len),
        TypeDescriptor::Tuple { fields, .. } => match structs.lookup(ty) {
            Some(descriptor) => descriptor.name.clone(),
            None => {
                let inner: Vec<String> = fields.iter().map(|f| rust_type(&f.ty, structs)).collect();
                tuple_type(&inner)
            }
        },
    }
}

/// `ethers` tokenizes `[u8; N]` as fixed bytes, so small unsigned elements of
/// a fixed array widen to `u16`
fn fixed_array_element(elem: &TypeDescriptor, structs: &StructRegistry) -> String {
    match elem {
        TypeDescriptor::Elementary(Elementary::Uint(bits)) if *bits <= 8 => "u16".to_string(),
        _ => rust_type(elem, structs),
    }
}

/// Type of an indexed event field; hashed values only carry their topic hash
pub fn topic_type(ty: &TypeDescriptor, structs: &StructRegistry) -> String {
    if ty.is_hashed_when_indexed() {
        "H256".to_string()
    } else {
        rust_type(ty, structs)
    }
}

/// Render a list of types as a Rust tuple, `()` for none and `(T,)` for one
pub fn tuple_type(types: &[String]) -> String {
    match types {
        [] => "()".to_string(),
        [single] => format!("({},)", single),
        many => format!("({})", many.join(", ")),
    }
}

fn elementary_type(kind: &Elementary) -> String {
    match kind {
        Elementary::Address => "Address".to_string(),
        Elementary::Bool => "bool".to_string(),
        Elementary::String => "String".to_string(),
        Elementary::Bytes => "Bytes".to_string(),
        Elementary::FixedBytes(len) => format!("[u8; {}]", len),
        Elementary::Function => "[u8; 24]".to_string(),
        Elementary::Uint(bits) => match bits {
            0..=8 => "u8",
            9..=16 => "u16",
            17..=32 => "u32",
            33..=64 => "u64",
            65..=128 => "u128",
            _ => "U256",
        }
        .to_string(),
        Elementary::Int(bits) => match bits {
            0..=8 => "i8",
            9..=16 => "i16",
            17..=32 => "i32",
            33..=64 => "i64",
            65..=128 => "i128",
            _ => "I256",
        }
        .to_string(),
    }
}
