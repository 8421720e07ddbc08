use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{BindError, Result};
use crate::types::*;

/// Longest slice of an offending entry quoted back in an error
const FRAGMENT_LIMIT: usize = 96;

/// One entry of a JSON ABI, dispatched on its `type` tag
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum RawEntry {
    Function(RawFunction),
    Event(RawEvent),
    Constructor(RawConstructor),
    Fallback(RawFallback),
    Receive {},
    Error(RawError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFunction {
    name: String,
    #[serde(default)]
    inputs: Vec<RawParam>,
    #[serde(default)]
    outputs: Vec<RawParam>,
    state_mutability: Option<RawMutability>,
    constant: Option<bool>,
    payable: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    name: String,
    #[serde(default)]
    inputs: Vec<RawParam>,
    #[serde(default)]
    anonymous: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConstructor {
    #[serde(default)]
    inputs: Vec<RawParam>,
    state_mutability: Option<RawMutability>,
    payable: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFallback {
    state_mutability: Option<RawMutability>,
}

#[derive(Debug, Deserialize)]
struct RawError {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParam {
    #[serde(default)]
    name: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    components: Option<Vec<RawParam>>,
    #[serde(default)]
    internal_type: Option<String>,
    #[serde(default)]
    indexed: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RawMutability {
    Pure,
    View,
    Nonpayable,
    Payable,
}

impl From<RawMutability> for StateMutability {
    fn from(raw: RawMutability) -> Self {
        match raw {
            RawMutability::Pure => StateMutability::Pure,
            RawMutability::View => StateMutability::View,
            RawMutability::Nonpayable => StateMutability::NonPayable,
            RawMutability::Payable => StateMutability::Payable,
        }
    }
}

/// A parsed ABI entry, in the order it appeared in the descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbiEntry {
    Function(Method),
    Event(Event),
    Constructor(Constructor),
    Fallback { payable: bool },
    Receive,
    /// Custom errors are recognized but not bound
    Error { name: String },
}

/// Parses interface descriptors of one contract
pub struct InterfaceParser {
    contract: String,
}

impl InterfaceParser {
    pub fn new(contract: &str) -> Self {
        Self {
            contract: contract.to_string(),
        }
    }

    /// Parse a descriptor into its ordered entries.
    ///
    /// Accepts a JSON ABI array, or a JSON array of human-readable signatures
    /// such as `"function balanceOf(address) view returns (uint256)"`.
    pub fn parse_entries(&self, text: &str) -> Result<Vec<AbiEntry>> {
        let document: Value = serde_json::from_str(text)
            .map_err(|e| BindError::malformed(&self.contract, None, e.to_string()))?;

        let items = match document {
            Value::Array(items) => items,
            other => {
                return Err(BindError::malformed(
                    &self.contract,
                    None,
                    format!("expected a JSON array, found {}", fragment(&other)),
                ))
            }
        };

        if !items.is_empty() && items.iter().all(Value::is_string) {
            return self.parse_human_readable(&items);
        }

        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| self.parse_entry(index, item))
            .collect()
    }

    /// Parse a descriptor and group its entries by kind
    pub fn parse(&self, text: &str) -> Result<ContractInterface> {
        let mut interface = ContractInterface::default();

        for entry in self.parse_entries(text)? {
            match entry {
                AbiEntry::Function(method) => interface.methods.push(method),
                AbiEntry::Event(event) => interface.events.push(event),
                AbiEntry::Constructor(constructor) => {
                    if interface.constructor.is_some() {
                        return Err(BindError::malformed(&self.contract, None, "more than one constructor"));
                    }
                    interface.constructor = Some(constructor);
                }
                AbiEntry::Fallback { .. } => interface.has_fallback = true,
                AbiEntry::Receive => interface.has_receive = true,
                AbiEntry::Error { name } => {
                    debug!("Skipping custom error {} in {}", name, self.contract);
                }
            }
        }

        debug!(
            "Parsed {}: {} method(s), {} event(s), constructor: {}",
            self.contract,
            interface.methods.len(),
            interface.events.len(),
            interface.constructor.is_some()
        );

        Ok(interface)
    }

    fn parse_entry(&self, index: usize, mut item: Value) -> Result<AbiEntry> {
        let quoted = fragment(&item);
        match &mut item {
            // legacy solc output leaves functions untagged
            Value::Object(map) => {
                map.entry("type").or_insert_with(|| Value::String("function".into()));
            }
            _ => return Err(BindError::malformed(&self.contract, Some(index), quoted)),
        }

        let raw: RawEntry = serde_json::from_value(item)
            .map_err(|e| BindError::malformed(&self.contract, Some(index), format!("{}: {}", e, quoted)))?;

        let entry = match raw {
            RawEntry::Function(f) => {
                let state_mutability = match f.state_mutability {
                    Some(m) => m.into(),
                    None if f.constant == Some(true) => StateMutability::View,
                    None if f.payable == Some(true) => StateMutability::Payable,
                    None => StateMutability::NonPayable,
                };
                AbiEntry::Function(Method {
                    name: f.name,
                    inputs: parse_params(&f.inputs)?,
                    outputs: parse_params(&f.outputs)?,
                    state_mutability,
                })
            }
            RawEntry::Event(e) => AbiEntry::Event(Event {
                name: e.name,
                inputs: parse_params(&e.inputs)?,
                anonymous: e.anonymous,
            }),
            RawEntry::Constructor(c) => {
                let state_mutability = match c.state_mutability {
                    Some(m) => m.into(),
                    None if c.payable == Some(true) => StateMutability::Payable,
                    None => StateMutability::NonPayable,
                };
                AbiEntry::Constructor(Constructor {
                    inputs: parse_params(&c.inputs)?,
                    state_mutability,
                })
            }
            RawEntry::Fallback(f) => AbiEntry::Fallback {
                payable: matches!(f.state_mutability, Some(RawMutability::Payable)),
            },
            RawEntry::Receive {} => AbiEntry::Receive,
            RawEntry::Error(e) => AbiEntry::Error { name: e.name },
        };

        Ok(entry)
    }

    fn parse_human_readable(&self, items: &[Value]) -> Result<Vec<AbiEntry>> {
        let lines: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
        let abi = ethers::abi::parse_abi(&lines)
            .map_err(|e| BindError::malformed(&self.contract, None, e.to_string()))?;

        let mut entries = Vec::new();
        if let Some(constructor) = &abi.constructor {
            entries.push(AbiEntry::Constructor(Constructor {
                inputs: convert_params(&constructor.inputs)?,
                state_mutability: StateMutability::NonPayable,
            }));
        }
        for function in abi.functions() {
            entries.push(AbiEntry::Function(Method {
                name: function.name.clone(),
                inputs: convert_params(&function.inputs)?,
                outputs: convert_params(&function.outputs)?,
                state_mutability: convert_mutability(function.state_mutability),
            }));
        }
        for event in abi.events() {
            let inputs = event
                .inputs
                .iter()
                .map(|p| {
                    let param = Parameter::new(Some(&p.name), parse_type(&p.kind.to_string())?);
                    Ok(if p.indexed { param.indexed() } else { param })
                })
                .collect::<Result<Vec<_>>>()?;
            entries.push(AbiEntry::Event(Event {
                name: event.name.clone(),
                inputs,
                anonymous: event.anonymous,
            }));
        }
        if abi.fallback {
            entries.push(AbiEntry::Fallback { payable: false });
        }
        if abi.receive {
            entries.push(AbiEntry::Receive);
        }

        Ok(entries)
    }
}

/// The signatures of a human-readable descriptor, `None` for a JSON ABI
pub fn human_readable_lines(text: &str) -> Option<Vec<String>> {
    let items: Vec<Value> = serde_json::from_str(text).ok()?;
    (!items.is_empty() && items.iter().all(Value::is_string))
        .then(|| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
}

fn convert_params(params: &[ethers::abi::Param]) -> Result<Vec<Parameter>> {
    params
        .iter()
        .map(|p| {
            let ty = parse_declared(&p.kind.to_string(), None, p.internal_type.as_deref())?;
            Ok(Parameter::new(Some(&p.name), ty))
        })
        .collect()
}

fn convert_mutability(mutability: ethers::abi::StateMutability) -> StateMutability {
    match mutability {
        ethers::abi::StateMutability::Pure => StateMutability::Pure,
        ethers::abi::StateMutability::View => StateMutability::View,
        ethers::abi::StateMutability::NonPayable => StateMutability::NonPayable,
        ethers::abi::StateMutability::Payable => StateMutability::Payable,
    }
}

fn parse_params(raw: &[RawParam]) -> Result<Vec<Parameter>> {
    raw.iter()
        .map(|p| {
            let ty = parse_declared(&p.kind, p.components.as_deref(), p.internal_type.as_deref())?;
            let param = Parameter::new(p.name.as_deref(), ty);
            Ok(if p.indexed { param.indexed() } else { param })
        })
        .collect()
}

/// Parse a type string (e.g. `uint256`, `address[]`, `(address,bytes32)[2]`)
/// into a type descriptor.
pub fn parse_type(raw: &str) -> Result<TypeDescriptor> {
    parse_declared(raw, None, None)
}

/// `components` supplies the fields of a `tuple` base type and
/// `internal_type` its struct name.
fn parse_declared(raw: &str, components: Option<&[RawParam]>, internal_type: Option<&str>) -> Result<TypeDescriptor> {
    let trimmed = raw.trim();

    // array suffixes, outermost last
    let mut base = trimmed;
    let mut dims: Vec<Option<usize>> = Vec::new();
    while base.ends_with(']') {
        let open = base.rfind('[').ok_or_else(|| BindError::unsupported(raw))?;
        let size = &base[open + 1..base.len() - 1];
        if size.is_empty() {
            dims.push(None);
        } else {
            let len: usize = size.parse().map_err(|_| BindError::unsupported(raw))?;
            if len == 0 {
                return Err(BindError::unsupported(raw));
            }
            dims.push(Some(len));
        }
        base = &base[..open];
    }
    dims.reverse();

    let mut ty = parse_base(base, raw, components, internal_type)?;
    for dim in dims {
        ty = match dim {
            Some(len) => TypeDescriptor::FixedArray(Box::new(ty), len),
            None => TypeDescriptor::DynamicArray(Box::new(ty)),
        };
    }
    Ok(ty)
}

fn parse_base(
    base: &str,
    raw: &str,
    components: Option<&[RawParam]>,
    internal_type: Option<&str>,
) -> Result<TypeDescriptor> {
    if base == "tuple" {
        let components = components.ok_or_else(|| BindError::unsupported(raw))?;
        let fields = components
            .iter()
            .map(|c| {
                Ok(TupleField {
                    name: c.name.clone().filter(|n| !n.is_empty()),
                    ty: parse_declared(&c.kind, c.components.as_deref(), c.internal_type.as_deref())?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        return Ok(TypeDescriptor::Tuple {
            fields,
            struct_name: internal_type.and_then(struct_name),
        });
    }

    if let Some(inner) = base.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        let fields = split_top_level(inner)
            .into_iter()
            .filter(|part| !part.trim().is_empty())
            .map(|part| Ok(TupleField { name: None, ty: parse_type(part)? }))
            .collect::<Result<Vec<_>>>()?;
        return Ok(TypeDescriptor::Tuple {
            fields,
            struct_name: internal_type.and_then(struct_name),
        });
    }

    parse_elementary(base)
        .map(TypeDescriptor::Elementary)
        .ok_or_else(|| BindError::unsupported(raw))
}

/// Look a base type name up in the elementary catalogue
fn parse_elementary(base: &str) -> Option<Elementary> {
    match base {
        "address" => return Some(Elementary::Address),
        "bool" => return Some(Elementary::Bool),
        "string" => return Some(Elementary::String),
        "bytes" => return Some(Elementary::Bytes),
        "function" => return Some(Elementary::Function),
        "uint" => return Some(Elementary::Uint(256)),
        "int" => return Some(Elementary::Int(256)),
        _ => {}
    }

    if let Some(bits) = base.strip_prefix("uint") {
        return integer_width(bits).map(Elementary::Uint);
    }
    if let Some(bits) = base.strip_prefix("int") {
        return integer_width(bits).map(Elementary::Int);
    }
    if let Some(digits) = base.strip_prefix("bytes") {
        if digits.starts_with('0') {
            return None;
        }
        return match digits.parse::<u8>() {
            Ok(len) if (1..=32).contains(&len) => Some(Elementary::FixedBytes(len)),
            _ => None,
        };
    }
    None
}

fn integer_width(digits: &str) -> Option<u16> {
    if digits.starts_with('0') {
        return None;
    }
    match digits.parse::<u16>() {
        Ok(bits) if bits % 8 == 0 && (8..=256).contains(&bits) => Some(bits),
        _ => None,
    }
}

/// `struct Pool.Position[]` -> `Position`
fn struct_name(internal_type: &str) -> Option<String> {
    let name = internal_type.strip_prefix("struct ")?;
    let name = name.split('[').next().unwrap_or(name);
    let name = name.rsplit('.').next().unwrap_or(name).trim();
    (!name.is_empty()).then(|| name.to_string())
}

/// Split on commas that are not nested inside parentheses
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

fn fragment(value: &Value) -> String {
    let text = value.to_string();
    if text.len() <= FRAGMENT_LIMIT {
        return text;
    }
    let mut end = FRAGMENT_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
