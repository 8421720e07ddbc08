// type definitions

use std::fmt;

/// Elementary (non-composite) ABI types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Elementary {
    Address,
    Bool,
    /// Unsigned integer with its bit width (8..=256, multiple of 8)
    Uint(u16),
    /// Signed integer with its bit width (8..=256, multiple of 8)
    Int(u16),
    /// `bytes1` .. `bytes32`
    FixedBytes(u8),
    Bytes,
    String,
    /// 24 byte address + selector pair
    Function,
}

impl fmt::Display for Elementary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Elementary::Address => write!(f, "address"),
            Elementary::Bool => write!(f, "bool"),
            Elementary::Uint(bits) => write!(f, "uint{}", bits),
            Elementary::Int(bits) => write!(f, "int{}", bits),
            Elementary::FixedBytes(len) => write!(f, "bytes{}", len),
            Elementary::Bytes => write!(f, "bytes"),
            Elementary::String => write!(f, "string"),
            Elementary::Function => write!(f, "function"),
        }
    }
}

/// One component of a tuple type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TupleField {
    pub name: Option<String>,
    pub ty: TypeDescriptor,
}

/// A recursive ABI type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Elementary(Elementary),
    FixedArray(Box<TypeDescriptor>, usize),
    DynamicArray(Box<TypeDescriptor>),
    Tuple {
        fields: Vec<TupleField>,
        /// Struct name carried by the descriptor's `internalType`, if any
        struct_name: Option<String>,
    },
}

impl TypeDescriptor {
    pub fn tuple(fields: Vec<TupleField>) -> Self {
        TypeDescriptor::Tuple { fields, struct_name: None }
    }

    /// Canonical type notation used in signatures, e.g. `(uint256,address)[]`.
    ///
    /// Field names and struct names never appear, so two tuples with the same
    /// canonical string are structurally equal.
    pub fn canonical(&self) -> String {
        match self {
            TypeDescriptor::Elementary(kind) => kind.to_string(),
            TypeDescriptor::FixedArray(elem, len) => format!("{}[{}]", elem.canonical(), len),
            TypeDescriptor::DynamicArray(elem) => format!("{}[]", elem.canonical()),
            TypeDescriptor::Tuple { fields, .. } => {
                let inner: Vec<String> = fields.iter().map(|f| f.ty.canonical()).collect();
                format!("({})", inner.join(","))
            }
        }
    }

    pub fn is_structurally_equal(&self, other: &TypeDescriptor) -> bool {
        self.canonical() == other.canonical()
    }

    /// Whether the type is dynamically sized in the ABI encoding
    pub fn is_dynamic(&self) -> bool {
        match self {
            TypeDescriptor::Elementary(Elementary::Bytes | Elementary::String) => true,
            TypeDescriptor::Elementary(_) => false,
            TypeDescriptor::DynamicArray(_) => true,
            TypeDescriptor::FixedArray(elem, _) => elem.is_dynamic(),
            TypeDescriptor::Tuple { fields, .. } => fields.iter().any(|f| f.ty.is_dynamic()),
        }
    }

    /// Whether an indexed event parameter of this type is stored as its
    /// keccak256 hash instead of the value itself.
    pub fn is_hashed_when_indexed(&self) -> bool {
        !matches!(
            self,
            TypeDescriptor::Elementary(kind) if !matches!(kind, Elementary::Bytes | Elementary::String)
        )
    }

    /// Visit every tuple nested in this type, children before parents.
    pub fn walk_tuples<'a>(&'a self, visit: &mut impl FnMut(&'a TypeDescriptor)) {
        match self {
            TypeDescriptor::Elementary(_) => {}
            TypeDescriptor::FixedArray(elem, _) | TypeDescriptor::DynamicArray(elem) => {
                elem.walk_tuples(visit)
            }
            TypeDescriptor::Tuple { fields, .. } => {
                for field in fields {
                    field.ty.walk_tuples(visit);
                }
                visit(self);
            }
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// `None` exactly when the descriptor left the name out
    pub name: Option<String>,
    pub ty: TypeDescriptor,
    /// Only meaningful for event inputs
    pub indexed: bool,
}

impl Parameter {
    pub fn new(name: Option<&str>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.filter(|n| !n.is_empty()).map(str::to_string),
            ty,
            indexed: false,
        }
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateMutability {
    Pure,
    View,
    NonPayable,
    Payable,
}

impl StateMutability {
    /// Read-only methods are bound as calls, everything else as transactions
    pub fn is_read_only(&self) -> bool {
        matches!(self, StateMutability::Pure | StateMutability::View)
    }
}

impl fmt::Display for StateMutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StateMutability::Pure => "pure",
            StateMutability::View => "view",
            StateMutability::NonPayable => "nonpayable",
            StateMutability::Payable => "payable",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub inputs: Vec<Parameter>,
    pub outputs: Vec<Parameter>,
    pub state_mutability: StateMutability,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub name: String,
    pub inputs: Vec<Parameter>,
    pub anonymous: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constructor {
    pub inputs: Vec<Parameter>,
    pub state_mutability: StateMutability,
}

/// Everything a single interface descriptor declares, in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractInterface {
    pub methods: Vec<Method>,
    pub events: Vec<Event>,
    pub constructor: Option<Constructor>,
    pub has_fallback: bool,
    pub has_receive: bool,
}
