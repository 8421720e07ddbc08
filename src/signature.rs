//! Canonical signatures, function selectors and event topics

use sha3::{Digest, Keccak256};

use crate::types::{Event, Method, Parameter, StateMutability};

/// Build the canonical signature string (e.g. `transfer(address,uint256)`)
pub fn signature(name: &str, params: &[Parameter]) -> String {
    let types: Vec<String> = params.iter().map(|p| p.ty.canonical()).collect();
    format!("{}({})", name, types.join(","))
}

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Calculate the 4-byte function selector from a method signature
pub fn calculate_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Parameter list as written in Solidity, e.g. `address indexed from, uint256 value`
fn declare_params(params: &[Parameter]) -> String {
    params
        .iter()
        .map(|p| {
            let mut decl = p.ty.canonical();
            if p.indexed {
                decl.push_str(" indexed");
            }
            if let Some(name) = &p.name {
                decl.push(' ');
                decl.push_str(name);
            }
            decl
        })
        .collect::<Vec<_>>()
        .join(", ")
}

impl Method {
    pub fn signature(&self) -> String {
        signature(&self.name, &self.inputs)
    }

    /// Human readable declaration used in generated docs
    pub fn declaration(&self) -> String {
        let mut decl = format!("function {}({})", self.name, declare_params(&self.inputs));
        if self.state_mutability != StateMutability::NonPayable {
            decl.push(' ');
            decl.push_str(&self.state_mutability.to_string());
        }
        if !self.outputs.is_empty() {
            decl.push_str(&format!(" returns({})", declare_params(&self.outputs)));
        }
        decl
    }

    pub fn selector(&self) -> [u8; 4] {
        calculate_selector(&self.signature())
    }
}

impl Event {
    pub fn signature(&self) -> String {
        signature(&self.name, &self.inputs)
    }

    pub fn declaration(&self) -> String {
        let mut decl = format!("event {}({})", self.name, declare_params(&self.inputs));
        if self.anonymous {
            decl.push_str(" anonymous");
        }
        decl
    }

    /// The first log topic, absent for anonymous events
    pub fn topic(&self) -> Option<[u8; 32]> {
        (!self.anonymous).then(|| keccak256(self.signature().as_bytes()))
    }
}

/// `0x`-prefixed lowercase hex
pub fn to_hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi_parser::parse_type;

    fn param(raw: &str) -> Parameter {
        Parameter::new(None, parse_type(raw).unwrap())
    }

    #[test]
    fn selector_matches_ethers_reference() {
        let method = Method {
            name: "transfer".into(),
            inputs: vec![param("address"), param("uint256")],
            outputs: vec![param("bool")],
            state_mutability: StateMutability::NonPayable,
        };
        assert_eq!(method.signature(), "transfer(address,uint256)");
        assert_eq!(method.selector(), ethers::utils::id("transfer(address,uint256)"));
        assert_eq!(hex::encode(method.selector()), "a9059cbb");
        assert_eq!(method.declaration(), "function transfer(address, uint256) returns(bool)");
    }

    #[test]
    fn tuple_parameters_expand_in_signature() {
        let method = Method {
            name: "submit".into(),
            inputs: vec![param("(uint256,address)[]"), param("bytes32")],
            outputs: vec![],
            state_mutability: StateMutability::NonPayable,
        };
        assert_eq!(method.signature(), "submit((uint256,address)[],bytes32)");
        assert_eq!(method.selector(), ethers::utils::id("submit((uint256,address)[],bytes32)"));
    }

    #[test]
    fn event_topic_is_full_keccak() {
        let event = Event {
            name: "Transfer".into(),
            inputs: vec![param("address").indexed(), param("address").indexed(), param("uint256")],
            anonymous: false,
        };
        let topic = event.topic().unwrap();
        assert_eq!(
            to_hex_prefixed(&topic),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
        assert_eq!(topic, ethers::utils::keccak256("Transfer(address,address,uint256)"));

        assert_eq!(
            event.declaration(),
            "event Transfer(address indexed, address indexed, uint256)"
        );

        let anonymous = Event { anonymous: true, ..event };
        assert_eq!(anonymous.topic(), None);
    }
}
