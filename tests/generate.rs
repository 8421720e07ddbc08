use solbind::linker::link_pattern;
use solbind::{generate, BindError, Generator};

const ERC20_SLICE: &str = r#"[
    {"type": "function", "name": "balanceOf", "stateMutability": "view",
     "inputs": [{"name": "", "type": "address"}],
     "outputs": [{"name": "", "type": "uint256"}]},
    {"type": "event", "name": "Transfer", "anonymous": false, "inputs": [
        {"name": "from", "type": "address", "indexed": true},
        {"name": "to", "type": "address", "indexed": true},
        {"name": "value", "type": "uint256", "indexed": false}]}
]"#;

#[test]
fn balance_of_and_transfer_end_to_end() {
    let (bindings, structs) = Generator::new("bindings")
        .contract("Token", ERC20_SLICE, "")
        .bindings()
        .unwrap();
    assert!(structs.is_empty());

    let token = &bindings[0];
    assert_eq!(token.type_name, "Token");
    assert_eq!(token.bytecode_hex, None);
    assert!(token.transacts.is_empty());
    assert!(token.constructor.is_none());

    assert_eq!(token.calls.len(), 1);
    let balance_of = &token.calls[0];
    assert_eq!(balance_of.name(), "BalanceOf");
    assert_eq!(balance_of.inputs.len(), 1);
    assert_eq!(balance_of.inputs[0].rust_type, "Address");
    assert_eq!(balance_of.outputs.len(), 1);
    assert_eq!(balance_of.outputs[0].rust_type, "U256");
    assert!(!balance_of.structured);

    assert_eq!(token.events.len(), 1);
    let transfer = &token.events[0];
    let fields: Vec<&str> = transfer.inputs.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(fields, vec!["From", "To", "Value"]);
    assert_eq!(
        transfer.topic_hex().as_deref(),
        Some("0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef")
    );

    let code = generate(&["Token"], &[ERC20_SLICE], &[""], "bindings").unwrap();
    assert!(code.contains("pub async fn balance_of(&self, arg0: Address)"));
    assert!(code.contains("pub const TOKEN_TRANSFER_TOPIC: &str"));
    assert!(code.contains("pub from: Address,"));
    assert!(code.contains("pub to: Address,"));
    assert!(code.contains("pub value: U256,"));
    assert!(!code.contains("pub fn deploy("));
}

#[test]
fn output_is_byte_identical_across_runs() {
    let first = generate(&["Token", "Vault"], &[ERC20_SLICE, ERC20_SLICE], &["0x6080", ""], "bindings").unwrap();
    let second = generate(&["Token", "Vault"], &[ERC20_SLICE, ERC20_SLICE], &["0x6080", ""], "bindings").unwrap();
    assert_eq!(first, second);
}

#[test]
fn topics_are_stable_across_contracts() {
    let (bindings, _) = Generator::new("bindings")
        .contract("Token", ERC20_SLICE, "")
        .contract("Wrapped", ERC20_SLICE, "")
        .bindings()
        .unwrap();
    assert_eq!(bindings[0].events[0].topic, bindings[1].events[0].topic);
    assert_eq!(
        bindings[0].events[0].topic,
        Some(ethers::utils::keccak256("Transfer(address,address,uint256)"))
    );
}

#[test]
fn overloads_render_as_distinct_methods() {
    let abi = r#"[
        {"type": "function", "name": "transfer", "stateMutability": "nonpayable",
         "inputs": [{"name": "to", "type": "address"}, {"name": "value", "type": "uint256"}], "outputs": []},
        {"type": "function", "name": "transfer", "stateMutability": "nonpayable",
         "inputs": [{"name": "to", "type": "address"}, {"name": "value", "type": "uint256"}, {"name": "data", "type": "bytes"}], "outputs": []}
    ]"#;
    let (bindings, _) = Generator::new("bindings").contract("Token", abi, "").bindings().unwrap();
    let names: Vec<&str> = bindings[0].transacts.iter().map(|m| m.name()).collect();
    assert_eq!(names, vec!["Transfer", "Transfer0"]);
    assert_eq!(bindings[0].transacts[0].selector_hex(), "a9059cbb");
    assert_eq!(
        bindings[0].transacts[1].selector,
        ethers::utils::id("transfer(address,uint256,bytes)")
    );

    let code = Generator::new("bindings").contract("Token", abi, "").generate().unwrap();
    assert!(code.contains("pub fn transfer(&self, to: Address, value: U256)"));
    assert!(code.contains("(&self, to: Address, value: U256, data: Bytes)"));
    assert_eq!(code.matches("pub fn transfer").count(), 2);
}

#[test]
fn linked_library_becomes_a_deploy_parameter() {
    let placeholder = format!("__${}$__", link_pattern("Math"));
    let calc_bin = format!("0x608060405273{}6000", placeholder);
    let calc_abi = r#"[{"type": "constructor", "stateMutability": "nonpayable",
        "inputs": [{"name": "seed", "type": "uint256"}]}]"#;

    let (bindings, _) = Generator::new("bindings")
        .contract("Calc", calc_abi, &calc_bin)
        .contract("Math", "[]", "0x6080")
        .bindings()
        .unwrap();
    assert_eq!(bindings[0].libraries.len(), 1);
    assert_eq!(bindings[0].libraries[0].library_name, "Math");
    assert!(!bindings[0].is_library);
    assert!(bindings[1].is_library);

    let code = Generator::new("bindings")
        .contract("Calc", calc_abi, &calc_bin)
        .contract("Math", "[]", "0x6080")
        .generate()
        .unwrap();
    assert!(code.contains("pub fn deploy(client: std::sync::Arc<M>, math_library: Address, seed: U256)"));
    assert!(code.contains(&format!(
        ".replace({:?}, &ethers::utils::hex::encode(math_library));",
        placeholder
    )));
    assert!(code.contains("factory.deploy((seed,))"));
    assert!(code.contains("/// Math is linked into other contracts of this module as a library."));
}

#[test]
fn deploy_locals_never_shadow_constructor_arguments() {
    let router_abi = r#"[{"type": "constructor", "stateMutability": "nonpayable",
        "inputs": [{"name": "_factory", "type": "address"}, {"name": "_WETH", "type": "address"}]}]"#;
    let code = generate(&["Router"], &[router_abi], &["0x6080"], "bindings").unwrap();
    assert!(code.contains("pub fn deploy(client: std::sync::Arc<M>, factory_: Address, weth: Address)"));
    assert!(code.contains("let factory = ethers::contract::ContractFactory::new(Self::abi()?, bytecode, client);"));
    assert!(code.contains("factory.deploy((factory_, weth))"));

    let placeholder = format!("__${}$__", link_pattern("Math"));
    let vault_abi = r#"[{"type": "constructor", "stateMutability": "nonpayable", "inputs": [
        {"name": "bytecode", "type": "bytes"},
        {"name": "client", "type": "address"},
        {"name": "mathLibrary", "type": "address"}]}]"#;
    let code = Generator::new("bindings")
        .contract("Vault", vault_abi, &format!("0x6080{}00", placeholder))
        .contract("Math", "[]", "0x6080")
        .generate()
        .unwrap();
    assert!(code.contains(
        "pub fn deploy(client: std::sync::Arc<M>, math_library: Address, bytecode_: Bytes, client_: Address, math_library_: Address)"
    ));
    assert!(code.contains("factory.deploy((bytecode_, client_, math_library_))"));
}

#[test]
fn deploy_body_is_indented_by_statement() {
    let placeholder = format!("__${}$__", link_pattern("Math"));
    let code = Generator::new("bindings")
        .contract("Calc", "[]", &format!("0x6080{}00", placeholder))
        .contract("Math", "[]", "0x6080")
        .generate()
        .unwrap();

    let lines: Vec<&str> = code.lines().collect();
    let indent = |needle: &str| {
        let line = lines.iter().find(|l| l.trim_start().starts_with(needle)).unwrap();
        line.len() - line.trim_start().len()
    };
    let base = indent("let bytecode = CALC_BIN");
    assert_eq!(indent(".replace("), base + 4);
    assert_eq!(indent("let bytecode: Bytes"), base);
    assert_eq!(indent(".map_err("), base + 4);
    assert_eq!(indent(".into();"), base + 4);
    assert_eq!(indent("let factory ="), base);
    assert_eq!(indent("factory.deploy("), base);
}

#[test]
fn fully_qualified_libraries_resolve_through_the_builder() {
    let placeholder = format!("__${}$__", link_pattern("src/lib/Strings.sol:Strings"));
    let (bindings, _) = Generator::new("bindings")
        .library("src/lib/Strings.sol:Strings")
        .contract("Printer", "[]", &format!("60{}60", placeholder))
        .bindings()
        .unwrap();
    assert_eq!(bindings[0].libraries[0].library_name, "Strings");
}

#[test]
fn no_placeholders_means_no_extra_deploy_addresses() {
    let code = generate(&["Token"], &[ERC20_SLICE], &["0x6080604052"], "bindings").unwrap();
    assert!(code.contains("pub fn deploy(client: std::sync::Arc<M>) ->"));
    assert!(!code.contains(".replace("));
}

#[test]
fn structured_and_positional_returns() {
    let abi = r#"[
        {"type": "function", "name": "getReserves", "stateMutability": "view", "inputs": [],
         "outputs": [{"name": "reserve0", "type": "uint112"}, {"name": "reserve1", "type": "uint112"}, {"name": "blockTimestampLast", "type": "uint32"}]},
        {"type": "function", "name": "slot0", "stateMutability": "view", "inputs": [],
         "outputs": [{"name": "", "type": "uint160"}, {"name": "", "type": "int24"}]}
    ]"#;
    let (bindings, _) = Generator::new("bindings").contract("Pair", abi, "").bindings().unwrap();
    assert!(bindings[0].calls[0].structured);
    assert!(!bindings[0].calls[1].structured);

    let code = Generator::new("bindings").contract("Pair", abi, "").generate().unwrap();
    assert!(code.contains("pub struct PairGetReservesOutput {"));
    assert!(code.contains("pub block_timestamp_last: u32,"));
    assert!(code.contains("(&self) -> Result<(U256, i32), ethers::contract::ContractError<M>>"));
}

#[test]
fn batch_errors_are_terminal() {
    let err = generate(&["A", "B"], &["[]", "[]"], &[""], "bindings").unwrap_err();
    assert_eq!(err, BindError::ArityMismatch { names: 2, abis: 2, bins: 1 });

    let bad = r#"[{"type": "function", "name": "f", "inputs": [{"name": "x", "type": "fixed128x18"}], "outputs": []}]"#;
    let err = generate(&["Good", "Bad"], &["[]", bad], &["", ""], "bindings").unwrap_err();
    assert_eq!(err, BindError::UnsupportedType { raw: "fixed128x18".into() });

    let err = generate(&["Token"], &["{\"not\": \"an array\"}"], &[""], "bindings").unwrap_err();
    assert!(matches!(err, BindError::MalformedDescriptor { index: None, .. }));
}
