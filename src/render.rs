//! Rust source emission for a batch of binding descriptors.
//!
//! The renderer only walks the descriptor tree; every naming and typing
//! decision was made by the builder. Generated code targets the `ethers`
//! client stack and only imports the handful of value types it uses
//! unqualified.

use crate::binding::{library_ident, AbiFormat, BindingDescriptor, BoundEvent, BoundMethod, BoundParam};
use crate::ident::constant_ident;
use crate::structs::StructDescriptor;
use crate::typemap::tuple_type;

const HEADER: &str = "// Code generated by solbind. DO NOT EDIT.\n// Any manual changes will be lost when the bindings are regenerated.\n";

const CONTRACT_ERROR: &str = "ethers::contract::ContractError<M>";
const ABI_ERROR: &str = "ethers::abi::Error";

/// Indented line buffer
#[derive(Default)]
struct SourceWriter {
    out: String,
    depth: usize,
}

impl SourceWriter {
    fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.out.push('\n');
            return;
        }
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    /// Write `text` and indent until the matching `close`
    fn open(&mut self, text: &str) {
        self.line(text);
        self.depth += 1;
    }

    fn close(&mut self, text: &str) {
        self.dedent();
        self.line(text);
    }

    /// End a continuation started with `open` without a closing line
    fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn doc(&mut self, text: &str) {
        if text.is_empty() {
            self.line("///");
        } else {
            self.line(&format!("/// {}", text));
        }
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Render `bindings` into one module named `package`.
///
/// `structs` must be in dependency order; each is emitted once.
pub fn render(bindings: &[BindingDescriptor], structs: &[StructDescriptor], package: &str) -> String {
    let mut w = SourceWriter::default();
    w.out.push_str(HEADER);
    w.blank();
    w.line("#[allow(clippy::all, dead_code, unused_imports, non_camel_case_types)]");
    w.open(&format!("pub mod {} {{", package));
    w.line("use ethers::types::{Address, Bytes, H256, I256, U256};");

    for descriptor in structs {
        w.blank();
        render_struct(&mut w, descriptor);
    }

    if bindings.iter().any(|b| !b.events.is_empty()) {
        w.blank();
        render_decode_helper(&mut w);
    }

    for binding in bindings {
        render_contract(&mut w, binding);
    }

    w.close("}");
    w.finish()
}

fn render_struct(w: &mut SourceWriter, descriptor: &StructDescriptor) {
    w.doc(&format!("Solidity tuple `{}`", descriptor.key));
    w.line("#[derive(Clone, Debug, PartialEq, Eq, ethers::contract::EthAbiType)]");
    w.open(&format!("pub struct {} {{", descriptor.name));
    for field in &descriptor.fields {
        w.line(&format!("pub {}: {},", field.ident, field.rust_type));
    }
    w.close("}");
}

fn render_decode_helper(w: &mut SourceWriter) {
    w.open(&format!(
        "fn decode_token<T: ethers::abi::Tokenizable>(token: Option<ethers::abi::Token>) -> Result<T, {}> {{",
        ABI_ERROR
    ));
    w.line(&format!("let token = token.ok_or({}::InvalidData)?;", ABI_ERROR));
    w.line(&format!(
        "T::from_token(token).map_err(|e| {}::Other(e.to_string().into()))",
        ABI_ERROR
    ));
    w.close("}");
}

fn render_contract(w: &mut SourceWriter, binding: &BindingDescriptor) {
    let ty = &binding.type_name;
    let prefix = &binding.const_prefix;

    w.blank();
    w.doc(&format!("ABI of the {} contract", ty));
    w.line(&format!("pub const {}_ABI: &str = {:?};", prefix, binding.abi_text));

    if let Some(bytecode) = &binding.bytecode_hex {
        w.blank();
        w.doc(&format!("Deployment bytecode of the {} contract", ty));
        for library in &binding.libraries {
            w.doc(&format!(
                "Link placeholder `{}` stands for library {}",
                library.link_pattern, library.library_name
            ));
        }
        w.line(&format!("pub const {}_BIN: &str = {:?};", prefix, bytecode));
    }

    w.blank();
    w.doc(&format!("Selector and canonical signature of every {} function", ty));
    if binding.func_sigs.is_empty() {
        w.line(&format!("pub const {}_FUNC_SIGS: &[(&str, &str)] = &[];", prefix));
    } else {
        w.open(&format!("pub const {}_FUNC_SIGS: &[(&str, &str)] = &[", prefix));
        for (selector, signature) in &binding.func_sigs {
            w.line(&format!("({:?}, {:?}),", selector, signature));
        }
        w.close("];");
    }

    for event in &binding.events {
        if let Some(topic) = event.topic_hex() {
            w.blank();
            w.doc(&format!("First topic of the {} event of {}", event.name(), ty));
            w.line(&format!("pub const {}: &str = {:?};", topic_const(binding, event), topic));
        }
    }

    for method in binding.calls.iter().filter(|m| m.structured) {
        w.blank();
        w.doc(&format!("Named return values of `{}`", method.normalized.original.declaration()));
        w.line("#[derive(Clone, Debug, PartialEq, Eq)]");
        w.open(&format!("pub struct {} {{", output_struct(binding, method)));
        for output in &method.outputs {
            w.line(&format!("pub {}: {},", output.ident, output.rust_type));
        }
        w.close("}");
    }

    for event in &binding.events {
        w.blank();
        render_log_struct(w, binding, event);
    }

    let mux: Vec<&BoundEvent> = binding.events.iter().filter(|e| e.topic.is_some()).collect();
    if !mux.is_empty() {
        w.blank();
        w.doc(&format!("Any event raised by the {} contract", ty));
        w.line("#[derive(Clone, Debug, PartialEq, Eq)]");
        w.open(&format!("pub enum {}Events {{", ty));
        for event in &mux {
            w.line(&format!("{}({}),", event.name(), log_struct(binding, event)));
        }
        w.close("}");
    }

    w.blank();
    if binding.is_library {
        w.doc(&format!("{} is linked into other contracts of this module as a library.", ty));
        w.doc("");
    }
    w.doc(&format!("Typed binding around a deployed {} contract", ty));
    w.line("#[derive(Clone, Debug)]");
    w.open(&format!("pub struct {}<M> {{", ty));
    w.line("contract: ethers::contract::Contract<M>,");
    w.close("}");

    w.blank();
    w.open(&format!("impl<M: ethers::providers::Middleware> {}<M> {{", ty));
    render_accessors(w, binding);
    if binding.bytecode_hex.is_some() {
        w.blank();
        render_deploy(w, binding);
    }
    for method in &binding.calls {
        w.blank();
        render_call(w, binding, method);
    }
    for method in &binding.transacts {
        w.blank();
        render_transact(w, method);
    }
    for event in &binding.events {
        w.blank();
        render_unpack(w, binding, event);
    }
    if !mux.is_empty() {
        w.blank();
        render_dispatch(w, binding, &mux);
    }
    if binding.has_receive {
        w.blank();
        w.doc("Plain value transfer handled by the contract's `receive` function");
        w.open("pub fn receive(&self) -> ethers::types::TransactionRequest {");
        w.line("ethers::types::TransactionRequest::new().to(self.contract.address())");
        w.close("}");
    }
    if binding.has_fallback {
        w.blank();
        w.doc("Arbitrary calldata handled by the contract's `fallback` function");
        w.open("pub fn fallback(&self, calldata: Bytes) -> ethers::types::TransactionRequest {");
        w.line("ethers::types::TransactionRequest::new().to(self.contract.address()).data(calldata)");
        w.close("}");
    }
    w.close("}");
}

fn render_accessors(w: &mut SourceWriter, binding: &BindingDescriptor) {
    let prefix = &binding.const_prefix;

    w.doc("Parsed contract ABI");
    w.open(&format!("pub fn abi() -> Result<ethers::abi::Abi, {}> {{", ABI_ERROR));
    match binding.abi_format {
        AbiFormat::Json => w.line(&format!("ethers::abi::Abi::load({}_ABI.as_bytes())", prefix)),
        AbiFormat::HumanReadable => w.line(&format!(
            "ethers::abi::parse_abi_str({}_ABI).map_err(|e| {}::Other(e.to_string().into()))",
            prefix, ABI_ERROR
        )),
    }
    w.close("}");

    w.blank();
    w.doc(&format!("Bind to a {} deployed at `address`", binding.type_name));
    w.open(&format!(
        "pub fn new(address: Address, client: std::sync::Arc<M>) -> Result<Self, {}> {{",
        ABI_ERROR
    ));
    w.line("let contract = ethers::contract::Contract::new(address, Self::abi()?, client);");
    w.line("Ok(Self { contract })");
    w.close("}");

    w.blank();
    w.open("pub fn address(&self) -> Address {");
    w.line("self.contract.address()");
    w.close("}");

    w.blank();
    w.open("pub fn contract(&self) -> &ethers::contract::Contract<M> {");
    w.line("&self.contract");
    w.close("}");
}

fn render_deploy(w: &mut SourceWriter, binding: &BindingDescriptor) {
    let prefix = &binding.const_prefix;
    let inputs = binding.constructor.as_ref().map(|c| c.inputs.as_slice()).unwrap_or_default();

    let mut params = vec!["client: std::sync::Arc<M>".to_string()];
    params.extend(binding.libraries.iter().map(|l| format!("{}: Address", library_ident(l))));
    params.extend(inputs.iter().map(|p| format!("{}: {}", p.ident, p.rust_type)));

    w.doc(&format!("Deployment transaction for a new {} contract.", binding.type_name));
    if !binding.libraries.is_empty() {
        w.doc("");
        w.doc("Library addresses are linked into the bytecode before deployment.");
    }
    if binding.constructor.as_ref().map_or(false, |c| c.payable) {
        w.doc("");
        w.doc("The constructor is payable; attach value with `.value(..)` on the deployer.");
    }
    w.open(&format!(
        "pub fn deploy({}) -> Result<ethers::contract::Deployer<M>, {}> {{",
        params.join(", "),
        CONTRACT_ERROR
    ));
    if binding.libraries.is_empty() {
        w.line(&format!("let bytecode = {}_BIN;", prefix));
    } else {
        w.open(&format!("let bytecode = {}_BIN", prefix));
        let last = binding.libraries.len() - 1;
        for (i, library) in binding.libraries.iter().enumerate() {
            w.line(&format!(
                ".replace({:?}, &ethers::utils::hex::encode({})){}",
                library.link_pattern,
                library_ident(library),
                if i == last { ";" } else { "" }
            ));
        }
        w.dedent();
    }
    w.open("let bytecode: Bytes = ethers::utils::hex::decode(bytecode)");
    w.line(&format!(".map_err(|e| {}::Other(e.to_string().into()))?", ABI_ERROR));
    w.line(".into();");
    w.dedent();
    w.line("let factory = ethers::contract::ContractFactory::new(Self::abi()?, bytecode, client);");
    let args: Vec<String> = inputs.iter().map(|p| p.ident.clone()).collect();
    w.line(&format!("factory.deploy({})", tuple_type(&args)));
    w.close("}");
}

fn render_call(w: &mut SourceWriter, binding: &BindingDescriptor, method: &BoundMethod) {
    let raw = output_type(&method.outputs);
    let ret = if method.structured {
        output_struct(binding, method)
    } else {
        raw.clone()
    };

    method_docs(w, method, "Calls");
    w.open(&format!(
        "pub async fn {}(&self{}) -> Result<{}, {}> {{",
        method.ident,
        param_list(&method.inputs),
        ret,
        CONTRACT_ERROR
    ));
    let invoke = format!(
        "self.contract.method_hash::<_, {}>({}, {})?.call().await",
        raw,
        selector_literal(method.selector),
        arg_tuple(&method.inputs)
    );
    if method.structured {
        let idents: Vec<String> = method.outputs.iter().map(|o| o.ident.clone()).collect();
        w.line(&format!("let ({}) = {}?;", idents.join(", "), invoke));
        w.line(&format!("Ok({} {{ {} }})", ret, idents.join(", ")));
    } else {
        w.line(&invoke);
    }
    w.close("}");
}

fn render_transact(w: &mut SourceWriter, method: &BoundMethod) {
    let raw = output_type(&method.outputs);
    method_docs(w, method, "Builds a transaction for");
    if method.normalized.original.state_mutability == crate::types::StateMutability::Payable {
        w.doc("");
        w.doc("Payable; attach value with `.value(..)` before sending.");
    }
    w.open(&format!(
        "pub fn {}(&self{}) -> Result<ethers::contract::ContractCall<M, {}>, {}> {{",
        method.ident,
        param_list(&method.inputs),
        raw,
        CONTRACT_ERROR
    ));
    w.line(&format!(
        "Ok(self.contract.method_hash({}, {})?)",
        selector_literal(method.selector),
        arg_tuple(&method.inputs)
    ));
    w.close("}");
}

fn render_log_struct(w: &mut SourceWriter, binding: &BindingDescriptor, event: &BoundEvent) {
    w.doc(&format!("{} event raised by the {} contract", event.name(), binding.type_name));
    w.line("#[derive(Clone, Debug, PartialEq, Eq)]");
    w.open(&format!("pub struct {} {{", log_struct(binding, event)));
    for field in &event.inputs {
        if field.hashed {
            w.doc(&format!(
                "keccak256 of the indexed `{}` value; the value itself is not in the log",
                field.ty
            ));
        }
        w.line(&format!("pub {}: {},", field.ident, field.rust_type));
    }
    w.doc("Log the event was decoded from");
    w.line("pub raw: ethers::types::Log,");
    w.close("}");
}

fn render_unpack(w: &mut SourceWriter, binding: &BindingDescriptor, event: &BoundEvent) {
    let original = &event.normalized.original;
    match event.topic_hex() {
        Some(topic) => w.doc(&format!("Decodes a {} log with topic {}", event.name(), topic)),
        None => w.doc(&format!("Decodes an anonymous {} log", event.name())),
    }
    w.doc("");
    w.doc(&format!("Solidity: `{}`", original.declaration()));
    w.open(&format!(
        "pub fn unpack_{}_log(&self, log: &ethers::types::Log) -> Result<{}, {}> {{",
        event.ident,
        log_struct(binding, event),
        ABI_ERROR
    ));
    w.line(&format!("let event = self.contract.abi().event({:?})?;", original.name));
    w.line("let raw = ethers::abi::RawLog { topics: log.topics.clone(), data: log.data.to_vec() };");
    w.line("let mut values = event.parse_log(raw)?.params.into_iter().map(|p| p.value);");
    w.open(&format!("Ok({} {{", log_struct(binding, event)));
    for field in &event.inputs {
        w.line(&format!("{}: decode_token(values.next())?,", field.ident));
    }
    w.line("raw: log.clone(),");
    w.close("})");
    w.close("}");
}

fn render_dispatch(w: &mut SourceWriter, binding: &BindingDescriptor, events: &[&BoundEvent]) {
    w.doc("Decodes any event of this contract, selected by the log's first topic");
    w.open(&format!(
        "pub fn unpack_log(&self, log: &ethers::types::Log) -> Result<{}Events, {}> {{",
        binding.type_name, ABI_ERROR
    ));
    w.line("let topic = log.topics.first().map(|t| format!(\"{:?}\", t)).unwrap_or_default();");
    w.open("match topic.as_str() {");
    for event in events {
        w.line(&format!(
            "{} => self.unpack_{}_log(log).map({}Events::{}),",
            topic_const(binding, event),
            event.ident,
            binding.type_name,
            event.name()
        ));
    }
    w.line(&format!("_ => Err({}::InvalidData),", ABI_ERROR));
    w.close("}");
    w.close("}");
}

fn method_docs(w: &mut SourceWriter, method: &BoundMethod, verb: &str) {
    w.doc(&format!("{} the contract method 0x{}.", verb, method.selector_hex()));
    w.doc("");
    w.doc(&format!("Solidity: `{}`", method.normalized.original.declaration()));
}

fn topic_const(binding: &BindingDescriptor, event: &BoundEvent) -> String {
    format!("{}_{}_TOPIC", binding.const_prefix, constant_ident(event.name()))
}

fn log_struct(binding: &BindingDescriptor, event: &BoundEvent) -> String {
    format!("{}{}Log", binding.type_name, event.name())
}

fn output_struct(binding: &BindingDescriptor, method: &BoundMethod) -> String {
    format!("{}{}Output", binding.type_name, method.name())
}

/// Single output as-is, otherwise a tuple of all outputs
fn output_type(outputs: &[BoundParam]) -> String {
    match outputs {
        [single] => single.rust_type.clone(),
        many => tuple_type(&many.iter().map(|o| o.rust_type.clone()).collect::<Vec<_>>()),
    }
}

fn param_list(inputs: &[BoundParam]) -> String {
    inputs
        .iter()
        .map(|p| format!(", {}: {}", p.ident, p.rust_type))
        .collect()
}

fn arg_tuple(inputs: &[BoundParam]) -> String {
    tuple_type(&inputs.iter().map(|p| p.ident.clone()).collect::<Vec<_>>())
}

fn selector_literal(selector: [u8; 4]) -> String {
    let bytes: Vec<String> = selector.iter().map(|b| format!("0x{:02x}", b)).collect();
    format!("[{}]", bytes.join(", "))
}
