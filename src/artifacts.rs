use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// ABI and bytecode of one contract, as read from compiler output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub type_name: String,
    pub abi: String,
    /// Empty when the compiler produced no deployable bytecode
    pub bytecode: String,
    pub source: PathBuf,
}

/// Read a plain `.abi` file and its optional bytecode
pub fn load_abi_pair(abi_path: &Path, bin_path: Option<&Path>, type_name: Option<&str>) -> Result<Artifact> {
    let abi = std::fs::read_to_string(abi_path)
        .with_context(|| format!("Failed to read ABI file {}", abi_path.display()))?;

    let bytecode = match bin_path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read bytecode file {}", path.display()))?
            .trim()
            .to_string(),
        None => String::new(),
    };

    let type_name = match type_name {
        Some(name) => name.to_string(),
        None => file_stem(abi_path)?,
    };

    Ok(Artifact {
        type_name,
        abi,
        bytecode,
        source: abi_path.to_path_buf(),
    })
}

/// Read a forge build artifact (`out/Token.sol/Token.json`)
pub fn load_forge_artifact(path: &Path) -> Result<Artifact> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read artifact {}", path.display()))?;
    let artifact: Value = serde_json::from_str(&content).context("Failed to parse forge artifact JSON")?;

    let abi = artifact.get("abi").context("ABI not found in artifact")?;

    // forge nests the hex under `bytecode.object`, older tools write it directly
    let bytecode = artifact
        .get("bytecode")
        .and_then(|v| v.get("object"))
        .and_then(|v| v.as_str())
        .or_else(|| artifact.get("bytecode").and_then(|v| v.as_str()))
        .unwrap_or_default();

    Ok(Artifact {
        type_name: file_stem(path)?,
        abi: abi.to_string(),
        bytecode: bytecode.to_string(),
        source: path.to_path_buf(),
    })
}

/// Read every contract of a `solc --combined-json abi,bin` output
pub fn load_combined_json(path: &Path) -> Result<Vec<Artifact>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read combined JSON {}", path.display()))?;
    let json: Value = serde_json::from_str(&content).context("Failed to parse solc JSON output")?;

    let contracts = json
        .get("contracts")
        .and_then(Value::as_object)
        .context("No 'contracts' in solc output")?;

    let mut artifacts = Vec::new();
    // keys look like "src/Token.sol:Token"
    for (key, contract) in contracts {
        let type_name = key.rsplit(':').next().unwrap_or(key).to_string();

        // solc writes the ABI as an embedded JSON string before 0.8.10
        let abi = match contract.get("abi") {
            Some(Value::String(text)) => text.clone(),
            Some(value) => value.to_string(),
            None => {
                warn!("Skipping {}: ABI not found in contract", key);
                continue;
            }
        };
        let bytecode = contract.get("bin").and_then(Value::as_str).unwrap_or_default();

        debug!("Loaded {} from {}", type_name, path.display());
        artifacts.push(Artifact {
            type_name,
            abi,
            bytecode: bytecode.to_string(),
            source: path.to_path_buf(),
        });
    }

    Ok(artifacts)
}

/// Find every contract under `dir`.
///
/// `*.abi` files are paired with a sibling `*.bin`; `*.json` files are read
/// as forge artifacts or solc combined JSON, whichever they look like.
/// Unrecognised JSON is skipped with a warning.
pub fn discover(dir: &Path) -> Result<Vec<Artifact>> {
    let mut artifacts = Vec::new();

    let mut entries: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect();
    entries.sort();

    for path in entries {
        match path.extension().and_then(|e| e.to_str()) {
            Some("abi") => {
                let bin = path.with_extension("bin");
                let bin = bin.is_file().then_some(bin);
                artifacts.push(load_abi_pair(&path, bin.as_deref(), None)?);
            }
            Some("json") => match json_kind(&path)? {
                JsonKind::Forge => artifacts.push(load_forge_artifact(&path)?),
                JsonKind::Combined => artifacts.extend(load_combined_json(&path)?),
                JsonKind::Other => debug!("Ignoring {}", path.display()),
            },
            _ => {}
        }
    }

    if artifacts.is_empty() {
        warn!("No contract artifacts found under {}", dir.display());
    }

    Ok(artifacts)
}

enum JsonKind {
    Forge,
    Combined,
    Other,
}

fn json_kind(path: &Path) -> Result<JsonKind> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let Ok(json) = serde_json::from_str::<Value>(&content) else {
        warn!("Skipping {}: not valid JSON", path.display());
        return Ok(JsonKind::Other);
    };

    Ok(if json.get("abi").map_or(false, Value::is_array) {
        JsonKind::Forge
    } else if json.get("contracts").map_or(false, Value::is_object) {
        JsonKind::Combined
    } else {
        JsonKind::Other
    })
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .with_context(|| format!("Cannot derive a contract name from {}", path.display()))
}
