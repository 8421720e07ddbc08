//! Command-line flags, the optional JSON manifest and their merge.
//!
//! Precedence, highest first: flags, manifest, `SOLBIND_PKG`, defaults.

use anyhow::{bail, Context, Result};
use clap::Parser;
use glob::Pattern;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::artifacts::{self, Artifact};

pub const DEFAULT_PACKAGE: &str = "bindings";
pub const PACKAGE_ENV: &str = "SOLBIND_PKG";

#[derive(Parser, Debug, Default)]
#[command(name = "solbind")]
#[command(about = "Generate typed Rust bindings for Solidity contracts from their ABI")]
#[command(version)]
pub struct Cli {
    /// ABI file of a single contract
    #[arg(long)]
    pub abi: Option<PathBuf>,

    /// Deployment bytecode (hex) of the --abi contract
    #[arg(long)]
    pub bin: Option<PathBuf>,

    /// Type name of the --abi contract, defaults to the file stem
    #[arg(long = "type")]
    pub type_name: Option<String>,

    /// Directory searched for .abi/.bin pairs, forge artifacts and solc combined JSON
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output of `solc --combined-json abi,bin`
    #[arg(long)]
    pub combined_json: Option<PathBuf>,

    /// Name of the generated module
    #[arg(short, long)]
    pub pkg: Option<String>,

    /// Output file, stdout when omitted
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Skip contracts whose type name matches this glob (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Fully qualified library name, e.g. src/Math.sol:Math (repeatable)
    #[arg(long = "lib")]
    pub libraries: Vec<String>,

    /// JSON manifest with the same options
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// One explicitly listed contract of a manifest
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ManifestContract {
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    pub abi: PathBuf,
    pub bin: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct Manifest {
    pub pkg: Option<String>,
    pub out: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub combined_json: Option<PathBuf>,
    pub contracts: Vec<ManifestContract>,
    pub exclude: Vec<String>,
    pub libraries: Vec<String>,
}

impl Manifest {
    /// Read a manifest; relative paths inside it are resolved against its directory
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let manifest: Manifest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(manifest.relative_to(base))
    }

    fn relative_to(mut self, base: &Path) -> Self {
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { base.join(p) };
        self.out = self.out.map(resolve);
        self.input = self.input.map(resolve);
        self.combined_json = self.combined_json.map(resolve);
        for contract in &mut self.contracts {
            contract.abi = resolve(contract.abi.clone());
            contract.bin = contract.bin.take().map(resolve);
        }
        self
    }
}

/// Where contracts are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Pair {
        abi: PathBuf,
        bin: Option<PathBuf>,
        type_name: Option<String>,
    },
    Directory(PathBuf),
    CombinedJson(PathBuf),
}

/// Fully resolved run configuration
#[derive(Debug, Clone)]
pub struct Settings {
    pub package: String,
    pub out: Option<PathBuf>,
    pub sources: Vec<Source>,
    pub exclude: Vec<Pattern>,
    pub libraries: Vec<String>,
}

impl Settings {
    /// Resolve flags against the manifest they name and the environment
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let manifest = match &cli.config {
            Some(path) => Manifest::load(path)?,
            None => Manifest::default(),
        };
        Self::merge(cli, manifest, std::env::var(PACKAGE_ENV).ok())
    }

    pub fn merge(cli: &Cli, manifest: Manifest, env_package: Option<String>) -> Result<Self> {
        if cli.bin.is_some() && cli.abi.is_none() {
            bail!("--bin requires --abi");
        }
        if cli.type_name.is_some() && cli.abi.is_none() {
            bail!("--type requires --abi");
        }

        let package = cli
            .pkg
            .clone()
            .or(manifest.pkg)
            .or(env_package)
            .unwrap_or_else(|| DEFAULT_PACKAGE.to_string());

        let mut sources = Vec::new();
        if let Some(abi) = &cli.abi {
            sources.push(Source::Pair {
                abi: abi.clone(),
                bin: cli.bin.clone(),
                type_name: cli.type_name.clone(),
            });
        }
        if let Some(dir) = &cli.input {
            sources.push(Source::Directory(dir.clone()));
        }
        if let Some(path) = &cli.combined_json {
            sources.push(Source::CombinedJson(path.clone()));
        }
        // the manifest only supplies sources when no flag names one
        if sources.is_empty() {
            sources.extend(manifest.contracts.into_iter().map(|c| Source::Pair {
                abi: c.abi,
                bin: c.bin,
                type_name: c.type_name,
            }));
            sources.extend(manifest.input.map(Source::Directory));
            sources.extend(manifest.combined_json.map(Source::CombinedJson));
        }
        if sources.is_empty() {
            bail!("No input given: use --abi, --input, --combined-json or a --config manifest");
        }

        let exclude = if cli.exclude.is_empty() { manifest.exclude } else { cli.exclude.clone() };
        let exclude = exclude
            .iter()
            .map(|p| Pattern::new(p).with_context(|| format!("Invalid exclude pattern {:?}", p)))
            .collect::<Result<Vec<_>>>()?;

        let mut libraries = manifest.libraries;
        libraries.extend(cli.libraries.iter().cloned());

        Ok(Settings {
            package,
            out: cli.out.clone().or(manifest.out),
            sources,
            exclude,
            libraries,
        })
    }

    pub fn is_excluded(&self, type_name: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(type_name))
    }

    /// Read every source, dropping excluded contracts
    pub fn load_artifacts(&self) -> Result<Vec<Artifact>> {
        let mut loaded = Vec::new();
        for source in &self.sources {
            match source {
                Source::Pair { abi, bin, type_name } => {
                    loaded.push(artifacts::load_abi_pair(abi, bin.as_deref(), type_name.as_deref())?)
                }
                Source::Directory(dir) => loaded.extend(artifacts::discover(dir)?),
                Source::CombinedJson(path) => loaded.extend(artifacts::load_combined_json(path)?),
            }
        }

        let (excluded, kept): (Vec<Artifact>, Vec<Artifact>) =
            loaded.into_iter().partition(|a| self.is_excluded(&a.type_name));
        for artifact in &excluded {
            debug!("Excluding {} ({})", artifact.type_name, artifact.source.display());
        }
        if kept.is_empty() {
            warn!("Every contract was excluded or none were found");
        }
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["solbind"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn flags_override_manifest_and_environment() {
        let manifest = Manifest {
            pkg: Some("from_manifest".into()),
            input: Some("artifacts".into()),
            ..Default::default()
        };
        let settings = Settings::merge(
            &cli(&["--abi", "Token.abi", "--pkg", "from_flag"]),
            manifest.clone(),
            Some("from_env".into()),
        )
        .unwrap();
        assert_eq!(settings.package, "from_flag");
        assert_eq!(settings.sources.len(), 1);

        let settings = Settings::merge(&cli(&[]), manifest, Some("from_env".into())).unwrap();
        assert_eq!(settings.package, "from_manifest");
        assert_eq!(settings.sources, vec![Source::Directory("artifacts".into())]);
    }

    #[test]
    fn environment_supplies_package_default() {
        let settings = Settings::merge(&cli(&["-i", "out"]), Manifest::default(), Some("from_env".into())).unwrap();
        assert_eq!(settings.package, "from_env");

        let settings = Settings::merge(&cli(&["-i", "out"]), Manifest::default(), None).unwrap();
        assert_eq!(settings.package, DEFAULT_PACKAGE);
    }

    #[test]
    fn missing_input_is_rejected() {
        let err = Settings::merge(&cli(&[]), Manifest::default(), None).unwrap_err();
        assert!(err.to_string().contains("No input given"));

        let err = Settings::merge(&cli(&["--bin", "Token.bin"]), Manifest::default(), None).unwrap_err();
        assert!(err.to_string().contains("--bin requires --abi"));
    }

    #[test]
    fn exclude_patterns_match_type_names() {
        let settings = Settings::merge(
            &cli(&["-i", "out", "--exclude", "Mock*", "--exclude", "*Test"]),
            Manifest::default(),
            None,
        )
        .unwrap();
        assert!(settings.is_excluded("MockToken"));
        assert!(settings.is_excluded("TokenTest"));
        assert!(!settings.is_excluded("Token"));

        let err = Settings::merge(&cli(&["-i", "out", "--exclude", "[bad"]), Manifest::default(), None).unwrap_err();
        assert!(err.to_string().contains("Invalid exclude pattern"));
    }

    #[test]
    fn manifest_paths_are_relative_to_the_manifest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("solbind.json");
        std::fs::write(
            &path,
            r#"{"pkg": "contracts", "out": "src/bindings.rs",
                "contracts": [{"type": "Token", "abi": "abi/Token.abi", "bin": "abi/Token.bin"}],
                "libraries": ["src/Math.sol:Math"]}"#,
        )
        .unwrap();

        let manifest = Manifest::load(&path).unwrap();
        assert_eq!(manifest.out, Some(dir.path().join("src/bindings.rs")));
        assert_eq!(manifest.contracts[0].abi, dir.path().join("abi/Token.abi"));

        let settings = Settings::merge(&cli(&["--lib", "Strings"]), manifest, None).unwrap();
        assert_eq!(settings.package, "contracts");
        assert_eq!(settings.libraries, vec!["src/Math.sol:Math".to_string(), "Strings".to_string()]);
    }

    #[test]
    fn unknown_manifest_keys_are_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("solbind.json");
        std::fs::write(&path, r#"{"package": "oops"}"#).unwrap();
        assert!(Manifest::load(&path).is_err());
    }

    #[test]
    fn excluded_artifacts_are_dropped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("Token.abi"), "[]").unwrap();
        std::fs::write(dir.path().join("MockToken.abi"), "[]").unwrap();
        let input = dir.path().to_string_lossy().to_string();

        let settings = Settings::merge(&cli(&["-i", &input, "--exclude", "Mock*"]), Manifest::default(), None).unwrap();
        let names: Vec<String> = settings.load_artifacts().unwrap().into_iter().map(|a| a.type_name).collect();
        assert_eq!(names, vec!["Token".to_string()]);
    }
}
