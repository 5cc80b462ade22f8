//! CLI configuration: fallback ladder, default profile and module search list.
//!
//! ```toml
//! profile = "ps_4_0"
//!
//! [compiler]
//! modules = ["d3dcompiler_47.dll"]
//!
//! [[attempt]]
//! label = "fast"
//! flags = ["optimization_level3"]
//!
//! [[attempt]]
//! label = "safe"
//! flags = ["skip_optimization"]
//! ```

use std::collections::HashSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use shader_driver::{AttemptConfiguration, CompileFlags, D3DCompilerLoader};

/// Environment variable supplying the target profile when `--profile` is absent.
pub const PROFILE_ENV: &str = "SHADER_CLI_PROFILE";

/// Compiler module search settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerSection {
    /// Modules to load, in order. Platform defaults when absent.
    pub modules: Option<Vec<String>>,
    /// Already-loaded modules to reuse (Windows). Platform defaults when absent.
    pub preloaded: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Target profile used when neither `--profile` nor the env var is set.
    pub profile: Option<String>,
    /// Base flags for the standard ladder when no `[[attempt]]` is listed.
    pub base_flags: Option<CompileFlags>,
    #[serde(rename = "attempt")]
    pub attempts: Vec<AttemptConfiguration>,
    pub compiler: CompilerSection,
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// `Some(path)` loads the file, `None` gives the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for attempt in &self.attempts {
            if attempt.label.trim().is_empty() {
                bail!("attempt labels must not be empty");
            }
            if !seen.insert(attempt.label.as_str()) {
                bail!("duplicate attempt label '{}'", attempt.label);
            }
        }
        if let Some(profile) = &self.profile {
            if profile.trim().is_empty() {
                bail!("profile must not be empty");
            }
        }
        Ok(())
    }

    /// The configured ladder, or the standard ladder over `base_flags`
    /// (optimization level 3 by default).
    pub fn configurations(&self) -> Vec<AttemptConfiguration> {
        if self.attempts.is_empty() {
            AttemptConfiguration::standard_ladder(
                self.base_flags.unwrap_or(CompileFlags::OPTIMIZATION_LEVEL3),
            )
        } else {
            self.attempts.clone()
        }
    }

    /// Command line first, then the environment, then the config file.
    pub fn resolve_profile(&self, from_cli: Option<&str>) -> Option<String> {
        self.resolve_profile_with(from_cli, std::env::var(PROFILE_ENV).ok())
    }

    fn resolve_profile_with(&self, from_cli: Option<&str>, from_env: Option<String>) -> Option<String> {
        from_cli
            .map(str::to_string)
            .or(from_env)
            .or_else(|| self.profile.clone())
            .filter(|p| !p.trim().is_empty())
    }

    /// Loader for the configured modules, with `D3DCOMPILER_PATH` tried first.
    pub fn loader(&self) -> D3DCompilerLoader {
        let mut loader = D3DCompilerLoader::default();
        if let Some(modules) = &self.compiler.modules {
            loader.module_names = modules.clone();
        }
        if let Some(preloaded) = &self.compiler.preloaded {
            loader.preloaded_names = preloaded.clone();
        }
        loader.with_override(std::env::var(shader_driver::d3d::COMPILER_PATH_ENV).ok())
    }
}
