use {
    crate::cmd::shade::error::{Error, Result},
    serde::Deserialize,
    std::{
        fs,
        path::{Path, PathBuf},
    },
};

/// Parsed build descriptor (`shade.toml`). Every recognized option is an
/// explicit field here; anything the descriptor omits falls back to the
/// documented defaults.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShadeConfig {
    pub project: ProjectConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub relocate: RelocateConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Project name, substituted into the artifact name template.
    pub name: String,
    /// Project version, substituted into the artifact name template.
    pub version: String,
    /// Name of the root module in the store.
    pub root: String,
    /// Members to retain as entry points in addition to the root's public
    /// surface, e.g. symbols accessed reflectively from outside.
    #[serde(default)]
    pub keep: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct StoreConfig {
    /// Module store directory.
    pub path: PathBuf,
    /// Deadline for loading all modules, in milliseconds. Unset means no
    /// deadline.
    pub timeout_ms: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("modules"),
            timeout_ms: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct OutputConfig {
    /// Directory the artifact is written to.
    pub directory: PathBuf,
    /// Artifact file name template; `{name}` and `{version}` are
    /// substituted from the project section.
    pub template: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("output"),
            template: "{name}-v{version}.pack".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RelocateConfig {
    /// Namespace that surviving dependency members are moved under when no
    /// explicit rule matches them.
    pub prefix: String,
    /// Explicit prefix rewrites, matched on `.` boundaries. The longest
    /// matching `from` wins.
    pub rules: Vec<RelocationRule>,
}

impl Default for RelocateConfig {
    fn default() -> Self {
        Self {
            prefix: "shaded".to_string(),
            rules: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RelocationRule {
    pub from: String,
    pub to: String,
}

impl RelocateConfig {
    /// Relocated name for a dependency member: the longest configured rule
    /// prefix wins, otherwise the member moves under the default namespace.
    pub fn target_for(&self, name: &str) -> String {
        let mut best: Option<&RelocationRule> = None;
        for rule in &self.rules {
            let applies = name == rule.from
                || (name.len() > rule.from.len()
                    && name.starts_with(rule.from.as_str())
                    && name.as_bytes()[rule.from.len()] == b'.');
            if applies && best.is_none_or(|b| rule.from.len() > b.from.len()) {
                best = Some(rule);
            }
        }
        match best {
            Some(rule) => format!("{}{}", rule.to, &name[rule.from.len()..]),
            None => format!("{}.{}", self.prefix, name),
        }
    }
}

impl ShadeConfig {
    /// Read and validate a build descriptor.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: ShadeConfig = toml::from_str(&content).map_err(|e| Error::Config {
            message: format!("cannot parse {}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("project.name", &self.project.name),
            ("project.version", &self.project.version),
            ("project.root", &self.project.root),
            ("relocate.prefix", &self.relocate.prefix),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config {
                    message: format!("{field} must not be empty"),
                });
            }
        }
        for rule in &self.relocate.rules {
            if rule.from.trim().is_empty() || rule.to.trim().is_empty() {
                return Err(Error::Config {
                    message: "relocation rules must have non-empty from and to".to_string(),
                });
            }
        }
        let artifact = self.artifact_name();
        if artifact.is_empty() || artifact.contains('/') || artifact.contains('\\') {
            return Err(Error::Config {
                message: format!("output.template resolves to an invalid file name: {artifact:?}"),
            });
        }
        Ok(())
    }

    /// Artifact file name with the template placeholders resolved.
    pub fn artifact_name(&self) -> String {
        self.output
            .template
            .replace("{name}", &self.project.name)
            .replace("{version}", &self.project.version)
    }

    /// Full destination path of the artifact.
    pub fn artifact_path(&self) -> PathBuf {
        self.output.directory.join(self.artifact_name())
    }
}
