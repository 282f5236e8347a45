use {
    crate::cmd::shade::{
        Pipeline,
        error::{Error, Result},
        model::{Member, Module, ModuleId, Resource},
        phases::{self, ShadingPhase},
    },
    serde::Deserialize,
    std::{
        collections::{HashSet, VecDeque},
        fs,
        path::{Path, PathBuf},
        time::{Duration, Instant},
    },
    walkdir::WalkDir,
};

/// Loads the root module and the transitive closure of its declared
/// dependencies from the store.
#[derive(Debug, Default)]
pub struct LoadModules;

impl ShadingPhase for LoadModules {}

impl<'a> Pipeline<'a, LoadModules> {
    pub fn load_modules(self) -> Result<Pipeline<'a, phases::Analyze>> {
        let store = self.ctx.config.store.path.clone();
        let root_name = self.ctx.config.project.root.clone();
        let deadline = self
            .ctx
            .config
            .store
            .timeout_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        // Breadth-first over dependency declarations, root first. The
        // resulting order doubles as the merge precedence order.
        let mut queue = VecDeque::from([root_name.clone()]);
        while let Some(name) = queue.pop_front() {
            if self.ctx.modules.contains(&name) {
                continue;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                return Err(Error::Resolution {
                    module: name,
                    reason: "module store deadline expired".to_string(),
                });
            }

            let module = load_module(&store, &name, name == root_name)?;
            println!(
                "Loaded module {} ({} members, {} resources)",
                module.id,
                module.members.len(),
                module.resources.len()
            );
            for dep in &module.dependencies {
                if !self.ctx.modules.contains(dep) {
                    queue.push_back(dep.clone());
                }
            }
            self.ctx.modules.push(module);
        }

        Ok(Pipeline {
            ctx: self.ctx,
            state: phases::Analyze,
        })
    }
}

/// On-disk manifest of a store module (`module.toml`).
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    module: ManifestModule,
    #[serde(default, rename = "member")]
    members: Vec<ManifestMember>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestModule {
    name: String,
    version: String,
    #[serde(default)]
    dependencies: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestMember {
    name: String,
    file: PathBuf,
    #[serde(default)]
    uses: Vec<String>,
    #[serde(default)]
    public: bool,
}

fn resolution_error(module: &str, reason: String) -> Error {
    Error::Resolution {
        module: module.to_string(),
        reason,
    }
}

/// Materialize one module from `<store>/<name>/`. Any missing or
/// malformed piece is a resolution failure naming the module.
fn load_module(store: &Path, name: &str, root: bool) -> Result<Module> {
    let dir = store.join(name);
    if !dir.is_dir() {
        return Err(resolution_error(
            name,
            format!("not found in store {}", store.display()),
        ));
    }

    let manifest_path = dir.join("module.toml");
    let content = fs::read_to_string(&manifest_path)
        .map_err(|e| resolution_error(name, format!("cannot read module.toml: {e}")))?;
    let manifest: Manifest = toml::from_str(&content)
        .map_err(|e| resolution_error(name, format!("malformed module.toml: {e}")))?;
    if manifest.module.name != name {
        return Err(resolution_error(
            name,
            format!("module.toml names {:?} instead", manifest.module.name),
        ));
    }

    let mut names = HashSet::new();
    let mut members = Vec::with_capacity(manifest.members.len());
    for entry in manifest.members {
        if !names.insert(entry.name.clone()) {
            return Err(resolution_error(
                name,
                format!("duplicate member {:?}", entry.name),
            ));
        }
        let content = fs::read(dir.join(&entry.file)).map_err(|e| {
            resolution_error(
                name,
                format!("cannot read member {:?} from {:?}: {e}", entry.name, entry.file),
            )
        })?;
        members.push(Member {
            name: entry.name,
            uses: entry.uses,
            content,
            public: entry.public,
        });
    }

    Ok(Module {
        id: ModuleId {
            name: manifest.module.name,
            version: manifest.module.version,
        },
        dependencies: manifest.module.dependencies,
        members,
        resources: load_resources(&dir, name)?,
        root,
    })
}

/// Every file under `<module>/resources/` becomes an archive resource
/// entry, keyed by its path relative to that directory.
fn load_resources(dir: &Path, module: &str) -> Result<Vec<Resource>> {
    let resources_dir = dir.join("resources");
    let mut resources = Vec::new();
    if !resources_dir.is_dir() {
        return Ok(resources);
    }

    for entry in WalkDir::new(&resources_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let rel_path = entry.path().strip_prefix(&resources_dir).map_err(|_| {
            resolution_error(
                module,
                format!("resource outside resources dir: {:?}", entry.path()),
            )
        })?;
        let path = rel_path.to_string_lossy().replace('\\', "/");
        let content = fs::read(entry.path())
            .map_err(|e| resolution_error(module, format!("cannot read resource {path:?}: {e}")))?;
        resources.push(Resource { path, content });
    }
    Ok(resources)
}
