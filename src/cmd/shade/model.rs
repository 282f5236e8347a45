use {
    sha2::{Digest, Sha256},
    std::{
        collections::{BTreeMap, HashMap},
        fmt,
    },
};

/// Identity of a module: name plus version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleId {
    pub name: String,
    pub version: String,
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A named binary unit belonging to exactly one module.
#[derive(Debug, Clone)]
pub struct Member {
    /// Qualified dotted name, e.g. `com.example.Codec`.
    pub name: String,
    /// Qualified names of members this member references.
    pub uses: Vec<String>,
    /// Opaque binary content.
    pub content: Vec<u8>,
    /// Part of the owning module's public surface.
    pub public: bool,
}

impl Member {
    /// Hex SHA-256 digest of the member content.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.content);
        format!("{:x}", hasher.finalize())
    }
}

/// A non-code entry carried into the archive unchanged.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Archive path, forward slashes.
    pub path: String,
    pub content: Vec<u8>,
}

/// A module as loaded from the store. Immutable once loaded.
#[derive(Debug)]
pub struct Module {
    pub id: ModuleId,
    /// Names of directly declared dependency modules, in declaration order.
    pub dependencies: Vec<String>,
    pub members: Vec<Member>,
    pub resources: Vec<Resource>,
    /// Whether this is the root module of the build.
    pub root: bool,
}

/// Modules in deterministic load order: root first, then breadth-first
/// over dependency declarations. This order is also the precedence order
/// used when merging colliding resources.
#[derive(Debug, Default)]
pub struct ModuleSet {
    modules: Vec<Module>,
    by_name: HashMap<String, usize>,
}

impl ModuleSet {
    pub fn push(&mut self, module: Module) {
        self.by_name
            .insert(module.id.name.clone(), self.modules.len());
        self.modules.push(module);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Module> {
        self.by_name.get(name).map(|&idx| &self.modules[idx])
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn root(&self) -> Option<&Module> {
        self.modules.iter().find(|m| m.root)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// Mapping from original to relocated qualified names, covering surviving
/// dependency members only. Root module members are never present as keys.
#[derive(Debug, Default)]
pub struct RelocationMap {
    map: BTreeMap<String, String>,
}

impl RelocationMap {
    pub fn insert(&mut self, from: &str, to: &str) {
        self.map.insert(from.to_string(), to.to_string());
    }

    /// Relocated name for `name`, if it is mapped.
    pub fn target(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(String::as_str)
    }

    /// Pairs in lexicographic order of the original name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.map.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// A member after minimization and relocation, ready for merging.
#[derive(Debug, Clone)]
pub struct ShadedMember {
    /// Post-relocation qualified name.
    pub name: String,
    /// Rendered id of the module the member came from.
    pub origin: String,
    /// Content with all references rewritten.
    pub content: Vec<u8>,
}

/// Final ordered entry list. Paths are unique and sorted, so identical
/// inputs serialize to identical bytes.
#[derive(Debug, Default)]
pub struct Archive {
    entries: Vec<ArchiveEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub content: Vec<u8>,
}

impl Archive {
    pub fn from_entries(entries: BTreeMap<String, Vec<u8>>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(path, content)| ArchiveEntry { path, content })
                .collect(),
        }
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn get(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Archive path of a code member: dots become slashes, `.bin` suffix.
pub fn member_entry_path(name: &str) -> String {
    format!("{}.bin", name.replace('.', "/"))
}

#[cfg(test)]
mod tests {
    use {super::*, std::collections::BTreeMap};

    #[test]
    fn module_id_renders_name_and_version() {
        let id = ModuleId {
            name: "gson".to_string(),
            version: "2.11.0".to_string(),
        };
        assert_eq!(id.to_string(), "gson@2.11.0");
    }

    #[test]
    fn member_entry_path_maps_dots_to_slashes() {
        assert_eq!(
            member_entry_path("com.example.Codec"),
            "com/example/Codec.bin"
        );
        assert_eq!(member_entry_path("Single"), "Single.bin");
    }

    #[test]
    fn identical_content_members_share_a_digest() {
        let a = Member {
            name: "a.X".to_string(),
            uses: vec![],
            content: b"same bytes".to_vec(),
            public: false,
        };
        let b = Member {
            name: "b.Y".to_string(),
            uses: vec![],
            content: b"same bytes".to_vec(),
            public: true,
        };
        assert_eq!(a.digest(), b.digest());

        let c = Member {
            content: b"different".to_vec(),
            ..a.clone()
        };
        assert_ne!(a.digest(), c.digest());
    }

    #[test]
    fn relocation_map_iterates_in_name_order() {
        let mut map = RelocationMap::default();
        map.insert("z.Last", "shaded.z.Last");
        map.insert("a.First", "shaded.a.First");
        let pairs: Vec<_> = map.iter().collect();
        assert_eq!(
            pairs,
            vec![
                ("a.First", "shaded.a.First"),
                ("z.Last", "shaded.z.Last"),
            ]
        );
    }

    #[test]
    fn archive_entries_are_sorted_by_path() {
        let mut entries = BTreeMap::new();
        entries.insert("z/last.bin".to_string(), b"z".to_vec());
        entries.insert("a/first.bin".to_string(), b"a".to_vec());
        entries.insert("m/mid.cfg".to_string(), b"m".to_vec());
        let archive = Archive::from_entries(entries);
        let paths: Vec<_> = archive.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["a/first.bin", "m/mid.cfg", "z/last.bin"]);
    }

    #[test]
    fn module_set_keeps_load_order_and_finds_root() {
        let mut set = ModuleSet::default();
        set.push(Module {
            id: ModuleId {
                name: "app".to_string(),
                version: "1.0".to_string(),
            },
            dependencies: vec!["lib".to_string()],
            members: vec![],
            resources: vec![],
            root: true,
        });
        set.push(Module {
            id: ModuleId {
                name: "lib".to_string(),
                version: "0.3".to_string(),
            },
            dependencies: vec![],
            members: vec![],
            resources: vec![],
            root: false,
        });

        assert_eq!(set.len(), 2);
        assert!(set.contains("lib"));
        assert_eq!(set.root().map(|m| m.id.name.as_str()), Some("app"));
        assert_eq!(set.modules()[0].id.name, "app");
        assert_eq!(set.get("lib").map(|m| m.id.version.as_str()), Some("0.3"));
    }
}
