use {
    crate::cmd::shade::{
        Pipeline,
        error::Result,
        model::{Archive, member_entry_path},
        phases::{self, ShadingPhase},
        report::Diagnostic,
    },
    std::collections::BTreeMap,
};

/// Combines shaded members and module resources into the final ordered
/// entry list.
#[derive(Debug, Default)]
pub struct Merge;

impl ShadingPhase for Merge {}

impl<'a> Pipeline<'a, Merge> {
    pub fn merge(self) -> Result<Pipeline<'a, phases::WriteArchive>> {
        // Path -> (content, origin). The BTreeMap gives the stable sorted
        // entry order the writer depends on.
        let mut entries: BTreeMap<String, (Vec<u8>, String)> = BTreeMap::new();
        let mut collisions = Vec::new();

        // Code members first; relocation already guarantees their paths
        // are collision-free.
        for member in &self.ctx.shaded {
            entries.insert(
                member_entry_path(&member.name),
                (member.content.clone(), member.origin.clone()),
            );
        }

        // Resources in module load order: the root module is first and
        // therefore always wins, then earlier dependencies beat later
        // ones. Losing entries are diagnostics, not failures.
        for module in self.ctx.modules.modules() {
            for resource in &module.resources {
                match entries.get(&resource.path) {
                    None => {
                        entries.insert(
                            resource.path.clone(),
                            (resource.content.clone(), module.id.to_string()),
                        );
                    }
                    Some((_, kept)) => {
                        collisions.push(Diagnostic::ResourceCollision {
                            path: resource.path.clone(),
                            kept: kept.clone(),
                            dropped: module.id.to_string(),
                        });
                    }
                }
            }
        }

        println!("Merged {} entries into the archive", entries.len());
        self.ctx.archive = Archive::from_entries(
            entries
                .into_iter()
                .map(|(path, (content, _))| (path, content))
                .collect(),
        );
        self.ctx.diagnostics.extend(collisions);

        Ok(Pipeline {
            ctx: self.ctx,
            state: phases::WriteArchive,
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::cmd::shade::{
            context::ShadeContext,
            model::{Module, ModuleId, Resource, ShadedMember},
            test_fixtures::minimal_config,
        },
    };

    fn module_with_resources(
        name: &str,
        root: bool,
        resources: &[(&str, &[u8])],
    ) -> Module {
        Module {
            id: ModuleId {
                name: name.to_string(),
                version: "1.0".to_string(),
            },
            dependencies: vec![],
            members: vec![],
            resources: resources
                .iter()
                .map(|(path, content)| Resource {
                    path: path.to_string(),
                    content: content.to_vec(),
                })
                .collect(),
            root,
        }
    }

    fn merged(ctx: &mut ShadeContext) {
        Pipeline { ctx, state: Merge }.merge().unwrap();
    }

    #[test]
    fn root_resources_beat_dependency_resources() {
        let mut ctx = ShadeContext::new(minimal_config("app"));
        ctx.modules.push(module_with_resources(
            "app",
            true,
            &[("meta.cfg", b"root content")],
        ));
        ctx.modules.push(module_with_resources(
            "dep",
            false,
            &[("meta.cfg", b"dep content")],
        ));
        merged(&mut ctx);

        assert_eq!(
            ctx.archive.get("meta.cfg").unwrap().content,
            b"root content"
        );
        assert_eq!(
            ctx.diagnostics,
            vec![Diagnostic::ResourceCollision {
                path: "meta.cfg".to_string(),
                kept: "app@1.0".to_string(),
                dropped: "dep@1.0".to_string(),
            }]
        );
    }

    #[test]
    fn earlier_dependency_wins_between_two_dependencies() {
        let mut ctx = ShadeContext::new(minimal_config("app"));
        ctx.modules
            .push(module_with_resources("app", true, &[]));
        ctx.modules.push(module_with_resources(
            "first",
            false,
            &[("shared.cfg", b"first")],
        ));
        ctx.modules.push(module_with_resources(
            "second",
            false,
            &[("shared.cfg", b"second")],
        ));
        merged(&mut ctx);

        assert_eq!(ctx.archive.get("shared.cfg").unwrap().content, b"first");
        assert_eq!(ctx.diagnostics.len(), 1);
    }

    #[test]
    fn member_entries_and_resources_share_one_sorted_namespace() {
        let mut ctx = ShadeContext::new(minimal_config("app"));
        ctx.modules.push(module_with_resources(
            "app",
            true,
            &[("zz/meta.cfg", b"resource")],
        ));
        ctx.shaded = vec![
            ShadedMember {
                name: "app.Main".to_string(),
                origin: "app@1.0".to_string(),
                content: b"main".to_vec(),
            },
            ShadedMember {
                name: "shaded.d.A".to_string(),
                origin: "dep@1.0".to_string(),
                content: b"a".to_vec(),
            },
        ];
        merged(&mut ctx);

        let paths: Vec<_> = ctx
            .archive
            .entries()
            .iter()
            .map(|e| e.path.as_str())
            .collect();
        assert_eq!(
            paths,
            vec!["app/Main.bin", "shaded/d/A.bin", "zz/meta.cfg"]
        );
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn member_entries_take_precedence_over_resources() {
        let mut ctx = ShadeContext::new(minimal_config("app"));
        ctx.modules.push(module_with_resources(
            "dep",
            false,
            &[("app/Main.bin", b"impostor")],
        ));
        ctx.shaded = vec![ShadedMember {
            name: "app.Main".to_string(),
            origin: "app@1.0".to_string(),
            content: b"real".to_vec(),
        }];
        merged(&mut ctx);

        assert_eq!(ctx.archive.get("app/Main.bin").unwrap().content, b"real");
        assert_eq!(ctx.diagnostics.len(), 1);
    }
}
