use {
    crate::cmd::shade::{
        Pipeline,
        error::{Error, Result},
        model::Member,
        phases::{self, ShadingPhase},
        report::Diagnostic,
    },
    std::collections::{BTreeSet, HashMap, HashSet, VecDeque},
    tap::Tap,
};

/// Computes the set of members transitively reachable from the entry set
/// and marks everything else for exclusion.
#[derive(Debug, Default)]
pub struct Analyze;

impl ShadingPhase for Analyze {}

impl<'a> Pipeline<'a, Analyze> {
    pub fn analyze(self) -> Result<Pipeline<'a, phases::Relocate>> {
        let mut retained = BTreeSet::new();
        let mut dangling = BTreeSet::new();
        let mut unknown_pins = Vec::new();

        {
            let modules = self.ctx.modules.modules();
            let root = self.ctx.modules.root().ok_or_else(|| Error::Resolution {
                module: self.ctx.config.project.root.clone(),
                reason: "root module missing from the loaded set".to_string(),
            })?;

            // Reference lookup over all loaded members. When several
            // modules define the same name, the earliest in load order
            // owns it; later definitions are shadowed and unreachable.
            let mut owner: HashMap<&str, &Member> = HashMap::new();
            for module in modules {
                for member in &module.members {
                    owner.entry(member.name.as_str()).or_insert(member);
                }
            }

            // Entry set: the root's public surface, or its whole member
            // set when nothing is marked public, plus pinned names.
            let mut seeds: Vec<&str> = root
                .members
                .iter()
                .filter(|m| m.public)
                .map(|m| m.name.as_str())
                .collect();
            if seeds.is_empty() {
                seeds = root.members.iter().map(|m| m.name.as_str()).collect();
            }
            for pin in &self.ctx.config.project.keep {
                if owner.contains_key(pin.as_str()) {
                    seeds.push(pin.as_str());
                } else {
                    unknown_pins.push(pin.clone());
                }
            }

            // Plain breadth-first closure. The result is a set, so the
            // visitation order is not observable in the output.
            let mut queue: VecDeque<&str> = seeds.into_iter().collect();
            while let Some(name) = queue.pop_front() {
                if !retained.insert(name.to_string()) {
                    continue;
                }
                let Some(member) = owner.get(name) else {
                    continue;
                };
                for used in &member.uses {
                    if owner.contains_key(used.as_str()) {
                        queue.push_back(used.as_str());
                    } else {
                        dangling.insert((member.name.clone(), used.clone()));
                    }
                }
            }

            // Root members are never minimized away, reachable or not.
            for member in &root.members {
                retained.insert(member.name.clone());
            }

            // Report the fate of every dependency member. A name already
            // claimed by an earlier module keeps only its first copy.
            let mut seen: HashSet<&str> =
                root.members.iter().map(|m| m.name.as_str()).collect();
            let mut kept_deps = 0usize;
            let mut total_deps = 0usize;
            for module in modules.iter().filter(|m| !m.root) {
                for member in &module.members {
                    total_deps += 1;
                    let kept = (retained.contains(&member.name)
                        && seen.insert(member.name.as_str()))
                    .tap(|&kept| {
                        println!(
                            "- member {} {}",
                            member.name,
                            if kept { "[kept]" } else { "[minimized]" }
                        );
                    });
                    if kept {
                        kept_deps += 1;
                    }
                }
            }
            println!("Retained {kept_deps} of {total_deps} dependency members");
        }

        self.ctx.retained = retained;
        for (from, to) in dangling {
            self.ctx
                .diagnostics
                .push(Diagnostic::DanglingReference { from, to });
        }
        for name in unknown_pins {
            self.ctx
                .diagnostics
                .push(Diagnostic::UnknownPinnedEntry { name });
        }

        Ok(Pipeline {
            ctx: self.ctx,
            state: phases::Relocate,
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::cmd::shade::{
            context::ShadeContext,
            test_fixtures::{in_memory_module, minimal_config},
        },
    };

    fn analyzed(ctx: &mut ShadeContext) -> Result<()> {
        Pipeline { ctx, state: Analyze }.analyze()?;
        Ok(())
    }

    fn two_module_context(root_uses: &[&str]) -> ShadeContext {
        let mut ctx = ShadeContext::new(minimal_config("app"));
        ctx.modules.push(in_memory_module(
            "app",
            true,
            &[("app.Main", root_uses, true)],
        ));
        ctx.modules.push(in_memory_module(
            "dep",
            false,
            &[
                ("d.A", &["d.B"], false),
                ("d.B", &[], false),
                ("d.C", &[], false),
            ],
        ));
        ctx
    }

    #[test]
    fn closure_follows_references_and_excludes_the_rest() {
        let mut ctx = two_module_context(&["d.A"]);
        analyzed(&mut ctx).unwrap();

        assert!(ctx.retained.contains("app.Main"));
        assert!(ctx.retained.contains("d.A"));
        assert!(ctx.retained.contains("d.B"));
        assert!(!ctx.retained.contains("d.C"));
        assert!(ctx.diagnostics.is_empty());
    }

    #[test]
    fn closure_is_independent_of_edge_order() {
        let mut forward = ShadeContext::new(minimal_config("app"));
        forward.modules.push(in_memory_module(
            "app",
            true,
            &[("app.Main", &["d.A", "d.B"], true)],
        ));
        forward.modules.push(in_memory_module(
            "dep",
            false,
            &[
                ("d.A", &["d.C"], false),
                ("d.B", &["d.C"], false),
                ("d.C", &[], false),
                ("d.D", &[], false),
            ],
        ));

        let mut reversed = ShadeContext::new(minimal_config("app"));
        reversed.modules.push(in_memory_module(
            "app",
            true,
            &[("app.Main", &["d.B", "d.A"], true)],
        ));
        reversed.modules.push(in_memory_module(
            "dep",
            false,
            &[
                ("d.D", &[], false),
                ("d.C", &[], false),
                ("d.B", &["d.C"], false),
                ("d.A", &["d.C"], false),
            ],
        ));

        analyzed(&mut forward).unwrap();
        analyzed(&mut reversed).unwrap();
        assert_eq!(forward.retained, reversed.retained);
    }

    #[test]
    fn root_members_survive_even_when_unreferenced() {
        let mut ctx = ShadeContext::new(minimal_config("app"));
        ctx.modules.push(in_memory_module(
            "app",
            true,
            &[
                ("app.Main", &[], true),
                ("app.Helper", &[], false),
            ],
        ));
        analyzed(&mut ctx).unwrap();

        assert!(ctx.retained.contains("app.Main"));
        assert!(ctx.retained.contains("app.Helper"));
    }

    #[test]
    fn private_root_members_do_not_pull_dependencies_in() {
        // `app.Helper` stays (root members always do), but since it is not
        // part of the entry set its reference does not reach `d.A`.
        let mut ctx = ShadeContext::new(minimal_config("app"));
        ctx.modules.push(in_memory_module(
            "app",
            true,
            &[
                ("app.Main", &[], true),
                ("app.Helper", &["d.A"], false),
            ],
        ));
        ctx.modules
            .push(in_memory_module("dep", false, &[("d.A", &[], false)]));
        analyzed(&mut ctx).unwrap();

        assert!(ctx.retained.contains("app.Helper"));
        assert!(!ctx.retained.contains("d.A"));
    }

    #[test]
    fn dangling_reference_is_a_diagnostic_not_a_failure() {
        let mut ctx = ShadeContext::new(minimal_config("app"));
        ctx.modules.push(in_memory_module(
            "app",
            true,
            &[("app.Main", &["ghost.Thing"], true)],
        ));
        analyzed(&mut ctx).unwrap();

        assert_eq!(
            ctx.diagnostics,
            vec![Diagnostic::DanglingReference {
                from: "app.Main".to_string(),
                to: "ghost.Thing".to_string(),
            }]
        );
        assert!(ctx.retained.contains("app.Main"));
    }

    #[test]
    fn pins_extend_the_entry_set() {
        let mut ctx = two_module_context(&[]);
        ctx.config.project.keep = vec!["d.C".to_string(), "d.Nope".to_string()];
        analyzed(&mut ctx).unwrap();

        assert!(ctx.retained.contains("d.C"));
        assert!(!ctx.retained.contains("d.A"));
        assert_eq!(
            ctx.diagnostics,
            vec![Diagnostic::UnknownPinnedEntry {
                name: "d.Nope".to_string(),
            }]
        );
    }

    #[test]
    fn shadowed_duplicate_names_are_not_kept_twice() {
        // Both modules define `lib.Util`; the earlier one owns the name.
        let mut ctx = ShadeContext::new(minimal_config("app"));
        ctx.modules.push(in_memory_module(
            "app",
            true,
            &[("app.Main", &["lib.Util"], true)],
        ));
        ctx.modules
            .push(in_memory_module("first", false, &[("lib.Util", &[], false)]));
        ctx.modules
            .push(in_memory_module("second", false, &[("lib.Util", &[], false)]));
        analyzed(&mut ctx).unwrap();

        assert!(ctx.retained.contains("lib.Util"));
    }
}
