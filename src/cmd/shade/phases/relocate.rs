use {
    crate::cmd::shade::{
        Pipeline,
        error::{Error, Result},
        model::{Member, Module, RelocationMap, ShadedMember},
        phases::{self, ShadingPhase},
    },
    regex::bytes::{Captures, Regex},
    std::collections::{HashMap, HashSet},
};

/// Moves surviving dependency members into their private namespace and
/// rewrites every reference consistently.
#[derive(Debug, Default)]
pub struct Relocate;

impl ShadingPhase for Relocate {}

impl<'a> Pipeline<'a, Relocate> {
    pub fn relocate(self) -> Result<Pipeline<'a, phases::Merge>> {
        let mut map = RelocationMap::default();
        let mut shaded = Vec::new();

        {
            let modules = self.ctx.modules.modules();
            let retained = &self.ctx.retained;
            let relocate = &self.ctx.config.relocate;

            // Survivors in load order; the first definition of a name wins.
            let mut survivors: Vec<(&Module, &Member)> = Vec::new();
            let mut seen: HashSet<&str> = HashSet::new();
            for module in modules {
                for member in &module.members {
                    let kept = module.root || retained.contains(&member.name);
                    if kept && seen.insert(member.name.as_str()) {
                        survivors.push((module, member));
                    }
                }
            }

            // Map every surviving dependency member. Root members keep
            // their names and never enter the map.
            for &(module, member) in &survivors {
                if !module.root {
                    map.insert(&member.name, &relocate.target_for(&member.name));
                }
            }

            // Claim target names up front. Distinct content under one
            // target is fatal; identical content collapses to one copy.
            let mut claimed: HashMap<String, (String, String)> = HashMap::new();
            let mut emit: Vec<(&Module, &Member, String)> = Vec::new();
            for &(module, member) in &survivors {
                let target = map
                    .target(&member.name)
                    .unwrap_or(&member.name)
                    .to_string();
                let origin = format!("{}::{}", module.id, member.name);
                let digest = member.digest();
                match claimed.get(&target) {
                    None => {
                        claimed.insert(target.clone(), (origin, digest));
                        emit.push((module, member, target));
                    }
                    Some((first, first_digest)) => {
                        if *first_digest != digest {
                            return Err(Error::RelocationConflict {
                                target,
                                first: first.clone(),
                                second: origin,
                            });
                        }
                        // Identical duplicate, already emitted once.
                    }
                }
            }

            let rewriter = Rewriter::new(&map);
            for (module, member, target) in emit {
                if member.name != target {
                    println!("- relocating {} -> {target}", member.name);
                }
                shaded.push(ShadedMember {
                    name: target,
                    origin: module.id.to_string(),
                    content: rewriter.rewrite(&member.content),
                });
            }
            println!(
                "Relocated {} of {} surviving members",
                map.len(),
                shaded.len()
            );
        }

        self.ctx.relocations = map;
        self.ctx.shaded = shaded;

        Ok(Pipeline {
            ctx: self.ctx,
            state: phases::Merge,
        })
    }
}

/// Single-pass rewriter over member content. One alternation pattern over
/// every mapped name keeps already-rewritten output from being rescanned.
struct Rewriter {
    pattern: Option<Regex>,
    targets: HashMap<Vec<u8>, Vec<u8>>,
}

impl Rewriter {
    fn new(map: &RelocationMap) -> Self {
        if map.is_empty() {
            return Self {
                pattern: None,
                targets: HashMap::new(),
            };
        }

        // Longer names first, so the alternation always takes the longest
        // match at a position.
        let mut names: Vec<&str> = map.iter().map(|(from, _)| from).collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        let alternation = names
            .iter()
            .map(|name| regex::escape(name))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"\b(?:{alternation})\b"))
            .expect("alternation of escaped names is a valid pattern");

        let targets = map
            .iter()
            .map(|(from, to)| (from.as_bytes().to_vec(), to.as_bytes().to_vec()))
            .collect();
        Self {
            pattern: Some(pattern),
            targets,
        }
    }

    fn rewrite(&self, content: &[u8]) -> Vec<u8> {
        match &self.pattern {
            None => content.to_vec(),
            Some(pattern) => pattern
                .replace_all(content, |caps: &Captures| {
                    self.targets
                        .get(&caps[0])
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_vec())
                })
                .into_owned(),
        }
    }
}
