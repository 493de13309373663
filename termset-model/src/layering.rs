//! Builds the profile tree from the layered documents.
//!
//! Layers, lowest first:
//!
//! 1. the defaults document's profile list, then generator drafts (the base
//!    layer). The defaults document's own `profiles.defaults` is folded into
//!    each base entry.
//! 2. the user document's `profiles.defaults`, a single node that is a parent
//!    of every profile
//! 3. the user document's profile list
//!
//! A user entry whose guid matches a base profile becomes a child of it.
//! Base profiles nobody overrides get an empty child so every profile in the
//! tree has the same parent shape: declared parents, then profile defaults,
//! then its base.

use serde_json::Value;
use std::collections::{HashMap, HashSet};

use crate::error::SettingsLoadError;
use crate::generator::ProfileDraft;
use crate::guid::Guid;
use crate::inheritance::{InheritanceGraph, NodeId};
use crate::profile_types::{Profile, ProfileEntry, ProfileGroup, ProfileSettings, tree};
use crate::sources::SettingsSources;

/// Drafts from one generator.
#[derive(Debug, Clone)]
pub(crate) struct GeneratedLayer {
    pub namespace: String,
    pub drafts: Vec<ProfileDraft>,
}

/// Resolved tree plus the records later stages and queries need.
#[derive(Debug, Clone)]
pub(crate) struct LayeredProfiles {
    pub tree: Vec<ProfileEntry>,
    /// Guids of generated profiles, in generation order
    pub generated_order: Vec<Guid>,
    /// The user document's `profiles.defaults` record
    pub profile_defaults: ProfileSettings,
    /// Slot of each top-level group of `tree`, in tree order
    pub group_slots: Vec<OrderSlot>,
}

/// Which settings document an entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    Defaults,
    User,
}

/// A top-level entry of a document's profile list, as seen by reordering.
///
/// Groups are identified by position, not name, so same-named groups in the
/// two documents each keep their own slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OrderSlot {
    Profile(Guid),
    Group { origin: Origin, index: usize },
}

/// Top-level order of a document's profile list.
pub(crate) fn top_level_order(document: &Value, origin: Origin) -> Vec<OrderSlot> {
    SettingsSources::profile_list(document)
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            if ProfileEntry::<Profile>::is_group_fragment(entry) {
                OrderSlot::Group { origin, index }
            } else {
                OrderSlot::Profile(ProfileSettings::from_json(entry).identity())
            }
        })
        .collect()
}

/// Slots of a document's top-level groups, in document order.
fn document_group_slots(document: &Value, origin: Origin) -> impl Iterator<Item = OrderSlot> {
    top_level_order(document, origin)
        .into_iter()
        .filter(|slot| matches!(slot, OrderSlot::Group { .. }))
}

/// Every guid a document's profile list defines, groups included.
pub(crate) fn declared_guids(document: &Value) -> HashSet<Guid> {
    fn walk(entries: &[Value], out: &mut HashSet<Guid>) {
        for entry in entries {
            if let Some(children) = entry.get("profiles").and_then(Value::as_array) {
                walk(children, out);
            } else if let Some(guid) = ProfileSettings::from_json(entry).effective_guid() {
                out.insert(guid);
            }
        }
    }
    let mut out = HashSet::new();
    walk(SettingsSources::profile_list(document), &mut out);
    out
}

enum Claim {
    /// The user entry takes the base entry's place in the tree.
    InPlace(NodeId),
    /// The user entry lives in a user group; the base entry is dropped.
    Moved,
}

struct Pending {
    node: NodeId,
    base: Option<NodeId>,
}

struct Builder {
    graph: InheritanceGraph,
    /// `profiles.defaults` of the defaults document
    base_defaults: ProfileSettings,
    base_index: HashMap<Guid, NodeId>,
    claims: HashMap<NodeId, Claim>,
    pending: Vec<Pending>,
}

fn label_for(settings: &ProfileSettings) -> String {
    settings
        .name
        .clone()
        .or_else(|| settings.guid.map(|g| g.to_string()))
        .unwrap_or_else(|| "(unnamed profile)".to_string())
}

impl Builder {
    fn add_profile(&mut self, mut settings: ProfileSettings) -> NodeId {
        // Identity comes from this layer alone, before anything is inherited.
        settings.guid = Some(settings.identity());
        let label = label_for(&settings);
        self.graph.add_node(settings, label)
    }

    fn add_base(&mut self, settings: ProfileSettings) -> NodeId {
        let id = self.add_profile(settings.merged_over(&self.base_defaults));
        if let Some(guid) = self.graph.node(id).settings.guid {
            self.base_index.entry(guid).or_insert(id);
        }
        id
    }

    fn base_entries(&mut self, entries: &[Value]) -> Vec<ProfileEntry<NodeId>> {
        entries
            .iter()
            .map(|entry| match entry.get("profiles").and_then(Value::as_array) {
                Some(children) => {
                    let mut group = ProfileGroup::from_json_header(entry);
                    group.children = self.base_entries(children);
                    ProfileEntry::Group(group)
                }
                None => ProfileEntry::Profile(self.add_base(ProfileSettings::from_json(entry))),
            })
            .collect()
    }

    fn user_entries(&mut self, entries: &[Value], top_level: bool) -> Vec<ProfileEntry<NodeId>> {
        let mut out = Vec::new();
        for entry in entries {
            if let Some(children) = entry.get("profiles").and_then(Value::as_array) {
                let mut group = ProfileGroup::from_json_header(entry);
                group.children = self.user_entries(children, false);
                out.push(ProfileEntry::Group(group));
                continue;
            }

            let id = self.add_profile(ProfileSettings::from_json(entry));
            let base = self
                .graph
                .node(id)
                .settings
                .guid
                .and_then(|guid| self.base_index.get(&guid).copied())
                .filter(|base| !self.claims.contains_key(base));
            self.pending.push(Pending { node: id, base });

            match base {
                Some(base) if top_level => {
                    self.claims.insert(base, Claim::InPlace(id));
                }
                Some(base) => {
                    self.claims.insert(base, Claim::Moved);
                    out.push(ProfileEntry::Profile(id));
                }
                None => out.push(ProfileEntry::Profile(id)),
            }
        }
        out
    }

    /// Swap each base entry for the node that overrides it.
    fn settle_base(&mut self, entries: Vec<ProfileEntry<NodeId>>) -> Vec<ProfileEntry<NodeId>> {
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                ProfileEntry::Group(mut group) => {
                    group.children = self.settle_base(group.children);
                    out.push(ProfileEntry::Group(group));
                }
                ProfileEntry::Profile(base) => match self.claims.get(&base) {
                    Some(Claim::InPlace(child)) => out.push(ProfileEntry::Profile(*child)),
                    Some(Claim::Moved) => {}
                    None => {
                        let base_node = self.graph.node(base);
                        let settings = ProfileSettings {
                            guid: base_node.settings.guid,
                            ..ProfileSettings::default()
                        };
                        let label = base_node.label.clone();
                        let child = self.graph.add_node(settings, label);
                        self.pending.push(Pending {
                            node: child,
                            base: Some(base),
                        });
                        out.push(ProfileEntry::Profile(child));
                    }
                },
            }
        }
        out
    }

    /// Connect every tree node to its declared parents, the profile-defaults
    /// node and its base, in that order.
    fn wire_parents(&mut self, tree_nodes: &[NodeId], defaults_node: NodeId) {
        let base_of: HashMap<NodeId, NodeId> = self
            .pending
            .iter()
            .filter_map(|p| p.base.map(|base| (p.node, base)))
            .collect();

        let mut by_guid: HashMap<Guid, NodeId> = HashMap::new();
        let mut by_name: HashMap<String, NodeId> = HashMap::new();
        for &id in tree_nodes {
            let settings = &self.graph.node(id).settings;
            if let Some(guid) = settings.guid {
                by_guid.entry(guid).or_insert(id);
            }
            let name = settings.name.clone().or_else(|| {
                base_of
                    .get(&id)
                    .and_then(|base| self.graph.node(*base).settings.name.clone())
            });
            if let Some(name) = name {
                by_name.entry(name).or_insert(id);
            }
        }

        let pending = std::mem::take(&mut self.pending);
        for Pending { node, base } in &pending {
            let declared = self
                .graph
                .node(*node)
                .settings
                .parents
                .clone()
                .or_else(|| base.and_then(|b| self.graph.node(b).settings.parents.clone()))
                .unwrap_or_default();

            for reference in &declared {
                let parent = reference
                    .parse::<Guid>()
                    .ok()
                    .and_then(|guid| by_guid.get(&guid))
                    .or_else(|| by_name.get(reference))
                    .copied();
                match parent {
                    Some(parent) => self.graph.add_parent(*node, parent),
                    None => log::warn!(
                        "Profile '{}' names unknown parent '{reference}', ignoring it",
                        self.graph.node(*node).label
                    ),
                }
            }

            self.graph.add_parent(*node, defaults_node);
            if let Some(base) = base {
                self.graph.add_parent(*node, *base);
            }
        }
    }
}

/// Layer both documents and the generated drafts into a resolved tree.
///
/// Fails with [`SettingsLoadError::CyclicInheritance`] when declared parents
/// form a cycle.
pub(crate) fn layer_profiles(
    sources: &SettingsSources,
    generated: &[GeneratedLayer],
) -> Result<LayeredProfiles, SettingsLoadError> {
    let fragment_of = |document: &Value| {
        let mut settings = SettingsSources::profile_defaults(document)
            .map(ProfileSettings::from_json)
            .unwrap_or_default();
        settings.guid = None;
        settings.parents = None;
        settings
    };

    let mut builder = Builder {
        graph: InheritanceGraph::new(),
        base_defaults: fragment_of(&sources.defaults),
        base_index: HashMap::new(),
        claims: HashMap::new(),
        pending: Vec::new(),
    };

    let profile_defaults = fragment_of(&sources.user);
    let defaults_node = builder
        .graph
        .add_node(profile_defaults.clone(), "profile defaults");

    let mut base_tree = builder.base_entries(SettingsSources::profile_list(&sources.defaults));
    let mut generated_order = Vec::new();
    for layer in generated {
        for draft in &layer.drafts {
            let mut settings = draft.settings.clone();
            settings.source = Some(layer.namespace.clone());
            let id = builder.add_base(settings);
            if let Some(guid) = builder.graph.node(id).settings.guid {
                generated_order.push(guid);
            }
            base_tree.push(ProfileEntry::Profile(id));
        }
    }

    let user_tree = builder.user_entries(SettingsSources::profile_list(&sources.user), true);
    let mut entries = builder.settle_base(base_tree);
    entries.extend(user_tree);

    let tree_nodes = tree::flatten(&entries);
    builder.wire_parents(&tree_nodes, defaults_node);

    let root = builder.graph.add_node(ProfileSettings::default(), "root");
    for &id in &tree_nodes {
        builder.graph.add_parent(root, id);
    }

    let cloned = builder.graph.clone_graph(root, Some(defaults_node))?;
    let resolved = cloned.graph.resolve_all();

    let mut profiles = cloned.top_level().iter().map(|&clone| {
        let settings = resolved[clone.index()].clone();
        let own_guid = settings.guid;
        let parents = cloned
            .graph
            .node(clone)
            .parents
            .iter()
            .filter_map(|parent| cloned.graph.node(*parent).settings.guid)
            .filter(|guid| Some(*guid) != own_guid)
            .collect();
        Profile::from_settings(settings, parents)
    });
    let tree = rebuild(entries, &mut profiles);

    // Base groups come first in the tree, then user groups.
    let group_slots = document_group_slots(&sources.defaults, Origin::Defaults)
        .chain(document_group_slots(&sources.user, Origin::User))
        .collect();

    Ok(LayeredProfiles {
        tree,
        generated_order,
        profile_defaults,
        group_slots,
    })
}

/// Put resolved profiles back into the tree shape, in flatten order.
fn rebuild(
    entries: Vec<ProfileEntry<NodeId>>,
    profiles: &mut impl Iterator<Item = Profile>,
) -> Vec<ProfileEntry> {
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        match entry {
            ProfileEntry::Profile(_) => {
                if let Some(profile) = profiles.next() {
                    out.push(ProfileEntry::Profile(profile));
                }
            }
            ProfileEntry::Group(group) => {
                let children = rebuild(group.children, profiles);
                out.push(ProfileEntry::Group(ProfileGroup {
                    name: group.name,
                    hidden: group.hidden,
                    icon: group.icon,
                    children,
                }));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn layer(defaults: Value, user: Value) -> Result<LayeredProfiles, SettingsLoadError> {
        layer_profiles(&SettingsSources::from_values(defaults, user), &[])
    }

    fn names(tree: &[ProfileEntry]) -> Vec<String> {
        tree::flatten(tree).into_iter().map(|p| p.name).collect()
    }

    #[test]
    fn test_user_entry_overrides_default_by_guid() {
        let guid = Guid::for_profile("Shell", None).to_string();
        let layered = layer(
            json!({ "profiles": [ { "guid": guid, "name": "Shell", "colorScheme": "Campbell", "icon": "/a.png" } ] }),
            json!({ "profiles": [ { "guid": guid, "colorScheme": "Tango Dark" } ] }),
        )
        .expect("layered");

        let flat = tree::flatten(&layered.tree);
        assert_eq!(flat.len(), 1);
        assert_eq!(flat[0].name, "Shell");
        assert_eq!(flat[0].color_scheme.as_deref(), Some("Tango Dark"));
        assert_eq!(flat[0].icon.as_deref(), Some("/a.png"));
    }

    #[test]
    fn test_user_entry_matches_by_derived_guid() {
        let layered = layer(
            json!({ "profiles": [ { "name": "Shell", "commandline": "sh" } ] }),
            json!({ "profiles": [ { "name": "Shell", "hidden": true }, { "name": "Extra" } ] }),
        )
        .expect("layered");

        let flat = tree::flatten(&layered.tree);
        assert_eq!(names(&layered.tree), vec!["Shell", "Extra"]);
        assert!(flat[0].hidden);
        assert_eq!(flat[0].commandline.as_deref(), Some("sh"));
    }

    #[test]
    fn test_profile_defaults_apply_below_profile_values() {
        let layered = layer(
            json!({ "profiles": { "defaults": { "colorScheme": "Campbell" }, "list": [ { "name": "A" }, { "name": "B", "colorScheme": "Vintage" } ] } }),
            json!({ "profiles": { "defaults": { "icon": "⚡" }, "list": [] } }),
        )
        .expect("layered");

        let flat = tree::flatten(&layered.tree);
        assert_eq!(flat[0].color_scheme.as_deref(), Some("Campbell"));
        assert_eq!(flat[1].color_scheme.as_deref(), Some("Vintage"));
        assert!(flat.iter().all(|p| p.icon.as_deref() == Some("⚡")));
        assert_eq!(layered.profile_defaults.icon.as_deref(), Some("⚡"));
    }

    #[test]
    fn test_profile_defaults_override_base_but_not_user() {
        let layered = layer(
            json!({ "profiles": [ { "name": "A", "colorScheme": "Base" } ] }),
            json!({ "profiles": { "defaults": { "colorScheme": "FromDefaults" }, "list": [ { "name": "B", "colorScheme": "Mine" } ] } }),
        )
        .expect("layered");
        let flat = tree::flatten(&layered.tree);
        assert_eq!(flat[0].color_scheme.as_deref(), Some("FromDefaults"));
        assert_eq!(flat[1].color_scheme.as_deref(), Some("Mine"));
    }

    #[test]
    fn test_declared_parents_by_name_and_guid() {
        let base_guid = Guid::for_profile("Base", None);
        let layered = layer(
            json!({ "profiles": [] }),
            json!({ "profiles": [
                { "name": "Base", "colorScheme": "Base Scheme", "icon": "/base.png" },
                { "name": "Mixin", "icon": "/mixin.png" },
                { "name": "Child", "parents": ["Mixin", base_guid.to_string()] }
            ] }),
        )
        .expect("layered");

        let flat = tree::flatten(&layered.tree);
        let child = &flat[2];
        assert_eq!(child.icon.as_deref(), Some("/mixin.png"), "first parent wins");
        assert_eq!(child.color_scheme.as_deref(), Some("Base Scheme"));
        assert_eq!(child.guid, Guid::for_profile("Child", None));
        assert_eq!(
            child.parents,
            vec![Guid::for_profile("Mixin", None), base_guid]
        );
    }

    #[test]
    fn test_unknown_parent_is_ignored() {
        let layered = layer(
            json!({}),
            json!({ "profiles": [ { "name": "Solo", "parents": ["Nobody"] } ] }),
        )
        .expect("layered");
        assert_eq!(names(&layered.tree), vec!["Solo"]);
    }

    #[test]
    fn test_parent_cycle_fails() {
        let err = layer(
            json!({}),
            json!({ "profiles": [
                { "name": "A", "parents": ["B"] },
                { "name": "B", "parents": ["A"] }
            ] }),
        )
        .expect_err("cycle");
        assert!(matches!(err, SettingsLoadError::CyclicInheritance { .. }));
    }

    #[test]
    fn test_groups_keep_shape_and_move_claimed_entries() {
        let layered = layer(
            json!({ "profiles": [ { "name": "A" }, { "name": "B" } ] }),
            json!({ "profiles": [
                { "name": "Mine", "profiles": [ { "name": "B", "tabTitle": "bee" }, { "name": "C" } ] }
            ] }),
        )
        .expect("layered");

        assert_eq!(layered.tree.len(), 2, "A, then the user group");
        let group = layered.tree[1].as_group().expect("group");
        assert_eq!(group.name, "Mine");
        assert_eq!(names(&layered.tree), vec!["A", "B", "C"]);
        assert_eq!(
            tree::flatten(&layered.tree)[1].tab_title.as_deref(),
            Some("bee")
        );
    }

    #[test]
    fn test_generated_layer_between_defaults_and_user() {
        let generated = vec![GeneratedLayer {
            namespace: "Test.Gen".to_string(),
            drafts: vec![
                ProfileDraft::new("Test.Gen", "zsh").commandline("/bin/zsh"),
                ProfileDraft::new("Test.Gen", "fish"),
            ],
        }];
        let user = json!({ "profiles": [ { "name": "zsh", "source": "Test.Gen", "hidden": true } ] });
        let layered = layer_profiles(
            &SettingsSources::from_values(json!({ "profiles": [ { "name": "Default" } ] }), user),
            &generated,
        )
        .expect("layered");

        let flat = tree::flatten(&layered.tree);
        assert_eq!(names(&layered.tree), vec!["Default", "zsh", "fish"]);
        assert!(flat[1].hidden);
        assert_eq!(flat[1].commandline.as_deref(), Some("/bin/zsh"));
        assert_eq!(flat[1].source.as_deref(), Some("Test.Gen"));
        assert_eq!(
            layered.generated_order,
            vec![
                Guid::for_generator("Test.Gen", "zsh"),
                Guid::for_generator("Test.Gen", "fish")
            ]
        );
    }

    #[test]
    fn test_duplicate_user_entries_stay_separate() {
        let layered = layer(
            json!({}),
            json!({ "profiles": [ { "name": "Twin", "icon": "/1.png" }, { "name": "Twin", "icon": "/2.png" } ] }),
        )
        .expect("layered");
        assert_eq!(names(&layered.tree), vec!["Twin", "Twin"]);
    }

    #[test]
    fn test_top_level_order_and_declared_guids() {
        let doc = json!({ "profiles": [
            { "name": "A" },
            { "name": "G", "profiles": [ { "name": "Inner" } ] },
            { "hidden": true }
        ] });
        assert_eq!(
            top_level_order(&doc, Origin::User),
            vec![
                OrderSlot::Profile(Guid::for_profile("A", None)),
                OrderSlot::Group {
                    origin: Origin::User,
                    index: 1
                },
                OrderSlot::Profile(Guid::for_profile("", None)),
            ]
        );
        let guids = declared_guids(&doc);
        assert!(guids.contains(&Guid::for_profile("Inner", None)));
        assert_eq!(guids.len(), 2);
    }
}
