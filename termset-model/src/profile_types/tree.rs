//! Recursive operations over the Profile/Group tree.
//!
//! All traversals are depth-first and left-to-right.

use std::collections::HashSet;

use super::group::ProfileEntry;
use super::profile::Profile;
use crate::guid::Guid;

/// Collect every leaf in tree order. Already-flat input comes back unchanged.
pub fn flatten<P: Clone>(entries: &[ProfileEntry<P>]) -> Vec<P> {
    let mut out = Vec::new();
    flatten_into(entries, &mut out);
    out
}

fn flatten_into<P: Clone>(entries: &[ProfileEntry<P>], out: &mut Vec<P>) {
    for entry in entries {
        match entry {
            ProfileEntry::Profile(profile) => out.push(profile.clone()),
            ProfileEntry::Group(group) => flatten_into(&group.children, out),
        }
    }
}

/// First profile with `guid`. Keeps searching sibling groups after a group
/// without a match.
pub fn find_by_guid(entries: &[ProfileEntry], guid: Guid) -> Option<&Profile> {
    find(entries, &|profile: &Profile| profile.guid == guid)
}

/// First profile whose name matches exactly.
pub fn find_by_name<'a>(entries: &'a [ProfileEntry], name: &str) -> Option<&'a Profile> {
    find(entries, &|profile: &Profile| profile.name == name)
}

fn find<'a>(entries: &'a [ProfileEntry], pred: &dyn Fn(&Profile) -> bool) -> Option<&'a Profile> {
    for entry in entries {
        let found = match entry {
            ProfileEntry::Profile(profile) => pred(profile).then_some(profile),
            ProfileEntry::Group(group) => find(&group.children, pred),
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Drop hidden profiles. A hidden group goes with all of its descendants
/// without its children being inspected.
pub fn remove_hidden(entries: &mut Vec<ProfileEntry>) {
    entries.retain_mut(|entry| match entry {
        ProfileEntry::Profile(profile) => !profile.hidden,
        ProfileEntry::Group(group) => {
            if group.hidden {
                return false;
            }
            remove_hidden(&mut group.children);
            true
        }
    });
}

/// Keep the first profile for each guid and remove the rest.
///
/// `seen` is shared across nested groups. Returns whether anything was removed.
pub fn remove_duplicates(entries: &mut Vec<ProfileEntry>, seen: &mut HashSet<Guid>) -> bool {
    let mut removed = false;
    let mut doomed = Vec::new();

    for (index, entry) in entries.iter_mut().enumerate() {
        match entry {
            ProfileEntry::Profile(profile) => {
                if !seen.insert(profile.guid) {
                    doomed.push(index);
                }
            }
            ProfileEntry::Group(group) => {
                removed |= remove_duplicates(&mut group.children, seen);
            }
        }
    }

    // Erase back to front so the collected indices stay valid.
    for index in doomed.iter().rev() {
        entries.remove(*index);
    }

    removed || !doomed.is_empty()
}

/// Run `f` on every profile in the tree.
pub fn for_each_profile_mut(entries: &mut [ProfileEntry], f: &mut impl FnMut(&mut Profile)) {
    for entry in entries {
        match entry {
            ProfileEntry::Profile(profile) => f(profile),
            ProfileEntry::Group(group) => for_each_profile_mut(&mut group.children, f),
        }
    }
}

/// Order-preserving dedup of a flat list by guid.
pub fn dedup_by_guid(profiles: Vec<Profile>) -> Vec<Profile> {
    let mut seen = HashSet::new();
    profiles
        .into_iter()
        .filter(|profile| seen.insert(profile.guid))
        .collect()
}
