//! Profile groups and the Profile/Group sum type.

use serde::Serialize;
use serde_json::Value;

use super::profile::Profile;
use crate::json;

/// Name given to groups that do not declare one
pub const DEFAULT_GROUP_NAME: &str = "Group";

/// A node of the profile tree.
///
/// Generic over the leaf so the same tree shape can carry graph node ids
/// while documents are being layered, and resolved [`Profile`]s afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ProfileEntry<P = Profile> {
    Profile(P),
    Group(ProfileGroup<P>),
}

/// Named container of profiles and nested groups. Groups never inherit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileGroup<P = Profile> {
    pub name: String,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    #[serde(rename = "profiles")]
    pub children: Vec<ProfileEntry<P>>,
}

impl<P> ProfileGroup<P> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hidden: false,
            icon: None,
            children: Vec::new(),
        }
    }

    /// Builder method to add a child entry
    pub fn with_child(mut self, child: ProfileEntry<P>) -> Self {
        self.children.push(child);
        self
    }

    /// Builder method to set the hidden flag
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    /// Group header fields from a JSON fragment. Children are not read here.
    pub fn from_json_header(value: &Value) -> Self {
        let mut name = None;
        let mut hidden = None;
        let mut icon = None;
        if let Some(obj) = json::as_object(value) {
            json::layer_string(obj, "name", &mut name);
            json::layer_bool(obj, "hidden", &mut hidden);
            json::layer_string(obj, "icon", &mut icon);
        }
        Self {
            name: name.unwrap_or_else(|| DEFAULT_GROUP_NAME.to_string()),
            hidden: hidden.unwrap_or(false),
            icon,
            children: Vec::new(),
        }
    }

    /// Rebuild the group with every leaf converted by `f`, in tree order.
    pub fn map_profiles<Q>(self, f: &mut impl FnMut(P) -> Q) -> ProfileGroup<Q> {
        ProfileGroup {
            name: self.name,
            hidden: self.hidden,
            icon: self.icon,
            children: self
                .children
                .into_iter()
                .map(|child| child.map_profiles(f))
                .collect(),
        }
    }
}

impl<P> ProfileEntry<P> {
    /// A fragment is a group when it carries a `"profiles"` array.
    pub fn is_group_fragment(value: &Value) -> bool {
        value
            .get("profiles")
            .is_some_and(|profiles| profiles.is_array())
    }

    pub fn as_profile(&self) -> Option<&P> {
        match self {
            ProfileEntry::Profile(profile) => Some(profile),
            ProfileEntry::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&ProfileGroup<P>> {
        match self {
            ProfileEntry::Profile(_) => None,
            ProfileEntry::Group(group) => Some(group),
        }
    }

    /// Rebuild the entry with every leaf converted by `f`, in tree order.
    pub fn map_profiles<Q>(self, f: &mut impl FnMut(P) -> Q) -> ProfileEntry<Q> {
        match self {
            ProfileEntry::Profile(profile) => ProfileEntry::Profile(f(profile)),
            ProfileEntry::Group(group) => ProfileEntry::Group(group.map_profiles(f)),
        }
    }
}
