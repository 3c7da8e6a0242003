use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tri-state enablement of an addon or component. [`EnabledState::Unset`]
/// defers to the catalog default.
///
/// Serialized as an optional boolean (`enabled: true`, `enabled: false` or no
/// field at all).
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum EnabledState {
    #[default]
    Unset,
    Enabled,
    Disabled,
}

impl EnabledState {
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Resolves the state, treating [`EnabledState::Unset`] as `unset_default`.
    pub fn resolve(self, unset_default: bool) -> bool {
        match self {
            Self::Enabled => true,
            Self::Disabled => false,
            Self::Unset => unset_default,
        }
    }

    /// Returns `self` unless it is unset, in which case `default` is returned.
    pub fn or(self, default: Self) -> Self {
        match self {
            Self::Unset => default,
            other => other,
        }
    }
}

impl From<bool> for EnabledState {
    fn from(value: bool) -> Self {
        if value { Self::Enabled } else { Self::Disabled }
    }
}

impl From<Option<bool>> for EnabledState {
    fn from(value: Option<bool>) -> Self {
        value.map_or(Self::Unset, Self::from)
    }
}

impl From<EnabledState> for Option<bool> {
    fn from(value: EnabledState) -> Self {
        match value {
            EnabledState::Unset => None,
            EnabledState::Enabled => Some(true),
            EnabledState::Disabled => Some(false),
        }
    }
}

/// A container of an addon or component. Empty strings mean "not set".
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContainerSpec {
    pub name: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub image: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cpu_requests: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub memory_requests: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub cpu_limits: String,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub memory_limits: String,
}

impl ContainerSpec {
    /// Creates a container with just a name and an image.
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ..Self::default()
        }
    }

    /// Sets requests and limits, in the order cpu request, memory request,
    /// cpu limit, memory limit.
    pub fn with_resources(
        mut self,
        cpu_requests: &str,
        memory_requests: &str,
        cpu_limits: &str,
        memory_limits: &str,
    ) -> Self {
        cpu_requests.clone_into(&mut self.cpu_requests);
        memory_requests.clone_into(&mut self.memory_requests);
        cpu_limits.clone_into(&mut self.cpu_limits);
        memory_limits.clone_into(&mut self.memory_limits);
        self
    }
}

/// Per agent pool configuration of an addon, currently only used by the
/// cluster-autoscaler.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddonPoolSpec {
    pub name: String,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddonSpec {
    pub name: String,

    #[serde(skip_serializing_if = "EnabledState::is_unset")]
    pub enabled: EnabledState,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub mode: String,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<ContainerSpec>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pools: Vec<AddonPoolSpec>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub data: String,
}

impl AddonSpec {
    pub fn new(name: impl Into<String>, enabled: impl Into<EnabledState>) -> Self {
        Self {
            name: name.into(),
            enabled: enabled.into(),
            ..Self::default()
        }
    }

    pub fn with_containers(mut self, containers: Vec<ContainerSpec>) -> Self {
        self.containers = containers;
        self
    }

    pub fn with_config<'a>(mut self, config: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        self.config = config
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        self
    }

    pub fn with_mode(mut self, mode: &str) -> Self {
        mode.clone_into(&mut self.mode);
        self
    }

    pub fn container(&self, name: &str) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.name == name)
    }
}

/// A control plane component. When `data` is set it replaces the generated
/// manifest entirely.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComponentSpec {
    pub name: String,

    #[serde(skip_serializing_if = "EnabledState::is_unset")]
    pub enabled: EnabledState,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub containers: Vec<ContainerSpec>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "String::is_empty")]
    pub data: String,
}

/// Finds an entry by name in an addon list.
pub fn find_addon<'a>(addons: &'a [AddonSpec], name: &str) -> Option<&'a AddonSpec> {
    addons.iter().find(|addon| addon.name == name)
}
