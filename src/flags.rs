use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Targeting tags, e.g. `env`, `app`, `region`.
pub type Tags = BTreeMap<String, String>;

/// Flag set as returned by the server: flag name to definition.
pub type FlagSet = HashMap<String, TryParse<FlagDefinition>>;

/// `TryParse` allows a single flag to fail parsing without failing the parsing of the whole flag
/// set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TryParse<T> {
    Parsed(T),
    ParseFailed(serde_json::Value),
}
impl<T> From<TryParse<T>> for Option<T> {
    fn from(value: TryParse<T>) -> Self {
        match value {
            TryParse::Parsed(v) => Some(v),
            TryParse::ParseFailed(_) => None,
        }
    }
}
impl<'a, T> From<&'a TryParse<T>> for Option<&'a T> {
    fn from(value: &TryParse<T>) -> Option<&T> {
        match value {
            TryParse::Parsed(v) => Some(v),
            TryParse::ParseFailed(_) => None,
        }
    }
}
impl<T> From<T> for TryParse<T> {
    fn from(value: T) -> Self {
        TryParse::Parsed(value)
    }
}

/// A single flag or experiment definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagDefinition {
    /// Flag name. The wire format keys flags by name, so this is filled in from the map key.
    #[serde(default, skip_serializing)]
    pub name: String,
    pub enabled: bool,
    #[serde(rename = "type", default)]
    pub flag_type: FlagType,
    /// Variants in name order. Only meaningful for [`FlagType::Experiment`].
    #[serde(default)]
    pub variants: BTreeMap<String, VariantConfig>,
    /// Informational targeting metadata.
    #[serde(default)]
    pub tags: Tags,
}

impl FlagDefinition {
    pub fn boolean(name: impl Into<String>, enabled: bool) -> Self {
        FlagDefinition {
            name: name.into(),
            enabled,
            flag_type: FlagType::Boolean,
            variants: BTreeMap::new(),
            tags: Tags::new(),
        }
    }

    pub fn experiment<N, V>(name: impl Into<String>, enabled: bool, variants: V) -> Self
    where
        N: Into<String>,
        V: IntoIterator<Item = (N, u32)>,
    {
        FlagDefinition {
            name: name.into(),
            enabled,
            flag_type: FlagType::Experiment,
            variants: variants
                .into_iter()
                .map(|(name, weight)| (name.into(), VariantConfig { weight }))
                .collect(),
            tags: Tags::new(),
        }
    }

    pub fn is_experiment(&self) -> bool {
        self.flag_type == FlagType::Experiment
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
    #[default]
    Boolean,
    Experiment,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantConfig {
    /// Relative weight. A missing weight counts as zero.
    #[serde(default)]
    pub weight: u32,
}
