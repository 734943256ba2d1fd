//! Ordered multi-valued maps used for headers, cookies and query parameters.

use super::nottable::NottableString;
use serde::de::{self, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How keys of a matcher map are compared against a subject map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyMatchStyle {
    /// Every matcher entry must be present in the subject; extra subject entries are fine.
    #[default]
    SubSet,
    /// Every subject value under a matched key must be allowed by the matcher.
    MatchingKey,
}

/// One name with all of its values, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    pub name: NottableString,
    pub values: Vec<NottableString>,
}

impl KeyValuePair {
    pub fn new<N, V, I>(name: N, values: I) -> Self
    where
        N: Into<NottableString>,
        V: Into<NottableString>,
        I: IntoIterator<Item = V>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    fn same_name(&self, name: &NottableString) -> bool {
        self.name.is_not() == name.is_not()
            && self.name.value().eq_ignore_ascii_case(name.value())
    }
}

/// Immutable ordered multimap. Entries sharing a name (ignoring case) are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiValueMap {
    entries: Vec<KeyValuePair>,
    key_match_style: KeyMatchStyle,
}

impl MultiValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> MultiValueMapBuilder {
        MultiValueMapBuilder::default()
    }

    /// Return a copy of this map with an extra entry merged in.
    pub fn with_entry<N, V, I>(self, name: N, values: I) -> Self
    where
        N: Into<NottableString>,
        V: Into<NottableString>,
        I: IntoIterator<Item = V>,
    {
        let mut builder = MultiValueMapBuilder {
            entries: self.entries,
            key_match_style: self.key_match_style,
        };
        builder.add(name, values);
        builder.build()
    }

    pub fn with_key_match_style(mut self, style: KeyMatchStyle) -> Self {
        self.key_match_style = style;
        self
    }

    pub fn key_match_style(&self) -> KeyMatchStyle {
        self.key_match_style
    }

    pub fn entries(&self) -> &[KeyValuePair] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values for a literal name, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&[NottableString]> {
        self.entries
            .iter()
            .find(|e| !e.name.is_not() && e.name.value().eq_ignore_ascii_case(name))
            .map(|e| e.values.as_slice())
    }

    pub fn get_first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(NottableString::value)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Accumulates entries before freezing them into a [`MultiValueMap`].
#[derive(Debug, Default)]
pub struct MultiValueMapBuilder {
    entries: Vec<KeyValuePair>,
    key_match_style: KeyMatchStyle,
}

impl MultiValueMapBuilder {
    pub fn add<N, V, I>(&mut self, name: N, values: I) -> &mut Self
    where
        N: Into<NottableString>,
        V: Into<NottableString>,
        I: IntoIterator<Item = V>,
    {
        let name = name.into();
        let values = values.into_iter().map(Into::into);
        match self.entries.iter_mut().find(|e| e.same_name(&name)) {
            Some(existing) => existing.values.extend(values),
            None => self.entries.push(KeyValuePair {
                name,
                values: values.collect(),
            }),
        }
        self
    }

    pub fn entry<N, V, I>(mut self, name: N, values: I) -> Self
    where
        N: Into<NottableString>,
        V: Into<NottableString>,
        I: IntoIterator<Item = V>,
    {
        self.add(name, values);
        self
    }

    pub fn key_match_style(mut self, style: KeyMatchStyle) -> Self {
        self.key_match_style = style;
        self
    }

    pub fn build(self) -> MultiValueMap {
        MultiValueMap {
            entries: self.entries,
            key_match_style: self.key_match_style,
        }
    }
}

impl<N, V> FromIterator<(N, V)> for MultiValueMap
where
    N: Into<NottableString>,
    V: Into<NottableString>,
{
    fn from_iter<T: IntoIterator<Item = (N, V)>>(iter: T) -> Self {
        let mut builder = MultiValueMapBuilder::default();
        for (name, value) in iter {
            builder.add(name, [value]);
        }
        builder.build()
    }
}

const KEY_MATCH_STYLE_FIELD: &str = "keyMatchStyle";

// Serialized as `{"name": ["value", ...]}`, with an optional `keyMatchStyle` key
// when it differs from the default.
impl Serialize for MultiValueMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let style = self.key_match_style != KeyMatchStyle::SubSet;
        let mut map = serializer.serialize_map(Some(self.entries.len() + usize::from(style)))?;
        if style {
            map.serialize_entry(KEY_MATCH_STYLE_FIELD, &self.key_match_style)?;
        }
        for entry in &self.entries {
            map.serialize_entry(&entry.name.to_string(), &entry.values)?;
        }
        map.end()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MultiValueMapRepr {
    List(Vec<KeyValuePair>),
    Map(serde_json::Map<String, Value>),
}

impl<'de> Deserialize<'de> for MultiValueMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut builder = MultiValueMapBuilder::default();
        match MultiValueMapRepr::deserialize(deserializer)? {
            MultiValueMapRepr::List(pairs) => {
                for pair in pairs {
                    builder.add(pair.name, pair.values);
                }
            }
            MultiValueMapRepr::Map(map) => {
                for (name, value) in map {
                    if name == KEY_MATCH_STYLE_FIELD {
                        let style = serde_json::from_value(value).map_err(de::Error::custom)?;
                        builder = builder.key_match_style(style);
                        continue;
                    }
                    let values: Vec<NottableString> = match value {
                        Value::Array(items) => items
                            .into_iter()
                            .map(serde_json::from_value)
                            .collect::<Result<_, _>>()
                            .map_err(de::Error::custom)?,
                        other => vec![serde_json::from_value(other).map_err(de::Error::custom)?],
                    };
                    builder.add(NottableString::parse(name), values);
                }
            }
        }
        Ok(builder.build())
    }
}
