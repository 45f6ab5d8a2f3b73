//! Loosely-typed records as returned by `user.getRecentTracks`.
//!
//! Nothing here is trusted. Every field is optional and every leaf is read
//! leniently: a value of the wrong type counts as absent instead of failing
//! the record, so decoding only fails on malformed JSON.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentTracksEnvelope {
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub recenttracks: Option<RecentTracks>,
}

impl RecentTracksEnvelope {
    /// Upstream error reported in-body, rendered as its code.
    ///
    /// Numbers and numeric or free-form strings count, as does `true`.
    /// Zero, `"0"`, the empty string and any other shape are not errors.
    pub fn reported_error(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
            Value::String(s) => {
                let s = s.trim();
                let zero = s.parse::<f64>().map(|n| n == 0.0).unwrap_or(false);
                (!s.is_empty() && !zero).then(|| s.to_string())
            }
            Value::Bool(true) => Some("true".to_string()),
            _ => None,
        }
    }

    pub fn into_first_track(self) -> Option<RawTrack> {
        self.recenttracks?.track?.into_first()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecentTracks {
    #[serde(default)]
    pub track: Option<OneOrMany>,
}

/// With `limit=1` the API sometimes collapses the track list into a bare
/// object. List entries that are not objects become empty records.
#[derive(Debug, Clone)]
pub enum OneOrMany {
    Many(Vec<RawTrack>),
    One(RawTrack),
    Other(Value),
}

impl<'de> Deserialize<'de> for OneOrMany {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(de)? {
            Value::Array(items) => OneOrMany::Many(items.into_iter().map(record).collect()),
            obj @ Value::Object(_) => OneOrMany::One(record(obj)),
            other => OneOrMany::Other(other),
        })
    }
}

impl OneOrMany {
    pub fn into_first(self) -> Option<RawTrack> {
        match self {
            OneOrMany::Many(tracks) => tracks.into_iter().next(),
            OneOrMany::One(track) => Some(track),
            OneOrMany::Other(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTrack {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub artist: Option<RawNamed>,
    #[serde(default, deserialize_with = "lenient")]
    pub album: Option<RawNamed>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub image: Option<Vec<RawImage>>,
    #[serde(default, rename = "@attr", deserialize_with = "lenient")]
    pub attr: Option<RawAttr>,
}

/// Artist and album come either flattened (`#text`) or, in extended mode,
/// as a nested `name`. Anything that is not an object is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawNamed {
    #[serde(default, rename = "#text", deserialize_with = "lenient_string")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImage {
    #[serde(default, deserialize_with = "lenient_string")]
    pub size: Option<String>,
    #[serde(default, rename = "#text", deserialize_with = "lenient_string")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawAttr {
    #[serde(default, deserialize_with = "lenient_string")]
    pub nowplaying: Option<String>,
}

fn lenient_string<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

// Only objects are records; serde would otherwise accept a positional array.
fn record<T>(value: Value) -> T
where
    T: DeserializeOwned + Default,
{
    if value.is_object() {
        serde_json::from_value(value).unwrap_or_default()
    } else {
        T::default()
    }
}

fn lenient<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(de)?;
    Ok(value.is_object().then(|| record(value)))
}

// Entries keep their position so "last entry" stays meaningful; a malformed
// entry becomes an empty one.
fn lenient_list<'de, D, T>(de: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(match Value::deserialize(de)? {
        Value::Array(items) => Some(items.into_iter().map(record).collect()),
        _ => None,
    })
}
