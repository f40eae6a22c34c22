//! Bibliographic profile links and the publication fetch seam.

use std::path::PathBuf;

use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use url::Url;

use crate::errors::PortalError;

static PROFILE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid profile id regex"));
static PROFILE_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"user=([A-Za-z0-9_-]+)").expect("valid profile param regex"));

/// Extracts the `user=` profile id from a profile link.
///
/// Full URLs are read through their query string; anything that does not parse as a URL
/// is searched for a bare `user=` parameter.
pub fn scholar_profile_id(link: &str) -> Option<String> {
    let link = link.trim();
    if let Ok(url) = Url::parse(link) {
        let from_query = url
            .query_pairs()
            .find(|(key, _)| key == "user")
            .map(|(_, value)| value.into_owned())
            .filter(|value| PROFILE_ID_RE.is_match(value));
        if from_query.is_some() {
            return from_query;
        }
    }
    PROFILE_PARAM_RE
        .captures(link)
        .and_then(|captures| captures.get(1))
        .map(|id| id.as_str().to_string())
}

/// One publication as an external source reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FetchedPublication {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub authors: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub citations: String,
}

impl FetchedPublication {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
        Null,
    }
    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(value) => value,
        Raw::Number(value) => value.to_string(),
        Raw::Null => String::new(),
    })
}

/// Source of publications for a profile id.
pub trait PublicationSource {
    fn fetch(&self, profile_id: &str) -> Result<Vec<FetchedPublication>, PortalError>;
}

/// Reads `<dir>/<profile_id>.json`, a JSON array of publication objects.
///
/// Entries that do not deserialize are skipped with a warning.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    dir: PathBuf,
}

impl JsonFileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl PublicationSource for JsonFileSource {
    fn fetch(&self, profile_id: &str) -> Result<Vec<FetchedPublication>, PortalError> {
        let path = self.dir.join(format!("{profile_id}.json"));
        let content = std::fs::read_to_string(&path).map_err(|err| PortalError::Other {
            message: format!("failed to read {}: {err}", path.display()).into(),
        })?;
        let entries: Vec<serde_json::Value> = serde_json::from_str(&content).map_err(|err| PortalError::Other {
            message: format!("failed to parse {}: {err}", path.display()).into(),
        })?;

        let mut publications = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            match serde_json::from_value::<FetchedPublication>(entry) {
                Ok(publication) => publications.push(publication),
                Err(err) => warn!("skipping entry {index} of {}: {err}", path.display()),
            }
        }
        info!("fetched {} publication(s) for profile {profile_id}", publications.len());
        Ok(publications)
    }
}
