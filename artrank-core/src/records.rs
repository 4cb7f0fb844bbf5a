//! Entity records exchanged between pipeline stages
//!
//! Upstream stages produce author and committee collections as JSON; the bulk
//! affiliation roster arrives as CSV rows. Year activity is accepted either as
//! a `{year: count}` mapping or a bare list of years and is normalized into a
//! single map representation right at the parsing boundary.

use serde::de::{self, DeserializeOwned, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::{CoreError, UNKNOWN_AFFILIATION};

/// Per-year activity counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct YearActivity(BTreeMap<i32, u32>);

impl YearActivity {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_years(years: impl IntoIterator<Item = i32>) -> Self {
        Self(years.into_iter().map(|y| (y, 1)).collect())
    }

    pub fn insert(&mut self, year: i32, count: u32) {
        self.0.insert(year, count);
    }

    pub fn get(&self, year: i32) -> Option<u32> {
        self.0.get(&year).copied()
    }

    /// Merge another activity map, keeping the larger count per year
    pub fn merge_max(&mut self, other: &YearActivity) {
        for (&year, &count) in &other.0 {
            let slot = self.0.entry(year).or_insert(0);
            *slot = (*slot).max(count);
        }
    }

    pub fn first_year(&self) -> Option<i32> {
        self.0.keys().next().copied()
    }

    pub fn last_year(&self) -> Option<i32> {
        self.0.keys().next_back().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i32, u32)> + '_ {
        self.0.iter().map(|(&y, &c)| (y, c))
    }
}

impl FromIterator<(i32, u32)> for YearActivity {
    fn from_iter<I: IntoIterator<Item = (i32, u32)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de> Deserialize<'de> for YearActivity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(YearActivityVisitor)
    }
}

struct YearActivityVisitor;

impl<'de> Visitor<'de> for YearActivityVisitor {
    type Value = YearActivity;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a year-to-count map or a list of years")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(YearActivity::default())
    }

    fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(YearActivity::default())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut years = BTreeMap::new();
        while let Some((year, count)) = map.next_entry::<Year, u32>()? {
            years.insert(year.0, count);
        }
        Ok(YearActivity(years))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut years = BTreeMap::new();
        while let Some(year) = seq.next_element::<Year>()? {
            years.insert(year.0, 1);
        }
        Ok(YearActivity(years))
    }
}

/// A year given either as a number or as a numeric string
struct Year(i32);

impl<'de> Deserialize<'de> for Year {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct YearVisitor;

        impl Visitor<'_> for YearVisitor {
            type Value = Year;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a year")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Year, E> {
                i32::try_from(v).map(Year).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Year, E> {
                i32::try_from(v).map(Year).map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Year, E> {
                v.trim().parse().map(Year).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(YearVisitor)
    }
}

/// True when an affiliation value carries real information
pub fn is_known_affiliation(affiliation: Option<&str>) -> bool {
    match affiliation.map(str::trim) {
        Some(a) => !a.is_empty() && a != UNKNOWN_AFFILIATION && !a.starts_with('_'),
        None => false,
    }
}

/// Author as seen by the enrichment stages.
///
/// Only `name` and `affiliation` are interpreted; every other field is carried
/// through untouched so the collection is written back in its original shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuthorEntry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            affiliation: None,
            extra: Map::new(),
        }
    }

    pub fn with_affiliation(mut self, affiliation: &str) -> Self {
        self.affiliation = Some(affiliation.to_string());
        self
    }

    pub fn has_known_affiliation(&self) -> bool {
        is_known_affiliation(self.affiliation.as_deref())
    }
}

/// Author with artifact statistics, as consumed by the merge engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub name: String,
    #[serde(default)]
    pub affiliation: Option<String>,
    #[serde(default)]
    pub conferences: Vec<String>,
    #[serde(default)]
    pub years: YearActivity,
    #[serde(default)]
    pub total: Option<u32>,
    #[serde(default)]
    pub artifact_count: Option<u32>,
    #[serde(default)]
    pub total_papers: Option<u32>,
    #[serde(default)]
    pub artifact_rate: Option<f64>,
    #[serde(default)]
    pub badges_available: Option<u32>,
    #[serde(default)]
    pub badges_functional: Option<u32>,
    #[serde(default)]
    pub badges_reproducible: Option<u32>,
}

impl AuthorRecord {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_conferences(mut self, conferences: &[&str]) -> Self {
        self.conferences = conferences.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_artifacts(mut self, artifacts: u32) -> Self {
        self.total = Some(artifacts);
        self
    }

    /// Artifact count, preferring `total` over the older `artifact_count`
    pub fn artifacts(&self) -> u32 {
        self.total.or(self.artifact_count).unwrap_or(0)
    }
}

/// Artifact-evaluation committee member
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitteeMemberRecord {
    pub name: String,
    #[serde(default)]
    pub affiliation: Option<String>,
    #[serde(default)]
    pub conferences: Vec<String>,
    #[serde(default)]
    pub years: YearActivity,
    #[serde(default)]
    pub total_memberships: u32,
    #[serde(default)]
    pub chair_count: u32,
}

impl CommitteeMemberRecord {
    pub fn new(name: &str, total_memberships: u32) -> Self {
        Self {
            name: name.to_string(),
            total_memberships,
            ..Default::default()
        }
    }

    pub fn with_conferences(mut self, conferences: &[&str]) -> Self {
        self.conferences = conferences.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_chairs(mut self, chair_count: u32) -> Self {
        self.chair_count = chair_count;
        self
    }
}

/// Row of the bulk faculty-affiliation roster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffiliationRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub affiliation: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default, rename = "scholarid")]
    pub scholar_id: String,
    #[serde(default)]
    pub orcid: String,
}

impl AffiliationRecord {
    pub fn new(name: &str, affiliation: &str) -> Self {
        Self {
            name: name.to_string(),
            affiliation: affiliation.to_string(),
            ..Default::default()
        }
    }

    /// Rows without a name or an affiliation are useless for linkage
    pub fn is_usable(&self) -> bool {
        !self.name.trim().is_empty() && !self.affiliation.trim().is_empty()
    }
}

/// Decode a JSON array of records
pub fn parse_collection<T: DeserializeOwned>(
    what: &'static str,
    json: &str,
) -> Result<Vec<T>, CoreError> {
    serde_json::from_str(json).map_err(|source| CoreError::Malformed { what, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_years_from_map_and_list() {
        let from_map: AuthorRecord =
            serde_json::from_str(r#"{"name": "A", "years": {"2020": 2, "2022": 1}}"#).unwrap();
        assert_eq!(from_map.years.get(2020), Some(2));
        assert_eq!(from_map.years.get(2022), Some(1));

        let from_list: AuthorRecord =
            serde_json::from_str(r#"{"name": "A", "years": [2019, 2021]}"#).unwrap();
        assert_eq!(from_list.years.get(2019), Some(1));
        assert_eq!(from_list.years.first_year(), Some(2019));
        assert_eq!(from_list.years.last_year(), Some(2021));

        let missing: AuthorRecord = serde_json::from_str(r#"{"name": "A"}"#).unwrap();
        assert!(missing.years.is_empty());

        let null: AuthorRecord = serde_json::from_str(r#"{"name": "A", "years": null}"#).unwrap();
        assert!(null.years.is_empty());
    }

    #[test]
    fn test_years_serialize_as_map() {
        let years = YearActivity::from_years([2021, 2020]);
        assert_eq!(serde_json::to_string(&years).unwrap(), r#"{"2020":1,"2021":1}"#);
    }

    #[test]
    fn test_merge_max() {
        let mut a: YearActivity = [(2020, 3), (2021, 1)].into_iter().collect();
        let b: YearActivity = [(2021, 4), (2022, 2)].into_iter().collect();
        a.merge_max(&b);
        assert_eq!(a.get(2020), Some(3));
        assert_eq!(a.get(2021), Some(4));
        assert_eq!(a.get(2022), Some(2));
    }

    #[test]
    fn test_artifact_count_fallback() {
        let record: AuthorRecord =
            serde_json::from_str(r#"{"name": "A", "artifact_count": 4}"#).unwrap();
        assert_eq!(record.artifacts(), 4);

        let record: AuthorRecord =
            serde_json::from_str(r#"{"name": "A", "total": 2, "artifact_count": 4}"#).unwrap();
        assert_eq!(record.artifacts(), 2);

        assert_eq!(AuthorRecord::new("A").artifacts(), 0);
    }

    #[test]
    fn test_author_entry_preserves_unknown_fields() {
        let json = r#"{"name":"Ada","affiliation":"Unknown","papers":[1,2],"total":2}"#;
        let mut entry: AuthorEntry = serde_json::from_str(json).unwrap();
        assert!(!entry.has_known_affiliation());

        entry.affiliation = Some("ETH Zurich".to_string());
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["affiliation"], "ETH Zurich");
        assert_eq!(value["papers"], serde_json::json!([1, 2]));
        assert_eq!(value["total"], 2);
    }

    #[test]
    fn test_known_affiliation() {
        assert!(is_known_affiliation(Some("MIT")));
        assert!(!is_known_affiliation(Some("")));
        assert!(!is_known_affiliation(Some("Unknown")));
        assert!(!is_known_affiliation(Some("_scraped")));
        assert!(!is_known_affiliation(None));
    }

    #[test]
    fn test_parse_collection_reports_malformed() {
        let err = parse_collection::<AuthorRecord>("authors", "{not json").unwrap_err();
        assert!(err.to_string().contains("authors"));
    }
}
