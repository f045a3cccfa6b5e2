//! Terminal result of an ensemble run

use super::agreement::AgreementScore;
use super::configuration::ModelConfiguration;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Final text per branch id, in run order.
///
/// Serialized as a JSON object; the key order is configurations first
/// followed by manual-only entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BranchTexts(Vec<(String, String)>);

impl BranchTexts {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace the text for `id`, keeping first-insertion order.
    pub fn insert(&mut self, id: impl Into<String>, text: impl Into<String>) {
        let id = id.into();
        let text = text.into();
        match self.0.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = text,
            None => self.0.push((id, text)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(existing, _)| existing == id)
            .map(|(_, text)| text.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for BranchTexts {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut texts = BranchTexts::new();
        for (id, text) in iter {
            texts.insert(id, text);
        }
        texts
    }
}

impl Serialize for BranchTexts {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(self.0.iter().map(|(id, text)| (id, text)))
    }
}

impl<'de> Deserialize<'de> for BranchTexts {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BranchTextsVisitor;

        impl<'de> Visitor<'de> for BranchTextsVisitor {
            type Value = BranchTexts;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of branch id to text")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut texts = BranchTexts::new();
                while let Some((id, text)) = map.next_entry::<String, String>()? {
                    texts.insert(id, text);
                }
                Ok(texts)
            }
        }

        deserializer.deserialize_map(BranchTextsVisitor)
    }
}

/// Everything a finished run produced; the unit external storage persists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub consensus_response: String,
    pub agreement_scores: Vec<AgreementScore>,
    pub individual_responses: BranchTexts,
    pub configurations: Vec<ModelConfiguration>,
}
