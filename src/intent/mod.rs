//! Intent classification: preprocessing, TF-IDF features and a
//! nearest-prototype classifier trained from an intents file.

mod preprocess;
mod tfidf;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub use preprocess::preprocess;
pub use tfidf::TfidfVectorizer;

pub const MODEL_VERSION: &str = "v1.0";
pub const DATASET_ID: &str = "intents_v1";
pub const UNKNOWN_TAG: &str = "unknown";
pub const FALLBACK_REPLY: &str = "I'm not sure I understood that. Could you rephrase?";

#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("intents file contains no patterns")]
    NoPatterns,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub tag: String,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub responses: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentSet {
    pub intents: Vec<Intent>,
}

impl IntentSet {
    pub fn load(path: &Path) -> Result<Self, IntentError> {
        read_json(path)
    }
}

/// Classification details returned alongside every reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentMeta {
    pub intent_tag: String,
    pub model_version: String,
    pub dataset_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Prototype {
    tag: String,
    weights: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentModel {
    pub model_version: String,
    pub dataset_id: String,
    vectorizer: TfidfVectorizer,
    prototypes: Vec<Prototype>,
    responses: BTreeMap<String, Vec<String>>,
}

impl IntentModel {
    pub fn train(set: &IntentSet) -> Result<Self, IntentError> {
        Self::train_versioned(set, MODEL_VERSION, DATASET_ID)
    }

    pub fn train_versioned(
        set: &IntentSet,
        model_version: &str,
        dataset_id: &str,
    ) -> Result<Self, IntentError> {
        let mut texts = Vec::new();
        let mut labels = Vec::new();
        for (label, intent) in set.intents.iter().enumerate() {
            for pattern in &intent.patterns {
                texts.push(preprocess(pattern));
                labels.push(label);
            }
        }
        if texts.is_empty() {
            return Err(IntentError::NoPatterns);
        }

        let vectorizer = TfidfVectorizer::fit(&texts);
        let mut sums = vec![vec![0.0; vectorizer.len()]; set.intents.len()];
        for (text, &label) in texts.iter().zip(&labels) {
            let row = vectorizer.transform(text);
            for (acc, value) in sums[label].iter_mut().zip(row) {
                *acc += value;
            }
        }

        let prototypes = set
            .intents
            .iter()
            .zip(sums)
            .map(|(intent, mut weights)| {
                tfidf::normalize(&mut weights);
                Prototype {
                    tag: intent.tag.clone(),
                    weights,
                }
            })
            .collect();

        let responses = set
            .intents
            .iter()
            .map(|intent| (intent.tag.clone(), intent.responses.clone()))
            .collect();

        tracing::debug!(
            patterns = texts.len(),
            vocabulary = vectorizer.len(),
            intents = set.intents.len(),
            "trained intent model"
        );

        Ok(Self {
            model_version: model_version.to_string(),
            dataset_id: dataset_id.to_string(),
            vectorizer,
            prototypes,
            responses,
        })
    }

    pub fn load(path: &Path) -> Result<Self, IntentError> {
        read_json(path)
    }

    /// Loads a trained model, training from `intents_path` when `model_path`
    /// does not exist yet.
    pub fn load_or_train(model_path: &Path, intents_path: &Path) -> Result<Self, IntentError> {
        if model_path.exists() {
            return Self::load(model_path);
        }
        tracing::warn!(
            model = %model_path.display(),
            intents = %intents_path.display(),
            "model file missing, training in memory"
        );
        Self::train(&IntentSet::load(intents_path)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), IntentError> {
        let io_err = |source| IntentError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let data = serde_json::to_string_pretty(self).map_err(|source| IntentError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, data).map_err(io_err)
    }

    pub fn predict(&self, text: &str) -> &str {
        let row = self.vectorizer.transform(&preprocess(text));
        let mut best: Option<(&str, f64)> = None;
        for prototype in &self.prototypes {
            let score = tfidf::dot(&row, &prototype.weights);
            if score > best.map_or(0.0, |(_, s)| s) {
                best = Some((prototype.tag.as_str(), score));
            }
        }
        best.map_or(UNKNOWN_TAG, |(tag, _)| tag)
    }

    pub fn respond<R: Rng + ?Sized>(&self, text: &str, rng: &mut R) -> (String, IntentMeta) {
        let tag = self.predict(text).to_string();
        let reply = self
            .responses
            .get(&tag)
            .and_then(|responses| responses.choose(rng))
            .cloned()
            .unwrap_or_else(|| FALLBACK_REPLY.to_string());

        let meta = IntentMeta {
            intent_tag: tag,
            model_version: self.model_version.clone(),
            dataset_id: self.dataset_id.clone(),
        };
        (reply, meta)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, IntentError> {
    let data = fs::read_to_string(path).map_err(|source| IntentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| IntentError::Json {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
pub(crate) fn sample_set() -> IntentSet {
    serde_json::from_str(
        r#"{
          "intents": [
            {"tag": "greeting", "patterns": ["Hello", "Hi there", "Good morning", "Hey"],
             "responses": ["Hi!"]},
            {"tag": "goodbye", "patterns": ["Bye", "See you later", "Goodbye"],
             "responses": ["See you!"]},
            {"tag": "provenance", "patterns": ["Which dataset trained this model",
              "Show the blockchain log", "Where is the provenance record"],
             "responses": ["Every conversation is hashed and committed on chain."]},
            {"tag": "silent", "patterns": ["mute"], "responses": []}
          ]
        }"#,
    )
    .unwrap()
}
