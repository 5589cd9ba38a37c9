use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// TF-IDF vectorizer with smoothed idf and L2-normalised rows.
///
/// Documents are expected to be preprocessed already; tokens shorter than two
/// characters are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

fn tokens(doc: &str) -> impl Iterator<Item = &str> {
    doc.split_whitespace().filter(|token| token.chars().count() >= 2)
}

impl TfidfVectorizer {
    pub fn fit(docs: &[String]) -> Self {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for doc in docs {
            let mut seen: Vec<&str> = tokens(doc).collect();
            seen.sort_unstable();
            seen.dedup();
            for token in seen {
                *document_frequency.entry(token.to_string()).or_insert(0) += 1;
            }
        }

        let n = docs.len() as f64;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (index, (token, df)) in document_frequency.into_iter().enumerate() {
            vocabulary.insert(token, index);
            idf.push(((1.0 + n) / (1.0 + df as f64)).ln() + 1.0);
        }

        Self { vocabulary, idf }
    }

    pub fn len(&self) -> usize {
        self.idf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.idf.is_empty()
    }

    /// Dense, L2-normalised TF-IDF row. All zeros when no token is known.
    pub fn transform(&self, doc: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.idf.len()];
        for token in tokens(doc) {
            if let Some(&index) = self.vocabulary.get(token) {
                row[index] += 1.0;
            }
        }
        for (value, idf) in row.iter_mut().zip(&self.idf) {
            *value *= idf;
        }
        normalize(&mut row);
        row
    }
}

pub(crate) fn normalize(row: &mut [f64]) {
    let norm = row.iter().map(|v| v * v).sum::<f64>().sqrt();
    if norm > 0.0 {
        row.iter_mut().for_each(|v| *v /= norm);
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
