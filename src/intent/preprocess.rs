use std::collections::HashSet;
use std::sync::OnceLock;

/// English stopwords (NLTK list, alphabetic entries only).
const STOPWORDS: &[&str] = &[
    "i", "me", "my", "myself", "we", "our", "ours", "ourselves", "you", "your", "yours",
    "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers", "herself",
    "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "what", "which",
    "who", "whom", "this", "that", "these", "those", "am", "is", "are", "was", "were", "be",
    "been", "being", "have", "has", "had", "having", "do", "does", "did", "doing", "a", "an",
    "the", "and", "but", "if", "or", "because", "as", "until", "while", "of", "at", "by",
    "for", "with", "about", "against", "between", "into", "through", "during", "before",
    "after", "above", "below", "to", "from", "up", "down", "in", "out", "on", "off", "over",
    "under", "again", "further", "then", "once", "here", "there", "when", "where", "why",
    "how", "all", "any", "both", "each", "few", "more", "most", "other", "some", "such", "no",
    "nor", "not", "only", "own", "same", "so", "than", "too", "very", "s", "t", "can", "will",
    "just", "don", "should", "now", "d", "ll", "m", "o", "re", "ve", "y", "ain", "aren",
    "couldn", "didn", "doesn", "hadn", "hasn", "haven", "isn", "ma", "mightn", "mustn",
    "needn", "shan", "shouldn", "wasn", "weren", "won", "wouldn",
];

fn stopwords() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| STOPWORDS.iter().copied().collect())
}

/// Lowercases `text`, keeps alphabetic words that are not stopwords and
/// joins them with single spaces.
pub fn preprocess(text: &str) -> String {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !c.is_alphabetic())
        .filter(|token| !token.is_empty())
        .filter(|token| !stopwords().contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::preprocess;

    #[test]
    fn drops_stopwords_punctuation_and_digits() {
        assert_eq!(preprocess("Hello, is THIS the bot?"), "hello bot");
        assert_eq!(preprocess("order 66 now!!"), "order");
    }

    #[test]
    fn contractions_split_into_stopwords() {
        assert_eq!(preprocess("I don't know"), "know");
    }

    #[test]
    fn whitespace_only_is_empty() {
        assert_eq!(preprocess("   \t "), "");
    }
}
