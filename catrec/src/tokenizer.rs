use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}']+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

fn is_stopword(token: &str) -> bool {
    STOPWORDS.contains(token)
}

/// Split text into normalized terms: NFKC fold, lowercase, purely alphabetic
/// tokens only, stopword removal, Porter stemming.
///
/// This is the single normalization pipeline shared by corpus ingestion and
/// ad hoc vectorization of out-of-corpus text; both paths must agree on it or
/// their vocabularies drift apart.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut tokens = Vec::new();
    for mat in RE.find_iter(&normalized) {
        let token = mat.as_str();
        // Tokens containing digits or apostrophes are dropped outright, not
        // split; the corpus vocabulary is alphabetic words only.
        if !token.chars().all(|c| c.is_ascii_alphabetic()) {
            continue;
        }
        if is_stopword(token) {
            continue;
        }
        tokens.push(STEMMER.stem(token).to_string());
    }
    tokens
}

/// Term -> raw count frequency table for a single document.
pub fn frequency_distribution(text: &str) -> HashMap<String, u32> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for term in tokenize(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_stems_and_lowercases() {
        let toks = tokenize("Running Runners RUN!");
        assert_eq!(toks, vec!["run", "runner", "run"]);
    }

    #[test]
    fn it_filters_stopwords() {
        let toks = tokenize("the quick brown fox and the lazy dog");
        assert!(!toks.contains(&"the".to_string()));
        assert!(!toks.contains(&"and".to_string()));
        assert!(toks.contains(&"fox".to_string()));
    }

    #[test]
    fn it_drops_non_alphabetic_tokens() {
        let toks = tokenize("ipv6 2018 wiki-markup plain");
        assert!(!toks.iter().any(|t| t.contains('6')));
        assert!(!toks.iter().any(|t| t.contains('2')));
        assert!(toks.contains(&"wiki".to_string()));
        assert!(toks.contains(&"markup".to_string()));
        assert!(toks.contains(&"plain".to_string()));
    }

    #[test]
    fn frequency_distribution_counts_terms() {
        let dist = frequency_distribution("cat fish cat");
        assert_eq!(dist.get("cat"), Some(&2));
        assert_eq!(dist.get("fish"), Some(&1));
        assert_eq!(dist.len(), 2);
    }
}
