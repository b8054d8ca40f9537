/* ------------------------------------------------------------------ */
/* Keyword extraction for choosing a generation seed                 */
/* ------------------------------------------------------------------ */
//
// Score per candidate token in the incoming text:
//   base        = length in chars
//   specificity = SPECIFICITY_WEIGHT / distinct successors   (known tokens
//                 with a retained frequency row only)
//   final       = (base + specificity) / term frequency in the text
// Tokens shorter than MIN_KEYWORD_CHARS are ignored.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::{MIN_KEYWORD_CHARS, SPECIFICITY_WEIGHT};
use crate::tokenizer::Tokenizer;

lazy_static! {
    static ref HTML_TAG:    Regex = Regex::new(r"<[^>]*>").unwrap();
    static ref URL:         Regex = Regex::new(r"https?://\S+").unwrap();
    static ref MENTION:     Regex = Regex::new(r"\B@\w+").unwrap();
    static ref PUNCTUATION: Regex = Regex::new(r#"[.,!?;:'"()\[\]{}]"#).unwrap();
}

#[derive(Clone, Debug, PartialEq)]
pub struct Keyword {
    pub token: String,
    pub score: f32,
}

/// Strip HTML tags, links, @mentions and punctuation; lowercase; trim.
pub fn clean_text(input: &str) -> String {
    let s = HTML_TAG.replace_all(input, "");
    let s = URL.replace_all(&s, "");
    let s = MENTION.replace_all(&s, "");
    let s = PUNCTUATION.replace_all(&s, "");
    s.to_lowercase().trim().to_string()
}

pub struct Extractor<'a> {
    tokenizer: &'a Tokenizer,
}

impl<'a> Extractor<'a> {
    pub fn new(tokenizer: &'a Tokenizer) -> Self { Self { tokenizer } }

    /// Best keywords first. `top_k == 0` returns every candidate.
    pub fn extract(&self, raw: &str, top_k: usize) -> Vec<Keyword> {
        let cleaned = clean_text(raw);

        let mut tf: HashMap<&str, usize> = HashMap::new();
        for tok in cleaned.split_whitespace() {
            *tf.entry(tok).or_insert(0) += 1;
        }

        let mut candidates: Vec<Keyword> = tf.into_iter()
            .filter(|(tok, _)| tok.chars().count() >= MIN_KEYWORD_CHARS)
            .map(|(tok, freq)| {
                let mut score = tok.chars().count() as f32;
                if let Some(row) = self.tokenizer
                    .get_token_index(tok)
                    .and_then(|idx| self.tokenizer.transitions().row(idx))
                {
                    if !row.is_empty() {
                        score += SPECIFICITY_WEIGHT / row.len() as f32;
                    }
                }
                Keyword { token: tok.to_string(), score: score / freq as f32 }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score.total_cmp(&a.score).then_with(|| a.token.cmp(&b.token))
        });

        if top_k > 0 { candidates.truncate(top_k); }
        candidates
    }

    /// First keyword the vocabulary knows, if any.
    pub fn best_known(&self, raw: &str) -> Option<String> {
        self.extract(raw, 0)
            .into_iter()
            .find(|k| self.tokenizer.get_token_index(&k.token).is_some())
            .map(|k| k.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        let raw = r#"<p>Hello, @alice! See https://example.com/x?y=1 (now)</p>"#;
        assert_eq!(clean_text(raw), "hello  see  now");
        assert_eq!(clean_text("email a@b stays"), "email a@b stays");
    }

    #[test]
    fn test_clean_text_mentions_after_punctuation() {
        let out = clean_text("hi (@bob) and,@carol");
        assert!(!out.contains("bob"));
        assert!(!out.contains("carol"));
        assert!(!out.contains('@'));
        assert_eq!(out, "hi  and");
    }

    #[test]
    fn test_clean_text_tags_join_adjacent_words() {
        assert_eq!(clean_text("a<b>bird</b>"), "abird");
        assert_eq!(clean_text("<p>one</p> <p>two</p>"), "one two");
    }

    #[test]
    fn test_extract_prefers_long_rare_words() {
        let t = Tokenizer::new();
        let e = Extractor::new(&t);
        let kws = e.extract("tiny elephant tiny tiny a", 0);
        assert_eq!(kws[0].token, "elephant");
        assert!(kws.iter().all(|k| k.token != "a"));

        let tiny = kws.iter().find(|k| k.token == "tiny").unwrap();
        assert!((tiny.score - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_extract_specificity_bonus() {
        let mut t = Tokenizer::new();
        // "spot" has one successor, "lots" has three.
        t.ingest_all(["spot on", "lots of", "lots to", "lots in"]);
        let e = Extractor::new(&t);
        let kws = e.extract("lots spot", 0);
        assert_eq!(kws[0].token, "spot");
        assert!((kws[0].score - (4.0 + 5.0)).abs() < 1e-6);
        assert!((kws[1].score - (4.0 + 5.0 / 3.0)).abs() < 1e-6);
    }

    #[test]
    fn test_extract_top_k_and_ties() {
        let t = Tokenizer::new();
        let e = Extractor::new(&t);
        let kws = e.extract("bb aa cc", 2);
        assert_eq!(kws.len(), 2);
        assert_eq!(kws[0].token, "aa");
        assert_eq!(kws[1].token, "bb");
        assert!(e.extract("   ", 1).is_empty());
    }

    #[test]
    fn test_best_known() {
        let mut t = Tokenizer::new();
        t.ingest_text("cats purr");
        let e = Extractor::new(&t);
        assert_eq!(e.best_known("Enormous cats!"), Some("cats".to_string()));
        assert_eq!(e.best_known("nothing familiar"), None);
    }
}
