//! WordPiece tokenizer for BERT-style sentence encoders.
//!
//! Reads the vocabulary from a HuggingFace `tokenizer.json` and turns text into the
//! three id sequences the encoder expects. Pipeline per input:
//!
//! 1. lower-case, drop control characters, collapse whitespace
//! 2. split on whitespace; every punctuation or symbol character is its own token
//! 3. whole-word vocabulary lookup, else greedy longest-match WordPiece with `##`
//!    continuation pieces, emitting `[UNK]` for an undecomposable remainder
//! 4. truncate the body to `max_length - 2` and wrap with `[CLS]` / `[SEP]`
//!
//! Padding is left to the caller; see [`crate::embedding::local`].

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

const CLS_TOKEN: &str = "[CLS]";
const SEP_TOKEN: &str = "[SEP]";
const PAD_TOKEN: &str = "[PAD]";
const DEFAULT_UNK_TOKEN: &str = "[UNK]";
const DEFAULT_CONTINUATION_PREFIX: &str = "##";
const DEFAULT_MAX_INPUT_CHARS_PER_WORD: usize = 100;

/// Token ids for one text fragment. All three sequences have the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub token_type_ids: Vec<i64>,
}

impl Encoding {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }
}

#[derive(Deserialize)]
struct TokenizerFile {
    #[serde(default)]
    added_tokens: Vec<AddedToken>,
    model: WordPieceModel,
}

#[derive(Deserialize)]
struct AddedToken {
    id: u32,
    content: String,
}

#[derive(Deserialize)]
struct WordPieceModel {
    vocab: HashMap<String, u32>,
    #[serde(default)]
    unk_token: Option<String>,
    #[serde(default)]
    continuing_subword_prefix: Option<String>,
    #[serde(default)]
    max_input_chars_per_word: Option<usize>,
}

/// A loaded WordPiece vocabulary plus its special-token ids.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    vocab: HashMap<String, u32>,
    continuation_prefix: String,
    max_input_chars_per_word: usize,
    max_length: usize,
    cls_id: u32,
    sep_id: u32,
    unk_id: u32,
    pad_id: u32,
}

impl Tokenizer {
    /// Load from a HuggingFace `tokenizer.json`.
    pub fn from_file(path: impl AsRef<Path>, max_length: usize) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read tokenizer file {}", path.display()))?;
        Self::from_json(&contents, max_length)
            .with_context(|| format!("invalid tokenizer file {}", path.display()))
    }

    /// Parse the contents of a `tokenizer.json`.
    pub fn from_json(json: &str, max_length: usize) -> Result<Self> {
        let file: TokenizerFile =
            serde_json::from_str(json).context("failed to parse tokenizer JSON")?;

        let mut vocab = file.model.vocab;
        // Added tokens carry explicit ids and win over the base vocabulary.
        for token in file.added_tokens {
            vocab.insert(token.content, token.id);
        }

        let unk = file
            .model
            .unk_token
            .unwrap_or_else(|| DEFAULT_UNK_TOKEN.to_string());
        let mut tokenizer = Self::with_unk_token(vocab, &unk, max_length)?;
        if let Some(prefix) = file.model.continuing_subword_prefix {
            tokenizer.continuation_prefix = prefix;
        }
        if let Some(max_chars) = file.model.max_input_chars_per_word {
            tokenizer.max_input_chars_per_word = max_chars;
        }
        Ok(tokenizer)
    }

    /// Build from an in-memory token → id map using the standard BERT special tokens.
    pub fn from_vocab(vocab: HashMap<String, u32>, max_length: usize) -> Result<Self> {
        Self::with_unk_token(vocab, DEFAULT_UNK_TOKEN, max_length)
    }

    fn with_unk_token(vocab: HashMap<String, u32>, unk: &str, max_length: usize) -> Result<Self> {
        let special = |token: &str| {
            vocab
                .get(token)
                .copied()
                .with_context(|| format!("vocabulary has no {token} token"))
        };
        let cls_id = special(CLS_TOKEN)?;
        let sep_id = special(SEP_TOKEN)?;
        let unk_id = special(unk)?;
        let pad_id = vocab.get(PAD_TOKEN).copied().unwrap_or(0);

        Ok(Self {
            vocab,
            continuation_prefix: DEFAULT_CONTINUATION_PREFIX.to_string(),
            max_input_chars_per_word: DEFAULT_MAX_INPUT_CHARS_PER_WORD,
            max_length,
            cls_id,
            sep_id,
            unk_id,
            pad_id,
        })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn pad_id(&self) -> u32 {
        self.pad_id
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab.len()
    }

    /// Encode one text fragment. The result never exceeds `max_length` tokens.
    pub fn encode(&self, text: &str) -> Encoding {
        let body_cap = self.max_length.saturating_sub(2);
        let mut ids = Vec::with_capacity(self.max_length.min(64));
        ids.push(self.cls_id as i64);

        'words: for word in split_words(&clean_text(text)) {
            for id in self.word_ids(&word) {
                if ids.len() > body_cap {
                    break 'words;
                }
                ids.push(id as i64);
            }
        }

        ids.push(self.sep_id as i64);
        ids.truncate(self.max_length);

        let len = ids.len();
        Encoding {
            input_ids: ids,
            attention_mask: vec![1; len],
            token_type_ids: vec![0; len],
        }
    }

    /// Ids for a single pre-split word: whole-word hit, else WordPiece pieces.
    fn word_ids(&self, word: &str) -> Vec<u32> {
        if let Some(&id) = self.vocab.get(word) {
            return vec![id];
        }
        if word.chars().count() > self.max_input_chars_per_word {
            return vec![self.unk_id];
        }

        // Byte offsets of every char boundary, so slicing never splits a code point.
        let bounds: Vec<usize> = word
            .char_indices()
            .map(|(i, _)| i)
            .chain(std::iter::once(word.len()))
            .collect();

        let mut pieces = Vec::new();
        let mut start = 0;
        while start < bounds.len() - 1 {
            let mut end = bounds.len() - 1;
            let mut matched = None;
            while end > start {
                let piece = &word[bounds[start]..bounds[end]];
                let found = if start == 0 {
                    self.vocab.get(piece)
                } else {
                    self.vocab
                        .get(&format!("{}{piece}", self.continuation_prefix))
                };
                if let Some(&id) = found {
                    matched = Some(id);
                    break;
                }
                end -= 1;
            }
            match matched {
                Some(id) => {
                    pieces.push(id);
                    start = end;
                }
                None => {
                    pieces.push(self.unk_id);
                    break;
                }
            }
        }
        pieces
    }
}

/// Lower-case, drop control characters, and collapse whitespace runs to single spaces.
fn clean_text(text: &str) -> String {
    let lowered: String = text
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some(' ')
            } else if c.is_control() || c == '\u{fffd}' {
                None
            } else {
                Some(c)
            }
        })
        .collect::<String>()
        .to_lowercase();
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split on whitespace; each punctuation or symbol character becomes its own word.
fn split_words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
        } else if is_punctuation(c) {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            words.push(c.to_string());
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || (!c.is_alphanumeric() && !c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_vocab() -> HashMap<String, u32> {
        [
            "[PAD]", "[UNK]", "[CLS]", "[SEP]", "hello", "world", ",", "!", "un", "##aff",
            "##able", "the", "cat", "sat", "tabs", "over", "spaces", "'", "s", "caf", "##é",
        ]
        .iter()
        .enumerate()
        .map(|(i, t)| (t.to_string(), i as u32))
        .collect()
    }

    fn tokenizer(max_length: usize) -> Tokenizer {
        Tokenizer::from_vocab(test_vocab(), max_length).unwrap()
    }

    #[test]
    fn test_wraps_with_sentinels() {
        let enc = tokenizer(32).encode("Hello, World!");
        // [CLS] hello , world ! [SEP]
        assert_eq!(enc.input_ids, vec![2, 4, 6, 5, 7, 3]);
    }

    #[test]
    fn test_wordpiece_decomposition() {
        let enc = tokenizer(32).encode("unaffable");
        assert_eq!(enc.input_ids, vec![2, 8, 9, 10, 3]);
    }

    #[test]
    fn test_unknown_remainder_becomes_unk() {
        // "un" matches, "xyz" does not decompose
        let enc = tokenizer(32).encode("unxyz");
        assert_eq!(enc.input_ids, vec![2, 8, 1, 3]);

        let enc = tokenizer(32).encode("qqq");
        assert_eq!(enc.input_ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_multibyte_continuation() {
        let enc = tokenizer(32).encode("CAFÉ");
        assert_eq!(enc.input_ids, vec![2, 19, 20, 3]);
    }

    #[test]
    fn test_truncates_body() {
        let enc = tokenizer(4).encode("the cat sat over tabs");
        assert_eq!(enc.input_ids, vec![2, 11, 12, 3]);
        assert_eq!(enc.len(), 4);
    }

    #[test]
    fn test_short_max_lengths() {
        assert_eq!(tokenizer(2).encode("the cat").input_ids, vec![2, 3]);
        assert_eq!(tokenizer(1).encode("the cat").input_ids, vec![2]);
        assert!(tokenizer(0).encode("the cat").is_empty());
    }

    #[test]
    fn test_output_never_exceeds_max_length() {
        let text = "the cat sat over the tabs, the spaces! unaffable qqq ".repeat(20);
        for max_length in 2..40 {
            let enc = tokenizer(max_length).encode(&text);
            assert!(enc.len() <= max_length);
            assert_eq!(enc.input_ids.first(), Some(&2));
            assert_eq!(enc.input_ids.last(), Some(&3));
        }
    }

    #[test]
    fn test_cleans_control_and_whitespace() {
        let enc = tokenizer(32).encode("  the\t\tcat\u{0007}\n\nsat  ");
        assert_eq!(enc.input_ids, vec![2, 11, 12, 13, 3]);
    }

    #[test]
    fn test_punctuation_split() {
        let enc = tokenizer(32).encode("cat's");
        assert_eq!(enc.input_ids, vec![2, 12, 17, 18, 3]);
    }

    #[test]
    fn test_mask_and_segments() {
        let enc = tokenizer(32).encode("tabs over spaces");
        assert_eq!(enc.attention_mask, vec![1; enc.len()]);
        assert_eq!(enc.token_type_ids, vec![0; enc.len()]);
    }

    #[test]
    fn test_empty_text() {
        let enc = tokenizer(8).encode("   ");
        assert_eq!(enc.input_ids, vec![2, 3]);
    }

    #[test]
    fn test_from_json_with_added_tokens() {
        let json = r###"{
            "added_tokens": [
                {"id": 100, "content": "[UNK]", "special": true},
                {"id": 101, "content": "[CLS]", "special": true},
                {"id": 102, "content": "[SEP]", "special": true},
                {"id": 0, "content": "[PAD]", "special": true}
            ],
            "model": {
                "type": "WordPiece",
                "unk_token": "[UNK]",
                "continuing_subword_prefix": "##",
                "max_input_chars_per_word": 100,
                "vocab": {"[PAD]": 0, "play": 7, "##ing": 8}
            }
        }"###;
        let tok = Tokenizer::from_json(json, 16).unwrap();
        assert_eq!(tok.encode("Playing").input_ids, vec![101, 7, 8, 102]);
        assert_eq!(tok.encode("zzz").input_ids, vec![101, 100, 102]);
        assert_eq!(tok.pad_id(), 0);
    }

    #[test]
    fn test_missing_special_tokens_is_error() {
        let vocab: HashMap<String, u32> = [("hello".to_string(), 0)].into_iter().collect();
        let err = Tokenizer::from_vocab(vocab, 16).unwrap_err();
        assert!(err.to_string().contains("[CLS]"));
    }
}
