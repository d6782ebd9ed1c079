//! Crawl-wide statistics
//!
//! The aggregator owns its synchronization and is shared by every worker
//! through an `Arc`. Word extraction happens before the lock is taken, so the
//! critical section only merges precomputed results.

use crate::url::{extract_host, page_key, subdomain_of};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, OnceLock, PoisonError};
use url::Url;

/// Words too common to say anything about a page
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "aren't", "as", "at", "be", "because", "been", "before", "being", "below", "between", "both",
    "but", "by", "can't", "cannot", "could", "couldn't", "did", "didn't", "do", "does", "doesn't",
    "doing", "don't", "down", "during", "each", "few", "for", "from", "further", "had", "hadn't",
    "has", "hasn't", "have", "haven't", "having", "he", "he'd", "he'll", "he's", "her", "here",
    "here's", "hers", "herself", "him", "himself", "his", "how", "how's", "i", "i'd", "i'll",
    "i'm", "i've", "if", "in", "into", "is", "isn't", "it", "it's", "its", "itself", "let's",
    "me", "more", "most", "mustn't", "my", "myself", "no", "nor", "not", "of", "off", "on",
    "once", "only", "or", "other", "ought", "our", "ours", "ourselves", "out", "over", "own",
    "same", "shan't", "she", "she'd", "she'll", "she's", "should", "shouldn't", "so", "some",
    "such", "than", "that", "that's", "the", "their", "theirs", "them", "themselves", "then",
    "there", "there's", "these", "they", "they'd", "they'll", "they're", "they've", "this",
    "those", "through", "to", "too", "under", "until", "up", "very", "was", "wasn't", "we",
    "we'd", "we'll", "we're", "we've", "were", "weren't", "what", "what's", "when", "when's",
    "where", "where's", "which", "while", "who", "who's", "whom", "why", "why's", "with",
    "won't", "would", "wouldn't", "you", "you'd", "you'll", "you're", "you've", "your", "yours",
    "yourself", "yourselves",
];

fn stop_words() -> &'static HashSet<&'static str> {
    static WORDS: OnceLock<HashSet<&'static str>> = OnceLock::new();
    WORDS.get_or_init(|| STOP_WORDS.iter().copied().collect())
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"))
}

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b\w+\b").expect("word pattern is valid"))
}

/// Extracts the words of a page
///
/// Tags are stripped, text is case-folded, and stop words are dropped.
///
/// # Examples
///
/// ```
/// use tidewalk::output::stats::extract_words;
///
/// let words = extract_words("<p>The Quick <b>brown</b> fox</p>");
/// assert_eq!(words, vec!["quick", "brown", "fox"]);
/// ```
pub fn extract_words(content: &str) -> Vec<String> {
    let text = tag_pattern().replace_all(content, " ").to_lowercase();
    let stop = stop_words();

    word_pattern()
        .find_iter(&text)
        .map(|m| m.as_str())
        .filter(|w| !stop.contains(w))
        .map(str::to_string)
        .collect()
}

/// The page with the most words seen so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongestPage {
    pub url: String,
    pub word_count: usize,
}

/// Point-in-time copy of the aggregated statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSnapshot {
    /// Number of distinct pages processed
    pub unique_pages: usize,

    /// Page with the highest word count
    pub longest_page: Option<LongestPage>,

    /// Most frequent words, highest count first (ties broken alphabetically)
    pub top_words: Vec<(String, u64)>,

    /// Pages per subdomain of the root domain, sorted by subdomain
    pub subdomains: BTreeMap<String, u64>,
}

#[derive(Debug, Default)]
struct StatsInner {
    unique_urls: HashSet<String>,
    longest_page: Option<LongestPage>,
    word_counts: HashMap<String, u64>,
    subdomains: BTreeMap<String, u64>,
}

/// Thread-safe crawl statistics
///
/// One `record_page` call per successfully processed page. Every part of the
/// update is applied under a single lock acquisition.
#[derive(Debug)]
pub struct StatsAggregator {
    root_domain: String,
    inner: Mutex<StatsInner>,
}

impl StatsAggregator {
    /// Creates an empty aggregator counting subdomains of `root_domain`
    pub fn new(root_domain: impl Into<String>) -> Self {
        Self {
            root_domain: root_domain.into().to_lowercase(),
            inner: Mutex::new(StatsInner::default()),
        }
    }

    /// Records one processed page
    pub fn record_page(&self, url: &Url, content: &[u8]) {
        let key = page_key(url);
        let words = extract_words(&String::from_utf8_lossy(content));
        let word_count = words.len();
        let host = extract_host(url);
        let subdomain = host
            .as_deref()
            .and_then(|h| subdomain_of(h, &self.root_domain))
            .map(str::to_string);

        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        inner.unique_urls.insert(key.clone());

        // Ties go to the smaller URL so the result is independent of worker order
        let replace = match &inner.longest_page {
            None => true,
            Some(current) => {
                word_count > current.word_count
                    || (word_count == current.word_count && key < current.url)
            }
        };
        if replace {
            inner.longest_page = Some(LongestPage {
                url: key,
                word_count,
            });
        }

        if let Some(subdomain) = subdomain {
            *inner.subdomains.entry(subdomain).or_insert(0) += 1;
        }

        for word in words {
            *inner.word_counts.entry(word).or_insert(0) += 1;
        }
    }

    /// Returns a snapshot with the `top_k` most frequent words
    pub fn snapshot(&self, top_k: usize) -> StatsSnapshot {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        let mut words: Vec<(String, u64)> = inner
            .word_counts
            .iter()
            .map(|(w, c)| (w.clone(), *c))
            .collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(top_k);

        StatsSnapshot {
            unique_pages: inner.unique_urls.len(),
            longest_page: inner.longest_page.clone(),
            top_words: words,
            subdomains: inner.subdomains.clone(),
        }
    }

    /// The configured root domain
    pub fn root_domain(&self) -> &str {
        &self.root_domain
    }
}
