//! N-Triples line parsing and canonical resource names.
//!
//! # Line shape
//!
//! A well-formed statement is exactly four whitespace-separated tokens:
//!
//! ```text
//! <http://dbpedia.org/resource/Rust> <http://dbpedia.org/ontology/wikiPageWikiLink> <http://dbpedia.org/resource/Mozilla> .
//! ```
//!
//! Only subject and object survive parsing; predicate and terminator are
//! checked for presence and dropped. Any other token count is a malformed
//! line: it is logged, counted in [`StreamStats::malformed`] and skipped.
//! Blank lines and `#` comments are skipped without being counted as
//! malformed.
//!
//! # Canonical names
//!
//! A [`Namespace`] turns `<http://dbpedia.org/resource/Rust>` into `Rust`
//! by removing the URI brackets and the resource prefix. Two URIs with the
//! same canonical name denote the same entity.

use std::io::BufRead;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::RankError;
use crate::progress::Progress;

/// Longest prefix of a malformed line echoed into debug logs.
const MALFORMED_ECHO_CHARS: usize = 120;

// ---------------------------------------------------------------------------
// Namespace
// ---------------------------------------------------------------------------

/// The resource-namespace prefix stripped from subject/object URIs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// DBpedia's English resource namespace.
    pub const DBPEDIA: &'static str = "http://dbpedia.org/resource/";

    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reduce a URI token to its canonical short name.
    ///
    /// Brackets are removed when present; the namespace prefix is removed
    /// when present. Tokens outside the namespace keep their full URI so
    /// that they never collide with in-namespace names.
    #[must_use]
    pub fn canonical<'a>(&self, token: &'a str) -> &'a str {
        let inner = token.strip_prefix('<').unwrap_or(token);
        let inner = inner.strip_suffix('>').unwrap_or(inner);
        inner.strip_prefix(self.0.as_str()).unwrap_or(inner)
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new(Self::DBPEDIA)
    }
}

// ---------------------------------------------------------------------------
// Triple
// ---------------------------------------------------------------------------

/// A parsed statement reduced to its canonical subject and object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Triple {
    pub subject: String,
    pub object: String,
}

impl Triple {
    #[must_use]
    pub fn new(subject: impl Into<String>, object: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            object: object.into(),
        }
    }
}

/// Classification of a single input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line<'a> {
    /// Four tokens: canonical subject and object.
    Statement { subject: &'a str, object: &'a str },
    /// Empty line or `#` comment.
    Ignorable,
    /// Any other token count.
    Malformed { tokens: usize },
}

/// Classify one line of N-Triples text.
#[must_use]
pub fn parse_line<'a>(line: &'a str, namespace: &Namespace) -> Line<'a> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return Line::Ignorable;
    }

    let mut tokens = trimmed.split_whitespace();
    match (
        tokens.next(),
        tokens.next(),
        tokens.next(),
        tokens.next(),
        tokens.next(),
    ) {
        (Some(subject), Some(_predicate), Some(object), Some(_terminator), None) => {
            Line::Statement {
                subject: namespace.canonical(subject),
                object: namespace.canonical(object),
            }
        }
        _ => Line::Malformed {
            tokens: trimmed.split_whitespace().count(),
        },
    }
}

// ---------------------------------------------------------------------------
// Streaming reader
// ---------------------------------------------------------------------------

/// Line accounting for one pass over a triple stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStats {
    /// Physical lines read.
    pub lines: u64,
    /// Well-formed statements yielded.
    pub triples: u64,
    /// Lines rejected by the four-token shape check.
    pub malformed: u64,
    /// Blank and comment lines.
    pub ignored: u64,
}

/// Lazy iterator of [`Triple`]s over a buffered reader.
///
/// Invalid UTF-8 is replaced rather than rejected so a single bad byte
/// cannot abort a multi-gigabyte pass. I/O failures are yielded as errors
/// and end the stream.
pub struct TripleReader<R> {
    reader: R,
    namespace: Namespace,
    progress: Progress,
    buf: Vec<u8>,
    stats: StreamStats,
    finished: bool,
}

impl<R: BufRead> TripleReader<R> {
    #[must_use]
    pub fn new(reader: R, namespace: Namespace, progress: Progress) -> Self {
        Self {
            reader,
            namespace,
            progress,
            buf: Vec::with_capacity(256),
            stats: StreamStats::default(),
            finished: false,
        }
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn stats(&self) -> StreamStats {
        self.stats
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            info!(
                stage = self.progress.stage(),
                lines = self.stats.lines,
                triples = self.stats.triples,
                malformed = self.stats.malformed,
                "stream finished"
            );
        }
    }
}

impl<R: BufRead> Iterator for TripleReader<R> {
    type Item = Result<Triple, RankError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.finish();
                    return None;
                }
                Ok(_) => {}
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e.into()));
                }
            }

            self.stats.lines += 1;
            self.progress.observe(self.stats.lines);

            let text = String::from_utf8_lossy(&self.buf);
            match parse_line(&text, &self.namespace) {
                Line::Statement { subject, object } => {
                    self.stats.triples += 1;
                    return Some(Ok(Triple::new(subject, object)));
                }
                Line::Ignorable => self.stats.ignored += 1,
                Line::Malformed { tokens } => {
                    self.stats.malformed += 1;
                    let echo: String = text.trim_end().chars().take(MALFORMED_ECHO_CHARS).collect();
                    debug!(
                        line = self.stats.lines,
                        tokens,
                        text = %echo,
                        "ignoring malformed line"
                    );
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn dbpedia() -> Namespace {
        Namespace::default()
    }

    #[test]
    fn canonical_strips_brackets_and_prefix() {
        let ns = dbpedia();
        assert_eq!(ns.canonical("<http://dbpedia.org/resource/Rust>"), "Rust");
        assert_eq!(
            ns.canonical("<http://dbpedia.org/resource/C_(programming_language)>"),
            "C_(programming_language)"
        );
    }

    #[test]
    fn canonical_keeps_foreign_uris_whole() {
        let ns = dbpedia();
        assert_eq!(
            ns.canonical("<http://example.org/thing>"),
            "http://example.org/thing"
        );
    }

    #[test]
    fn canonical_with_empty_namespace_only_strips_brackets() {
        let ns = Namespace::new("");
        assert_eq!(ns.canonical("<A>"), "A");
        assert_eq!(ns.canonical("B"), "B");
    }

    #[test]
    fn parse_well_formed_statement() {
        let ns = dbpedia();
        let line = "<http://dbpedia.org/resource/A> <http://dbpedia.org/ontology/wikiPageRedirects> <http://dbpedia.org/resource/B> .\n";
        assert_eq!(
            parse_line(line, &ns),
            Line::Statement {
                subject: "A",
                object: "B"
            }
        );
    }

    #[test]
    fn parse_rejects_wrong_token_counts() {
        let ns = dbpedia();
        assert_eq!(parse_line("<A> <p> <B>", &ns), Line::Malformed { tokens: 3 });
        assert_eq!(
            parse_line("<A> <p> \"two words\" .", &ns),
            Line::Malformed { tokens: 5 }
        );
    }

    #[test]
    fn parse_ignores_blank_and_comment_lines() {
        let ns = dbpedia();
        assert_eq!(parse_line("", &ns), Line::Ignorable);
        assert_eq!(parse_line("   \t", &ns), Line::Ignorable);
        assert_eq!(parse_line("# started 2024-01-01", &ns), Line::Ignorable);
    }

    #[test]
    fn reader_yields_triples_and_counts_skips() {
        let input = "<A> <p> <B> .\nbroken line\n\n<B> <p> <C> .\n# note\n<C> <p>\n";
        let mut reader = TripleReader::new(
            input.as_bytes(),
            Namespace::new(""),
            Progress::disabled("test"),
        );

        let triples: Vec<Triple> = reader
            .by_ref()
            .collect::<Result<_, _>>()
            .expect("in-memory read cannot fail");

        assert_eq!(triples, vec![Triple::new("A", "B"), Triple::new("B", "C")]);
        let stats = reader.stats();
        assert_eq!(stats.lines, 6);
        assert_eq!(stats.triples, 2);
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.ignored, 2);
    }

    #[test]
    fn reader_handles_missing_trailing_newline_and_crlf() {
        let input = "<A> <p> <B> .\r\n<B> <p> <C> .";
        let reader = TripleReader::new(
            input.as_bytes(),
            Namespace::new(""),
            Progress::disabled("test"),
        );
        let triples: Vec<Triple> = reader.collect::<Result<_, _>>().expect("read");
        assert_eq!(triples, vec![Triple::new("A", "B"), Triple::new("B", "C")]);
    }

    #[test]
    fn reader_replaces_invalid_utf8() {
        let input: &[u8] = b"<A\xff> <p> <B> .\n";
        let reader = TripleReader::new(input, Namespace::new(""), Progress::disabled("test"));
        let triples: Vec<Triple> = reader.collect::<Result<_, _>>().expect("read");
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].object, "B");
        assert!(triples[0].subject.starts_with('A'));
    }
}
