//! Plain-text model persistence.
//!
//! ```text
//! committee: <id> (<name>)
//! trees: <n>
//! features: <n>
//! maxdepth: <n>
//! fpnfactor: <float>
//! <tree 1>
//! ...
//! <tree n>
//! ```
//!
//! Only the numeric committee id is read back; the name is for humans.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::iter::Enumerate;
use std::path::Path;
use std::str::{FromStr, Lines, SplitWhitespace};

use tracing::{debug, info, instrument, warn};

use crate::config::{Committee, ForestConfig};
use crate::error::ForestError;
use crate::forest::Forest;
use crate::tree::DecisionTree;

/// Line cursor over a model text that reports positions in its errors.
///
/// Blank lines are skipped.
pub(crate) struct ModelLines<'a> {
    lines: Enumerate<Lines<'a>>,
    source_name: &'a str,
    line: usize,
}

impl<'a> ModelLines<'a> {
    pub(crate) fn new(text: &'a str, source_name: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            source_name,
            line: 0,
        }
    }

    /// Error pointing at the most recently consumed line.
    pub(crate) fn malformed(&self, reason: impl Into<String>) -> ForestError {
        malformed(self.source_name, self.line, reason)
    }

    fn next_line(&mut self) -> Option<&'a str> {
        for (idx, text) in self.lines.by_ref() {
            if !text.trim().is_empty() {
                self.line = idx + 1;
                return Some(text);
            }
        }
        None
    }

    /// Whitespace-separated fields of the next non-blank line.
    pub(crate) fn fields(&mut self) -> Result<Fields<'a>, ForestError> {
        let text = self
            .next_line()
            .ok_or_else(|| malformed(self.source_name, self.line + 1, "unexpected end of model"))?;
        Ok(Fields {
            tokens: text.split_whitespace(),
            line: self.line,
            source_name: self.source_name,
        })
    }

    /// Fields after `<label>:` on the next line, checking the label.
    pub(crate) fn labelled_fields(&mut self, label: &str) -> Result<Fields<'a>, ForestError> {
        let text = self.next_line().ok_or_else(|| {
            malformed(
                self.source_name,
                self.line + 1,
                format!("expected `{label}:`, found end of model"),
            )
        })?;
        let rest = text
            .split_once(':')
            .filter(|(found, _)| found.trim() == label)
            .map(|(_, rest)| rest)
            .ok_or_else(|| {
                self.malformed(format!("expected `{label}:`, found `{}`", text.trim()))
            })?;
        Ok(Fields {
            tokens: rest.split_whitespace(),
            line: self.line,
            source_name: self.source_name,
        })
    }

    /// Single value of a `<label>: <value>` line.
    pub(crate) fn labelled<T: FromStr>(&mut self, label: &str) -> Result<T, ForestError> {
        let mut fields = self.labelled_fields(label)?;
        let value = fields.parse()?;
        fields.finish()?;
        Ok(value)
    }

    /// Line number of the first non-blank line left, if any.
    pub(crate) fn trailing_line(&mut self) -> Option<usize> {
        self.next_line().map(|_| self.line)
    }
}

/// Tokens of one model line.
pub(crate) struct Fields<'a> {
    tokens: SplitWhitespace<'a>,
    line: usize,
    source_name: &'a str,
}

impl<'a> Fields<'a> {
    pub(crate) fn next_token(&mut self) -> Result<&'a str, ForestError> {
        self.tokens
            .next()
            .ok_or_else(|| malformed(self.source_name, self.line, "missing field"))
    }

    pub(crate) fn parse<T: FromStr>(&mut self) -> Result<T, ForestError> {
        let token = self.next_token()?;
        token.parse().map_err(|_| {
            malformed(
                self.source_name,
                self.line,
                format!("cannot parse `{token}` as {}", std::any::type_name::<T>()),
            )
        })
    }

    /// Reject leftover tokens.
    pub(crate) fn finish(mut self) -> Result<(), ForestError> {
        match self.tokens.next() {
            None => Ok(()),
            Some(extra) => Err(malformed(
                self.source_name,
                self.line,
                format!("unexpected field `{extra}`"),
            )),
        }
    }
}

fn malformed(source_name: &str, line: usize, reason: impl Into<String>) -> ForestError {
    ForestError::MalformedModel {
        source_name: source_name.to_string(),
        line,
        reason: reason.into(),
    }
}

impl Forest {
    /// Write the header and every grown tree in the text model format.
    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        let committee = self.config.committee;
        writeln!(out, "committee: {} ({})", committee.id(), committee.name())?;
        writeln!(out, "trees: {}", self.trees.len())?;
        writeln!(out, "features: {}", self.n_features)?;
        writeln!(out, "maxdepth: {}", self.config.max_depth)?;
        writeln!(out, "fpnfactor: {}", self.config.feature_factor)?;
        for tree in &self.trees {
            tree.write_to(out)?;
        }
        Ok(())
    }

    /// Save the model to a text file.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::WriteModel`] when the file cannot be created
    /// or written. Nothing about the forest changes either way.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), ForestError> {
        let path = path.as_ref();
        let to_error = |source| ForestError::WriteModel {
            path: path.to_path_buf(),
            source,
        };

        let file = File::create(path).map_err(to_error)?;
        let mut out = BufWriter::new(file);
        self.write_to(&mut out).map_err(to_error)?;
        out.flush().map_err(to_error)?;

        info!(n_trees = self.trees.len(), "model saved");
        Ok(())
    }

    /// Load a model from a text file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::ReadModel`] | file missing or unreadable |
    /// | [`ForestError::MalformedModel`] | header or tree lines do not parse |
    /// | [`ForestError::UnknownCommittee`] | committee id is not 1, 2 or 3 |
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ForestError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ForestError::ReadModel {
            path: path.to_path_buf(),
            source,
        })?;
        Self::read_from(file, &path.display().to_string())
    }

    /// Load a model from any reader; `source_name` labels parse errors.
    ///
    /// Extra non-blank lines after the last tree are logged and ignored.
    ///
    /// # Errors
    ///
    /// See [`Forest::read`].
    pub fn read_from<R: Read>(mut reader: R, source_name: &str) -> Result<Self, ForestError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|source| ForestError::ReadModel {
                path: source_name.into(),
                source,
            })?;
        Self::parse(&text, source_name)
    }

    fn parse(text: &str, source_name: &str) -> Result<Self, ForestError> {
        let mut lines = ModelLines::new(text, source_name);

        let mut committee_fields = lines.labelled_fields("committee")?;
        let committee = Committee::from_id(committee_fields.parse()?)?;
        let n_trees: usize = lines.labelled("trees")?;
        let n_features: usize = lines.labelled("features")?;
        let max_depth: usize = lines.labelled("maxdepth")?;
        let feature_factor: f64 = lines.labelled("fpnfactor")?;
        if !(feature_factor.is_finite() && feature_factor > 0.0) {
            return Err(lines.malformed(format!(
                "feature factor must be positive and finite, got {feature_factor}"
            )));
        }

        // Counts come from the file; grow as trees actually parse.
        let mut trees = Vec::new();
        for _ in 0..n_trees {
            trees.push(DecisionTree::read_from(&mut lines, n_features)?);
        }

        if let Some(line) = lines.trailing_line() {
            warn!(source = source_name, line, "ignoring data after the last tree");
        }

        debug!(%committee, n_trees, n_features, max_depth, "model loaded");

        let config = ForestConfig::new(committee)
            .with_n_trees(n_trees)
            .with_max_depth(max_depth)
            .with_feature_factor(feature_factor);
        Ok(Forest {
            config,
            n_features,
            trees,
        })
    }

    /// Concatenate the trees of several models under the first model's header.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ForestError::NoModels`] | `forests` is empty |
    /// | [`ForestError::IncompatibleModels`] | committees or feature counts differ |
    pub fn combine(forests: impl IntoIterator<Item = Forest>) -> Result<Self, ForestError> {
        let mut forests = forests.into_iter();
        let mut combined = forests.next().ok_or(ForestError::NoModels)?;
        for (i, forest) in forests.enumerate() {
            if forest.config.committee != combined.config.committee {
                return Err(ForestError::IncompatibleModels {
                    reason: format!(
                        "model {} is {}, model 1 is {}",
                        i + 2,
                        forest.config.committee,
                        combined.config.committee
                    ),
                });
            }
            if forest.n_features != combined.n_features {
                return Err(ForestError::IncompatibleModels {
                    reason: format!(
                        "model {} has {} features, model 1 has {}",
                        i + 2,
                        forest.n_features,
                        combined.n_features
                    ),
                });
            }
            combined.trees.extend(forest.trees);
        }
        combined.config.n_trees = combined.trees.len();
        info!(n_trees = combined.trees.len(), "models combined");
        Ok(combined)
    }
}
