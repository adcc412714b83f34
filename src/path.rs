//! Paths that locate a node within a set tree.
//!
//! A [`Path`] is the ordered list of node names from a root of a tree down to
//! the node in question (e.g., `["My Selections", "Selection 1"]`). Names are
//! only unique among siblings, so a path is only meaningful relative to a
//! particular tree.
//!
//! Paths are displayed exactly as they were written, but they are matched in
//! a _normalized_ form where each segment is trimmed and lowercased and the
//! segments are joined with `/` (see [`normalize()`]).

use std::str::FromStr;

use nonempty::NonEmpty;
use serde::Deserialize;
use serde::Serialize;

/// The separator used when joining segments into a [key](Path::key()).
pub const KEY_SEPARATOR: &str = "___";

/// The separator used when joining normalized segments.
pub const NORMALIZED_SEPARATOR: char = '/';

/// An error related to a [`Path`].
#[derive(Debug)]
pub enum Error {
    /// A path was created with no segments.
    Empty,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Empty => write!(f, "a path must have at least one segment"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
type Result<T> = std::result::Result<T, Error>;

/// Normalizes a single path segment.
pub fn normalize_segment(segment: &str) -> String {
    segment.trim().to_lowercase()
}

/// Normalizes a sequence of path segments into a single `/`-joined key.
///
/// # Examples
///
/// ```
/// use cellsets::path::normalize;
///
/// assert_eq!(normalize(&[" My Selections", "Group A "]), "my selections/group a");
/// assert_eq!(normalize::<&str>(&[]), "");
/// ```
pub fn normalize<S: AsRef<str>>(segments: &[S]) -> String {
    let mut result = String::new();

    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            result.push(NORMALIZED_SEPARATOR);
        }

        result.push_str(&normalize_segment(segment.as_ref()));
    }

    result
}

/// A non-empty path from the root of a tree to a node.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Path(NonEmpty<String>);

impl Path {
    /// Attempts to create a path from the provided segments.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::path::Path;
    ///
    /// let path = Path::try_new(["Cell Type", "T cells"])?;
    /// assert_eq!(path.len(), 2);
    /// assert_eq!(path.name(), "T cells");
    ///
    /// assert!(Path::try_new(Vec::<String>::new()).is_err());
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn try_new<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NonEmpty::from_vec(segments.into_iter().map(Into::into).collect())
            .map(Self)
            .ok_or(Error::Empty)
    }

    /// Creates a single-segment path pointing at a root node.
    pub fn root(name: impl Into<String>) -> Self {
        Self(NonEmpty::new(name.into()))
    }

    /// Creates the path of a child named `name` beneath this path.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut inner = self.0.clone();
        inner.push(name.into());
        Self(inner)
    }

    /// Gets the path of the parent node, if this path is not a root.
    pub fn parent(&self) -> Option<Self> {
        let mut segments = self.0.iter().cloned().collect::<Vec<_>>();
        segments.pop();
        Self::try_new(segments).ok()
    }

    /// Gets the number of segments in the path.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always returns `false`, as a path cannot be empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Gets the name of the node the path points to (the last segment).
    pub fn name(&self) -> &str {
        self.0.last()
    }

    /// Gets an iterator over the segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Gets the key used to identify the node in tree widgets.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::path::Path;
    ///
    /// let path = Path::try_new(["Cell Type", "T cells"])?;
    /// assert_eq!(path.key(), "Cell Type___T cells");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn key(&self) -> String {
        self.segments().collect::<Vec<_>>().join(KEY_SEPARATOR)
    }

    /// Gets the normalized form of the path.
    pub fn normalized(&self) -> String {
        normalize(&self.segments().collect::<Vec<_>>())
    }

    /// Gets a display label for the group, which is every segment below the
    /// root joined by spaces.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::path::Path;
    ///
    /// let path = Path::try_new(["My Selections", "Selection 1"])?;
    /// assert_eq!(path.label(), "Selection 1");
    ///
    /// let path = Path::try_new(["Leiden"])?;
    /// assert_eq!(path.label(), "");
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn label(&self) -> String {
        self.0.tail.join(" ")
    }

    /// Returns whether `ancestor` is this path or one of its ancestors, after
    /// normalization.
    ///
    /// # Examples
    ///
    /// ```
    /// use cellsets::path::Path;
    ///
    /// let path = Path::try_new(["My Selections", "Selection 1"])?;
    /// assert!(path.starts_with(&Path::root("my selections")));
    /// assert!(path.starts_with(&path));
    /// assert!(!Path::root("My Selections").starts_with(&path));
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn starts_with(&self, ancestor: &Path) -> bool {
        ancestor.len() <= self.len()
            && self
                .segments()
                .zip(ancestor.segments())
                .all(|(a, b)| normalize_segment(a) == normalize_segment(b))
    }

    /// Replaces the leading `from` portion of this path with `to`.
    ///
    /// Returns `None` if this path does not start with `from`.
    pub fn rebase(&self, from: &Path, to: &Path) -> Option<Path> {
        if !self.starts_with(from) {
            return None;
        }

        Self::try_new(to.segments().chain(self.segments().skip(from.len()))).ok()
    }
}

impl TryFrom<Vec<String>> for Path {
    type Error = Error;

    fn try_from(segments: Vec<String>) -> Result<Self> {
        Self::try_new(segments)
    }
}

impl From<Path> for Vec<String> {
    fn from(path: Path) -> Self {
        path.0.into()
    }
}

impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.segments().collect::<Vec<_>>().join("/"))
    }
}

impl FromStr for Path {
    type Err = Error;

    /// Parses a `/`-separated path. Empty segments are ignored.
    ///
    /// Names that contain a `/` cannot be written this way. Build those paths
    /// with [`Path::try_new()`] or deserialize them from a list of names.
    fn from_str(s: &str) -> Result<Self> {
        Self::try_new(
            s.split(NORMALIZED_SEPARATOR)
                .map(str::trim)
                .filter(|segment| !segment.is_empty()),
        )
    }
}
