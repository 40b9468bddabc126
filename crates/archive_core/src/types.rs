use std::fmt;

/// Type tag of records whose content spans numbered pages.
pub const MULTI_PAGE_TAG: &str = "Pdf";

/// A value read from the UI that is compared by full value equality.
///
/// Pollers use `is_empty` to recognise transitional reads during page loads.
pub trait Snapshot: Clone + PartialEq + Default + fmt::Debug {
    fn is_empty(&self) -> bool;
}

impl<T: Clone + PartialEq + fmt::Debug> Snapshot for Vec<T> {
    fn is_empty(&self) -> bool {
        Vec::is_empty(self)
    }
}

/// Ordered display names from the hierarchy root down to the current node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BreadcrumbPath(Vec<String>);

impl BreadcrumbPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Parse the text of a breadcrumb panel: one segment per line, blanks dropped.
    pub fn from_panel_text(text: &str) -> Self {
        text.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect()
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Path one level deeper.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }
}

impl Snapshot for BreadcrumbPath {
    fn is_empty(&self) -> bool {
        BreadcrumbPath::is_empty(self)
    }
}

impl<S: Into<String>> FromIterator<S> for BreadcrumbPath {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for BreadcrumbPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(" / "))
    }
}

/// A child node link. `id` is the UI handle used to click into it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub name: String,
    pub id: String,
}

impl NodeRef {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}-{}}}", self.name, self.id)
    }
}

/// A downloadable entry of a file list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileRecord {
    pub id: String,
    pub type_tag: String,
}

impl FileRecord {
    pub fn new(id: impl Into<String>, type_tag: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            type_tag: type_tag.into(),
        }
    }

    /// Multi-page documents are fetched page by page until the first miss.
    pub fn is_multi_page(&self) -> bool {
        self.type_tag.eq_ignore_ascii_case(MULTI_PAGE_TAG)
    }
}

impl fmt::Display for FileRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}-{}}}", self.id, self.type_tag)
    }
}
