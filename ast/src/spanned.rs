use std::{fmt, ops::Deref};

/// A position in the source file, 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Site {
    pub line: usize,
    pub column: usize,
}

impl Site {
    pub fn new(line: usize, column: usize) -> Self {
        Site { line, column }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone)]
pub struct Spanned<T> {
    pub site: Site,
    pub data: T,
}

impl<T> Eq for Spanned<T> where T: Eq {}
impl<T> PartialEq for Spanned<T>
where
    T: PartialEq,
{
    /// This only compares the `data`! I.e. two `Spanned`s are equal even if
    /// they were declared at different sites, as long as the content is the
    /// same.
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl<T> Deref for Spanned<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<T> fmt::Display for Spanned<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.data, self.site)
    }
}

impl<T> Spanned<T> {
    pub fn new(site: Site, data: T) -> Self {
        Spanned { site, data }
    }

    /// Attach a default site. Used for synthesized nodes and in tests.
    pub fn dummy(data: T) -> Self {
        Spanned {
            site: Site::default(),
            data,
        }
    }

    pub fn map<U, F>(&self, f: F) -> Spanned<U>
    where
        F: FnOnce(&T) -> U,
    {
        Spanned {
            site: self.site,
            data: f(&self.data),
        }
    }
}
