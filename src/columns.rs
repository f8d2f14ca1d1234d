use serde::Serialize;

/// Convert a zero-based column index into spreadsheet letters
///
/// Uses bijective base-26: `0 -> A`, `25 -> Z`, `26 -> AA`, `701 -> ZZ`, `702 -> AAA`.
///
/// # Examples
/// ```
/// use warehouse::columns::column_letter;
///
/// assert_eq!(column_letter(0), "A");
/// assert_eq!(column_letter(27), "AB");
/// ```
pub fn column_letter(index: usize) -> String {
    let mut col = index + 1;
    let mut result = String::new();
    while col > 0 {
        col -= 1;
        result.push(((col % 26) as u8 + b'A') as char);
        col /= 26;
    }
    result.chars().rev().collect()
}

/// Convert spreadsheet letters back into a zero-based column index
///
/// Returns `None` for an empty string or any non-letter character.
pub fn column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    letters.chars().try_fold(0usize, |acc, c| {
        if c.is_ascii_alphabetic() {
            Some(acc * 26 + (c.to_ascii_uppercase() as usize - 'A' as usize + 1))
        } else {
            None
        }
    })
    .map(|n| n - 1)
}

/// Keyword rule used to locate a status column by header name
///
/// Matching is a case-insensitive substring test against each header.
#[derive(Debug, Clone, Copy)]
pub enum ColumnRule {
    /// Header contains at least one of the keywords
    Any(&'static [&'static str]),
    /// Header contains every keyword
    All(&'static [&'static str]),
}

impl ColumnRule {
    pub fn matches(&self, header: &str) -> bool {
        let header = header.to_lowercase();
        match self {
            ColumnRule::Any(words) => words.iter().any(|w| header.contains(w)),
            ColumnRule::All(words) => words.iter().all(|w| header.contains(w)),
        }
    }
}

/// Ordered header row of a tab
///
/// Built once per fetch and passed along with the data rows, so column
/// positions are always taken from the header actually read.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HeaderMap {
    names: Vec<String>,
}

impl HeaderMap {
    pub fn new(names: Vec<String>) -> Self {
        HeaderMap { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// First column whose header satisfies the rule. Duplicates are not
    /// disambiguated: the leftmost match wins.
    pub fn find(&self, rule: ColumnRule) -> Option<usize> {
        self.names.iter().position(|name| rule.matches(name))
    }
}
