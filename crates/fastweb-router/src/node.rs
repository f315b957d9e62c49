//! Radix tree vertex
//!
//! A node owns a byte prefix, its static children (indexed by their first
//! byte and ordered by descending priority), at most one `:param` child and
//! at most one `*catch-all` child. Lookups try static children first, then
//! the param child, then the catch-all, backtracking on failure. Priority only
//! changes the order among static siblings, and at most one static
//! sibling can match a given byte, so it never changes the result.

use crate::InsertError;
use smallvec::SmallVec;
use std::mem;

/// Wildcard names and values captured while walking the tree.
pub(crate) type Captures<'n, 'p> = SmallVec<[(&'n [u8], &'p [u8]); 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
    Static,
    Root,
    Param,
    CatchAll,
}

#[derive(Debug)]
pub(crate) struct Node<T> {
    /// Literal bytes for static/root nodes, `:name` or `*name` for wildcards
    pub(crate) prefix: Vec<u8>,
    pub(crate) kind: NodeKind,
    /// First byte of each static child, parallel to `children`
    pub(crate) indices: Vec<u8>,
    pub(crate) children: Vec<Node<T>>,
    pub(crate) param: Option<Box<Node<T>>>,
    pub(crate) catch_all: Option<Box<Node<T>>>,
    /// Number of routes registered in this subtree
    pub(crate) priority: u32,
    pub(crate) value: Option<T>,
}

impl<T> Node<T> {
    pub(crate) fn new(kind: NodeKind, prefix: &[u8]) -> Self {
        Self {
            prefix: prefix.to_vec(),
            kind,
            indices: Vec::new(),
            children: Vec::new(),
            param: None,
            catch_all: None,
            priority: 0,
            value: None,
        }
    }

    pub(crate) fn root() -> Self {
        Self::new(NodeKind::Root, &[])
    }

    /// Wildcard name without its leading `:` or `*`
    fn name(&self) -> &[u8] {
        debug_assert!(matches!(self.kind, NodeKind::Param | NodeKind::CatchAll));
        &self.prefix[1..]
    }

    fn is_fresh(&self) -> bool {
        self.prefix.is_empty()
            && self.children.is_empty()
            && self.param.is_none()
            && self.catch_all.is_none()
            && self.value.is_none()
    }

    // ---------------------------------------------------------------------
    // Insertion
    // ---------------------------------------------------------------------

    /// Walks the tree without modifying it and reports whether inserting
    /// `path` would hit a duplicate or a wildcard conflict.
    ///
    /// `path` is the remainder of `full` that starts at this node's prefix.
    pub(crate) fn check(&self, path: &[u8], full: &str) -> Result<(), InsertError> {
        if self.is_fresh() {
            return Ok(());
        }
        let i = common_prefix_len(&self.prefix, path);
        if i < self.prefix.len() {
            // Diverges inside this prefix: the split creates fresh territory.
            return Ok(());
        }
        self.check_rest(&path[i..], full)
    }

    fn check_rest(&self, rest: &[u8], full: &str) -> Result<(), InsertError> {
        match rest.first() {
            None => match self.value {
                Some(_) => Err(InsertError::DuplicateRoute(full.to_string())),
                None => Ok(()),
            },
            Some(b':') => {
                let (wildcard, after) = rest.split_at(segment_end(rest));
                if let Some(catch_all) = &self.catch_all {
                    if *catch_all.name() != wildcard[1..] {
                        return Err(conflict(full, &catch_all.prefix, wildcard));
                    }
                }
                match &self.param {
                    Some(param) if param.prefix != wildcard => {
                        Err(conflict(full, &param.prefix, wildcard))
                    }
                    Some(param) => param.check_rest(after, full),
                    None => Ok(()),
                }
            }
            Some(b'*') => {
                if let Some(param) = &self.param {
                    if *param.name() != rest[1..] {
                        return Err(conflict(full, &param.prefix, rest));
                    }
                }
                match &self.catch_all {
                    Some(catch_all) if catch_all.prefix != rest => {
                        Err(conflict(full, &catch_all.prefix, rest))
                    }
                    Some(_) => Err(InsertError::DuplicateRoute(full.to_string())),
                    None => Ok(()),
                }
            }
            Some(first) => match self.indices.iter().position(|c| c == first) {
                Some(pos) => self.children[pos].check(rest, full),
                None => Ok(()),
            },
        }
    }

    /// Inserts `value` for `path`. The caller must have run [`Node::check`].
    pub(crate) fn insert(&mut self, path: &[u8], value: T) {
        self.priority += 1;

        if self.is_fresh() {
            let lead = static_len(path);
            self.prefix = path[..lead].to_vec();
            self.insert_rest(&path[lead..], value);
            return;
        }

        let i = common_prefix_len(&self.prefix, path);
        if i < self.prefix.len() {
            self.split(i);
        }
        self.insert_rest(&path[i..], value);
    }

    fn insert_rest(&mut self, rest: &[u8], value: T) {
        match rest.first() {
            None => self.value = Some(value),
            Some(b':') => {
                let (wildcard, after) = rest.split_at(segment_end(rest));
                let param = self
                    .param
                    .get_or_insert_with(|| Box::new(Node::new(NodeKind::Param, wildcard)));
                param.priority += 1;
                param.insert_rest(after, value);
            }
            Some(b'*') => {
                let catch_all = self
                    .catch_all
                    .get_or_insert_with(|| Box::new(Node::new(NodeKind::CatchAll, rest)));
                catch_all.priority += 1;
                catch_all.value = Some(value);
            }
            Some(&first) => {
                let pos = match self.indices.iter().position(|&c| c == first) {
                    Some(pos) => pos,
                    None => {
                        self.indices.push(first);
                        self.children.push(Node::new(NodeKind::Static, &[]));
                        self.children.len() - 1
                    }
                };
                self.children[pos].insert(rest, value);
                self.promote(pos);
            }
        }
    }

    /// Moves everything below `at` into a single static child.
    fn split(&mut self, at: usize) {
        let child = Node {
            prefix: self.prefix[at..].to_vec(),
            kind: NodeKind::Static,
            indices: mem::take(&mut self.indices),
            children: mem::take(&mut self.children),
            param: self.param.take(),
            catch_all: self.catch_all.take(),
            // already counts the route being inserted
            priority: self.priority - 1,
            value: self.value.take(),
        };
        self.prefix.truncate(at);
        self.indices = vec![child.prefix[0]];
        self.children = vec![child];
    }

    /// Bubbles the child at `pos` up past siblings with a lower priority.
    /// Equal priorities keep registration order.
    fn promote(&mut self, mut pos: usize) {
        while pos > 0 && self.children[pos - 1].priority < self.children[pos].priority {
            self.children.swap(pos - 1, pos);
            self.indices.swap(pos - 1, pos);
            pos -= 1;
        }
    }

    // ---------------------------------------------------------------------
    // Lookup
    // ---------------------------------------------------------------------

    /// Matches `path` against this static/root node and its subtree.
    pub(crate) fn search<'n, 'p>(
        &'n self,
        path: &'p [u8],
        captures: &mut Captures<'n, 'p>,
    ) -> Option<&'n T> {
        let rest = path.strip_prefix(self.prefix.as_slice())?;
        self.search_rest(rest, captures)
    }

    fn search_rest<'n, 'p>(
        &'n self,
        rest: &'p [u8],
        captures: &mut Captures<'n, 'p>,
    ) -> Option<&'n T> {
        match rest.first() {
            None => {
                if let Some(value) = &self.value {
                    return Some(value);
                }
            }
            Some(&first) => {
                if let Some(pos) = self.indices.iter().position(|&c| c == first) {
                    if let Some(value) = self.children[pos].search(rest, captures) {
                        return Some(value);
                    }
                }

                if first != b'/' {
                    if let Some(param) = &self.param {
                        let mark = captures.len();
                        let end = segment_end(rest);
                        captures.push((param.name(), &rest[..end]));
                        if let Some(value) = param.search_rest(&rest[end..], captures) {
                            return Some(value);
                        }
                        captures.truncate(mark);
                    }
                }
            }
        }

        let catch_all = self.catch_all.as_deref()?;
        let value = catch_all.value.as_ref()?;
        captures.push((catch_all.name(), rest));
        Some(value)
    }

    /// Case-insensitive walk that writes the tree's spelling of the matched
    /// route into `out`. Static bytes are compared with ASCII case folding,
    /// so non-ASCII bytes must match exactly. Wildcard values are copied as
    /// given.
    ///
    /// With `fix_trailing_slash`, a route that only differs by one trailing
    /// `/` also counts as a match.
    pub(crate) fn find_case_insensitive(
        &self,
        path: &[u8],
        fix_trailing_slash: bool,
        out: &mut Vec<u8>,
    ) -> bool {
        let n = self.prefix.len();
        let mark = out.len();

        if path.len() >= n && path[..n].eq_ignore_ascii_case(&self.prefix) {
            out.extend_from_slice(&self.prefix);
            if self.find_case_insensitive_rest(&path[n..], fix_trailing_slash, out) {
                return true;
            }
            out.truncate(mark);
            return false;
        }

        // Only the trailing slash of this prefix is missing.
        if fix_trailing_slash
            && self.value.is_some()
            && n == path.len() + 1
            && self.prefix[n - 1] == b'/'
            && path.eq_ignore_ascii_case(&self.prefix[..n - 1])
        {
            out.extend_from_slice(&self.prefix);
            return true;
        }
        false
    }

    fn find_case_insensitive_rest(
        &self,
        rest: &[u8],
        fix_trailing_slash: bool,
        out: &mut Vec<u8>,
    ) -> bool {
        let Some(&first) = rest.first() else {
            if self.value.is_some() {
                return true;
            }
            if self.catch_all.as_ref().is_some_and(|c| c.value.is_some()) {
                return true;
            }
            if fix_trailing_slash {
                if let Some(pos) = self.indices.iter().position(|&c| c == b'/') {
                    let child = &self.children[pos];
                    if child.prefix == b"/" && child.value.is_some() {
                        out.push(b'/');
                        return true;
                    }
                }
            }
            return false;
        };

        let mark = out.len();

        for (pos, c) in self.indices.iter().enumerate() {
            if c.eq_ignore_ascii_case(&first)
                && self.children[pos].find_case_insensitive(rest, fix_trailing_slash, out)
            {
                return true;
            }
        }

        if first != b'/' {
            if let Some(param) = &self.param {
                let end = segment_end(rest);
                out.extend_from_slice(&rest[..end]);
                if param.find_case_insensitive_rest(&rest[end..], fix_trailing_slash, out) {
                    return true;
                }
                out.truncate(mark);
            }
        }

        if self.catch_all.as_ref().is_some_and(|c| c.value.is_some()) {
            out.extend_from_slice(rest);
            return true;
        }

        // Superfluous trailing slash.
        fix_trailing_slash && rest == b"/" && self.value.is_some()
    }
}

fn conflict(full: &str, existing: &[u8], new: &[u8]) -> InsertError {
    InsertError::WildcardConflict {
        path: full.to_string(),
        existing: String::from_utf8_lossy(existing).into_owned(),
        new: String::from_utf8_lossy(new).into_owned(),
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Index of the next `/`, or the length when there is none
fn segment_end(path: &[u8]) -> usize {
    path.iter().position(|&c| c == b'/').unwrap_or(path.len())
}

/// Length of the literal lead before the first wildcard
fn static_len(path: &[u8]) -> usize {
    path.iter()
        .position(|&c| c == b':' || c == b'*')
        .unwrap_or(path.len())
}
