//! Cursor over the XML tree
//!
//! Paths are written as `/Root[1]/Child[2]`, where the index counts
//! siblings with the same local name starting from one. The path of an
//! element is stable for a given document and doubles as the basis of
//! structural identity.

use crate::node::Element;

/// A cursor for navigating the XML tree
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    /// Current element
    element: &'a Element,

    /// Path segments to the current element, `name[index]`
    path: Vec<String>,
}

impl<'a> Cursor<'a> {
    /// Create a new cursor at the document root
    pub fn new(root: &'a Element) -> Self {
        Self {
            element: root,
            path: vec![segment(&root.name.local, 1)],
        }
    }

    /// Get the current element
    pub fn element(&self) -> &'a Element {
        self.element
    }

    /// Get the current path, e.g. `/Weakness_Catalog[1]/Weaknesses[1]/Weakness[3]`
    pub fn position_path(&self) -> String {
        let mut path = String::new();
        for part in &self.path {
            path.push('/');
            path.push_str(part);
        }
        path
    }

    /// Cursors over all child elements, in document order
    ///
    /// Siblings are counted by local name, so `{a}Note` and `{b}Note` under
    /// one parent become `Note[1]` and `Note[2]`.
    pub fn children(&self) -> Vec<Cursor<'a>> {
        let mut seen: Vec<(&str, usize)> = Vec::new();
        self.element
            .children()
            .map(|child| {
                let local = child.name.local.as_str();
                let index = match seen.iter_mut().find(|(name, _)| *name == local) {
                    Some((_, count)) => {
                        *count += 1;
                        *count
                    }
                    None => {
                        seen.push((local, 1));
                        1
                    }
                };
                self.descend(child, index)
            })
            .collect()
    }

    fn descend(&self, child: &'a Element, index: usize) -> Cursor<'a> {
        let mut path = self.path.clone();
        path.push(segment(&child.name.local, index));
        Cursor {
            element: child,
            path,
        }
    }
}

fn segment(local: &str, index: usize) -> String {
    format!("{local}[{index}]")
}
