pub mod heading;
pub mod mirror;

use serde::{Deserialize, Serialize};

pub use heading::{CommentId, Heading, ItemKind, ItemStatus, COMMENTS_HEADING};
pub use mirror::{HeadingRef, Location, Mirror};

/// Position of a heading in an [`Outline`]: child indices from the root.
/// The length of the path is the outline level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HeadingPath(pub Vec<usize>);

impl HeadingPath {
  pub fn root(index: usize) -> Self {
    Self(vec![index])
  }

  pub fn level(&self) -> usize {
    self.0.len()
  }

  pub fn parent(&self) -> Option<HeadingPath> {
    if self.0.len() <= 1 {
      return None;
    }
    Some(HeadingPath(self.0[..self.0.len() - 1].to_vec()))
  }

  pub fn child(&self, index: usize) -> HeadingPath {
    let mut path = self.0.clone();
    path.push(index);
    HeadingPath(path)
  }

  pub fn is_ancestor_of(&self, other: &HeadingPath) -> bool {
    other.0.len() > self.0.len() && other.0.starts_with(&self.0)
  }

  /// Where `self` ends up once the heading at `removed` has been taken out.
  fn after_removal(&self, removed: &HeadingPath) -> HeadingPath {
    let depth = removed.0.len() - 1;
    let mut path = self.0.clone();
    if path.len() > depth && path[..depth] == removed.0[..depth] && path[depth] > removed.0[depth] {
      path[depth] -= 1;
    }
    HeadingPath(path)
  }
}

/// One document of headings. Each project is mirrored in its own outline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Outline {
  #[serde(default)]
  pub headings: Vec<Heading>,
}

impl Outline {
  pub fn get(&self, path: &HeadingPath) -> Option<&Heading> {
    let (first, rest) = path.0.split_first()?;
    let mut node = self.headings.get(*first)?;
    for &i in rest {
      node = node.children.get(i)?;
    }
    Some(node)
  }

  pub fn get_mut(&mut self, path: &HeadingPath) -> Option<&mut Heading> {
    let (first, rest) = path.0.split_first()?;
    let mut node = self.headings.get_mut(*first)?;
    for &i in rest {
      node = node.children.get_mut(i)?;
    }
    Some(node)
  }

  fn siblings_mut(&mut self, parent: Option<&HeadingPath>) -> Option<&mut Vec<Heading>> {
    match parent {
      None => Some(&mut self.headings),
      Some(p) => self.get_mut(p).map(|h| &mut h.children),
    }
  }

  /// Depth-first walk, parents before children.
  pub fn walk(&self) -> Vec<(HeadingPath, &Heading)> {
    fn visit<'a>(path: HeadingPath, h: &'a Heading, out: &mut Vec<(HeadingPath, &'a Heading)>) {
      out.push((path.clone(), h));
      for (i, child) in h.children.iter().enumerate() {
        visit(path.child(i), child, out);
      }
    }

    let mut out = Vec::new();
    for (i, h) in self.headings.iter().enumerate() {
      visit(HeadingPath::root(i), h, &mut out);
    }
    out
  }

  pub fn find(&self, id: &str) -> Option<HeadingPath> {
    self
      .walk()
      .into_iter()
      .find(|(_, h)| h.id() == Some(id))
      .map(|(path, _)| path)
  }

  pub fn child_by_title(&self, parent: Option<&HeadingPath>, title: &str) -> Option<HeadingPath> {
    let children = match parent {
      None => &self.headings,
      Some(p) => &self.get(p)?.children,
    };
    let index = children.iter().position(|h| h.title == title)?;
    Some(match parent {
      None => HeadingPath::root(index),
      Some(p) => p.child(index),
    })
  }

  pub fn first_child(&self, parent: &HeadingPath) -> Option<HeadingPath> {
    let heading = self.get(parent)?;
    if heading.children.is_empty() {
      None
    } else {
      Some(parent.child(0))
    }
  }

  pub fn next_sibling(&self, path: &HeadingPath) -> Option<HeadingPath> {
    let (last, _) = path.0.split_last()?;
    let count = match path.parent() {
      None => self.headings.len(),
      Some(p) => self.get(&p)?.children.len(),
    };
    if last + 1 < count {
      let mut next = path.0.clone();
      *next.last_mut()? += 1;
      Some(HeadingPath(next))
    } else {
      None
    }
  }

  /// Appends `heading` as the last child of `parent` (or as a top-level
  /// heading) and returns its path.
  pub fn insert_child(&mut self, parent: Option<&HeadingPath>, heading: Heading) -> Option<HeadingPath> {
    let siblings = self.siblings_mut(parent)?;
    siblings.push(heading);
    let index = siblings.len() - 1;
    Some(match parent {
      None => HeadingPath::root(index),
      Some(p) => p.child(index),
    })
  }

  pub fn remove(&mut self, path: &HeadingPath) -> Option<Heading> {
    let (last, _) = path.0.split_last()?;
    let parent = path.parent();
    let siblings = self.siblings_mut(parent.as_ref())?;
    if *last < siblings.len() {
      Some(siblings.remove(*last))
    } else {
      None
    }
  }

  /// Moves the subtree at `path` under `new_parent`, returning its new path.
  /// Returns `None` when the target is the heading itself or lies inside it.
  pub fn move_to(&mut self, path: &HeadingPath, new_parent: Option<&HeadingPath>) -> Option<HeadingPath> {
    if let Some(target) = new_parent {
      if target == path || path.is_ancestor_of(target) {
        return None;
      }
      self.get(target)?;
    }
    let heading = self.remove(path)?;
    let target = new_parent.map(|t| t.after_removal(path));
    self.insert_child(target.as_ref(), heading)
  }
}
