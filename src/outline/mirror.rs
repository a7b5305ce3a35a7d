use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use tracing::{debug, info};

use crate::error::{EjiraError, Result};
use crate::outline::{Heading, HeadingPath, ItemKind, Outline};

/// A heading inside the mirror: the project outline it lives in and its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub project: String,
    pub path: HeadingPath,
}

/// How the user points at a heading: by ID, or by title under a parent item
/// (`PARENT-ID>Title`) for headings that have no ID yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeadingRef {
    Id(String),
    Child { parent: String, title: String },
}

impl std::str::FromStr for HeadingRef {
    type Err = EjiraError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('>') {
            Some((parent, title)) if !parent.trim().is_empty() && !title.trim().is_empty() => {
                Ok(HeadingRef::Child {
                    parent: parent.trim().to_string(),
                    title: title.trim().to_string(),
                })
            }
            Some(_) => Err(EjiraError::Precondition(format!(
                "invalid heading reference: {s}"
            ))),
            None => Ok(HeadingRef::Id(s.trim().to_string())),
        }
    }
}

impl std::fmt::Display for HeadingRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeadingRef::Id(id) => f.write_str(id),
            HeadingRef::Child { parent, title } => write!(f, "{parent}>{title}"),
        }
    }
}

/// Directory of project outlines, `<dir>/<PROJECT>.yaml`.
pub struct Mirror {
    dir: PathBuf,
    outlines: BTreeMap<String, Outline>,
}

impl Mirror {
    pub fn load(dir: &Path) -> Result<Self> {
        let mut outlines = BTreeMap::new();

        if dir.exists() {
            let mut entries: Vec<_> = std::fs::read_dir(dir)?.filter_map(|e| e.ok()).collect();
            entries.sort_by_key(|e| e.file_name());

            for entry in entries {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                    continue;
                }
                let Some(project) = path.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                let outline: Outline = serde_yaml::from_str(&read_locked(&path)?)?;
                outlines.insert(project.to_string(), outline);
            }
        }

        debug!("loaded {} outline(s) from {}", outlines.len(), dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            outlines,
        })
    }

    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        for (project, outline) in &self.outlines {
            let path = self.dir.join(format!("{project}.yaml"));
            write_locked(&path, &serde_yaml::to_string(outline)?)?;
        }
        info!("saved mirror to {}", self.dir.display());
        Ok(())
    }

    pub fn projects(&self) -> impl Iterator<Item = &str> {
        self.outlines.keys().map(String::as_str)
    }

    pub fn outline(&self, project: &str) -> Option<&Outline> {
        self.outlines.get(project)
    }

    pub fn outline_mut(&mut self, project: &str) -> &mut Outline {
        self.outlines.entry(project.to_string()).or_default()
    }

    pub fn locate(&self, id: &str) -> Option<Location> {
        self.outlines.iter().find_map(|(project, outline)| {
            outline.find(id).map(|path| Location {
                project: project.clone(),
                path,
            })
        })
    }

    pub fn resolve(&self, target: &HeadingRef) -> Result<Location> {
        match target {
            HeadingRef::Id(id) => self
                .locate(id)
                .ok_or_else(|| EjiraError::NotFound(id.clone())),
            HeadingRef::Child { parent, title } => {
                let parent_loc = self
                    .locate(parent)
                    .ok_or_else(|| EjiraError::NotFound(parent.clone()))?;
                let path = self
                    .outline(&parent_loc.project)
                    .and_then(|o| o.child_by_title(Some(&parent_loc.path), title))
                    .ok_or_else(|| EjiraError::NotFound(target.to_string()))?;
                Ok(Location {
                    project: parent_loc.project,
                    path,
                })
            }
        }
    }

    pub fn heading(&self, loc: &Location) -> Option<&Heading> {
        self.outlines.get(&loc.project)?.get(&loc.path)
    }

    pub fn heading_mut(&mut self, loc: &Location) -> Option<&mut Heading> {
        self.outlines.get_mut(&loc.project)?.get_mut(&loc.path)
    }

    pub fn parent(&self, loc: &Location) -> Option<Location> {
        loc.path.parent().map(|path| Location {
            project: loc.project.clone(),
            path,
        })
    }

    /// Nearest strict ancestor of `loc` that is an item of `kind`.
    pub fn enclosing(&self, loc: &Location, kind: ItemKind) -> Option<Location> {
        let mut current = self.parent(loc);
        while let Some(candidate) = current {
            if self.heading(&candidate).and_then(Heading::kind) == Some(kind) {
                return Some(candidate);
            }
            current = self.parent(&candidate);
        }
        None
    }

    pub fn insert_top(&mut self, project: &str, heading: Heading) -> Location {
        let outline = self.outline_mut(project);
        outline.headings.push(heading);
        Location {
            project: project.to_string(),
            path: HeadingPath::root(outline.headings.len() - 1),
        }
    }

    pub fn insert(&mut self, parent: &Location, heading: Heading) -> Result<Location> {
        let path = self
            .outlines
            .get_mut(&parent.project)
            .and_then(|o| o.insert_child(Some(&parent.path), heading))
            .ok_or_else(|| EjiraError::Mirror(format!("no heading at {parent:?}")))?;
        Ok(Location {
            project: parent.project.clone(),
            path,
        })
    }

    pub fn remove(&mut self, loc: &Location) -> Option<Heading> {
        self.outlines.get_mut(&loc.project)?.remove(&loc.path)
    }

    /// Moves the subtree at `from` to be the last child of `to_parent`,
    /// possibly across project outlines.
    pub fn move_heading(&mut self, from: &Location, to_parent: &Location) -> Result<Location> {
        if from.project == to_parent.project {
            let path = self
                .outlines
                .get_mut(&from.project)
                .and_then(|o| o.move_to(&from.path, Some(&to_parent.path)))
                .ok_or_else(|| {
                    EjiraError::Mirror(format!("cannot move {from:?} under {to_parent:?}"))
                })?;
            return Ok(Location {
                project: from.project.clone(),
                path,
            });
        }

        if self.heading(to_parent).is_none() {
            return Err(EjiraError::Mirror(format!("no heading at {to_parent:?}")));
        }
        let heading = self
            .remove(from)
            .ok_or_else(|| EjiraError::Mirror(format!("no heading at {from:?}")))?;
        self.insert(to_parent, heading)
    }
}

fn read_locked(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    FileExt::lock_shared(&file)?;
    let mut content = String::new();
    let read = file.read_to_string(&mut content);
    FileExt::unlock(&file)?;
    read?;
    Ok(content)
}

fn write_locked(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    FileExt::lock_exclusive(&file)?;
    let written = file
        .set_len(0)
        .and_then(|_| file.write_all(content.as_bytes()))
        .and_then(|_| file.flush());
    FileExt::unlock(&file)?;
    written?;
    Ok(())
}
