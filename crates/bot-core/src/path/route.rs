use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::BotError;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub struct Waypoint {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Waypoint {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

pub type Route = Vec<Waypoint>;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash, Default)]
pub enum RouteName {
    #[default]
    Primary,
    Secondary,
    Evacuation,
}

impl RouteName {
    pub const ALL: [RouteName; 3] = [RouteName::Primary, RouteName::Secondary, RouteName::Evacuation];

    pub fn as_str(self) -> &'static str {
        match self {
            RouteName::Primary => "Primary",
            RouteName::Secondary => "Secondary",
            RouteName::Evacuation => "Evacuation",
        }
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RouteName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown route {s:?} (expected primary, secondary or evacuation)"))
    }
}

/// All three routes, in the on-disk shape.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteSet {
    #[serde(rename = "Primary", default)]
    pub primary: Route,
    #[serde(rename = "Secondary", default)]
    pub secondary: Route,
    #[serde(rename = "Evacuation", default)]
    pub evacuation: Route,
}

impl RouteSet {
    pub fn get(&self, name: RouteName) -> &Route {
        match name {
            RouteName::Primary => &self.primary,
            RouteName::Secondary => &self.secondary,
            RouteName::Evacuation => &self.evacuation,
        }
    }

    pub fn get_mut(&mut self, name: RouteName) -> &mut Route {
        match name {
            RouteName::Primary => &mut self.primary,
            RouteName::Secondary => &mut self.secondary,
            RouteName::Evacuation => &mut self.evacuation,
        }
    }
}

/// Where the follower gets its routes from. Each call returns a fresh snapshot.
pub trait RouteSource: Send {
    fn load_route(&self, name: RouteName) -> Route;
}

impl RouteSource for RouteSet {
    fn load_route(&self, name: RouteName) -> Route {
        self.get(name).clone()
    }
}

/// JSON route file.
#[derive(Debug, Clone)]
pub struct RouteStore {
    path: PathBuf,
}

impl RouteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads every route. Never fails: a missing file is created empty, and a
    /// broken one is logged and read as empty.
    pub fn load(&self) -> RouteSet {
        match self.try_load() {
            Ok(set) => set,
            Err(err) => {
                let err = BotError::Config(format!("{err:#}"));
                error!("routes.load_failed path={} err={err}", self.path.display());
                RouteSet::default()
            }
        }
    }

    pub fn try_load(&self) -> anyhow::Result<RouteSet> {
        if !self.path.exists() {
            info!("routes.create_default path={}", self.path.display());
            self.save(&RouteSet::default())?;
        }
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("read routes at {}", self.path.display()))?;
        let set: RouteSet = serde_json::from_str(&text)
            .with_context(|| format!("parse routes at {}", self.path.display()))?;
        debug!(
            "routes.loaded primary={} secondary={} evacuation={}",
            set.primary.len(),
            set.secondary.len(),
            set.evacuation.len()
        );
        Ok(set)
    }

    /// Pretty-prints with 4-space indentation.
    pub fn save(&self, set: &RouteSet) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create route dir {}", parent.display()))?;
        }

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        set.serialize(&mut ser).context("encode routes")?;

        fs::write(&self.path, buf)
            .with_context(|| format!("write routes at {}", self.path.display()))?;
        Ok(())
    }

    pub fn add_point(&self, name: RouteName, point: Waypoint) -> anyhow::Result<()> {
        let mut set = self.try_load()?;
        set.get_mut(name).push(point);
        self.save(&set)?;
        info!("routes.added route={name} point={point:?}");
        Ok(())
    }

    /// Removes and returns the point at `index`. Out-of-range indices leave the
    /// file untouched.
    pub fn remove_point(&self, name: RouteName, index: usize) -> anyhow::Result<Waypoint> {
        let mut set = self.try_load()?;
        let route = set.get_mut(name);
        if index >= route.len() {
            anyhow::bail!("invalid index {index} for route {name} (len {})", route.len());
        }
        let removed = route.remove(index);
        self.save(&set)?;
        info!("routes.removed route={name} point={removed:?}");
        Ok(removed)
    }
}

impl RouteSource for RouteStore {
    fn load_route(&self, name: RouteName) -> Route {
        self.load().get(name).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, RouteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RouteStore::new(dir.path().join("configs").join("routes.json"));
        (dir, store)
    }

    #[test]
    fn missing_file_is_created_empty() {
        let (_dir, store) = store();
        assert_eq!(store.load(), RouteSet::default());
        let text = fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("\"Primary\": []"));
        assert!(text.contains("\n    \"Evacuation\""));
    }

    #[test]
    fn saved_route_loads_back_in_order() {
        let (_dir, store) = store();
        let points = vec![
            Waypoint::new(-213, 4, 337),
            Waypoint::new(-213, 4, 300),
            Waypoint::new(-180, 4, 300),
        ];
        for p in &points {
            store.add_point(RouteName::Primary, *p).unwrap();
        }
        assert_eq!(store.load_route(RouteName::Primary), points);
        assert!(store.load_route(RouteName::Secondary).is_empty());
    }

    #[test]
    fn corrupt_file_loads_empty() {
        let (_dir, store) = store();
        store.save(&RouteSet::default()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();
        assert_eq!(store.load(), RouteSet::default());
    }

    #[test]
    fn remove_out_of_range_leaves_file_untouched() {
        let (_dir, store) = store();
        store.add_point(RouteName::Evacuation, Waypoint::new(1, 2, 3)).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        assert!(store.remove_point(RouteName::Evacuation, 5).is_err());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);

        let removed = store.remove_point(RouteName::Evacuation, 0).unwrap();
        assert_eq!(removed, Waypoint::new(1, 2, 3));
        assert!(store.load_route(RouteName::Evacuation).is_empty());
    }

    #[test]
    fn route_names_parse_case_insensitively() {
        assert_eq!("secondary".parse::<RouteName>(), Ok(RouteName::Secondary));
        assert_eq!(" Evacuation ".parse::<RouteName>(), Ok(RouteName::Evacuation));
        assert!("tertiary".parse::<RouteName>().is_err());
    }
}
