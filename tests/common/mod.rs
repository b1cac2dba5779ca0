//! Throwaway GameMaker projects for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

pub struct TestProject {
    dir: TempDir,
    resources: Vec<(String, String)>,
    room_order: Vec<String>,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            resources: Vec::new(),
            room_order: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Registers `<dir>/<name>/<name>.yy` in the manifest and writes its descriptor.
    pub fn asset(&mut self, dir: &str, name: &str, descriptor: &str) -> &mut Self {
        let path = format!("{dir}/{name}/{name}.yy");
        self.write(&path, descriptor);
        if dir == "rooms" {
            self.room_order.push(name.to_string());
        }
        self.resources.push((name.to_string(), path));
        self.write_manifest();
        self
    }

    pub fn object(&mut self, name: &str, parent: Option<&str>) -> &mut Self {
        let parent = match parent {
            Some(p) => format!(r#"{{"name":"{p}","path":"objects/{p}/{p}.yy"}}"#),
            None => "null".to_string(),
        };
        let descriptor = format!(
            r#"{{"resourceType":"GMObject","name":"{name}","parentObjectId":{parent},"spriteId":null,"eventList":[]}}"#
        );
        self.asset("objects", name, &descriptor)
    }

    pub fn script(&mut self, name: &str, source: &str) -> &mut Self {
        self.asset(
            "scripts",
            name,
            &format!(r#"{{"resourceType":"GMScript","name":"{name}"}}"#),
        );
        self.write(&format!("scripts/{name}/{name}.gml"), source)
    }

    /// Writes a file relative to the project root.
    pub fn write(&mut self, relative: &str, content: &str) -> &mut Self {
        let path = self.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
        self
    }

    /// Deletes an asset directory and its manifest entry.
    pub fn delete_asset(&mut self, name: &str) -> &mut Self {
        if let Some(pos) = self.resources.iter().position(|(n, _)| n == name) {
            let (_, path) = self.resources.remove(pos);
            let dir = self.path().join(&path);
            if let Some(parent) = dir.parent() {
                fs::remove_dir_all(parent).unwrap();
            }
        }
        self.room_order.retain(|r| r != name);
        self.write_manifest();
        self
    }

    pub fn index_file(&self) -> PathBuf {
        self.path().join(".gml-indexer").join("symbols.json")
    }

    fn write_manifest(&self) {
        let resources = self
            .resources
            .iter()
            .map(|(name, path)| format!(r#"{{"id":{{"name":"{name}","path":"{path}"}},}}"#))
            .collect::<Vec<_>>()
            .join(",");
        let rooms = self
            .room_order
            .iter()
            .map(|name| format!(r#"{{"roomId":{{"name":"{name}","path":"rooms/{name}/{name}.yy"}}}}"#))
            .collect::<Vec<_>>()
            .join(",");
        let manifest = format!(
            r#"{{"resourceType":"GMProject","name":"TestGame","resources":[{resources}],"RoomOrderNodes":[{rooms}],"MetaData":{{"IDEVersion":"2024.2.0.163"}},}}"#
        );
        fs::write(self.path().join("TestGame.yyp"), manifest).unwrap();
    }
}
