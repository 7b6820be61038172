//! Zip-backed [`ArchiveSource`].
//!
//! Zip files store a flat list of names; the tree is rebuilt from the
//! central directory. Directories that are only implied by a file name
//! (`a/b/c.txt` without `a/` and `a/b/` records) are synthesized.

use crate::source::{ArchiveSource, NodeId};
use crate::{ArchiveError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use tracing::debug;
use zip::ZipArchive;

#[derive(Debug)]
struct Node {
    name: String,
    is_directory: bool,
    /// Index in the zip central directory, absent for synthesized directories.
    index: Option<usize>,
    size: u64,
    children: Vec<NodeId>,
}

impl Node {
    fn directory(name: &str) -> Self {
        Self {
            name: name.to_string(),
            is_directory: true,
            index: None,
            size: 0,
            children: Vec::new(),
        }
    }
}

/// A zip archive opened for traversal.
pub struct ZipSource<R: Read + Seek> {
    archive: Option<ZipArchive<R>>,
    nodes: Vec<Node>,
}

impl ZipSource<BufReader<File>> {
    /// Open a zip file from disk.
    pub fn open_file(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl ZipSource<Cursor<Vec<u8>>> {
    /// Open a zip held in memory, such as a subpackage read from its parent.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_reader(Cursor::new(bytes))
    }
}

impl<R: Read + Seek> ZipSource<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let nodes = build_tree(&mut archive)?;
        Ok(Self {
            archive: Some(archive),
            nodes,
        })
    }

    /// Number of nodes, including the root and synthesized directories.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_closed(&self) -> bool {
        self.archive.is_none()
    }
}

fn build_tree<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<Node>> {
    let mut nodes = vec![Node::directory("")];
    let mut lookup: HashMap<(usize, String), usize> = HashMap::new();

    for index in 0..archive.len() {
        let (name, is_directory, size) = {
            let file = archive.by_index_raw(index)?;
            (file.name().to_string(), file.is_dir(), file.size())
        };

        let segments: Vec<&str> = name.split('/').filter(|s| !s.is_empty()).collect();
        let Some((leaf, parents)) = segments.split_last() else {
            continue;
        };

        let mut parent = 0;
        for segment in parents {
            parent = match lookup.get(&(parent, segment.to_string())) {
                Some(&existing) => existing,
                None => attach(&mut nodes, &mut lookup, parent, Node::directory(segment)),
            };
        }

        match lookup.get(&(parent, leaf.to_string())) {
            Some(&existing) if nodes[existing].index.is_none() && is_directory => {
                // An explicit directory record for a directory seen earlier.
                nodes[existing].index = Some(index);
            }
            Some(_) => {
                debug!("Ignoring duplicate zip entry {}", name);
            }
            None => {
                attach(
                    &mut nodes,
                    &mut lookup,
                    parent,
                    Node {
                        name: leaf.to_string(),
                        is_directory,
                        index: Some(index),
                        size: if is_directory { 0 } else { size },
                        children: Vec::new(),
                    },
                );
            }
        }
    }

    Ok(nodes)
}

fn attach(
    nodes: &mut Vec<Node>,
    lookup: &mut HashMap<(usize, String), usize>,
    parent: usize,
    node: Node,
) -> usize {
    let id = nodes.len();
    lookup.insert((parent, node.name.clone()), id);
    nodes[parent].children.push(NodeId::from(id));
    nodes.push(node);
    id
}

impl<R: Read + Seek> ArchiveSource for ZipSource<R> {
    fn root(&self) -> NodeId {
        NodeId::from(0)
    }

    fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.index()].children
    }

    fn name(&self, node: NodeId) -> &str {
        &self.nodes[node.index()].name
    }

    fn is_directory(&self, node: NodeId) -> bool {
        self.nodes[node.index()].is_directory
    }

    fn size(&self, node: NodeId) -> u64 {
        self.nodes[node.index()].size
    }

    fn open_entry(&mut self, node: NodeId) -> Result<Box<dyn Read + '_>> {
        let entry = &self.nodes[node.index()];
        let index = match entry.index {
            Some(index) if !entry.is_directory => index,
            _ => return Err(ArchiveError::NotAFile(entry.name.clone())),
        };

        let archive = self.archive.as_mut().ok_or(ArchiveError::Closed)?;
        let file = archive.by_index(index)?;
        Ok(Box::new(file))
    }

    fn close(&mut self) {
        self.archive = None;
    }
}
