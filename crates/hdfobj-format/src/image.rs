//! In-memory object tree of a whole file.
//!
//! A [`FileImage`] is an arena of [`Node`]s: groups hold named links to
//! other nodes, datasets hold their datatype, dataspace and raw bytes, and
//! both carry attributes. [`FileImage::from_bytes`] loads every object
//! reachable from the root; [`FileImage::to_bytes`] writes the reachable
//! objects back children-first, so each link's target address is known by
//! the time its group header is serialized.
//!
//! Unlinking leaves a node in the arena, since open identifiers may still
//! refer to it. [`FileImage::reclaim`] frees the slots of nodes nothing can
//! reach any more.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::attribute::AttributeMessage;
use crate::data_layout::DataLayout;
use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;
use crate::link_message::LinkMessage;
use crate::message_type::MessageType;
use crate::object_header::{ObjectHeader, ObjectKind};
use crate::signature::find_signature;
use crate::superblock::{Superblock, SUPERBLOCK_SIZE, SUPERBLOCK_VERSION};

/// Index of a node inside one [`FileImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// Payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Group {
        links: BTreeMap<String, NodeId>,
    },
    Dataset {
        datatype: Datatype,
        dataspace: Dataspace,
        /// Raw element bytes in `datatype`'s byte order, row-major.
        data: Vec<u8>,
    },
}

/// One object (group or dataset) and its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub data: NodeData,
    /// Attributes in creation order; names are unique.
    pub attributes: Vec<AttributeMessage>,
}

impl Node {
    pub fn group() -> Self {
        Self {
            data: NodeData::Group {
                links: BTreeMap::new(),
            },
            attributes: Vec::new(),
        }
    }

    /// A dataset whose elements are all zero bytes.
    pub fn dataset(datatype: Datatype, dataspace: Dataspace) -> Result<Self, FormatError> {
        let data = dataspace.zeroed_data(datatype.size())?;
        Ok(Self::dataset_with(datatype, dataspace, data))
    }

    /// A dataset holding `data`, which must be `dataspace`'s elements of
    /// `datatype`.
    pub fn dataset_with(datatype: Datatype, dataspace: Dataspace, data: Vec<u8>) -> Self {
        Self {
            data: NodeData::Dataset {
                datatype,
                dataspace,
                data,
            },
            attributes: Vec::new(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self.data {
            NodeData::Group { .. } => ObjectKind::Group,
            NodeData::Dataset { .. } => ObjectKind::Dataset,
        }
    }

    /// Links of a group; `None` for datasets.
    pub fn links(&self) -> Option<&BTreeMap<String, NodeId>> {
        match &self.data {
            NodeData::Group { links } => Some(links),
            NodeData::Dataset { .. } => None,
        }
    }

    pub fn links_mut(&mut self) -> Option<&mut BTreeMap<String, NodeId>> {
        match &mut self.data {
            NodeData::Group { links } => Some(links),
            NodeData::Dataset { .. } => None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeMessage> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn attribute_mut(&mut self, name: &str) -> Option<&mut AttributeMessage> {
        self.attributes.iter_mut().find(|a| a.name == name)
    }
}

/// Outcome of [`FileImage::reclaim`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reclaimed {
    /// Nodes whose slots were freed.
    pub released: Vec<NodeId>,
    /// Some pinned node is still unreachable from the root.
    pub pinned_detached: bool,
}

/// The object tree of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileImage {
    nodes: Vec<Node>,
    root: NodeId,
    /// Reclaimed slots, reused by `add_node`.
    free: Vec<NodeId>,
}

impl Default for FileImage {
    fn default() -> Self {
        Self::new()
    }
}

impl FileImage {
    /// An empty file: just a root group.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::group()],
            root: NodeId(0),
            free: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Panics if `id` did not come from this image.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// Panics if `id` did not come from this image.
    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Add an unlinked node to the arena.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        if let Some(id) = self.free.pop() {
            self.nodes[id.0] = node;
            return id;
        }
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    /// Number of nodes currently holding an object.
    pub fn live_nodes(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Free every node reachable neither from the root nor from `pinned`.
    ///
    /// Freed ids must not be used again; their slots go to later
    /// [`add_node`](Self::add_node) calls.
    pub fn reclaim(&mut self, pinned: impl IntoIterator<Item = NodeId>) -> Reclaimed {
        let mut marked = vec![false; self.nodes.len()];
        for id in &self.free {
            marked[id.0] = true;
        }
        self.mark(self.root, &mut marked);
        let mut pinned_detached = false;
        for id in pinned {
            if !marked[id.0] {
                pinned_detached = true;
                self.mark(id, &mut marked);
            }
        }

        let released: Vec<NodeId> = (0..self.nodes.len())
            .filter(|&i| !marked[i])
            .map(NodeId)
            .collect();
        for id in &released {
            self.nodes[id.0] = Node::group();
        }
        self.free.extend(&released);
        Reclaimed {
            released,
            pinned_detached,
        }
    }

    fn mark(&self, from: NodeId, marked: &mut [bool]) {
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut marked[id.0], true) {
                continue;
            }
            if let Some(links) = self.node(id).links() {
                stack.extend(links.values().copied());
            }
        }
    }

    /// Resolve one link name under `parent`.
    pub fn lookup(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node(parent).links()?.get(name).copied()
    }

    /// Link `child` under `parent` as `name`.
    ///
    /// Returns `false` without changing anything if `parent` is not a group,
    /// `name` is taken, or the link would make `parent` reachable from
    /// itself.
    pub fn link(&mut self, parent: NodeId, name: &str, child: NodeId) -> bool {
        if self.reaches(child, parent) {
            return false;
        }
        match self.node_mut(parent).links_mut() {
            Some(links) if !links.contains_key(name) => {
                links.insert(name.to_string(), child);
                true
            }
            _ => false,
        }
    }

    /// Remove the link `name` from `parent`. The target node stays in the
    /// arena until [`reclaim`](Self::reclaim) frees it, but is no longer
    /// written once unreachable.
    pub fn unlink(&mut self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.node_mut(parent).links_mut()?.remove(name)
    }

    fn reaches(&self, from: NodeId, target: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if seen.insert(id) {
                if let Some(links) = self.node(id).links() {
                    stack.extend(links.values().copied());
                }
            }
        }
        false
    }

    /// Serialize every node reachable from the root.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; SUPERBLOCK_SIZE];
        let mut addresses = HashMap::new();
        let root_group_address = self.write_node(self.root, &mut buf, &mut addresses);
        let superblock = Superblock {
            version: SUPERBLOCK_VERSION,
            root_group_address,
            eof_address: buf.len() as u64,
        };
        buf[..SUPERBLOCK_SIZE].copy_from_slice(&superblock.serialize());
        buf
    }

    fn write_node(&self, id: NodeId, buf: &mut Vec<u8>, addresses: &mut HashMap<NodeId, u64>) -> u64 {
        if let Some(&address) = addresses.get(&id) {
            return address;
        }
        let node = self.node(id);
        let mut header = match &node.data {
            NodeData::Group { links } => {
                let mut hdr = ObjectHeader::new(ObjectKind::Group);
                for (name, &child) in links {
                    let address = self.write_node(child, buf, addresses);
                    let link = LinkMessage {
                        name: name.clone(),
                        address,
                    };
                    hdr.add_message(MessageType::Link, link.serialize());
                }
                hdr
            }
            NodeData::Dataset {
                datatype,
                dataspace,
                data,
            } => {
                let layout = DataLayout {
                    address: buf.len() as u64,
                    size: data.len() as u64,
                };
                buf.extend_from_slice(data);
                let mut hdr = ObjectHeader::new(ObjectKind::Dataset);
                hdr.add_message(MessageType::Dataspace, dataspace.serialize());
                hdr.add_message(MessageType::Datatype, datatype.serialize());
                hdr.add_message(MessageType::DataLayout, layout.serialize());
                hdr
            }
        };
        for attr in &node.attributes {
            header.add_message(MessageType::Attribute, attr.serialize());
        }

        let address = buf.len() as u64;
        buf.extend_from_slice(&header.serialize());
        addresses.insert(id, address);
        address
    }

    /// Parse a whole file.
    pub fn from_bytes(data: &[u8]) -> Result<Self, FormatError> {
        let base = find_signature(data)?;
        let superblock = Superblock::parse(data, base)?;
        let end = base as u64 + superblock.eof_address;
        if end > data.len() as u64 {
            return Err(FormatError::UnexpectedEof {
                expected: end as usize,
                available: data.len(),
            });
        }

        let mut loader = Loader {
            data,
            base,
            eof: superblock.eof_address,
            nodes: Vec::new(),
            by_address: HashMap::new(),
            in_progress: HashSet::new(),
        };
        let root = loader.load(superblock.root_group_address)?;
        if loader.nodes[root.0].kind() != ObjectKind::Group {
            return Err(FormatError::InvalidObjectKind(1));
        }
        Ok(Self {
            nodes: loader.nodes,
            root,
            free: Vec::new(),
        })
    }
}

struct Loader<'a> {
    data: &'a [u8],
    base: usize,
    eof: u64,
    nodes: Vec<Node>,
    by_address: HashMap<u64, NodeId>,
    in_progress: HashSet<u64>,
}

impl Loader<'_> {
    fn check_range(&self, address: u64, size: u64) -> Result<(), FormatError> {
        if address.checked_add(size).map_or(true, |end| end > self.eof) {
            return Err(FormatError::AddressOutOfBounds {
                address,
                eof: self.eof,
            });
        }
        Ok(())
    }

    fn load(&mut self, address: u64) -> Result<NodeId, FormatError> {
        if let Some(&id) = self.by_address.get(&address) {
            return Ok(id);
        }
        if !self.in_progress.insert(address) {
            return Err(FormatError::LinkCycle(address));
        }
        self.check_range(address, 1)?;

        let header = ObjectHeader::parse(self.data, self.base + address as usize, address)?;
        let attributes = header
            .messages_of(MessageType::Attribute)
            .map(|m| AttributeMessage::parse(&m.data))
            .collect::<Result<Vec<_>, _>>()?;

        let data = match header.kind {
            ObjectKind::Group => {
                let mut links = BTreeMap::new();
                for msg in header.messages_of(MessageType::Link) {
                    let link = LinkMessage::parse(&msg.data)?;
                    let child = self.load(link.address)?;
                    links.insert(link.name, child);
                }
                NodeData::Group { links }
            }
            ObjectKind::Dataset => {
                let dataspace = Dataspace::parse(&header.require(MessageType::Dataspace)?.data)?;
                let (datatype, _) = Datatype::parse(&header.require(MessageType::Datatype)?.data)?;
                let layout = DataLayout::parse(&header.require(MessageType::DataLayout)?.data)?;

                let expected = dataspace.data_size(datatype.size())? as u64;
                if layout.size != expected {
                    return Err(FormatError::DataSizeMismatch {
                        expected,
                        actual: layout.size,
                    });
                }
                self.check_range(layout.address, layout.size)?;
                let start = self.base + layout.address as usize;
                NodeData::Dataset {
                    datatype,
                    dataspace,
                    data: self.data[start..start + layout.size as usize].to_vec(),
                }
            }
        };

        self.in_progress.remove(&address);
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { data, attributes });
        self.by_address.insert(address, id);
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset_node(values: &[i32]) -> Node {
        Node::dataset_with(
            Datatype::integer(4, true),
            Dataspace::simple(&[values.len() as u64]),
            values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        )
    }

    #[test]
    fn empty_image_round_trip() {
        let image = FileImage::new();
        let bytes = image.to_bytes();
        assert_eq!(&bytes[..4], &[0x89, b'H', b'O', b'B']);
        let loaded = FileImage::from_bytes(&bytes).unwrap();
        assert!(loaded.node(loaded.root()).links().unwrap().is_empty());
    }

    #[test]
    fn nested_groups_and_datasets() {
        let mut image = FileImage::new();
        let root = image.root();
        let grp = image.add_node(Node::group());
        assert!(image.link(root, "sensors", grp));
        let ds = image.add_node(dataset_node(&[1, 2, 3]));
        assert!(image.link(grp, "temperature", ds));
        image.node_mut(grp).attributes.push(AttributeMessage {
            name: "count".into(),
            datatype: Datatype::integer(4, true),
            dataspace: Dataspace::scalar(),
            data: 3i32.to_le_bytes().to_vec(),
        });

        let loaded = FileImage::from_bytes(&image.to_bytes()).unwrap();
        let grp = loaded.lookup(loaded.root(), "sensors").unwrap();
        assert_eq!(loaded.node(grp).kind(), ObjectKind::Group);
        let attr = loaded.node(grp).attribute("count").unwrap();
        assert_eq!(attr.data, 3i32.to_le_bytes().to_vec());

        let ds = loaded.lookup(grp, "temperature").unwrap();
        match &loaded.node(ds).data {
            NodeData::Dataset {
                datatype,
                dataspace,
                data,
            } => {
                assert_eq!(*datatype, Datatype::integer(4, true));
                assert_eq!(dataspace.dimensions, vec![3]);
                assert_eq!(data.len(), 12);
                assert_eq!(&data[4..8], &2i32.to_le_bytes());
            }
            NodeData::Group { .. } => panic!("expected dataset"),
        }
    }

    #[test]
    fn link_rejects_duplicate_and_non_group_parent() {
        let mut image = FileImage::new();
        let root = image.root();
        let ds = image.add_node(dataset_node(&[1]));
        assert!(image.link(root, "d", ds));
        let other = image.add_node(Node::group());
        assert!(!image.link(root, "d", other));
        assert!(!image.link(ds, "x", other));
    }

    #[test]
    fn link_rejects_cycle() {
        let mut image = FileImage::new();
        let root = image.root();
        let a = image.add_node(Node::group());
        assert!(image.link(root, "a", a));
        assert!(!image.link(a, "up", root));
        assert!(!image.link(a, "self", a));
    }

    #[test]
    fn hard_link_loads_as_one_node() {
        let mut image = FileImage::new();
        let root = image.root();
        let a = image.add_node(Node::group());
        let b = image.add_node(Node::group());
        let shared = image.add_node(dataset_node(&[7]));
        assert!(image.link(root, "a", a));
        assert!(image.link(root, "b", b));
        assert!(image.link(a, "data", shared));
        assert!(image.link(b, "data", shared));

        let loaded = FileImage::from_bytes(&image.to_bytes()).unwrap();
        let a = loaded.lookup(loaded.root(), "a").unwrap();
        let b = loaded.lookup(loaded.root(), "b").unwrap();
        assert_eq!(loaded.lookup(a, "data"), loaded.lookup(b, "data"));
    }

    #[test]
    fn unlinked_nodes_are_not_written() {
        let mut image = FileImage::new();
        let root = image.root();
        let ds = image.add_node(dataset_node(&[1; 64]));
        assert!(image.link(root, "big", ds));
        let with_data = image.to_bytes().len();
        assert_eq!(image.unlink(root, "big"), Some(ds));
        let without = image.to_bytes().len();
        assert!(without + 256 <= with_data);
        let loaded = FileImage::from_bytes(&image.to_bytes()).unwrap();
        assert!(loaded.lookup(loaded.root(), "big").is_none());
    }

    #[test]
    fn zeroed_dataset_checks_its_size() {
        let node = Node::dataset(Datatype::float(8), Dataspace::simple(&[2, 2])).unwrap();
        assert!(matches!(&node.data, NodeData::Dataset { data, .. } if data == &[0u8; 32]));
        assert_eq!(
            Node::dataset(Datatype::integer(8, false), Dataspace::simple(&[1 << 61])),
            Err(FormatError::ExtentTooLarge(vec![1 << 61]))
        );
    }

    #[test]
    fn reclaim_frees_unreachable_nodes() {
        let mut image = FileImage::new();
        let root = image.root();
        let grp = image.add_node(Node::group());
        let inner = image.add_node(dataset_node(&[1, 2]));
        let kept = image.add_node(dataset_node(&[3]));
        assert!(image.link(root, "grp", grp));
        assert!(image.link(grp, "inner", inner));
        assert!(image.link(root, "kept", kept));
        assert_eq!(image.live_nodes(), 4);

        image.unlink(root, "grp");
        let outcome = image.reclaim([]);
        assert_eq!(outcome.released, vec![grp, inner]);
        assert!(!outcome.pinned_detached);
        assert_eq!(image.live_nodes(), 2);

        let reused = image.add_node(dataset_node(&[9]));
        assert!(reused == grp || reused == inner);
        assert_eq!(image.live_nodes(), 3);
        assert!(image.reclaim([]).released.contains(&reused));
    }

    #[test]
    fn pinned_nodes_survive_reclaim() {
        let mut image = FileImage::new();
        let root = image.root();
        let grp = image.add_node(Node::group());
        let inner = image.add_node(dataset_node(&[1]));
        assert!(image.link(root, "grp", grp));
        assert!(image.link(grp, "inner", inner));
        image.unlink(root, "grp");

        let outcome = image.reclaim([grp]);
        assert!(outcome.released.is_empty());
        assert!(outcome.pinned_detached);
        assert_eq!(image.lookup(grp, "inner"), Some(inner));

        let outcome = image.reclaim([]);
        assert_eq!(outcome.released.len(), 2);
        assert!(!outcome.pinned_detached);
    }

    #[test]
    fn oversized_extent_in_file_is_rejected() {
        let space = Dataspace::simple(&[1 << 40, 1 << 40]);
        let layout = DataLayout {
            address: SUPERBLOCK_SIZE as u64,
            size: 0,
        };
        let mut dset = ObjectHeader::new(ObjectKind::Dataset);
        dset.add_message(MessageType::Dataspace, space.serialize());
        dset.add_message(MessageType::Datatype, Datatype::integer(8, true).serialize());
        dset.add_message(MessageType::DataLayout, layout.serialize());
        let dset = dset.serialize();

        let mut root = ObjectHeader::new(ObjectKind::Group);
        let link = LinkMessage {
            name: "huge".into(),
            address: SUPERBLOCK_SIZE as u64,
        };
        root.add_message(MessageType::Link, link.serialize());
        let root = root.serialize();

        let superblock = Superblock {
            version: SUPERBLOCK_VERSION,
            root_group_address: (SUPERBLOCK_SIZE + dset.len()) as u64,
            eof_address: (SUPERBLOCK_SIZE + dset.len() + root.len()) as u64,
        };
        let mut data = superblock.serialize();
        data.extend_from_slice(&dset);
        data.extend_from_slice(&root);
        assert_eq!(
            FileImage::from_bytes(&data),
            Err(FormatError::ExtentTooLarge(vec![1 << 40, 1 << 40]))
        );
    }

    #[test]
    fn user_block_prefix() {
        let mut data = vec![0u8; 512];
        data.extend_from_slice(&FileImage::new().to_bytes());
        assert!(FileImage::from_bytes(&data).is_ok());
    }

    #[test]
    fn cycle_in_file_is_rejected() {
        let mut hdr = ObjectHeader::new(ObjectKind::Group);
        let link = LinkMessage {
            name: "loop".into(),
            address: SUPERBLOCK_SIZE as u64,
        };
        hdr.add_message(MessageType::Link, link.serialize());
        let header = hdr.serialize();
        let superblock = Superblock {
            version: SUPERBLOCK_VERSION,
            root_group_address: SUPERBLOCK_SIZE as u64,
            eof_address: (SUPERBLOCK_SIZE + header.len()) as u64,
        };
        let mut data = superblock.serialize();
        data.extend_from_slice(&header);
        assert_eq!(
            FileImage::from_bytes(&data),
            Err(FormatError::LinkCycle(SUPERBLOCK_SIZE as u64))
        );
    }

    #[test]
    fn truncated_file() {
        let bytes = FileImage::new().to_bytes();
        assert!(matches!(
            FileImage::from_bytes(&bytes[..bytes.len() - 4]),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn not_a_container() {
        assert_eq!(
            FileImage::from_bytes(b"plain text, not a container"),
            Err(FormatError::SignatureNotFound)
        );
    }
}
