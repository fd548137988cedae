use crate::fixed::Fixed64;
use crate::id::{NodeId, NodeTypeId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur during graph operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("node not found: {0:?}")]
    NodeNotFound(NodeId),
    #[error("connection not found: {0:?}")]
    ConnectionNotFound(ConnectionKey),
    #[error("cannot connect node {0:?} to itself")]
    SelfConnection(NodeId),
    #[error("no path from {from:?} to {to:?}")]
    NoPathFound { from: NodeId, to: NodeId },
    #[error("length between {a:?} and {b:?} is not representable")]
    LengthOutOfRange { a: NodeId, b: NodeId },
}

// ---------------------------------------------------------------------------
// Core data structures
// ---------------------------------------------------------------------------

/// A point on the plane the colony is laid out on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Position) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point `t` of the way from `self` to `other`.
    pub fn lerp(self, other: Position, t: f64) -> Position {
        Position {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Per-node data stored in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub position: Position,
    /// The node type this node was created from.
    pub node_type: NodeTypeId,
}

/// Canonical (lower id first) endpoint pair identifying a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionKey {
    pub a: NodeId,
    pub b: NodeId,
}

impl ConnectionKey {
    /// Canonicalize an unordered pair.
    pub fn new(x: NodeId, y: NodeId) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    /// The endpoint opposite `node`. Returns `a` for any node that is not `a`'s
    /// counterpart, so callers must only pass an actual endpoint.
    pub fn opposite(&self, node: NodeId) -> NodeId {
        if self.a == node { self.b } else { self.a }
    }

    pub fn touches(&self, node: NodeId) -> bool {
        self.a == node || self.b == node
    }
}

/// An undirected link between two nodes with its cached length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub key: ConnectionKey,
    pub length: Fixed64,
}

// ---------------------------------------------------------------------------
// ColonyGraph
// ---------------------------------------------------------------------------

/// Nodes, undirected connections, and a memoized shortest-path service.
///
/// Connections are kept in creation order; `index` maps a canonical pair to
/// its slot, and `adjacency` lists every connection touching a node.
#[derive(Debug, Clone, Default)]
pub struct ColonyGraph {
    nodes: BTreeMap<NodeId, NodeData>,
    connections: Vec<Connection>,
    index: HashMap<ConnectionKey, usize>,
    adjacency: BTreeMap<NodeId, Vec<usize>>,
    /// Memoized routes keyed by ordered (start, target). Never invalidated by
    /// `connect`; see `invalidate_path_cache`.
    path_cache: HashMap<(NodeId, NodeId), Vec<NodeId>>,
}

impl ColonyGraph {
    /// Create a new, empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Insert a node under an id chosen by the caller.
    pub(crate) fn insert_node(&mut self, id: NodeId, data: NodeData) {
        self.nodes.insert(id, data);
        self.adjacency.entry(id).or_default();
    }

    /// Connect two nodes. Idempotent per canonical pair: connecting an
    /// already-connected pair returns the existing connection.
    pub fn connect(&mut self, x: NodeId, y: NodeId) -> Result<Connection, GraphError> {
        if x == y {
            return Err(GraphError::SelfConnection(x));
        }
        let px = self.position(x)?;
        let py = self.position(y)?;

        let key = ConnectionKey::new(x, y);
        if let Some(&slot) = self.index.get(&key) {
            return Ok(self.connections[slot]);
        }

        let length = Fixed64::checked_from_num(px.distance(py))
            .ok_or(GraphError::LengthOutOfRange { a: key.a, b: key.b })?;
        let conn = Connection { key, length };
        Ok(self.push_connection(conn))
    }

    /// Re-insert a persisted connection without recomputing its length.
    pub(crate) fn restore_connection(&mut self, conn: Connection) -> Result<(), GraphError> {
        if conn.key.a == conn.key.b {
            return Err(GraphError::SelfConnection(conn.key.a));
        }
        self.node(conn.key.a)?;
        self.node(conn.key.b)?;
        let key = ConnectionKey::new(conn.key.a, conn.key.b);
        if !self.index.contains_key(&key) {
            self.push_connection(Connection { key, ..conn });
        }
        Ok(())
    }

    fn push_connection(&mut self, conn: Connection) -> Connection {
        let slot = self.connections.len();
        self.connections.push(conn);
        self.index.insert(conn.key, slot);
        self.adjacency.entry(conn.key.a).or_default().push(slot);
        self.adjacency.entry(conn.key.b).or_default().push(slot);
        conn
    }

    /// Drop every memoized route. Not called by `connect`: routes cached
    /// before a new connection stay in use until this is called.
    pub fn invalidate_path_cache(&mut self) {
        self.path_cache.clear();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Result<&NodeData, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    pub fn position(&self, id: NodeId) -> Result<Position, GraphError> {
        self.node(id).map(|n| n.position)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Iterate over nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &NodeData)> {
        self.nodes.iter().map(|(&id, data)| (id, data))
    }

    /// Node ids in ascending order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// All connections, in creation order.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Look up the connection between two nodes, in either order.
    pub fn connection(&self, x: NodeId, y: NodeId) -> Result<Connection, GraphError> {
        let key = ConnectionKey::new(x, y);
        self.index
            .get(&key)
            .map(|&slot| self.connections[slot])
            .ok_or(GraphError::ConnectionNotFound(key))
    }

    /// Every connection touching `node`, in creation order.
    pub fn connections_of(&self, node: NodeId) -> Vec<Connection> {
        self.adjacency
            .get(&node)
            .map(|slots| slots.iter().map(|&s| self.connections[s]).collect())
            .unwrap_or_default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn cached_path_count(&self) -> usize {
        self.path_cache.len()
    }

    /// The node nearest to `pos`. Ties go to the lowest id.
    pub fn closest_node(&self, pos: Position) -> Option<NodeId> {
        let mut best: Option<(NodeId, f64)> = None;
        for (&id, data) in &self.nodes {
            let d = pos.distance(data.position);
            match best {
                Some((_, bd)) if d >= bd => {}
                _ => best = Some((id, d)),
            }
        }
        best.map(|(id, _)| id)
    }

    // -----------------------------------------------------------------------
    // Shortest path (Dijkstra)
    // -----------------------------------------------------------------------

    /// Shortest route from `start` to `target`, excluding `start` and ending
    /// with `target`. Empty when `start == target`.
    ///
    /// Results are memoized per ordered pair. A cached route is returned
    /// unchanged even if connections added since would make it suboptimal.
    pub fn shortest_path(
        &mut self,
        start: NodeId,
        target: NodeId,
    ) -> Result<Vec<NodeId>, GraphError> {
        if start == target {
            return Ok(Vec::new());
        }
        if let Some(path) = self.path_cache.get(&(start, target)) {
            return Ok(path.clone());
        }
        self.node(start)?;
        self.node(target)?;

        let path = self.dijkstra(start, target)?;
        self.path_cache.insert((start, target), path.clone());
        Ok(path)
    }

    /// Frontier selection scans for the minimal tentative distance; ties go
    /// to the lowest node id. Quadratic in node count.
    fn dijkstra(&self, start: NodeId, target: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let mut dist: BTreeMap<NodeId, Option<Fixed64>> =
            self.nodes.keys().map(|&id| (id, None)).collect();
        dist.insert(start, Some(Fixed64::ZERO));
        let mut prev: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        let mut frontier: BTreeSet<NodeId> = self.nodes.keys().copied().collect();

        while !frontier.is_empty() {
            let mut current: Option<(NodeId, Fixed64)> = None;
            for &id in &frontier {
                if let Some(d) = dist[&id] {
                    match current {
                        Some((_, cd)) if d >= cd => {}
                        _ => current = Some((id, d)),
                    }
                }
            }
            // Everything left is unreachable.
            let Some((node, node_dist)) = current else {
                break;
            };
            frontier.remove(&node);
            if node == target {
                break;
            }

            for conn in self.connections_of(node) {
                let neighbor = conn.key.opposite(node);
                if !frontier.contains(&neighbor) {
                    continue;
                }
                let alt = node_dist.saturating_add(conn.length);
                let better = match dist[&neighbor] {
                    Some(d) => alt < d,
                    None => true,
                };
                if better {
                    dist.insert(neighbor, Some(alt));
                    prev.insert(neighbor, node);
                }
            }
        }

        let mut path = vec![target];
        let mut node = target;
        while node != start {
            node = *prev
                .get(&node)
                .ok_or(GraphError::NoPathFound { from: start, to: target })?;
            path.push(node);
        }
        path.reverse();
        path.remove(0);
        Ok(path)
    }
}
