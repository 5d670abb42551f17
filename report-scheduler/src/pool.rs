//! Fixed-capacity arena of subscription nodes
//!
//! Slots never move. Removing a node vacates its slot and bumps the slot's
//! generation, so a handle kept by a torn-down subscription can never reach a node
//! that later reuses the slot.

use std::fmt;

use crate::error::{Result, SchedulerError};
use crate::node::SubscriptionNode;

/// Stable identity of a node in the pool.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct NodeHandle {
    index: u32,
    generation: u32,
}

impl NodeHandle {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for NodeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    node: Option<SubscriptionNode>,
}

/// Arena of subscription nodes with a fixed capacity.
#[derive(Debug)]
pub struct NodePool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    capacity: usize,
    len: usize,
}

impl NodePool {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            capacity,
            len: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a node, reusing a vacated slot before growing.
    pub fn insert(&mut self, node: SubscriptionNode) -> Result<NodeHandle> {
        let index = match self.free.pop() {
            Some(index) => index,
            None if self.slots.len() < self.capacity => {
                self.slots.push(Slot {
                    generation: 0,
                    node: None,
                });
                (self.slots.len() - 1) as u32
            }
            None => {
                return Err(SchedulerError::PoolExhausted {
                    capacity: self.capacity,
                })
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.node = Some(node);
        self.len += 1;
        Ok(NodeHandle {
            index,
            generation: slot.generation,
        })
    }

    /// Vacate the slot behind `handle`.
    pub fn remove(&mut self, handle: NodeHandle) -> Option<SubscriptionNode> {
        let slot = self.slot_mut(handle)?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.len -= 1;
        Some(node)
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&SubscriptionNode> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)?
            .node
            .as_ref()
    }

    pub fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut SubscriptionNode> {
        self.slot_mut(handle)?.node.as_mut()
    }

    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeHandle, &SubscriptionNode)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.node.as_ref().map(|node| {
                (
                    NodeHandle {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    node,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (NodeHandle, &mut SubscriptionNode)> + '_ {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.node.as_mut().map(|node| {
                (
                    NodeHandle {
                        index: index as u32,
                        generation,
                    },
                    node,
                )
            })
        })
    }

    fn slot_mut(&mut self, handle: NodeHandle) -> Option<&mut Slot> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }
}
