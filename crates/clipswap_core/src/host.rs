//! Host object model
//!
//! ClipSwap never owns the host's object graph. It only needs to find,
//! create and destroy named objects and to ask whether an object it created
//! earlier is still alive. Hosts routinely tear down most of their graph on
//! level transitions; objects marked persistent survive that.

use std::fmt;

use crate::id::ObjectId;

/// The part of a host object graph ClipSwap relies on
pub trait ObjectGraph: Send {
    /// All live objects carrying `name`, oldest first
    fn find_all(&self, name: &str) -> Vec<ObjectId>;

    /// First live object carrying `name`
    fn find(&self, name: &str) -> Option<ObjectId> {
        self.find_all(name).into_iter().next()
    }

    /// Create a new object under `name`
    fn create(&mut self, name: &str) -> ObjectId;

    /// Destroy an object. Returns false if it was already gone.
    fn destroy(&mut self, id: ObjectId) -> bool;

    /// Check whether an object is still alive
    fn is_alive(&self, id: ObjectId) -> bool;

    /// Name of a live object
    fn name_of(&self, id: ObjectId) -> Option<&str>;
}

/// One object in a [`SceneGraph`]
#[derive(Debug, Clone)]
struct SceneObject {
    name: String,
    persistent: bool,
    /// Creation order
    seq: u64,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    object: Option<SceneObject>,
}

/// In-memory host object graph with level unloading.
///
/// Slots are recycled with a bumped generation, so ids that outlive their
/// object are reported dead even after the slot is reused.
#[derive(Default)]
pub struct SceneGraph {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
    next_seq: u64,
}

impl SceneGraph {
    /// Create an empty scene graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.live
    }

    /// Check if no objects are alive
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Keep an object alive across [`SceneGraph::unload_level`]
    pub fn set_persistent(&mut self, id: ObjectId, persistent: bool) -> bool {
        match self.object_mut(id) {
            Some(object) => {
                object.persistent = persistent;
                true
            }
            None => false,
        }
    }

    /// Destroy every non-persistent object, like a host level transition.
    ///
    /// Returns the number of objects destroyed.
    pub fn unload_level(&mut self) -> usize {
        let doomed: Vec<ObjectId> = self
            .iter()
            .filter(|(_, object)| !object.persistent)
            .map(|(id, _)| id)
            .collect();

        for id in &doomed {
            self.destroy(*id);
        }
        doomed.len()
    }

    /// Live object ids, in slot order
    pub fn ids(&self) -> Vec<ObjectId> {
        self.iter().map(|(id, _)| id).collect()
    }

    fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.object
                .as_ref()
                .map(|object| (ObjectId::new(index as u32, slot.generation), object))
        })
    }

    fn slot(&self, id: ObjectId) -> Option<&Slot> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
    }

    fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.object.as_mut())
    }
}

impl ObjectGraph for SceneGraph {
    fn find_all(&self, name: &str) -> Vec<ObjectId> {
        let mut found: Vec<(u64, ObjectId)> = self
            .iter()
            .filter(|(_, object)| object.name == name)
            .map(|(id, object)| (object.seq, id))
            .collect();
        // Recycled slots can sit before older objects
        found.sort_by_key(|(seq, _)| *seq);
        found.into_iter().map(|(_, id)| id).collect()
    }

    fn create(&mut self, name: &str) -> ObjectId {
        let object = SceneObject {
            name: name.to_string(),
            persistent: false,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.live += 1;

        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.generation += 1;
            slot.object = Some(object);
            ObjectId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                object: Some(object),
            });
            ObjectId::new(index, 0)
        }
    }

    fn destroy(&mut self, id: ObjectId) -> bool {
        let Some(slot) = self
            .slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
        else {
            return false;
        };

        if slot.object.take().is_some() {
            self.free.push(id.index());
            self.live -= 1;
            true
        } else {
            false
        }
    }

    fn is_alive(&self, id: ObjectId) -> bool {
        self.slot(id).map_or(false, |slot| slot.object.is_some())
    }

    fn name_of(&self, id: ObjectId) -> Option<&str> {
        self.slot(id)
            .and_then(|slot| slot.object.as_ref())
            .map(|object| object.name.as_str())
    }
}

impl fmt::Debug for SceneGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.iter().map(|(id, object)| (id, &object.name)))
            .finish()
    }
}
