/*

Glk objects
===========

Copyright (c) 2024 Dannii Willis
MIT licenced
https://github.com/curiousdannii/remglk-rs

*/

use std::collections::HashMap;
use std::num::NonZeroU32;

/** A store for Glk objects of a particular type.
    The object store will own the objects, and keeps them in a doubly linked list for iteration (newest first).
 */
pub struct GlkObjectStore<T> {
    counter: u32,
    first: Option<NonZeroU32>,
    store: HashMap<NonZeroU32, GlkObject<T>>,
}

#[derive(Debug, PartialEq)]
pub struct IterationResult {
    pub id: NonZeroU32,
    pub rock: u32,
}

impl<T> Default for GlkObjectStore<T> {
    fn default() -> Self {
        GlkObjectStore {
            counter: 0,
            first: None,
            store: HashMap::new(),
        }
    }
}

impl<T> GlkObjectStore<T> {
    pub fn get(&self, id: Option<NonZeroU32>) -> Option<&T> {
        self.store.get(&id?).map(|obj| &obj.obj)
    }

    pub fn get_mut(&mut self, id: Option<NonZeroU32>) -> Option<&mut T> {
        self.store.get_mut(&id?).map(|obj| &mut obj.obj)
    }

    pub fn get_rock(&self, id: Option<NonZeroU32>) -> Option<u32> {
        self.store.get(&id?).map(|obj| obj.rock)
    }

    pub fn ids(&self) -> Vec<NonZeroU32> {
        let mut ids = Vec::with_capacity(self.store.len());
        let mut next = self.first;
        while let Some(id) = next {
            ids.push(id);
            next = self.store.get(&id).and_then(|obj| obj.next);
        }
        ids
    }

    pub fn iterate(&self, id: Option<NonZeroU32>) -> Option<IterationResult> {
        let next = match id {
            None => self.first,
            Some(id) => self.store.get(&id)?.next,
        }?;
        Some(IterationResult {
            id: next,
            rock: self.store.get(&next)?.rock,
        })
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn register(&mut self, obj: T, rock: u32) -> NonZeroU32 {
        // Ids are never reused, so a stale id held by the VM can't alias a new object
        self.counter += 1;
        let new_id = NonZeroU32::new(self.counter).unwrap_or(NonZeroU32::MIN);
        let mut glk_object = GlkObject::new(obj, rock);
        if let Some(old_first) = self.first.and_then(|id| self.store.get_mut(&id)) {
            old_first.prev = Some(new_id);
            glk_object.next = self.first;
        }
        self.store.insert(new_id, glk_object);
        self.first = Some(new_id);
        new_id
    }

    /** Remove an object from the store */
    pub fn unregister(&mut self, id: NonZeroU32) -> Option<T> {
        let obj = self.store.remove(&id)?;
        if let Some(prev) = obj.prev.and_then(|prev_id| self.store.get_mut(&prev_id)) {
            prev.next = obj.next;
        }
        if let Some(next) = obj.next.and_then(|next_id| self.store.get_mut(&next_id)) {
            next.prev = obj.prev;
        }
        if self.first == Some(id) {
            self.first = obj.next;
        }
        Some(obj.obj)
    }
}

/** Contains the private data we keep in each object store */
struct GlkObject<T> {
    next: Option<NonZeroU32>,
    obj: T,
    prev: Option<NonZeroU32>,
    rock: u32,
}

impl<T> GlkObject<T> {
    fn new(obj: T, rock: u32) -> Self {
        GlkObject {
            next: None,
            obj,
            prev: None,
            rock,
        }
    }
}
