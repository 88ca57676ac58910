//! Arena of coroutine records.
//!
//! Records live in boxed slots addressed by index. A slot's generation is
//! bumped when its record is removed, so an id that outlived its coroutine
//! no longer resolves. Live records form a ring in creation order, starting
//! at the root record in slot 0.

use std::any::Any;
use std::fmt;
use std::thread;

use crate::context::Context;
use crate::stack::Stack;

pub(crate) const ROOT: u32 = 0;

pub(crate) type Entry = Box<dyn FnOnce() -> Box<dyn Any>>;
pub(crate) type Outcome = thread::Result<Box<dyn Any>>;

/// Identity of one coroutine incarnation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct CoroutineId {
    index: u32,
    generation: u32
}

impl fmt::Display for CoroutineId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum State {
    /// Started but never scheduled.
    New,
    /// Either on the CPU or ready to be resumed.
    Running,
    /// Blocked in `wait` until its target is dead.
    Waiting,
    /// Entry returned; kept until its waiter reclaims it.
    Dead
}

pub(crate) struct Coroutine {
    pub name: String,
    pub entry: Option<Entry>,
    pub state: State,
    pub waiter: Option<CoroutineId>,
    pub waiting_on: Option<CoroutineId>,
    pub context: Context,
    pub stack: Option<Stack>,
    pub outcome: Option<Outcome>,
    prev: u32,
    next: u32
}

impl Coroutine {
    pub fn new(name: &str, entry: Option<Entry>, stack: Option<Stack>) -> Coroutine {
        Coroutine {
            name: name.to_owned(),
            entry: entry,
            state: State::New,
            waiter: None,
            waiting_on: None,
            context: Context::empty(),
            stack: stack,
            outcome: None,
            prev: ROOT,
            next: ROOT
        }
    }
}

struct Slot {
    generation: u32,
    co: Option<Box<Coroutine>>
}

pub(crate) struct Registry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    len: usize
}

impl Registry {
    /// Creates a registry holding only the root, already running.
    pub fn new(root_name: &str) -> Registry {
        let mut root = Coroutine::new(root_name, None, None);
        root.state = State::Running;

        Registry {
            slots: vec![Slot { generation: 0, co: Some(Box::new(root)) }],
            free: Vec::new(),
            len: 1
        }
    }

    /// Appends `co` at the tail of the ring.
    pub fn create(&mut self, mut co: Coroutine) -> CoroutineId {
        let index = match self.free.pop() {
            Some(i) => i,
            None => {
                self.slots.push(Slot { generation: 0, co: None });
                (self.slots.len() - 1) as u32
            }
        };

        let tail = self.at(ROOT).prev;
        co.prev = tail;
        co.next = ROOT;
        self.at_mut(tail).next = index;
        self.at_mut(ROOT).prev = index;

        let slot = &mut self.slots[index as usize];
        slot.co = Some(Box::new(co));
        self.len += 1;

        CoroutineId {
            index: index,
            generation: slot.generation
        }
    }

    /// Unlinks and returns the record of `id`. The root cannot be removed.
    pub fn remove(&mut self, id: CoroutineId) -> Option<Box<Coroutine>> {
        if id.index == ROOT || self.resolve(id).is_none() {
            return None;
        }

        let (prev, next) = {
            let co = self.at(id.index);
            (co.prev, co.next)
        };
        self.at_mut(prev).next = next;
        self.at_mut(next).prev = prev;

        let slot = &mut self.slots[id.index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        let co = slot.co.take();
        self.free.push(id.index);
        self.len -= 1;
        co
    }

    pub fn resolve(&self, id: CoroutineId) -> Option<&Coroutine> {
        match self.slots.get(id.index as usize) {
            Some(slot) if slot.generation == id.generation => slot.co.as_ref().map(|c| &**c),
            _ => None
        }
    }

    pub fn resolve_mut(&mut self, id: CoroutineId) -> Option<&mut Coroutine> {
        match self.slots.get_mut(id.index as usize) {
            Some(slot) if slot.generation == id.generation => slot.co.as_mut().map(|c| &mut **c),
            _ => None
        }
    }

    /// Id of the live record in slot `index`.
    pub fn id_at(&self, index: u32) -> CoroutineId {
        CoroutineId {
            index: index,
            generation: self.slots[index as usize].generation
        }
    }

    /// Record in slot `index`, which must be live.
    pub fn at(&self, index: u32) -> &Coroutine {
        match self.slots[index as usize].co {
            Some(ref co) => &**co,
            None => panic!("coroutine slot {} is vacant", index)
        }
    }

    pub fn at_mut(&mut self, index: u32) -> &mut Coroutine {
        match self.slots[index as usize].co {
            Some(ref mut co) => &mut **co,
            None => panic!("coroutine slot {} is vacant", index)
        }
    }

    /// Successor of `index` in the ring.
    pub fn next_in_ring(&self, index: u32) -> u32 {
        self.at(index).next
    }

    /// Number of live records, root included.
    pub fn len(&self) -> usize {
        self.len
    }
}
