//! Fixed-capacity slot arrays holding in-flight messages.
//!
//! Each [`SlotBuffer`] is an arena of `Option<Message>` slots. An occupied slot is a
//! valid message, an empty one is free. Retrieval prefers the lowest index, and
//! [`SlotBuffer::compact`] keeps free slots trailing so that order is preserved.

use radiolink_core::error::{ErrorKind, RadioError, Result};
use radiolink_protocol::Message;

/// Position of a message inside a [`SlotBuffer`].
pub type SlotIndex = usize;

/// Which side of the link a buffer serves.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Frames received from the air.
    Receive,
    /// Fragments waiting to be transmitted.
    Transmit,
}

impl Direction {
    /// Fault reported when a buffer in this direction has no free slot.
    pub fn full_error(self) -> RadioError {
        match self {
            Direction::Receive => RadioError::ReceiveBufferFull,
            Direction::Transmit => RadioError::TransmitBufferFull,
        }
    }
}

/// Fixed-capacity ordered collection of messages.
#[derive(Debug)]
pub struct SlotBuffer {
    direction: Direction,
    slots: Vec<Option<Message>>,
    occupied: usize,
}

impl SlotBuffer {
    /// Creates a buffer with `capacity` free slots.
    pub fn with_capacity(direction: Direction, capacity: usize) -> Self {
        Self {
            direction,
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            occupied: 0,
        }
    }

    /// Direction this buffer serves.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Total number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.occupied
    }

    /// True when no slot is occupied.
    pub fn is_empty(&self) -> bool {
        self.occupied == 0
    }

    /// Number of free slots.
    pub fn free_slots(&self) -> usize {
        self.capacity() - self.occupied
    }

    /// Stores `message` in the first free slot.
    ///
    /// When every slot is taken the message is rejected with the direction's
    /// buffer-full fault.
    pub fn add(&mut self, message: Message) -> Result<SlotIndex> {
        match self.slots.iter().position(Option::is_none) {
            Some(index) => {
                self.slots[index] = Some(message);
                self.occupied += 1;
                Ok(index)
            }
            None => Err(ErrorKind::Radio(self.direction.full_error())),
        }
    }

    /// Stores every message or none of them.
    pub fn add_all(&mut self, messages: Vec<Message>) -> Result<usize> {
        if messages.len() > self.free_slots() {
            return Err(ErrorKind::Radio(self.direction.full_error()));
        }

        let count = messages.len();
        for message in messages {
            self.add(message)?;
        }
        Ok(count)
    }

    /// Takes the lowest-indexed message matching `predicate` out of its slot.
    pub fn take_next<P>(&mut self, mut predicate: P) -> Option<(SlotIndex, Message)>
    where
        P: FnMut(&Message) -> bool,
    {
        let index = self.slots.iter().position(|slot| slot.as_ref().is_some_and(&mut predicate))?;
        self.remove(index).map(|message| (index, message))
    }

    /// Puts a message back, preferably at the index it was taken from.
    ///
    /// Falls back to the first free slot when `index` is occupied or out of range.
    pub fn restore(&mut self, index: SlotIndex, message: Message) -> Result<SlotIndex> {
        match self.slots.get_mut(index) {
            Some(slot @ None) => {
                *slot = Some(message);
                self.occupied += 1;
                Ok(index)
            }
            _ => self.add(message),
        }
    }

    /// Frees the slot at `index`, returning its message.
    pub fn remove(&mut self, index: SlotIndex) -> Option<Message> {
        let message = self.slots.get_mut(index)?.take()?;
        self.occupied -= 1;
        Some(message)
    }

    /// Borrows the message at `index`, if any.
    pub fn get(&self, index: SlotIndex) -> Option<&Message> {
        self.slots.get(index)?.as_ref()
    }

    /// Occupied slots with their index, lowest first.
    pub fn iter(&self) -> impl Iterator<Item = (SlotIndex, &Message)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| slot.as_ref().map(|m| (index, m)))
    }

    /// Moves occupied slots left over any gaps, keeping their relative order.
    pub fn compact(&mut self) {
        let mut write = 0;
        for read in 0..self.slots.len() {
            if self.slots[read].is_some() {
                if read != write {
                    self.slots.swap(write, read);
                }
                write += 1;
            }
        }
    }
}
