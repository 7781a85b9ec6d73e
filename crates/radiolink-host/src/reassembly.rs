//! Merging received fragments back into complete messages.
//!
//! Fragments belong together when they share `(source, parts_total)`. A group is
//! merged only when every part index `0..parts_total` is present exactly once.
//! Gaps and duplicates leave the group untouched in the buffer until the set
//! becomes complete.

use radiolink_core::{
    error::{ErrorKind, RadioError, Result},
    NodeAddress,
};
use radiolink_protocol::Message;

use crate::slot_buffer::{SlotBuffer, SlotIndex};

type GroupKey = (NodeAddress, u8);

/// Merges every complete fragment group in `buffer`.
///
/// The merged message replaces its fragments at the lowest slot index they
/// occupied. Returns the number of groups merged. When the merged payload
/// cannot be allocated the fragments stay buffered and
/// [`RadioError::AllocationFailure`] is returned.
pub fn try_reassemble(buffer: &mut SlotBuffer) -> Result<usize> {
    let mut groups: Vec<GroupKey> = Vec::new();
    for (_, message) in buffer.iter().filter(|(_, m)| m.is_fragment()) {
        let key = (message.source, message.parts_total);
        if !groups.contains(&key) {
            groups.push(key);
        }
    }

    let mut merged = 0;
    for key in groups {
        let Some(slots) = complete_group(buffer, key) else {
            continue;
        };
        merge_group(buffer, &slots)?;
        merged += 1;
    }
    Ok(merged)
}

/// Slot indices of the group ordered by part, or `None` while parts are missing
/// or duplicated.
fn complete_group(buffer: &SlotBuffer, (source, parts_total): GroupKey) -> Option<Vec<SlotIndex>> {
    let mut by_part: Vec<Option<SlotIndex>> = vec![None; parts_total as usize];

    for (index, message) in buffer.iter() {
        if !message.is_fragment() || message.source != source || message.parts_total != parts_total {
            continue;
        }
        match by_part.get_mut(message.part as usize) {
            Some(slot @ None) => *slot = Some(index),
            Some(Some(_)) => {
                tracing::trace!(
                    "Duplicate part {} of {} from node {}, waiting",
                    message.part,
                    parts_total,
                    source
                );
                return None;
            }
            None => return None,
        }
    }

    by_part.into_iter().collect()
}

fn merge_group(buffer: &mut SlotBuffer, slots: &[SlotIndex]) -> Result<()> {
    let fragments = slots.iter().filter_map(|&index| buffer.get(index));
    let total_len: usize = fragments.clone().map(Message::len).sum();

    let mut payload = Vec::new();
    if payload.try_reserve_exact(total_len).is_err() {
        tracing::warn!("Could not allocate {} bytes to reassemble a message", total_len);
        return Err(ErrorKind::Radio(RadioError::AllocationFailure));
    }

    let mut header = None;
    for fragment in fragments {
        payload.extend_from_slice(fragment.payload());
        header.get_or_insert((fragment.source, fragment.destination));
    }
    let Some((source, destination)) = header else {
        return Ok(());
    };

    let mut lowest = SlotIndex::MAX;
    for &index in slots {
        buffer.remove(index);
        lowest = lowest.min(index);
    }

    tracing::debug!(
        "Reassembled {} fragments from node {} into {} bytes",
        slots.len(),
        source,
        payload.len()
    );
    buffer.restore(lowest, Message::new(source, destination, payload))?;
    Ok(())
}
