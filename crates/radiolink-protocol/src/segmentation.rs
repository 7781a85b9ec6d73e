//! Splitting outbound payloads into frame-sized fragments.

use radiolink_core::{
    error::{ErrorKind, RadioError, Result},
    NodeAddress,
};

use crate::message::Message;

/// Number of fragments needed to carry `len` bytes with `capacity` bytes per frame.
///
/// An empty payload needs no fragments.
pub fn parts_needed(len: usize, capacity: usize) -> usize {
    if capacity == 0 {
        return 0;
    }
    len.div_ceil(capacity)
}

/// Splits `payload` into messages of at most `capacity` bytes each.
///
/// Every fragment except the last is exactly `capacity` bytes long. All payload
/// memory is reserved up front, so on [`RadioError::AllocationFailure`] nothing has
/// been produced. More than 255 fragments cannot be described by the header and
/// is rejected with [`RadioError::TransmitBufferFull`].
pub fn segment(
    source: NodeAddress,
    destination: NodeAddress,
    payload: &[u8],
    capacity: usize,
) -> Result<Vec<Message>> {
    if payload.is_empty() {
        return Ok(Vec::new());
    }
    if capacity == 0 {
        return Err(ErrorKind::InvalidConfig("payload capacity must be at least 1 byte"));
    }
    let parts = parts_needed(payload.len(), capacity);
    if parts > u8::MAX as usize {
        return Err(ErrorKind::Radio(RadioError::TransmitBufferFull));
    }

    let mut messages = Vec::new();
    messages
        .try_reserve_exact(parts)
        .map_err(|_| ErrorKind::Radio(RadioError::AllocationFailure))?;

    let parts_total = parts as u8;
    for (part, chunk) in payload.chunks(capacity).enumerate() {
        let mut data = Vec::new();
        data.try_reserve_exact(chunk.len())
            .map_err(|_| ErrorKind::Radio(RadioError::AllocationFailure))?;
        data.extend_from_slice(chunk);
        messages.push(Message::fragment(source, destination, data, part as u8, parts_total));
    }

    tracing::trace!(
        "Segmented {} bytes for node {} into {} fragment(s)",
        payload.len(),
        destination,
        parts_total
    );
    Ok(messages)
}
