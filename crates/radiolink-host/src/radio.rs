use std::fmt::{self, Debug, Formatter};

use radiolink_core::{
    config::Config,
    constants::FRAME_HEADER_SIZE,
    error::{ErrorKind, RadioError, Result},
    Delay, NodeAddress, RadioDriver,
};
use radiolink_protocol::{parts_needed, segment, verify_and_strip, Message};
use tracing::{debug, error, trace, warn};

use crate::{
    delivery::{await_ack, next_state_after_timeout, DeliveryState},
    reassembly::try_reassemble,
    slot_buffer::{Direction, SlotBuffer, SlotIndex},
    statistics::RadioStatistics,
};

/// Callback invoked for every counted fault.
pub type ErrorHandler = Box<dyn FnMut(RadioError)>;
/// Callback invoked with the source and payload of every complete message.
pub type MessageHandler = Box<dyn FnMut(NodeAddress, &[u8])>;

/// Reliable message link over a small-frame radio.
///
/// A `Radio` owns the receive and transmit slot buffers and is driven by calling
/// [`Radio::poll`] from the application loop. Each call:
///
/// 1. reads at most one pending frame from the driver, verifies and buffers it,
/// 2. answers the sender's ACK request, whatever happened to the frame,
/// 3. reassembles completed fragment groups and delivers one complete message,
/// 4. transmits one queued frame and blocks until it is acknowledged or times out.
///
/// Faults never abort the loop. They increment [`Radio::error_count`] and are
/// forwarded to the error handler when one is installed.
pub struct Radio<D: RadioDriver, T: Delay> {
    address: NodeAddress,
    config: Config,
    driver: D,
    delay: T,
    rx: SlotBuffer,
    tx: SlotBuffer,
    frame_buffer: Vec<u8>,
    error_count: u32,
    statistics: RadioStatistics,
    on_error: Option<ErrorHandler>,
    on_message: Option<MessageHandler>,
}

impl<D: RadioDriver, T: Delay> Debug for Radio<D, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Radio")
            .field("address", &self.address)
            .field("config", &self.config)
            .field("rx", &self.rx)
            .field("tx", &self.tx)
            .field("error_count", &self.error_count)
            .field("statistics", &self.statistics)
            .finish()
    }
}

impl<D: RadioDriver, T: Delay> Radio<D, T> {
    /// Creates a radio for node `address`. The configuration is validated first.
    pub fn new(address: NodeAddress, config: Config, driver: D, delay: T) -> Result<Self> {
        config.validate()?;

        let mut frame_buffer = Vec::new();
        frame_buffer
            .try_reserve_exact(config.max_frame_size)
            .map_err(|_| ErrorKind::Radio(RadioError::AllocationFailure))?;
        frame_buffer.resize(config.max_frame_size, 0);

        debug!(
            "Radio {} ready: {} rx / {} tx slots, {} payload bytes per frame",
            address,
            config.rx_buffer_size,
            config.tx_buffer_size,
            config.payload_capacity()
        );

        Ok(Self {
            address,
            rx: SlotBuffer::with_capacity(Direction::Receive, config.rx_buffer_size),
            tx: SlotBuffer::with_capacity(Direction::Transmit, config.tx_buffer_size),
            config,
            driver,
            delay,
            frame_buffer,
            error_count: 0,
            statistics: RadioStatistics::default(),
            on_error: None,
            on_message: None,
        })
    }

    /// Installs the callback invoked for every counted fault.
    pub fn set_error_handler<F>(&mut self, handler: F)
    where
        F: FnMut(RadioError) + 'static,
    {
        self.on_error = Some(Box::new(handler));
    }

    /// Removes the error callback.
    pub fn clear_error_handler(&mut self) {
        self.on_error = None;
    }

    /// Installs the callback receiving complete messages.
    ///
    /// Without one, complete messages are still taken out of the receive buffer
    /// and discarded.
    pub fn set_message_handler<F>(&mut self, handler: F)
    where
        F: FnMut(NodeAddress, &[u8]) + 'static,
    {
        self.on_message = Some(Box::new(handler));
    }

    /// Removes the message callback.
    pub fn clear_message_handler(&mut self) {
        self.on_message = None;
    }

    /// Runs one iteration of the control loop.
    pub fn poll(&mut self) {
        self.receive_frame();

        if !self.rx.is_empty() {
            self.process_receive();
        }
        if !self.tx.is_empty() {
            self.process_transmit();
        }
    }

    /// Queues `payload` for `dest`, split into as many frames as needed.
    ///
    /// Returns the number of fragments queued. Either every fragment is queued or
    /// none is: a message needing more slots than are free is rejected with
    /// [`RadioError::TransmitBufferFull`]. An empty payload queues nothing.
    pub fn transmit(&mut self, dest: NodeAddress, payload: &[u8]) -> Result<u8> {
        if payload.is_empty() {
            return Ok(0);
        }

        let capacity = self.config.payload_capacity();
        let parts = parts_needed(payload.len(), capacity);
        if parts > self.tx.free_slots() || parts > u8::MAX as usize {
            warn!(
                "Rejecting {} byte message for node {}: needs {} slots, {} free",
                payload.len(),
                dest,
                parts,
                self.tx.free_slots()
            );
            return Err(self.counted(ErrorKind::Radio(RadioError::TransmitBufferFull)));
        }

        let fragments = match segment(self.address, dest, payload, capacity) {
            Ok(fragments) => fragments,
            Err(e) => return Err(self.counted(e)),
        };
        match self.tx.add_all(fragments) {
            Ok(queued) => Ok(queued as u8),
            Err(e) => Err(self.counted(e)),
        }
    }

    /// True when no message is waiting in the receive buffer.
    pub fn rx_buffer_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// True when no frame is waiting to be transmitted.
    pub fn tx_buffer_empty(&self) -> bool {
        self.tx.is_empty()
    }

    /// Faults counted since the radio was created.
    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    /// Traffic counters.
    pub fn statistics(&self) -> &RadioStatistics {
        &self.statistics
    }

    /// Address of this node.
    pub fn address(&self) -> NodeAddress {
        self.address
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Borrows the underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Mutably borrows the underlying driver.
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Borrows the delay primitive.
    pub fn delay(&self) -> &T {
        &self.delay
    }

    fn receive_frame(&mut self) {
        if !self.driver.receive_pending() {
            return;
        }

        let (source, outcome) = match self.driver.receive(&mut self.frame_buffer) {
            Ok((source, frame)) => {
                self.statistics.frames_received += 1;
                (source, store_frame(&mut self.rx, self.address, source, frame))
            }
            Err(e) => {
                error!("Error occurred receiving a frame: {}", e);
                return;
            }
        };

        match outcome {
            Ok(Some(len)) => {
                self.statistics.bytes_received += len as u64;
                trace!("Buffered {} byte frame from node {}", len, source);
            }
            Ok(None) => trace!("Ignoring header-only frame from node {}", source),
            Err(e) => match e.radio_error() {
                Some(kind) => {
                    warn!("Dropping frame from node {}: {}", source, kind);
                    self.report(kind);
                }
                None => warn!("Dropping frame from node {}: {}", source, e),
            },
        }

        // The radio-level handshake is independent of what happened to the payload.
        if self.driver.ack_requested(source) {
            if let Some(ack_delay) = self.config.ack_delay {
                self.delay.delay(ack_delay);
            }
            match self.driver.send_ack(source) {
                Ok(()) => self.statistics.acks_sent += 1,
                Err(e) => error!("Error occurred sending an ACK (to node {}): {}", source, e),
            }
        }
    }

    fn process_receive(&mut self) {
        if let Err(e) = try_reassemble(&mut self.rx) {
            self.counted(e);
        }

        if let Some((_, message)) = self.rx.take_next(Message::is_complete) {
            self.statistics.messages_delivered += 1;
            debug!("Delivering {} byte message from node {}", message.len(), message.source);
            if let Some(handler) = self.on_message.as_mut() {
                handler(message.source, message.payload());
            }
        }

        self.rx.compact();
    }

    fn process_transmit(&mut self) {
        if let Some((index, message)) = self.tx.take_next(|_| true) {
            match message.to_frame() {
                Ok(frame) => self.attempt(index, message, &frame),
                Err(e) => self.defer(index, message, e),
            }
        }

        self.tx.compact();
    }

    fn attempt(&mut self, index: SlotIndex, mut message: Message, frame: &[u8]) {
        let dest = message.destination;
        self.statistics.frames_sent += 1;
        let sent = match self.driver.transmit(dest, frame) {
            Ok(()) => true,
            Err(e) => {
                error!("Error occurred sending a frame (to node {}): {}", dest, e);
                self.statistics.transmit_failures += 1;
                false
            }
        };

        let mut state = DeliveryState::after_transmit(sent);
        if state == DeliveryState::AwaitingAck {
            let acked = await_ack(
                &mut self.driver,
                &mut self.delay,
                dest,
                self.config.ack_poll_budget(),
                self.config.ack_poll_interval,
            );
            state = DeliveryState::after_wait(acked);
        }
        if state == DeliveryState::TimedOut {
            message.retries = message.retries.saturating_add(1);
            state = next_state_after_timeout(message.retries, self.config.max_retries);
        }

        if !state.is_terminal() {
            debug!("No ACK from node {}, retry {} scheduled", dest, message.retries);
            self.statistics.retries += 1;
            self.requeue(index, message);
            return;
        }

        if state == DeliveryState::Acked {
            self.statistics.bytes_sent += message.len() as u64;
            trace!("Part {} of {} acknowledged by node {}", message.part + 1, message.parts_total, dest);
        } else {
            warn!(
                "Dropping part {} of {} for node {} after {} attempts",
                message.part + 1,
                message.parts_total,
                dest,
                message.retries
            );
            self.statistics.messages_dropped += 1;
            self.report(RadioError::AckTimeoutExhausted);
        }
    }

    /// Puts back a message whose frame could not be built. No attempt was made,
    /// so no retry is consumed.
    fn defer(&mut self, index: SlotIndex, message: Message, error: ErrorKind) {
        debug!("Deferring frame for node {}: {}", message.destination, error);
        self.requeue(index, message);
        self.counted(error);
    }

    fn requeue(&mut self, index: SlotIndex, message: Message) {
        if let Err(e) = self.tx.restore(index, message) {
            self.counted(e);
        }
    }

    /// Counts `error` if it is a radio fault and hands it back.
    fn counted(&mut self, error: ErrorKind) -> ErrorKind {
        if let Some(kind) = error.radio_error() {
            self.report(kind);
        }
        error
    }

    fn report(&mut self, kind: RadioError) {
        self.error_count = self.error_count.saturating_add(1);
        if let Some(handler) = self.on_error.as_mut() {
            handler(kind);
        }
    }
}

/// Verifies `frame` and stores it in `rx`. Returns the payload length, or `None`
/// for a frame carrying no payload.
fn store_frame(
    rx: &mut SlotBuffer,
    address: NodeAddress,
    source: NodeAddress,
    frame: &[u8],
) -> Result<Option<usize>> {
    if frame.len() <= FRAME_HEADER_SIZE {
        return Ok(None);
    }

    let (header, payload) = verify_and_strip(frame)?;
    let message = Message::from_frame(source, address, &header, payload)?;
    rx.add(message)?;
    Ok(Some(payload.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use radiolink_protocol::{build_frame, FrameHeader};
    use std::{cell::RefCell, collections::VecDeque, io, rc::Rc, time::Duration};

    #[derive(Default)]
    struct MockDriver {
        incoming: VecDeque<(NodeAddress, Vec<u8>, bool)>,
        ack_request_from: Option<NodeAddress>,
        sent: Vec<(NodeAddress, Vec<u8>)>,
        acks_sent: Vec<NodeAddress>,
        peer_acks: bool,
        fail_transmit: bool,
        fail_receive: bool,
    }

    impl RadioDriver for MockDriver {
        fn transmit(&mut self, dest: NodeAddress, frame: &[u8]) -> io::Result<()> {
            if self.fail_transmit {
                return Err(io::Error::new(io::ErrorKind::Other, "radio busy"));
            }
            self.sent.push((dest, frame.to_vec()));
            Ok(())
        }

        fn receive_pending(&mut self) -> bool {
            !self.incoming.is_empty()
        }

        fn receive<'a>(&mut self, buffer: &'a mut [u8]) -> io::Result<(NodeAddress, &'a [u8])> {
            if self.fail_receive {
                self.incoming.pop_front();
                self.ack_request_from = None;
                return Err(io::Error::new(io::ErrorKind::InvalidData, "bad packet length"));
            }
            let (src, frame, wants_ack) = self
                .incoming
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::WouldBlock, "nothing pending"))?;
            let len = frame.len().min(buffer.len());
            buffer[..len].copy_from_slice(&frame[..len]);
            self.ack_request_from = wants_ack.then_some(src);
            Ok((src, &buffer[..len]))
        }

        fn send_ack(&mut self, dest: NodeAddress) -> io::Result<()> {
            self.acks_sent.push(dest);
            Ok(())
        }

        fn ack_received(&mut self, _dest: NodeAddress) -> bool {
            self.peer_acks
        }

        fn ack_requested(&mut self, src: NodeAddress) -> bool {
            self.ack_request_from.take() == Some(src)
        }
    }

    #[derive(Default)]
    struct RecordingDelay {
        sleeps: Vec<Duration>,
    }

    impl Delay for RecordingDelay {
        fn delay(&mut self, duration: Duration) {
            self.sleeps.push(duration);
        }
    }

    fn quick_config() -> Config {
        Config {
            rx_buffer_size: 8,
            tx_buffer_size: 8,
            ack_timeout: Duration::from_millis(3),
            ..Config::default()
        }
    }

    fn radio(driver: MockDriver) -> Radio<MockDriver, RecordingDelay> {
        Radio::new(1, quick_config(), driver, RecordingDelay::default()).unwrap()
    }

    fn record_errors(radio: &mut Radio<MockDriver, RecordingDelay>) -> Rc<RefCell<Vec<RadioError>>> {
        let errors = Rc::new(RefCell::new(Vec::new()));
        let sink = errors.clone();
        radio.set_error_handler(move |kind| sink.borrow_mut().push(kind));
        errors
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = Config { max_retries: 0, ..Config::default() };
        let result = Radio::new(1, config, MockDriver::default(), RecordingDelay::default());
        assert!(matches!(result, Err(ErrorKind::InvalidConfig(_))));
    }

    #[test]
    fn test_empty_transmit_queues_nothing() {
        let mut radio = radio(MockDriver::default());
        assert_eq!(radio.transmit(2, &[]).unwrap(), 0);
        assert!(radio.tx_buffer_empty());
        assert_eq!(radio.error_count(), 0);
    }

    #[test]
    fn test_acked_fragments_are_sent_in_order() {
        let mut radio = radio(MockDriver { peer_acks: true, ..Default::default() });
        let payload: Vec<u8> = (0..120u8).collect();
        assert_eq!(radio.transmit(2, &payload).unwrap(), 3);

        for _ in 0..3 {
            radio.poll();
        }

        assert!(radio.tx_buffer_empty());
        let sent = &radio.driver().sent;
        assert_eq!(sent.len(), 3);
        for (part, (dest, frame)) in sent.iter().enumerate() {
            let (header, _) = verify_and_strip(frame).unwrap();
            assert_eq!(*dest, 2);
            assert_eq!(header.part, part as u8);
            assert_eq!(header.parts_total, 3);
        }
        assert_eq!(radio.statistics().bytes_sent, 120);
        assert!(radio.delay().sleeps.is_empty());
    }

    #[test]
    fn test_retry_ceiling_drops_once() {
        let mut radio = radio(MockDriver::default());
        let errors = record_errors(&mut radio);
        radio.transmit(2, b"never acked").unwrap();

        radio.poll();
        radio.poll();
        assert!(!radio.tx_buffer_empty());
        assert!(errors.borrow().is_empty());

        radio.poll();
        assert!(radio.tx_buffer_empty());
        assert_eq!(*errors.borrow(), vec![RadioError::AckTimeoutExhausted]);
        assert_eq!(radio.error_count(), 1);
        assert_eq!(radio.driver().sent.len(), 3);
        assert_eq!(radio.statistics().retries, 2);
        assert_eq!(radio.statistics().messages_dropped, 1);

        // Three attempts of three sleeps each.
        assert_eq!(radio.delay().sleeps.len(), 9);

        radio.poll();
        assert_eq!(radio.driver().sent.len(), 3);
    }

    #[test]
    fn test_failed_driver_transmit_consumes_attempt() {
        let mut radio = radio(MockDriver { fail_transmit: true, ..Default::default() });
        radio.transmit(2, b"x").unwrap();

        for _ in 0..3 {
            radio.poll();
        }
        assert!(radio.tx_buffer_empty());
        assert_eq!(radio.error_count(), 1);
        assert_eq!(radio.statistics().frames_sent, 3);
        assert_eq!(radio.statistics().transmit_failures, 3);
        assert_eq!(radio.statistics().retries, 2);
        assert!(radio.statistics().retry_rate() <= 1.0);
        assert!(radio.delay().sleeps.is_empty());
    }

    #[test]
    fn test_unbuilt_frame_is_deferred_without_retry() {
        let mut radio = radio(MockDriver::default());
        let errors = record_errors(&mut radio);
        radio.transmit(2, b"later").unwrap();

        let (index, message) = radio.tx.take_next(|_| true).unwrap();
        radio.defer(index, message, ErrorKind::Radio(RadioError::AllocationFailure));

        assert_eq!(radio.tx.len(), 1);
        assert_eq!(radio.tx.get(index).unwrap().retries, 0);
        assert_eq!(*errors.borrow(), vec![RadioError::AllocationFailure]);
        assert_eq!(radio.error_count(), 1);
        assert!(radio.driver().sent.is_empty());

        radio.driver_mut().peer_acks = true;
        radio.poll();
        assert!(radio.tx_buffer_empty());
        assert_eq!(radio.driver().sent.len(), 1);
    }

    #[test]
    fn test_failed_driver_receive_is_not_acked() {
        let frame = build_frame(b"lost", 0, 1).unwrap();
        let mut radio = radio(MockDriver {
            incoming: VecDeque::from([(7, frame, true)]),
            fail_receive: true,
            ..Default::default()
        });
        let errors = record_errors(&mut radio);
        let delivered = Rc::new(RefCell::new(0));
        let sink = delivered.clone();
        radio.set_message_handler(move |_, _| *sink.borrow_mut() += 1);

        radio.poll();

        assert!(radio.driver().acks_sent.is_empty());
        assert!(radio.rx_buffer_empty());
        assert_eq!(radio.statistics().frames_received, 0);
        assert_eq!(radio.error_count(), 0);
        assert!(errors.borrow().is_empty());
        assert_eq!(*delivered.borrow(), 0);
    }

    #[test]
    fn test_transmit_rejects_when_slots_run_out() {
        let mut radio = radio(MockDriver::default());
        let errors = record_errors(&mut radio);
        radio.transmit(2, &[0u8; 57 * 6]).unwrap();

        let err = radio.transmit(2, &[0u8; 120]).unwrap_err();
        assert_eq!(err.radio_error(), Some(RadioError::TransmitBufferFull));
        assert_eq!(*errors.borrow(), vec![RadioError::TransmitBufferFull]);
        assert_eq!(radio.tx.len(), 6);

        assert_eq!(radio.transmit(2, &[0u8; 114]).unwrap(), 2);
    }

    #[test]
    fn test_received_message_is_delivered_and_acked() {
        let frame = build_frame(b"hello", 0, 1).unwrap();
        let driver = MockDriver { incoming: VecDeque::from([(7, frame, true)]), ..Default::default() };
        let mut radio = radio(driver);

        let delivered = Rc::new(RefCell::new(Vec::new()));
        let sink = delivered.clone();
        radio.set_message_handler(move |src, payload| sink.borrow_mut().push((src, payload.to_vec())));

        radio.poll();

        assert_eq!(*delivered.borrow(), vec![(7, b"hello".to_vec())]);
        assert_eq!(radio.driver().acks_sent, vec![7]);
        assert_eq!(radio.delay().sleeps, vec![Duration::from_millis(5)]);
        assert!(radio.rx_buffer_empty());
        assert_eq!(radio.statistics().messages_delivered, 1);
        assert_eq!(radio.statistics().bytes_received, 5);
    }

    #[test]
    fn test_corrupt_frame_counted_but_still_acked() {
        let mut frame = build_frame(b"hello", 0, 1).unwrap();
        frame[5] ^= 0x01;
        let driver = MockDriver { incoming: VecDeque::from([(7, frame, true)]), ..Default::default() };
        let mut radio = radio(driver);
        let errors = record_errors(&mut radio);

        radio.poll();

        assert_eq!(*errors.borrow(), vec![RadioError::CrcMismatch]);
        assert!(radio.rx_buffer_empty());
        assert_eq!(radio.driver().acks_sent, vec![7]);
    }

    #[test]
    fn test_header_only_frame_ignored_silently() {
        let mut header = Vec::new();
        FrameHeader::new(0, 1).write_to(&mut header).unwrap();
        let driver = MockDriver { incoming: VecDeque::from([(7, header, true)]), ..Default::default() };
        let mut radio = radio(driver);

        radio.poll();

        assert_eq!(radio.error_count(), 0);
        assert!(radio.rx_buffer_empty());
        assert_eq!(radio.driver().acks_sent, vec![7]);
    }

    #[test]
    fn test_ack_delay_can_be_disabled() {
        let frame = build_frame(b"hi", 0, 1).unwrap();
        let driver = MockDriver { incoming: VecDeque::from([(7, frame, true)]), ..Default::default() };
        let config = Config { ack_delay: None, ..quick_config() };
        let mut radio = Radio::new(1, config, driver, RecordingDelay::default()).unwrap();

        radio.poll();

        assert_eq!(radio.driver().acks_sent, vec![7]);
        assert!(radio.delay().sleeps.is_empty());
    }

    #[test]
    fn test_full_receive_buffer_drops_frame() {
        let fragments = radiolink_protocol::segment(7, 1, &[1u8; 120], 57).unwrap();
        let incoming = fragments
            .iter()
            .take(2)
            .map(|m| (7, m.to_frame().unwrap(), false))
            .collect();
        let config = Config { rx_buffer_size: 1, ..quick_config() };
        let driver = MockDriver { incoming, ..Default::default() };
        let mut radio = Radio::new(1, config, driver, RecordingDelay::default()).unwrap();
        let errors = record_errors(&mut radio);

        radio.poll();
        assert!(errors.borrow().is_empty());
        radio.poll();

        assert_eq!(*errors.borrow(), vec![RadioError::ReceiveBufferFull]);
        assert_eq!(radio.rx.len(), 1);
    }

    #[test]
    fn test_fragments_reassembled_before_delivery() {
        let payload: Vec<u8> = (0..120u8).collect();
        let fragments = radiolink_protocol::segment(7, 1, &payload, 57).unwrap();
        let incoming = [2, 0, 1]
            .iter()
            .map(|&i: &usize| (7, fragments[i].to_frame().unwrap(), true))
            .collect();
        let mut radio = radio(MockDriver { incoming, ..Default::default() });

        let delivered = Rc::new(RefCell::new(Vec::new()));
        let sink = delivered.clone();
        radio.set_message_handler(move |_, payload| sink.borrow_mut().push(payload.to_vec()));

        for _ in 0..3 {
            radio.poll();
        }

        assert_eq!(*delivered.borrow(), vec![payload]);
        assert_eq!(radio.driver().acks_sent, vec![7, 7, 7]);
        assert!(radio.rx_buffer_empty());
    }
}
