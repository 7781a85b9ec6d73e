//! In-memory radio medium.
//!
//! A [`SimulatedAir`] connects any number of [`AirDriver`]s by node address.
//! Frames queue per receiver in send order. Loss, ACK loss, driver failures and
//! bit corruption can be injected to exercise the retry and CRC paths.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet, VecDeque},
    fmt::{self, Debug, Formatter},
    io,
    rc::Rc,
};

use radiolink_core::{NodeAddress, RadioDriver};
use rand::{rngs::StdRng, Rng, SeedableRng};

type Corruptor = Box<dyn FnMut(&mut Vec<u8>)>;

struct AirFrame {
    source: NodeAddress,
    data: Vec<u8>,
    wants_ack: bool,
}

struct AirState {
    queues: HashMap<NodeAddress, VecDeque<AirFrame>>,
    /// Pending ACKs as `(acknowledging node, acknowledged node)`.
    acks: HashSet<(NodeAddress, NodeAddress)>,
    auto_ack: bool,
    drop_frames: usize,
    drop_acks: usize,
    fail_transmits: usize,
    loss: Option<(f64, StdRng)>,
    corruptor: Option<Corruptor>,
    frames_delivered: u64,
    frames_lost: u64,
    acks_lost: u64,
}

impl AirState {
    fn deliver_ack(&mut self, from: NodeAddress, to: NodeAddress) {
        if take_loss(&mut self.drop_acks, &mut self.loss) {
            self.acks_lost += 1;
            tracing::debug!("ACK {} -> {} lost in the air", from, to);
            return;
        }
        self.acks.insert((from, to));
    }
}

/// Consumes one scheduled loss, or rolls the random loss rate.
fn take_loss(scheduled: &mut usize, loss: &mut Option<(f64, StdRng)>) -> bool {
    if *scheduled > 0 {
        *scheduled -= 1;
        return true;
    }
    match loss {
        Some((rate, rng)) => rng.random_bool(*rate),
        None => false,
    }
}

/// Shared in-memory medium. Clones refer to the same air.
#[derive(Clone)]
pub struct SimulatedAir {
    state: Rc<RefCell<AirState>>,
}

impl Debug for SimulatedAir {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SimulatedAir")
            .field("nodes", &state.queues.len())
            .field("auto_ack", &state.auto_ack)
            .field("frames_delivered", &state.frames_delivered)
            .field("frames_lost", &state.frames_lost)
            .finish()
    }
}

impl Default for SimulatedAir {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedAir {
    /// Creates an empty medium.
    ///
    /// Receivers acknowledge frames in hardware by default: a delivered frame
    /// that asked for an ACK raises the sender's ACK flag immediately. This lets a
    /// single thread drive several radios, since a sender blocks in its ACK wait
    /// while its peer is not being polled.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(AirState {
                queues: HashMap::new(),
                acks: HashSet::new(),
                auto_ack: true,
                drop_frames: 0,
                drop_acks: 0,
                fail_transmits: 0,
                loss: None,
                corruptor: None,
                frames_delivered: 0,
                frames_lost: 0,
                acks_lost: 0,
            })),
        }
    }

    /// Registers `address` on the air and returns its driver.
    pub fn attach(&self, address: NodeAddress) -> AirDriver {
        self.state.borrow_mut().queues.entry(address).or_default();
        AirDriver { address, air: self.clone(), ack_request_from: None }
    }

    /// Enables or disables hardware acknowledgement.
    ///
    /// When disabled, ACKs only travel when the receiver calls `send_ack`.
    pub fn set_auto_ack(&self, enabled: bool) {
        self.state.borrow_mut().auto_ack = enabled;
    }

    /// Loses the next `count` data frames.
    pub fn drop_next_frames(&self, count: usize) {
        self.state.borrow_mut().drop_frames += count;
    }

    /// Loses the next `count` ACKs.
    pub fn drop_next_acks(&self, count: usize) {
        self.state.borrow_mut().drop_acks += count;
    }

    /// Makes the next `count` driver transmissions fail with an I/O error.
    pub fn fail_next_transmits(&self, count: usize) {
        self.state.borrow_mut().fail_transmits += count;
    }

    /// Loses frames and ACKs at random with probability `rate`.
    ///
    /// The generator is seeded so that runs are reproducible. A rate of zero
    /// disables random loss.
    pub fn set_loss_rate(&self, rate: f64, seed: u64) {
        let rate = rate.clamp(0.0, 1.0);
        self.state.borrow_mut().loss =
            (rate > 0.0).then(|| (rate, StdRng::seed_from_u64(seed)));
    }

    /// Runs `corruptor` on every data frame before it is queued for its receiver.
    pub fn set_corruptor<F>(&self, corruptor: F)
    where
        F: FnMut(&mut Vec<u8>) + 'static,
    {
        self.state.borrow_mut().corruptor = Some(Box::new(corruptor));
    }

    /// Removes the corruption hook.
    pub fn clear_corruptor(&self) {
        self.state.borrow_mut().corruptor = None;
    }

    /// Frames waiting to be read by `address`.
    pub fn pending_frames(&self, address: NodeAddress) -> usize {
        self.state.borrow().queues.get(&address).map_or(0, VecDeque::len)
    }

    /// Data frames that reached a receiver queue.
    pub fn frames_delivered(&self) -> u64 {
        self.state.borrow().frames_delivered
    }

    /// Data frames lost in the air.
    pub fn frames_lost(&self) -> u64 {
        self.state.borrow().frames_lost
    }

    /// ACKs lost in the air.
    pub fn acks_lost(&self) -> u64 {
        self.state.borrow().acks_lost
    }

    fn send(&self, source: NodeAddress, dest: NodeAddress, frame: &[u8]) -> io::Result<()> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        if state.fail_transmits > 0 {
            state.fail_transmits -= 1;
            return Err(io::Error::new(io::ErrorKind::Other, "simulated transmitter fault"));
        }

        // A new transmission invalidates any ACK still flagged from this peer.
        state.acks.remove(&(dest, source));

        if take_loss(&mut state.drop_frames, &mut state.loss) {
            state.frames_lost += 1;
            tracing::debug!("Frame {} -> {} lost in the air", source, dest);
            return Ok(());
        }

        let mut data = frame.to_vec();
        if let Some(corruptor) = state.corruptor.as_mut() {
            corruptor(&mut data);
        }

        let auto_ack = state.auto_ack;
        let Some(queue) = state.queues.get_mut(&dest) else {
            tracing::trace!("No node {} on the air, frame from {} unheard", dest, source);
            return Ok(());
        };
        queue.push_back(AirFrame { source, data, wants_ack: true });
        state.frames_delivered += 1;

        if auto_ack {
            state.deliver_ack(dest, source);
        }
        Ok(())
    }
}

/// [`RadioDriver`] endpoint on a [`SimulatedAir`].
#[derive(Debug)]
pub struct AirDriver {
    address: NodeAddress,
    air: SimulatedAir,
    ack_request_from: Option<NodeAddress>,
}

impl AirDriver {
    /// Address this driver listens on.
    pub fn address(&self) -> NodeAddress {
        self.address
    }

    /// The medium this driver is attached to.
    pub fn air(&self) -> &SimulatedAir {
        &self.air
    }
}

impl RadioDriver for AirDriver {
    fn transmit(&mut self, dest: NodeAddress, frame: &[u8]) -> io::Result<()> {
        self.air.send(self.address, dest, frame)
    }

    fn receive_pending(&mut self) -> bool {
        self.air.pending_frames(self.address) > 0
    }

    fn receive<'a>(&mut self, buffer: &'a mut [u8]) -> io::Result<(NodeAddress, &'a [u8])> {
        let frame = self
            .air
            .state
            .borrow_mut()
            .queues
            .get_mut(&self.address)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| io::Error::new(io::ErrorKind::WouldBlock, "no frame pending"))?;

        let len = frame.data.len().min(buffer.len());
        if len < frame.data.len() {
            tracing::trace!("Truncating {} byte frame to {} bytes", frame.data.len(), len);
        }
        buffer[..len].copy_from_slice(&frame.data[..len]);
        self.ack_request_from = frame.wants_ack.then_some(frame.source);
        Ok((frame.source, &buffer[..len]))
    }

    fn send_ack(&mut self, dest: NodeAddress) -> io::Result<()> {
        self.air.state.borrow_mut().deliver_ack(self.address, dest);
        Ok(())
    }

    fn ack_received(&mut self, dest: NodeAddress) -> bool {
        self.air.state.borrow().acks.contains(&(dest, self.address))
    }

    fn ack_requested(&mut self, src: NodeAddress) -> bool {
        self.ack_request_from.take() == Some(src)
    }
}
