//! IR port emulation and its netplay transport.
//!
//! The IR line is a single bit of PM_IO_DATA: bit 0 is the transmit level,
//! bit 1 the receive level, bit 5 disables the port. A received LOW pulse
//! decays back to HIGH after a short fade. Remote peers are other emulator
//! instances reached over TCP (network ids 0-9, one listener plus one
//! outbound stream per pair); id 10 is a locally generated pulse train that
//! imitates a TV remote.
//!
//! Every wire message is two bytes, `[payload, tag]`. An IR bit (tag 0x40)
//! is acknowledged by echoing; the sender blocks on that echo. Hard sync
//! exchanges cycle credits (tag 0xFF) so both peers stay within the
//! configured threshold of each other. Blocking waits poll non-blocking
//! sockets and give up after one wall-clock second.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::core::irq::IR_RECEIVER_IRQ;

/// Network slot reserved for the generated TV-remote source.
pub const REMOTE_SLOT: u8 = 10;

/// Cycles an incoming LOW pulse holds the line before decaying.
const SIGNAL_FADE_CYCLES: i32 = 64;

/// Hard-sync window refresh: a quarter of an emulated second.
const SYNC_TIMEOUT_REFRESH: i32 = 524_288;

/// Wall-clock limit on every blocking wait.
const WAIT_LIMIT: Duration = Duration::from_secs(1);

const TAG_IR_BIT: u8 = 0x40;
const TAG_SYNC: u8 = 0xFF;
const TAG_STOP_SYNC_ACK: u8 = 0xF0;
const TAG_STOP_SYNC: u8 = 0xF1;
const TAG_DISCONNECT: u8 = 0x80;

pub struct IrLink {
    pub network_id: u8,
    pub signal: u8,
    pub fade: i32,
    pub connected: [bool; 11],
    pub sync: bool,
    pub sync_counter: u32,
    /// Allowed drift between peers, in cycles.
    pub sync_clock: u32,
    pub sync_timeout: i32,
    pub sync_balance: i32,
    pub hard_sync_enabled: bool,
    send_signal: bool,

    local_id: u8,
    server_port: u16,
    netplay: bool,
    listeners: Vec<Option<TcpListener>>,
    inbound: Vec<Option<TcpStream>>,
    outbound: Vec<Option<TcpStream>>,
    rx_partial: Vec<Option<u8>>,

    // TV-remote pulse train for slot 10.
    remote_cycles: Vec<u32>,
    remote_index: usize,
    remote_delay: i32,
    saved_id: u8,
}

impl Default for IrLink {
    fn default() -> Self {
        Self::new()
    }
}

impl IrLink {
    pub fn new() -> Self {
        Self {
            network_id: 0,
            signal: 0,
            fade: 0,
            connected: [false; 11],
            sync: false,
            sync_counter: 0,
            sync_clock: 0,
            sync_timeout: 0,
            sync_balance: 0,
            hard_sync_enabled: false,
            send_signal: false,
            local_id: 0,
            server_port: 0,
            netplay: false,
            listeners: (0..10).map(|_| None).collect(),
            inbound: (0..10).map(|_| None).collect(),
            outbound: (0..10).map(|_| None).collect(),
            rx_partial: vec![None; 10],
            remote_cycles: Vec::new(),
            remote_index: 0,
            remote_delay: 0,
            saved_id: 0,
        }
    }

    /// Enable the TCP transport. Sockets come up lazily as peers appear;
    /// `poll_connection` keeps trying until both directions are live.
    pub fn enable_netplay(
        &mut self,
        local_id: u8,
        server_port: u16,
        hard_sync: bool,
        sync_threshold: u32,
    ) {
        self.netplay = true;
        self.local_id = local_id;
        self.network_id = local_id;
        self.server_port = server_port;
        self.hard_sync_enabled = hard_sync;
        self.sync_clock = sync_threshold;
        log::info!("IR netplay enabled, id {local_id}, base port {server_port}");
    }

    pub fn is_netplay(&self) -> bool {
        self.netplay
    }

    pub fn local_id(&self) -> u8 {
        self.local_id
    }

    fn listen_port(&self, peer: u8) -> u16 {
        self.server_port + 10 * self.local_id as u16 + peer as u16
    }

    fn connect_port(&self, peer: u8) -> u16 {
        self.server_port + 10 * peer as u16 + self.local_id as u16
    }

    /// Try to bring up the listener/outbound pair for the current peer.
    pub fn poll_connection(&mut self) {
        let id = self.network_id;
        if !self.netplay || id >= REMOTE_SLOT || id == self.local_id || self.connected[id as usize]
        {
            return;
        }
        let index = id as usize;

        if self.listeners[index].is_none() {
            match TcpListener::bind(("127.0.0.1", self.listen_port(id))) {
                Ok(listener) => {
                    listener.set_nonblocking(true).ok();
                    self.listeners[index] = Some(listener);
                }
                Err(err) => {
                    log::warn!("IR listener bind failed: {err}");
                    return;
                }
            }
        }

        if self.inbound[index].is_none() {
            if let Some(listener) = &self.listeners[index] {
                if let Ok((stream, _)) = listener.accept() {
                    stream.set_nonblocking(true).ok();
                    stream.set_nodelay(true).ok();
                    self.inbound[index] = Some(stream);
                    log::info!("IR peer {id} connected inbound");
                }
            }
        }

        if self.outbound[index].is_none() {
            let addr = std::net::SocketAddr::from(([127, 0, 0, 1], self.connect_port(id)));
            if let Ok(stream) = TcpStream::connect_timeout(&addr, Duration::from_millis(20)) {
                stream.set_nonblocking(true).ok();
                stream.set_nodelay(true).ok();
                self.outbound[index] = Some(stream);
                log::info!("IR peer {id} connected outbound");
            }
        }

        self.connected[index] = self.inbound[index].is_some() && self.outbound[index].is_some();
    }

    fn drop_peer(&mut self, id: u8) {
        let index = id as usize;
        self.connected[index] = false;
        self.inbound[index] = None;
        self.outbound[index] = None;
        self.rx_partial[index] = None;
    }

    fn send_message(&mut self, payload: u8, tag: u8) -> bool {
        let id = self.network_id;
        let Some(stream) = self.outbound[id as usize].as_mut() else {
            return false;
        };
        if stream.write_all(&[payload, tag]).is_err() {
            log::warn!("IR send to peer {id} failed, dropping connection");
            self.drop_peer(id);
            return false;
        }
        true
    }

    /// Non-blocking read of one 2-byte message from the current peer.
    fn recv_message(&mut self) -> Option<[u8; 2]> {
        enum Outcome {
            Complete,
            Partial(usize),
            Dropped,
        }

        let id = self.network_id as usize;
        if self.inbound[id].is_none() {
            return None;
        }

        let mut buf = [0u8; 2];
        let mut have = 0;
        if let Some(byte) = self.rx_partial[id].take() {
            buf[0] = byte;
            have = 1;
        }

        let outcome = {
            let stream = self.inbound[id].as_mut().unwrap();
            loop {
                match stream.read(&mut buf[have..]) {
                    Ok(0) => break Outcome::Dropped,
                    Ok(n) => {
                        have += n;
                        if have == 2 {
                            break Outcome::Complete;
                        }
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                        break Outcome::Partial(have);
                    }
                    Err(_) => break Outcome::Dropped,
                }
            }
        };

        match outcome {
            Outcome::Complete => Some(buf),
            Outcome::Partial(1) => {
                self.rx_partial[id] = Some(buf[0]);
                None
            }
            Outcome::Partial(_) => None,
            Outcome::Dropped => {
                self.drop_peer(id as u8);
                None
            }
        }
    }

    /// Wait for any message from the peer, up to the 1 s wall-clock limit.
    fn wait_for_message(&mut self) -> Option<[u8; 2]> {
        let start = Instant::now();
        while start.elapsed() < WAIT_LIMIT {
            if let Some(message) = self.recv_message() {
                return Some(message);
            }
            if !self.connected[self.network_id as usize] {
                return None;
            }
            std::thread::sleep(Duration::from_micros(50));
        }
        None
    }

    /// Transmit the current IR line level to the peer and wait for the
    /// echo acknowledgement. `io_data` is the live PM_IO_DATA latch.
    pub fn process_ir(&mut self, io_data: u8) {
        let id = self.network_id;
        if !self.netplay || id == self.local_id || id >= REMOTE_SLOT {
            return;
        }
        if !self.connected[id as usize] {
            return;
        }
        if io_data & 0x20 != 0 {
            return;
        }

        let bit = io_data & 0x1;
        self.signal = 0;

        if !self.send_message(bit, TAG_IR_BIT) {
            return;
        }

        // Any echoed message acknowledges the bit.
        if self.wait_for_message().is_some() {
            self.sync_timeout = SYNC_TIMEOUT_REFRESH;
            self.send_signal = true;
        }
    }

    /// Drain one incoming message, mirroring IR bits into the IO latch.
    /// Returns the IRQ mask to raise.
    pub fn recv_byte(&mut self, io_data: &mut u8) -> u32 {
        let id = self.network_id;
        if !self.netplay || id == self.local_id || id >= REMOTE_SLOT {
            return 0;
        }
        if !self.connected[id as usize] {
            return 0;
        }

        let Some([payload, tag]) = self.recv_message() else {
            return 0;
        };

        match tag {
            TAG_SYNC if self.sync => {
                self.sync = false;
                self.sync_counter = 0;
                self.sync_balance = payload as i32;
                0
            }

            TAG_STOP_SYNC => {
                self.sync_timeout = 0;
                self.sync = false;
                0
            }

            TAG_STOP_SYNC_ACK => {
                self.sync = false;
                self.sync_counter = 0;
                self.send_message(payload, 0x01);
                0
            }

            TAG_DISCONNECT => {
                log::info!("IR peer {id} disconnected");
                self.drop_peer(id);
                self.sync = false;
                0
            }

            TAG_IR_BIT => {
                let last_signal = self.signal;

                if *io_data & 0x20 == 0 {
                    if payload == 1 {
                        *io_data |= 0x2;
                        self.signal = 0;
                    } else {
                        *io_data &= !0x2;
                        self.signal = 1;
                        self.fade = SIGNAL_FADE_CYCLES;
                    }
                    self.sync_timeout = SYNC_TIMEOUT_REFRESH;
                }

                // Echo the bit back as the acknowledgement.
                self.send_message(payload, TAG_IR_BIT);

                if last_signal == 0 && self.signal == 1 {
                    IR_RECEIVER_IRQ
                } else {
                    0
                }
            }

            _ => 0,
        }
    }

    /// Offer our cycle credit to the peer and enter the blocked-sync state.
    fn request_sync(&mut self) {
        let mut balance = -self.sync_balance;
        if self.send_signal {
            balance += 8;
            self.send_signal = false;
        }

        if self.send_message(balance as u8, TAG_SYNC) {
            self.sync = true;
        }
    }

    /// Tell the peer to abandon hard sync.
    pub fn stop_sync(&mut self) {
        if self.connected[self.network_id as usize] {
            self.send_message(0, TAG_STOP_SYNC);
        }
        self.sync = false;
    }

    /// Hard-sync bookkeeping, run once per instruction while the window is
    /// open. Blocks (polling) when this peer has run ahead of its credit.
    /// Returns any IRQ mask raised by messages consumed while waiting.
    pub fn hard_sync(&mut self, cycles: u32, io_data: &mut u8) -> u32 {
        self.sync_counter = self.sync_counter.wrapping_add(cycles);
        self.sync_timeout -= cycles as i32;
        self.sync_balance -= cycles as i32;

        if self.sync_timeout <= 0 {
            self.sync_timeout = 0;
            self.stop_sync();
            return 0;
        }

        let mut raised = 0;

        if self.sync_balance <= 0 {
            self.request_sync();
            let start = Instant::now();

            while self.sync {
                raised |= self.recv_byte(io_data);

                if start.elapsed() >= WAIT_LIMIT {
                    self.sync_timeout = 0;
                    self.stop_sync();
                    break;
                }
                std::thread::sleep(Duration::from_micros(50));
            }
        }

        raised
    }

    /// Decay a received LOW pulse back to the idle HIGH level.
    pub fn clock_fade(&mut self, cycles: u32, io_data: &mut u8) {
        if self.fade != 0 {
            self.fade -= cycles as i32;
            if self.fade <= 0 {
                self.fade = 0;
                self.signal = 0;
                *io_data |= 0x2;
            }
        }
    }

    /// Switch slot 10 on and start a random pulse train, as an IR source
    /// like a TV remote would produce.
    pub fn start_remote_signal(&mut self) {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x5EED);
        let mut state = seed | 1;
        let mut next = move || {
            // xorshift64
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state
        };

        // 32-64 ON/OFF pulse pairs of 128-256 cycles each.
        let pulses = (32 + (next() % 33) as usize) * 2;
        self.remote_cycles = (0..pulses).map(|_| 128 + (next() % 129) as u32).collect();

        self.saved_id = self.network_id;
        self.network_id = REMOTE_SLOT;
        self.connected[REMOTE_SLOT as usize] = true;
        self.remote_index = 0;
        self.remote_delay = self.remote_cycles[0] as i32;
    }

    /// Replay the queued remote pulses; even pulses drive the line LOW.
    /// Returns the IRQ mask to raise.
    pub fn process_remote_signal(&mut self, cycles: u32, io_data: &mut u8) -> u32 {
        if !self.connected[REMOTE_SLOT as usize] {
            return 0;
        }

        self.remote_delay -= cycles as i32;
        if self.remote_delay > 0 {
            return 0;
        }

        let mut raised = 0;
        let last_signal = self.signal;

        if *io_data & 0x20 == 0 {
            if self.remote_index % 2 == 0 {
                *io_data &= !0x2;
                self.signal = 1;
            } else {
                *io_data |= 0x2;
                self.signal = 0;
            }
        }

        if last_signal == 0 && self.signal == 1 {
            raised |= IR_RECEIVER_IRQ;
        }

        self.remote_index += 1;
        if self.remote_index >= self.remote_cycles.len() {
            self.connected[REMOTE_SLOT as usize] = false;
            self.network_id = self.saved_id;
        } else {
            self.remote_delay += self.remote_cycles[self.remote_index] as i32;
        }

        raised
    }

    /// Send the disconnect notice and tear all sockets down.
    pub fn disconnect(&mut self) {
        if !self.netplay {
            return;
        }
        for id in 0..10u8 {
            if self.connected[id as usize] {
                if let Some(stream) = self.outbound[id as usize].as_mut() {
                    let _ = stream.write_all(&[0, TAG_DISCONNECT]);
                }
            }
            self.drop_peer(id);
            self.listeners[id as usize] = None;
        }
        self.sync_timeout = 0;
        self.sync = false;
        log::info!("IR netplay shut down");
    }

    /// Cycle to the next peer id (frontend hotkey). Only allowed while no
    /// hard-sync window is open.
    pub fn next_peer(&mut self) -> u8 {
        if self.sync_timeout == 0 {
            self.network_id = (self.network_id + 1) % 10;
            self.sync_balance = 4;
        }
        self.network_id
    }
}
