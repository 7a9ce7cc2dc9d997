use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use nxtlink_frame::opcode::{self, opcode_name};
use nxtlink_frame::reply::{decode_program_name, decode_vibrate};
use nxtlink_frame::{
    is_timeout, Capability, FileEntry, FirmwareVersion, Frame, FrameReader, FrameWriter,
    OutputState, Port, Reply, SpeechRequest,
};
use nxtlink_transport::{Connector, DeviceAddress, LinkStream, TransportError};
use tracing::{debug, info, warn};

use crate::config::ChannelConfig;
use crate::delay_queue::DelayQueue;
use crate::error::{ChannelError, ConnectError, Result};
use crate::event::{ChannelEvent, ConnectionState};
use crate::intent::Intent;
use crate::link::{frame_io, open_stream, split_stream, stop_all_motors};

enum Command {
    Connect {
        address: DeviceAddress,
        done: SyncSender<std::result::Result<(), ConnectError>>,
    },
    Submit {
        intent: Intent,
        delay: Duration,
        submitted_at: Instant,
    },
    Disconnect {
        done: SyncSender<()>,
    },
    /// Sent by a receive loop whose link failed.
    LinkLost {
        session: u64,
    },
    Shutdown,
}

#[derive(Default)]
struct Shared {
    state: Mutex<ConnectionState>,
    capability: Mutex<Capability>,
    last_reply: Mutex<Option<Frame>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Shared {
    fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    fn set_state(&self, state: ConnectionState) {
        let mut current = lock(&self.state);
        if *current != state {
            debug!(from = %*current, to = %state, "connection state");
            *current = state;
        }
    }
}

/// Asynchronous command channel to one brick.
///
/// A worker thread owns the write side of the connection and drains the
/// intent queue; a receive loop thread owns the read side and turns replies
/// into [`ChannelEvent`]s. Dropping the channel disconnects and stops both.
pub struct Channel {
    commands: Sender<Command>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Channel {
    /// Start the worker. Events are delivered on `events`.
    pub fn spawn(
        connector: Arc<dyn Connector>,
        config: ChannelConfig,
        events: Sender<ChannelEvent>,
    ) -> Result<Self> {
        let (commands, rx) = mpsc::channel();
        let shared = Arc::new(Shared::default());

        let worker = Worker {
            connector,
            config,
            events,
            shared: Arc::clone(&shared),
            commands: commands.clone(),
            queue: DelayQueue::new(),
            session: None,
            next_session: 1,
        };
        let handle = thread::Builder::new()
            .name("nxtlink-channel".to_string())
            .spawn(move || worker.run(rx))
            .map_err(ChannelError::Spawn)?;

        Ok(Self {
            commands,
            shared,
            worker: Some(handle),
        })
    }

    /// Connect to the brick at `address`, replacing any current connection.
    ///
    /// Failures are returned and also reported as `Toast` and
    /// `ConnectError` events.
    pub fn connect(&self, address: &DeviceAddress) -> Result<()> {
        let (done, result) = mpsc::sync_channel(1);
        self.post(Command::Connect {
            address: address.clone(),
            done,
        })?;
        result
            .recv()
            .map_err(|_| ChannelError::WorkerStopped)?
            .map_err(ChannelError::from)
    }

    /// Queue an intent to be sent after `delay`.
    ///
    /// Intents with equal due times are sent in submission order.
    pub fn submit(&self, intent: Intent, delay: Duration) -> Result<()> {
        if !self.shared.state().is_connected() {
            return Err(ChannelError::NotConnected);
        }
        self.post(Command::Submit {
            intent,
            delay,
            submitted_at: Instant::now(),
        })
    }

    /// Stop the motors and close the connection. Pending intents are dropped.
    ///
    /// Does nothing when already disconnected.
    pub fn disconnect(&self) -> Result<()> {
        let (done, finished) = mpsc::sync_channel(1);
        self.post(Command::Disconnect { done })?;
        finished.recv().map_err(|_| ChannelError::WorkerStopped)
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Protocol flavour reported by the last firmware version reply.
    pub fn capability(&self) -> Capability {
        *lock(&self.shared.capability)
    }

    /// The most recent reply telegram received.
    pub fn last_reply(&self) -> Option<Frame> {
        lock(&self.shared.last_reply).clone()
    }

    fn post(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| ChannelError::WorkerStopped)
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

struct Session {
    id: u64,
    writer: FrameWriter<LinkStream>,
    running: Arc<AtomicBool>,
    receiver: Option<JoinHandle<()>>,
}

impl Session {
    /// Stop the receive loop and release the link.
    fn close(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Err(err) = self.writer.get_ref().shutdown() {
            debug!(%err, "link shutdown failed");
        }
        if let Some(receiver) = self.receiver.take() {
            let _ = receiver.join();
        }
    }
}

struct Worker {
    connector: Arc<dyn Connector>,
    config: ChannelConfig,
    events: Sender<ChannelEvent>,
    shared: Arc<Shared>,
    commands: Sender<Command>,
    queue: DelayQueue<Intent>,
    session: Option<Session>,
    next_session: u64,
}

impl Worker {
    fn run(mut self, rx: Receiver<Command>) {
        loop {
            let command = match self.queue.next_deadline() {
                Some(deadline) => {
                    match rx.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
                        Ok(command) => Some(command),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match rx.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                },
            };

            match command {
                Some(Command::Connect { address, done }) => {
                    let result = self.connect(&address);
                    let _ = done.send(result);
                }
                Some(Command::Submit {
                    intent,
                    delay,
                    submitted_at,
                }) => {
                    self.queue.push(submitted_at, delay, intent);
                }
                Some(Command::Disconnect { done }) => {
                    self.disconnect();
                    let _ = done.send(());
                }
                Some(Command::LinkLost { session }) => self.link_lost(session),
                Some(Command::Shutdown) => {
                    self.disconnect();
                    break;
                }
                None => {}
            }

            self.dispatch_due();
        }
        debug!("channel worker stopped");
    }

    fn emit(&self, event: ChannelEvent) {
        let _ = self.events.send(event);
    }

    fn connect(&mut self, address: &DeviceAddress) -> std::result::Result<(), ConnectError> {
        if self.session.is_some() {
            self.disconnect();
        }
        self.shared.set_state(ConnectionState::Connecting);
        debug!(%address, "connecting");

        match self.open_session(address) {
            Ok(session) => {
                self.session = Some(session);
                *lock(&self.shared.capability) = Capability::Classic;
                *lock(&self.shared.last_reply) = None;
                self.shared.set_state(ConnectionState::Connected);
                info!(%address, "connected");
                self.emit(ChannelEvent::Connected);
                Ok(())
            }
            Err(err) => {
                warn!(%address, %err, "connect failed");
                self.shared.set_state(ConnectionState::Disconnected);
                let toast = match &err {
                    ConnectError::PairingRequired { .. } => {
                        "Accept the pairing request on the brick, then connect again".to_string()
                    }
                    ConnectError::DeviceNotFound { .. } => "No paired brick found".to_string(),
                    ConnectError::Socket { .. } => err.to_string(),
                };
                self.emit(ChannelEvent::Toast(toast));
                self.emit(ChannelEvent::ConnectError(err.to_string()));
                Err(err)
            }
        }
    }

    fn open_session(&mut self, address: &DeviceAddress) -> std::result::Result<Session, ConnectError> {
        let socket_error = |source: TransportError| ConnectError::Socket {
            address: address.to_string(),
            source,
        };

        let stream = open_stream(self.connector.as_ref(), address, &self.config)?;
        let (reader, writer) = split_stream(stream, &self.config)
            .map_err(|err| socket_error(TransportError::Io(frame_io(err))))?;

        let id = self.next_session;
        self.next_session += 1;
        let running = Arc::new(AtomicBool::new(true));
        let receive_loop = ReceiveLoop {
            session: id,
            reader,
            running: Arc::clone(&running),
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
            commands: self.commands.clone(),
        };
        let receiver = thread::Builder::new()
            .name(format!("nxtlink-receive-{id}"))
            .spawn(move || receive_loop.run())
            .map_err(|err| socket_error(TransportError::Io(err)))?;

        Ok(Session {
            id,
            writer,
            running,
            receiver: Some(receiver),
        })
    }

    fn disconnect(&mut self) {
        let dropped = self.queue.clear();
        if dropped > 0 {
            debug!(dropped, "dropping pending intents");
        }
        let Some(mut session) = self.session.take() else {
            return;
        };

        self.shared.set_state(ConnectionState::Disconnecting);
        match stop_all_motors(&mut session.writer) {
            Ok(()) => thread::sleep(self.config.settle_time),
            Err(err) => warn!(%err, "could not stop motors before disconnect"),
        }
        session.close();
        self.shared.set_state(ConnectionState::Disconnected);
        info!("disconnected");
        self.emit(ChannelEvent::Disconnected);
    }

    fn link_lost(&mut self, session: u64) {
        if self.session.as_ref().map(|s| s.id) != Some(session) {
            return;
        }
        if let Some(mut session) = self.session.take() {
            session.close();
        }
        let dropped = self.queue.clear();
        if dropped > 0 {
            warn!(dropped, "link lost with intents pending");
        }
        self.shared.set_state(ConnectionState::Disconnected);
        self.emit(ChannelEvent::Disconnected);
    }

    fn dispatch_due(&mut self) {
        while let Some(intent) = self.queue.pop_due(Instant::now()) {
            self.dispatch(intent);
        }
    }

    fn dispatch(&mut self, intent: Intent) {
        let Some(session) = self.session.as_mut() else {
            warn!(?intent, "not connected, dropping intent");
            return;
        };

        let frame = intent.to_frame();
        debug!(?intent, opcode = frame.opcode().map(opcode_name), "dispatch");
        match session.writer.write_frame(&frame) {
            Ok(()) => {
                if intent.is_beep() {
                    thread::sleep(self.config.beep_gap);
                }
            }
            Err(err) => {
                let id = session.id;
                warn!(%err, "send failed");
                self.shared.set_state(ConnectionState::Faulted);
                self.emit(ChannelEvent::SendError(err.to_string()));
                self.link_lost(id);
            }
        }
    }
}

struct ReceiveLoop {
    session: u64,
    reader: FrameReader<LinkStream>,
    running: Arc<AtomicBool>,
    shared: Arc<Shared>,
    events: Sender<ChannelEvent>,
    commands: Sender<Command>,
}

impl ReceiveLoop {
    fn run(mut self) {
        while self.running.load(Ordering::SeqCst) {
            match self.reader.read_frame() {
                Ok(frame) => self.handle(frame),
                Err(err) if is_timeout(&err) => continue,
                Err(err) => {
                    // A local disconnect clears `running` before closing the link.
                    if self.running.swap(false, Ordering::SeqCst) {
                        warn!(%err, "receive loop failed");
                        self.shared.set_state(ConnectionState::Faulted);
                        let _ = self.events.send(ChannelEvent::ReceiveError(err.to_string()));
                        let _ = self.commands.send(Command::LinkLost {
                            session: self.session,
                        });
                    }
                    return;
                }
            }
        }
    }

    fn handle(&self, frame: Frame) {
        if frame.is_reply() {
            *lock(&self.shared.last_reply) = Some(frame.clone());
            if let Err(err) = self.handle_reply(&frame) {
                warn!(%err, "malformed reply");
            }
            return;
        }

        let result = match frame.opcode() {
            Some(opcode::SAY_TEXT) => {
                SpeechRequest::decode(&frame).map(|request| self.emit(ChannelEvent::SayText(request)))
            }
            Some(opcode::VIBRATE_PHONE) => {
                decode_vibrate(&frame).map(|duration| self.emit(ChannelEvent::Vibrate(duration)))
            }
            other => {
                warn!(opcode = ?other, len = frame.len(), "ignoring unexpected telegram");
                Ok(())
            }
        };
        if let Err(err) = result {
            warn!(%err, "malformed telegram");
        }
    }

    fn handle_reply(&self, frame: &Frame) -> nxtlink_frame::Result<()> {
        let reply = Reply::parse(frame)?;
        let event = match reply.opcode() {
            opcode::GET_OUTPUT_STATE => {
                let state = OutputState::decode(&reply)?;
                let Some(port) = Port::from_index(state.port) else {
                    warn!(port = state.port, "output state for unknown port");
                    return Ok(());
                };
                ChannelEvent::MotorState {
                    port,
                    position: state.position(),
                }
            }
            opcode::GET_FIRMWARE_VERSION => {
                let version = FirmwareVersion::decode(&reply)?;
                let capability = version.capability();
                *lock(&self.shared.capability) = capability;
                ChannelEvent::FirmwareVersion {
                    version,
                    capability,
                }
            }
            opcode::FIND_FIRST | opcode::FIND_NEXT => {
                ChannelEvent::FileFound(FileEntry::decode(&reply)?)
            }
            opcode::GET_CURRENT_PROGRAM_NAME => {
                ChannelEvent::ProgramName(decode_program_name(&reply)?)
            }
            other => {
                debug!(opcode = opcode_name(other), status = reply.status(), "reply");
                return Ok(());
            }
        };
        self.emit(event);
        Ok(())
    }

    fn emit(&self, event: ChannelEvent) {
        let _ = self.events.send(event);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::net::UnixStream;

    use nxtlink_frame::{command, FrameError, Voice};

    use super::*;

    const WAIT: Duration = Duration::from_secs(2);

    /// Hands the brick side of each new loopback link to the test.
    struct LoopbackConnector {
        bricks: Mutex<Sender<UnixStream>>,
    }

    impl Connector for LoopbackConnector {
        fn connect(&self, _address: &DeviceAddress) -> nxtlink_transport::Result<LinkStream> {
            let (host, brick) = UnixStream::pair()?;
            let _ = lock(&self.bricks).send(brick);
            Ok(LinkStream::from_unix(host))
        }
    }

    struct RefusingConnector;

    impl Connector for RefusingConnector {
        fn connect(&self, _address: &DeviceAddress) -> nxtlink_transport::Result<LinkStream> {
            Err(TransportError::Io(std::io::Error::from(
                std::io::ErrorKind::ConnectionRefused,
            )))
        }
    }

    struct Brick {
        reader: FrameReader<UnixStream>,
        writer: FrameWriter<UnixStream>,
    }

    impl Brick {
        fn new(stream: UnixStream) -> Self {
            stream.set_read_timeout(Some(WAIT)).unwrap();
            Self {
                reader: FrameReader::new(stream.try_clone().unwrap()),
                writer: FrameWriter::new(stream),
            }
        }

        fn expect(&mut self) -> Frame {
            self.reader.read_frame().unwrap()
        }

        fn reply(&mut self, bytes: &[u8]) {
            self.writer.send(bytes).unwrap();
        }
    }

    fn config() -> ChannelConfig {
        ChannelConfig {
            poll_interval: Duration::from_millis(10),
            settle_time: Duration::from_millis(1),
            beep_gap: Duration::from_millis(1),
            ..ChannelConfig::default()
        }
    }

    fn address() -> DeviceAddress {
        "00:16:53:0A:0B:0C".parse().unwrap()
    }

    /// A connected channel, its events, the brick end of the link, and the
    /// source of brick ends for later connects.
    fn connected() -> (
        Channel,
        Receiver<ChannelEvent>,
        Brick,
        Receiver<UnixStream>,
    ) {
        connected_with(config())
    }

    fn connected_with(
        config: ChannelConfig,
    ) -> (Channel, Receiver<ChannelEvent>, Brick, Receiver<UnixStream>) {
        let (brick_tx, brick_rx) = mpsc::channel();
        let connector = Arc::new(LoopbackConnector {
            bricks: Mutex::new(brick_tx),
        });
        let (events_tx, events) = mpsc::channel();
        let channel = Channel::spawn(connector, config, events_tx).unwrap();
        channel.connect(&address()).unwrap();
        assert_eq!(events.recv_timeout(WAIT).unwrap(), ChannelEvent::Connected);
        let brick = Brick::new(brick_rx.recv_timeout(WAIT).unwrap());
        (channel, events, brick, brick_rx)
    }

    #[test]
    fn submit_sends_beep() {
        let (channel, _events, mut brick, _bricks) = connected();
        assert!(channel.is_connected());

        channel.submit(Intent::beep(440, 1000), Duration::ZERO).unwrap();
        assert_eq!(
            brick.expect().to_wire().unwrap().as_ref(),
            &[0x06, 0x00, 0x80, 0x03, 0xB8, 0x01, 0xE8, 0x03]
        );
    }

    #[test]
    fn delayed_intents_dispatch_by_due_time() {
        let (channel, _events, mut brick, _bricks) = connected();

        channel.submit(Intent::beep(1000, 10), Duration::ZERO).unwrap();
        channel
            .submit(Intent::beep(2000, 10), Duration::from_millis(100))
            .unwrap();
        channel
            .submit(Intent::beep(3000, 10), Duration::from_millis(50))
            .unwrap();

        let order: Vec<Frame> = (0..3).map(|_| brick.expect()).collect();
        assert_eq!(order[0], command::play_tone(1000, 10));
        assert_eq!(order[1], command::play_tone(3000, 10));
        assert_eq!(order[2], command::play_tone(2000, 10));
    }

    #[test]
    fn delay_counts_from_submission_while_worker_is_busy() {
        let (channel, _events, mut brick, _bricks) = connected_with(ChannelConfig {
            beep_gap: Duration::from_millis(300),
            ..config()
        });

        channel.submit(Intent::beep(440, 10), Duration::ZERO).unwrap();
        channel
            .submit(Intent::StopProgram, Duration::from_millis(200))
            .unwrap();
        thread::sleep(Duration::from_millis(150));
        // Due at 250ms, later than StopProgram at 200ms, though the worker
        // only sees it once the beep gap ends.
        channel
            .submit(Intent::GetProgramName, Duration::from_millis(100))
            .unwrap();

        assert_eq!(brick.expect(), command::play_tone(440, 10));
        assert_eq!(brick.expect().as_bytes(), &[0x80, 0x01]);
        assert_eq!(brick.expect().as_bytes(), &[0x00, 0x11]);
    }

    #[test]
    fn immediate_intents_keep_submission_order() {
        let (channel, _events, mut brick, _bricks) = connected();
        for power in [10, 20, 30, 40] {
            channel.submit(Intent::motor(Port::A, power), Duration::ZERO).unwrap();
        }
        for power in [10, 20, 30, 40] {
            assert_eq!(brick.expect(), command::set_output_state(Port::A, power));
        }
    }

    #[test]
    fn motor_power_is_clamped_on_the_wire() {
        let (channel, _events, mut brick, _bricks) = connected();
        channel.submit(Intent::motor(Port::C, 400), Duration::ZERO).unwrap();
        assert_eq!(brick.expect().as_bytes()[3], 100);
    }

    #[test]
    fn submit_while_disconnected_is_rejected() {
        let (events_tx, _events) = mpsc::channel();
        let channel = Channel::spawn(Arc::new(RefusingConnector), config(), events_tx).unwrap();
        let result = channel.submit(Intent::StopProgram, Duration::ZERO);
        assert!(matches!(result, Err(ChannelError::NotConnected)));
    }

    #[test]
    fn disconnect_stops_motors_and_is_idempotent() {
        let (channel, events, mut brick, _bricks) = connected();

        channel.disconnect().unwrap();
        for port in Port::ALL {
            assert_eq!(brick.expect(), command::set_output_state(port, 0));
        }
        assert!(matches!(
            brick.reader.read_frame(),
            Err(FrameError::ConnectionClosed)
        ));
        assert_eq!(events.recv_timeout(WAIT).unwrap(), ChannelEvent::Disconnected);
        assert_eq!(channel.state(), ConnectionState::Disconnected);

        channel.disconnect().unwrap();
        assert!(events.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn output_state_reply_raises_motor_state() {
        let (channel, events, mut brick, _bricks) = connected();
        channel
            .submit(Intent::ReadMotorState(Port::B), Duration::ZERO)
            .unwrap();
        assert_eq!(brick.expect().as_bytes(), &[0x00, 0x06, 0x01]);

        let mut reply = vec![0x02, 0x06, 0x00, 0x01, 0, 0, 0, 0, 0];
        reply.extend_from_slice(&[0u8; 12]);
        reply.extend_from_slice(&[0x01, 0x00, 0x00, 0x00]);
        brick.reply(&reply);

        assert_eq!(
            events.recv_timeout(WAIT).unwrap(),
            ChannelEvent::MotorState {
                port: Port::B,
                position: 1
            }
        );
        assert_eq!(channel.last_reply().unwrap().as_bytes(), reply.as_slice());
    }

    #[test]
    fn firmware_reply_sets_capability() {
        let (channel, events, mut brick, _bricks) = connected();
        channel
            .submit(Intent::FirmwareVersion, Duration::ZERO)
            .unwrap();
        assert_eq!(brick.expect(), command::get_firmware_version());

        brick.reply(&[0x02, 0x88, 0x00, 0x6C, 0x4D, 0x49, 0x64]);
        match events.recv_timeout(WAIT).unwrap() {
            ChannelEvent::FirmwareVersion { capability, .. } => {
                assert_eq!(capability, Capability::Extended)
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(channel.capability(), Capability::Extended);
    }

    #[test]
    fn inbound_extension_telegrams_raise_events() {
        let (_channel, events, mut brick, _bricks) = connected();

        brick.writer.write_frame(&command::say_text("hello", Voice::default())).unwrap();
        brick.reply(&[0x80, 0x31, 30]);

        match events.recv_timeout(WAIT).unwrap() {
            ChannelEvent::SayText(request) => assert_eq!(request.text, "hello"),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(
            events.recv_timeout(WAIT).unwrap(),
            ChannelEvent::Vibrate(Duration::from_millis(300))
        );
    }

    #[test]
    fn brick_hangup_reports_receive_error() {
        let (channel, events, brick, _bricks) = connected();
        drop(brick);

        assert!(matches!(
            events.recv_timeout(WAIT).unwrap(),
            ChannelEvent::ReceiveError(_)
        ));
        assert_eq!(events.recv_timeout(WAIT).unwrap(), ChannelEvent::Disconnected);
        assert_eq!(channel.state(), ConnectionState::Disconnected);

        channel.connect(&address()).unwrap();
        assert_eq!(events.recv_timeout(WAIT).unwrap(), ChannelEvent::Connected);
    }

    #[test]
    fn connect_failure_reports_toast_and_error() {
        let (events_tx, events) = mpsc::channel();
        let channel = Channel::spawn(Arc::new(RefusingConnector), config(), events_tx).unwrap();

        let err = channel.connect(&address()).unwrap_err();
        assert!(matches!(err, ChannelError::Connect(ConnectError::Socket { .. })));
        assert!(matches!(events.recv_timeout(WAIT).unwrap(), ChannelEvent::Toast(_)));
        assert!(matches!(
            events.recv_timeout(WAIT).unwrap(),
            ChannelEvent::ConnectError(_)
        ));
        assert_eq!(channel.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn pairing_flag_changes_connect_error() {
        let (events_tx, events) = mpsc::channel();
        let cfg = ChannelConfig {
            pairing: true,
            ..config()
        };
        let channel = Channel::spawn(Arc::new(RefusingConnector), cfg, events_tx).unwrap();

        let err = channel.connect(&address()).unwrap_err();
        assert!(matches!(
            err,
            ChannelError::Connect(ConnectError::PairingRequired { .. })
        ));
        match events.recv_timeout(WAIT).unwrap() {
            ChannelEvent::Toast(message) => assert!(message.contains("pairing")),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn reconnect_replaces_previous_session() {
        let (channel, events, mut first, bricks) = connected();
        channel.connect(&address()).unwrap();

        for port in Port::ALL {
            assert_eq!(first.expect(), command::set_output_state(port, 0));
        }
        assert_eq!(events.recv_timeout(WAIT).unwrap(), ChannelEvent::Disconnected);
        assert_eq!(events.recv_timeout(WAIT).unwrap(), ChannelEvent::Connected);

        let mut second = Brick::new(bricks.recv_timeout(WAIT).unwrap());
        assert!(channel.is_connected());
        channel.submit(Intent::StopProgram, Duration::ZERO).unwrap();
        assert_eq!(second.expect(), command::stop_program());
    }
}
