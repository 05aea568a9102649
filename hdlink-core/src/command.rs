//! Command dispatch and packet helpers
//!
//! The first byte of every delivered packet is a command number. A
//! [`CommandDispatcher`] routes each packet to the handler registered for
//! that number, with a [`PayloadReader`] over the rest. Outbound packets are
//! assembled with a [`PacketBuilder`].
//!
//! Multi-byte values are little-endian on the wire.

use alloc::vec;
use alloc::vec::Vec;

use hdlink_hal::{TimerService, UartTx};

use crate::link::{Link, LinkError, Outbox, PacketListener};

/// Handler for one command number
///
/// Receives the dispatcher's context, a reader over the payload and the
/// outbox for replies.
pub type CommandHandler<C> = fn(&mut C, &mut PayloadReader<'_>, &mut Outbox<'_>);

/// Number of distinct command bytes
pub const COMMAND_COUNT: usize = 256;

/// Routes delivered packets to per-command handlers
pub struct CommandDispatcher<C> {
    context: C,
    handlers: [Option<CommandHandler<C>>; COMMAND_COUNT],
    unhandled: u32,
}

impl<C> CommandDispatcher<C> {
    pub fn new(context: C) -> Self {
        Self {
            context,
            handlers: [None; COMMAND_COUNT],
            unhandled: 0,
        }
    }

    /// Register a handler, returning the one it replaces
    pub fn register(&mut self, command: u8, handler: CommandHandler<C>) -> Option<CommandHandler<C>> {
        self.handlers[usize::from(command)].replace(handler)
    }

    /// Remove the handler for `command`
    pub fn unregister(&mut self, command: u8) -> Option<CommandHandler<C>> {
        self.handlers[usize::from(command)].take()
    }

    pub fn is_registered(&self, command: u8) -> bool {
        self.handlers[usize::from(command)].is_some()
    }

    /// Packets dropped for lack of a handler
    pub fn unhandled(&self) -> u32 {
        self.unhandled
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }
}

impl<C> PacketListener for CommandDispatcher<C> {
    fn on_packet(&mut self, command: u8, payload: &[u8], outbox: &mut Outbox<'_>) {
        match self.handlers[usize::from(command)] {
            Some(handler) => {
                let mut reader = PayloadReader::new(payload);
                handler(&mut self.context, &mut reader, outbox);
            }
            None => {
                self.unhandled += 1;
                warn!("No handler for command {}", command);
            }
        }
    }
}

/// Cursor over a delivered payload
///
/// Every getter returns `None` once the payload runs out, leaving the cursor
/// where it was.
#[derive(Debug, Clone)]
pub struct PayloadReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PayloadReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    pub fn get_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    pub fn get_u16(&mut self) -> Option<u16> {
        self.take().map(u16::from_le_bytes)
    }

    pub fn get_s16(&mut self) -> Option<i16> {
        self.take().map(i16::from_le_bytes)
    }

    pub fn get_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    pub fn get_s32(&mut self) -> Option<i32> {
        self.take().map(i32::from_le_bytes)
    }

    /// Unread bytes, without consuming them
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    /// Whole payload regardless of position
    pub fn all(&self) -> &'a [u8] {
        self.data
    }
}

/// Builder for an outbound packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketBuilder {
    packet: Vec<u8>,
}

impl PacketBuilder {
    /// Start a packet for `command`
    pub fn new(command: u8) -> Self {
        Self {
            packet: vec![command],
        }
    }

    pub fn command(&self) -> u8 {
        self.packet[0]
    }

    /// Payload written so far, without the command byte
    pub fn payload(&self) -> &[u8] {
        &self.packet[1..]
    }

    pub fn add_u8(mut self, value: u8) -> Self {
        self.packet.push(value);
        self
    }

    pub fn add_u16(mut self, value: u16) -> Self {
        self.packet.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn add_s16(mut self, value: i16) -> Self {
        self.packet.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn add_u32(mut self, value: u32) -> Self {
        self.packet.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn add_s32(mut self, value: i32) -> Self {
        self.packet.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn add_bytes(mut self, bytes: &[u8]) -> Self {
        self.packet.extend_from_slice(bytes);
        self
    }

    /// Finished packet, command byte first
    pub fn build(self) -> Vec<u8> {
        self.packet
    }

    /// Queue the packet on a link
    pub fn submit<T, S, L>(self, link: &mut Link<T, S, L>) -> Result<(), LinkError>
    where
        T: UartTx,
        S: TimerService,
        L: PacketListener,
    {
        link.submit(self.packet)
    }

    /// Queue the packet as a reply from inside a handler
    pub fn reply(self, outbox: &mut Outbox<'_>) -> Result<(), LinkError> {
        outbox.submit_packet(self.packet)
    }
}

#[cfg(test)]
mod tests {
    use hdlink_protocol::{Control, SeqNum, MAX_PAYLOAD_SIZE};

    use super::*;
    use crate::config::{LinkConfig, Role};
    use crate::link::testing::*;

    #[derive(Default)]
    struct Counters {
        pings: u32,
        last_value: Option<u32>,
    }

    fn ping(ctx: &mut Counters, _reader: &mut PayloadReader<'_>, _outbox: &mut Outbox<'_>) {
        ctx.pings += 1;
    }

    fn store(ctx: &mut Counters, reader: &mut PayloadReader<'_>, _outbox: &mut Outbox<'_>) {
        ctx.last_value = reader.get_u32();
    }

    fn echo(_ctx: &mut Counters, reader: &mut PayloadReader<'_>, outbox: &mut Outbox<'_>) {
        PacketBuilder::new(0x01)
            .add_bytes(reader.remaining())
            .reply(outbox)
            .unwrap();
    }

    fn up_link(
        dispatcher: CommandDispatcher<Counters>,
    ) -> Link<RecordingUart, ManualTimers, CommandDispatcher<Counters>> {
        let mut link = Link::new(
            LinkConfig::with_role(Role::Secondary),
            RecordingUart::default(),
            ManualTimers::default(),
            dispatcher,
        );
        link.on_bytes_received(&wire(Control::SNRM, &[]));
        link.transport_mut().take_frames();
        link
    }

    fn info(seq: u8, payload: &[u8]) -> std::vec::Vec<u8> {
        wire(Control::information(SeqNum::new(seq), SeqNum::ZERO, true), payload)
    }

    #[test]
    fn test_reader_little_endian() {
        let data = [0x01, 0x34, 0x12, 0xFE, 0xFF, 0x78, 0x56, 0x34, 0x12];
        let mut reader = PayloadReader::new(&data);
        assert_eq!(reader.get_u8(), Some(0x01));
        assert_eq!(reader.get_u16(), Some(0x1234));
        assert_eq!(reader.get_s16(), Some(-2));
        assert_eq!(reader.get_u32(), Some(0x1234_5678));
        assert!(reader.remaining().is_empty());
        assert_eq!(reader.all().len(), data.len());
    }

    #[test]
    fn test_reader_underrun() {
        let data = [0xAA, 0xBB, 0xCC];
        let mut reader = PayloadReader::new(&data);
        assert_eq!(reader.get_u32(), None);
        // A failed read consumes nothing
        assert_eq!(reader.get_u16(), Some(0xBBAA));
        assert_eq!(reader.get_u16(), None);
        assert_eq!(reader.get_u8(), Some(0xCC));
        assert_eq!(reader.get_u8(), None);
    }

    #[test]
    fn test_builder_layout() {
        let packet = PacketBuilder::new(0x10)
            .add_u8(0xAB)
            .add_u16(0x1234)
            .add_s16(-1)
            .add_u32(0xDEAD_BEEF)
            .add_s32(-2)
            .build();
        assert_eq!(
            packet,
            std::vec![
                0x10, 0xAB, 0x34, 0x12, 0xFF, 0xFF, 0xEF, 0xBE, 0xAD, 0xDE, 0xFE, 0xFF, 0xFF, 0xFF
            ]
        );
    }

    #[test]
    fn test_builder_accessors() {
        let builder = PacketBuilder::new(0x22).add_u16(7);
        assert_eq!(builder.command(), 0x22);
        assert_eq!(builder.payload(), &[7, 0]);
    }

    #[test]
    fn test_builder_submit_checks_size() {
        let mut link = up_link(CommandDispatcher::new(Counters::default()));
        let too_big = PacketBuilder::new(0x01).add_bytes(&[0u8; MAX_PAYLOAD_SIZE]);
        assert_eq!(too_big.submit(&mut link), Err(LinkError::PacketTooLarge));

        PacketBuilder::new(0x02).add_u8(1).submit(&mut link).unwrap();
        let frames = link.transport_mut().take_frames();
        assert_eq!(frames[0].payload.as_slice(), &[0x02, 1]);
    }

    #[test]
    fn test_register_replaces() {
        let mut dispatcher = CommandDispatcher::new(Counters::default());
        assert!(dispatcher.register(0x05, ping).is_none());
        assert!(dispatcher.register(0x05, store).is_some());
        assert!(dispatcher.is_registered(0x05));
        assert!(dispatcher.unregister(0x05).is_some());
        assert!(!dispatcher.is_registered(0x05));
    }

    #[test]
    fn test_dispatch_by_command_byte() {
        let mut dispatcher = CommandDispatcher::new(Counters::default());
        dispatcher.register(0x00, ping);
        dispatcher.register(0xFF, store);
        let mut link = up_link(dispatcher);

        link.on_bytes_received(&info(0, &[0x00]));
        link.on_bytes_received(&info(1, &[0xFF, 0x78, 0x56, 0x34, 0x12]));

        let ctx = link.listener().context();
        assert_eq!(ctx.pings, 1);
        assert_eq!(ctx.last_value, Some(0x1234_5678));
    }

    #[test]
    fn test_unknown_command_dropped() {
        let mut link = up_link(CommandDispatcher::new(Counters::default()));
        link.on_bytes_received(&info(0, &[0x42, 1, 2]));

        assert_eq!(link.listener().unhandled(), 1);
        assert!(link.is_up());
        // Still acknowledged
        assert_eq!(link.transport_mut().take_frames().len(), 1);
    }

    #[test]
    fn test_handler_reply() {
        let mut dispatcher = CommandDispatcher::new(Counters::default());
        dispatcher.register(0x01, echo);
        let mut link = up_link(dispatcher);

        link.on_bytes_received(&info(0, &[0x01, 0xCA, 0xFE]));

        let frames = link.transport_mut().take_frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].payload.as_slice(), &[0x01, 0xCA, 0xFE]);
    }
}
