//! The LCP file-transfer sequence: `OpenWrite`, `Write`..., `Close`.
//!
//! Every request waits for its reply before the next one is sent. The brick
//! hands back a handle in each reply and expects it on the following request,
//! so there is never more than one chunk in flight.

use std::io::{ErrorKind, Read};

use nxtlink_channel::MessageLink;
use nxtlink_frame::reply::{
    CLOSE_REPLY_LEN, OPEN_WRITE_REPLY_LEN, STATUS_FILE_EXISTS, WRITE_REPLY_LEN,
};
use nxtlink_frame::{command, opcode, Frame, Reply, MAX_WRITE_CHUNK};
use tracing::{debug, info, warn};

use crate::error::{ProtocolError, Result, UploadError};

/// Upload `length` bytes from `source` to `remote_name` on the brick.
///
/// `chunk_size` is clamped to `1..=MAX_WRITE_CHUNK`. `on_chunk` is called
/// after each acknowledged chunk with the running byte count. Returns the
/// number of bytes the brick acknowledged.
pub fn upload_file<L, R, F>(
    link: &mut L,
    remote_name: &str,
    mut source: R,
    length: u32,
    chunk_size: usize,
    mut on_chunk: F,
) -> Result<u32>
where
    L: MessageLink + ?Sized,
    R: Read,
    F: FnMut(u32),
{
    if command::name_truncated(remote_name) {
        warn!(name = remote_name, "file name longer than the brick allows, truncating");
    }

    let mut handle = open_write(link, remote_name, length)?;
    debug!(name = remote_name, handle, length, "remote file open");

    let chunk_size = chunk_size.clamp(1, MAX_WRITE_CHUNK);
    let mut buf = [0u8; MAX_WRITE_CHUNK];
    let mut sent: u32 = 0;
    loop {
        let n = fill_chunk(&mut source, &mut buf[..chunk_size])?;
        if n == 0 {
            break;
        }
        link.send_message(&command::write(handle, &buf[..n]))?;
        let reply = expect_reply(link, opcode::WRITE, WRITE_REPLY_LEN)?;
        handle = reply.as_bytes()[3];
        sent += n as u32;
        on_chunk(sent);
    }

    link.send_message(&command::close(handle))?;
    expect_reply(link, opcode::CLOSE, CLOSE_REPLY_LEN)?;

    if sent != length {
        warn!(name = remote_name, sent, length, "source length changed during upload");
    }
    info!(name = remote_name, bytes = sent, "upload complete");
    Ok(sent)
}

/// Open the remote file, deleting an existing one at most once.
fn open_write<L: MessageLink + ?Sized>(link: &mut L, name: &str, length: u32) -> Result<u8> {
    let mut tried_delete = false;
    loop {
        link.send_message(&command::open_write(name, length))?;
        let frame = link.receive_message()?;
        let reply = Reply::parse(&frame).map_err(ProtocolError::from)?;

        if !tried_delete
            && reply.opcode() == opcode::OPEN_WRITE
            && reply.status() == STATUS_FILE_EXISTS
        {
            tried_delete = true;
            debug!(name, "remote file exists, deleting");
            link.send_message(&command::delete(name))?;
            let deleted = link.receive_message()?;
            debug!(status = deleted.as_bytes().get(2).copied(), "delete answered");
            continue;
        }

        let reply = check_reply(&frame, opcode::OPEN_WRITE, OPEN_WRITE_REPLY_LEN)?;
        return Ok(reply.as_bytes()[3]);
    }
}

fn expect_reply<L: MessageLink + ?Sized>(link: &mut L, opcode: u8, len: usize) -> Result<Reply> {
    let frame = link.receive_message()?;
    Ok(check_reply(&frame, opcode, len)?)
}

/// Validate opcode, status and length, in that order.
fn check_reply(frame: &Frame, opcode: u8, len: usize) -> std::result::Result<Reply, ProtocolError> {
    let reply = Reply::parse(frame)?;
    if reply.opcode() == opcode && !reply.is_success() {
        return Err(ProtocolError::Status {
            opcode,
            status: reply.status(),
        });
    }
    reply.expect(opcode, len)?;
    Ok(reply)
}

/// Read until `buf` is full or the source is exhausted.
fn fill_chunk<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(UploadError::Read(err)),
        }
    }
    Ok(filled)
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::time::Duration;

    use nxtlink_channel::{ReceiveError, SendError};

    use super::*;
    use crate::error::UploadErrorCode;

    /// A brick that records every telegram and answers from a script.
    #[derive(Default)]
    pub(crate) struct ScriptedBrick {
        pub sent: Vec<Frame>,
        pub replies: VecDeque<Vec<u8>>,
    }

    impl ScriptedBrick {
        pub fn new(replies: impl IntoIterator<Item = Vec<u8>>) -> Self {
            Self {
                sent: Vec::new(),
                replies: replies.into_iter().collect(),
            }
        }

        fn opcodes(&self) -> Vec<u8> {
            self.sent.iter().filter_map(Frame::opcode).collect()
        }
    }

    impl MessageLink for ScriptedBrick {
        fn send_message(&mut self, frame: &Frame) -> std::result::Result<(), SendError> {
            self.sent.push(frame.clone());
            Ok(())
        }

        fn receive_message(&mut self) -> std::result::Result<Frame, ReceiveError> {
            self.replies
                .pop_front()
                .map(Frame::from)
                .ok_or(ReceiveError::Timeout(Duration::from_secs(5)))
        }
    }

    fn open_ok(handle: u8) -> Vec<u8> {
        vec![0x02, 0x81, 0x00, handle]
    }

    fn write_ok(handle: u8, count: u16) -> Vec<u8> {
        let [lo, hi] = count.to_le_bytes();
        vec![0x02, 0x83, 0x00, handle, lo, hi]
    }

    fn close_ok(handle: u8) -> Vec<u8> {
        vec![0x02, 0x84, 0x00, handle]
    }

    #[test]
    fn uploads_in_bounded_chunks_and_closes() {
        let data: Vec<u8> = (0..130u8).collect();
        let mut brick = ScriptedBrick::new([
            open_ok(1),
            write_ok(1, 58),
            write_ok(1, 58),
            write_ok(1, 14),
            close_ok(1),
        ]);
        let mut progress = Vec::new();

        let sent = upload_file(&mut brick, "Test.rxe", Cursor::new(&data), 130, 58, |n| {
            progress.push(n)
        })
        .unwrap();

        assert_eq!(sent, 130);
        assert_eq!(progress, vec![58, 116, 130]);
        assert_eq!(brick.opcodes(), vec![0x81, 0x83, 0x83, 0x83, 0x84]);

        let open = brick.sent[0].as_bytes();
        assert_eq!(&open[..2], &[0x01, 0x81]);
        assert_eq!(&open[2..10], b"Test.rxe");
        assert_eq!(&open[22..26], &130u32.to_le_bytes());

        let chunks: Vec<usize> = brick.sent[1..4].iter().map(|f| f.len() - 3).collect();
        assert_eq!(chunks, vec![58, 58, 14]);
        assert_eq!(&brick.sent[3].as_bytes()[3..], &data[116..]);
        assert!(brick.replies.is_empty());
    }

    #[test]
    fn each_request_echoes_the_previous_handle() {
        let mut brick = ScriptedBrick::new([
            open_ok(5),
            write_ok(6, 4),
            write_ok(7, 4),
            close_ok(7),
        ]);

        upload_file(&mut brick, "a.rxe", Cursor::new(b"abcdefgh"), 8, 4, |_| {}).unwrap();

        let handles: Vec<u8> = brick.sent[1..].iter().map(|f| f.as_bytes()[2]).collect();
        assert_eq!(handles, vec![5, 6, 7]);
    }

    #[test]
    fn existing_file_is_deleted_once_then_reopened() {
        let mut brick = ScriptedBrick::new([
            vec![0x02, 0x81, 0x8F, 0x00],
            {
                let mut delete = vec![0x02, 0x85, 0x00];
                delete.extend_from_slice(&[0u8; 20]);
                delete
            },
            open_ok(2),
            write_ok(2, 3),
            close_ok(2),
        ]);

        upload_file(&mut brick, "a.rxe", Cursor::new(b"abc"), 3, 58, |_| {}).unwrap();

        assert_eq!(brick.opcodes(), vec![0x81, 0x85, 0x81, 0x83, 0x84]);
        assert_eq!(&brick.sent[1].as_bytes()[2..7], b"a.rxe");
    }

    #[test]
    fn second_file_exists_reply_is_a_transfer_error() {
        let mut brick = ScriptedBrick::new([
            vec![0x02, 0x81, 0x8F, 0x00],
            vec![0x02, 0x85, 0x00],
            vec![0x02, 0x81, 0x8F, 0x00],
        ]);

        let err = upload_file(&mut brick, "a.rxe", Cursor::new(b"abc"), 3, 58, |_| {}).unwrap_err();

        assert!(matches!(
            err,
            UploadError::Protocol(ProtocolError::Status { opcode: 0x81, status: 0x8F })
        ));
        assert_eq!(err.code(), UploadErrorCode::TransferError);
        assert!(!brick.opcodes().contains(&0x83));
    }

    #[test]
    fn failed_open_status_is_reported_without_delete() {
        let mut brick = ScriptedBrick::new([vec![0x02, 0x81, 0xFB, 0x00]]);

        let err = upload_file(&mut brick, "a.rxe", Cursor::new(b"abc"), 3, 58, |_| {}).unwrap_err();

        assert!(matches!(
            err,
            UploadError::Protocol(ProtocolError::Status { opcode: 0x81, status: 0xFB })
        ));
        assert_eq!(err.code(), UploadErrorCode::TransferError);
        assert_eq!(brick.opcodes(), vec![0x81]);
    }

    #[test]
    fn short_write_reply_is_rejected() {
        let mut brick = ScriptedBrick::new([open_ok(1), vec![0x02, 0x83, 0x00, 0x01]]);

        let err = upload_file(&mut brick, "a.rxe", Cursor::new(b"abc"), 3, 58, |_| {}).unwrap_err();

        assert!(matches!(err, UploadError::Protocol(ProtocolError::Reply(_))));
        assert_eq!(brick.opcodes(), vec![0x81, 0x83]);
    }

    #[test]
    fn failed_write_status_stops_before_close() {
        let mut brick = ScriptedBrick::new([open_ok(1), vec![0x02, 0x83, 0xFB, 0x01, 0, 0]]);

        let err = upload_file(&mut brick, "a.rxe", Cursor::new(b"abc"), 3, 58, |_| {}).unwrap_err();

        assert!(matches!(
            err,
            UploadError::Protocol(ProtocolError::Status { status: 0xFB, .. })
        ));
        assert!(!brick.opcodes().contains(&0x84));
    }

    #[test]
    fn silent_brick_surfaces_receive_error() {
        let mut brick = ScriptedBrick::new([]);

        let err = upload_file(&mut brick, "a.rxe", Cursor::new(b"abc"), 3, 58, |_| {}).unwrap_err();

        assert!(matches!(err, UploadError::Receive(ReceiveError::Timeout(_))));
        assert_eq!(err.code(), UploadErrorCode::TransferError);
    }

    #[test]
    fn empty_source_opens_and_closes_without_writes() {
        let mut brick = ScriptedBrick::new([open_ok(3), close_ok(3)]);

        let sent = upload_file(&mut brick, "empty.txt", Cursor::new(b""), 0, 58, |_| {}).unwrap();

        assert_eq!(sent, 0);
        assert_eq!(brick.opcodes(), vec![0x81, 0x84]);
        assert_eq!(brick.sent[1].as_bytes()[2], 3);
    }

    #[test]
    fn oversized_chunk_size_is_clamped() {
        let data = vec![7u8; 100];
        let mut brick = ScriptedBrick::new([open_ok(1), write_ok(1, 58), write_ok(1, 42), close_ok(1)]);

        upload_file(&mut brick, "a.rxe", Cursor::new(&data), 100, 500, |_| {}).unwrap();

        assert_eq!(brick.sent[1].len(), 3 + 58);
        assert_eq!(brick.sent[2].len(), 3 + 42);
    }
}
