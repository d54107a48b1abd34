//! Serial badge reader
//!
//! The reader firmware prints one line per scan (`UID:61D1AA17`) plus status
//! lines such as `RFID_READY`, and expects `AUTH\n` or `DENY\n` in reply.

use super::{AccessOutcome, BadgeReader, DeviceConnector, DeviceError};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};

const UID_PREFIX: &str = "UID:";

/// Line-oriented badge reader over any byte stream
pub struct SerialBadgeReader<R, W> {
    reader: R,
    writer: W,
    line: String,
}

impl<R, W> SerialBadgeReader<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: String::new(),
        }
    }
}

/// Extract the uid from a reader line, if it is a scan line
fn parse_uid_line(line: &str) -> Option<String> {
    let uid = line.trim().strip_prefix(UID_PREFIX)?.trim();
    if uid.is_empty() {
        None
    } else {
        Some(uid.to_string())
    }
}

#[async_trait]
impl<R, W> BadgeReader for SerialBadgeReader<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn next_uid(&mut self) -> Result<String, DeviceError> {
        loop {
            self.line.clear();
            let read = self.reader.read_line(&mut self.line).await?;
            if read == 0 {
                return Err(DeviceError::Disconnected);
            }

            match parse_uid_line(&self.line) {
                Some(uid) => {
                    tracing::debug!(uid = %uid, "Badge scanned");
                    return Ok(uid);
                }
                None => {
                    let ignored = self.line.trim();
                    if !ignored.is_empty() {
                        tracing::trace!(line = %ignored, "Ignoring reader line");
                    }
                }
            }
        }
    }

    async fn acknowledge(&mut self, outcome: AccessOutcome) -> Result<(), DeviceError> {
        self.writer.write_all(outcome.wire_line()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Badge reader on a serial device file
pub type SerialPortReader = SerialBadgeReader<BufReader<ReadHalf<File>>, WriteHalf<File>>;

/// Opens the serial device file (e.g. `/dev/ttyACM0`)
pub struct SerialBadgeConnector {
    path: PathBuf,
}

impl SerialBadgeConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DeviceConnector for SerialBadgeConnector {
    type Device = SerialPortReader;

    fn name(&self) -> &'static str {
        "badge_reader"
    }

    async fn connect(&self) -> Result<Self::Device, DeviceError> {
        if self.path.as_os_str().is_empty() {
            return Err(DeviceError::Misconfigured("serial port path is empty".to_string()));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    DeviceError::Unavailable(format!("{} not found", self.path.display()))
                }
                _ => DeviceError::Io(e),
            })?;

        let (read_half, write_half) = tokio::io::split(file);
        tracing::info!(path = %self.path.display(), "Serial badge reader opened");
        Ok(SerialBadgeReader::new(BufReader::new(read_half), write_half))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, AsyncReadExt};

    #[test]
    fn test_parse_uid_line() {
        assert_eq!(parse_uid_line("UID:61D1AA17\r\n").as_deref(), Some("61D1AA17"));
        assert_eq!(parse_uid_line("UID: 333647F7").as_deref(), Some("333647F7"));
        assert_eq!(parse_uid_line("RFID_READY"), None);
        assert_eq!(parse_uid_line("UID:"), None);
    }

    #[tokio::test]
    async fn test_reads_uids_and_acknowledges() {
        let (mut device, host) = duplex(256);
        let (host_read, host_write) = tokio::io::split(host);
        let mut reader = SerialBadgeReader::new(BufReader::new(host_read), host_write);

        device
            .write_all(b"RFID_READY\nUID:61D1AA17\n\nUID:A1B2C3D4\n")
            .await
            .unwrap();

        assert_eq!(reader.next_uid().await.unwrap(), "61D1AA17");
        reader.acknowledge(AccessOutcome::Grant).await.unwrap();
        assert_eq!(reader.next_uid().await.unwrap(), "A1B2C3D4");
        reader.acknowledge(AccessOutcome::Deny).await.unwrap();

        let mut reply = [0u8; 10];
        device.read_exact(&mut reply).await.unwrap();
        assert_eq!(&reply, b"AUTH\nDENY\n");
    }

    #[tokio::test]
    async fn test_eof_is_transient_disconnect() {
        let (device, host) = duplex(64);
        let (host_read, host_write) = tokio::io::split(host);
        let mut reader = SerialBadgeReader::new(BufReader::new(host_read), host_write);
        drop(device);

        let err = reader.next_uid().await.unwrap_err();
        assert!(matches!(err, DeviceError::Disconnected));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_missing_device_file_is_unavailable() {
        let connector = SerialBadgeConnector::new("/nonexistent/ttyACM9");
        let err = connector.connect().await.err().unwrap();
        assert!(matches!(err, DeviceError::Unavailable(_)));
    }
}
