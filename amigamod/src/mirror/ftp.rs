use super::session::{Connector, Session, SessionError};
use std::{
    io::{self, Write},
    net::ToSocketAddrs,
    time::Duration,
};
use suppaftp::{FtpError, FtpStream, types::FileType};
use tracing::debug;

/// Opens anonymous FTP sessions
#[derive(Debug, Clone)]
pub struct FtpConnector {
    host: String,
    port: u16,
    timeout: Duration,
}

impl FtpConnector {
    /// The standard FTP control port
    pub const DEFAULT_PORT: u16 = 21;

    /// Connect to `host` on the standard port
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port: Self::DEFAULT_PORT,
            timeout,
        }
    }

    /// Use a different control port
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }
}

impl Connector for FtpConnector {
    type Session = FtpSession;

    fn connect(&self) -> Result<FtpSession, SessionError> {
        let addr = (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| SessionError::Protocol(format!("Could not resolve {}", self.host)))?;

        debug!("Connecting to {} ({addr})", self.host);
        let mut stream = FtpStream::connect_timeout(addr, self.timeout)?;
        stream.get_ref().set_read_timeout(Some(self.timeout))?;
        stream.get_ref().set_write_timeout(Some(self.timeout))?;
        stream.login("anonymous", "anonymous@")?;

        Ok(FtpSession { stream })
    }
}

/// A logged-in FTP control connection
pub struct FtpSession {
    stream: FtpStream,
}

impl Session for FtpSession {
    fn list(&mut self) -> Result<Vec<String>, SessionError> {
        Ok(self.stream.nlst(None)?)
    }

    fn enter(&mut self, dir: &str) -> Result<(), SessionError> {
        Ok(self.stream.cwd(dir)?)
    }

    fn leave(&mut self) -> Result<(), SessionError> {
        Ok(self.stream.cdup()?)
    }

    fn size(&mut self, file: &str) -> Result<u64, SessionError> {
        // Servers only report exact sizes in binary mode
        self.stream.transfer_type(FileType::Binary)?;
        Ok(self.stream.size(file)? as u64)
    }

    fn retrieve(
        &mut self,
        file: &str,
        offset: u64,
        sink: &mut dyn Write,
    ) -> Result<u64, SessionError> {
        self.stream.transfer_type(FileType::Binary)?;
        if offset > 0 {
            let offset = usize::try_from(offset)
                .map_err(|_| SessionError::Protocol(format!("Offset {offset} is too large")))?;
            self.stream.resume_transfer(offset)?;
        }

        let written = self.stream.retr(file, |reader| {
            io::copy(reader, &mut *sink).map_err(FtpError::ConnectionError)
        })?;

        Ok(written)
    }
}

impl Drop for FtpSession {
    fn drop(&mut self) {
        // The server cleans up after a dropped connection too, so a failed goodbye is harmless
        let _ = self.stream.quit();
    }
}

impl From<FtpError> for SessionError {
    fn from(err: FtpError) -> Self {
        match err {
            FtpError::ConnectionError(err) => Self::Io(err),
            FtpError::UnexpectedResponse(response) => Self::Rejected {
                code: response.status.code(),
                message: String::from_utf8_lossy(&response.body).trim().to_owned(),
            },
            other => Self::Protocol(other.to_string()),
        }
    }
}
