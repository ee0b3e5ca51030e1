//! An in-memory stand-in for an FTP server

use super::session::{Connector, Session, SessionError};
use crate::interrupt::Interrupt;
use parking_lot::Mutex;
use std::{
    collections::{BTreeMap, BTreeSet},
    io::Write,
    sync::Arc,
};

const BUSY: &str = "Sorry, the maximum number of clients (50) for this user are already connected.";

#[derive(Clone, Default)]
pub(crate) struct FakeServer {
    files: Arc<BTreeMap<String, Vec<u8>>>,
    empty_dirs: Arc<BTreeSet<String>>,
    refusals: Arc<Mutex<u32>>,
    tripwire: Arc<Mutex<Option<(usize, Interrupt)>>>,
}

impl FakeServer {
    pub(crate) fn with_files<'a, I>(files: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        Self {
            files: Arc::new(
                files
                    .into_iter()
                    .map(|(path, data)| (path.to_owned(), data.to_vec()))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    /// Add folders that exist but contain nothing
    pub(crate) fn with_empty_dirs<'a, I>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.empty_dirs = Arc::new(dirs.into_iter().map(str::to_owned).collect());
        self
    }

    /// Trigger `interrupt` once the next transfer has sent `bytes` bytes
    pub(crate) fn interrupt_after(&self, bytes: usize, interrupt: Interrupt) {
        *self.tripwire.lock() = Some((bytes, interrupt));
    }

    /// Turn away the next `count` connections with a "too many clients" reply
    pub(crate) fn refuse_connections(&self, count: u32) {
        *self.refusals.lock() = count;
    }

    fn is_dir(&self, path: &str) -> bool {
        let path = path.trim_end_matches('/');
        let prefix = format!("{path}/");

        self.empty_dirs.contains(path)
            || self
                .files
                .keys()
                .chain(self.empty_dirs.iter())
                .any(|file| file.starts_with(&prefix))
    }
}

impl Connector for FakeServer {
    type Session = FakeSession;

    fn connect(&self) -> Result<FakeSession, SessionError> {
        let mut refusals = self.refusals.lock();
        if *refusals > 0 {
            *refusals -= 1;
            return Err(SessionError::Rejected {
                code: 530,
                message: BUSY.to_owned(),
            });
        }

        Ok(FakeSession {
            server: self.clone(),
            cwd: "/".to_owned(),
        })
    }
}

pub(crate) struct FakeSession {
    server: FakeServer,
    cwd: String,
}

impl FakeSession {
    fn resolve(&self, name: &str) -> String {
        if name.starts_with('/') {
            name.trim_end_matches('/').to_owned()
        } else {
            format!("{}/{name}", self.cwd.trim_end_matches('/'))
        }
    }

    fn file(&self, name: &str) -> Result<&[u8], SessionError> {
        self.server
            .files
            .get(&self.resolve(name))
            .map(Vec::as_slice)
            .ok_or_else(unavailable)
    }
}

fn unavailable() -> SessionError {
    SessionError::Rejected {
        code: 550,
        message: "No such file or directory".to_owned(),
    }
}

impl Session for FakeSession {
    fn list(&mut self) -> Result<Vec<String>, SessionError> {
        let prefix = format!("{}/", self.cwd.trim_end_matches('/'));
        let mut names: BTreeSet<String> = self
            .server
            .files
            .keys()
            .chain(self.server.empty_dirs.iter())
            .filter_map(|path| path.strip_prefix(&prefix))
            .map(|rest| rest.split('/').next().unwrap_or(rest).to_owned())
            .collect();

        if names.is_empty() {
            return Err(unavailable());
        }

        Ok(names.into_iter().collect())
    }

    fn enter(&mut self, dir: &str) -> Result<(), SessionError> {
        let path = self.resolve(dir);
        if path.is_empty() || self.server.is_dir(&path) {
            self.cwd = if path.is_empty() { "/".to_owned() } else { path };
            Ok(())
        } else {
            Err(unavailable())
        }
    }

    fn leave(&mut self) -> Result<(), SessionError> {
        self.cwd = match self.cwd.trim_end_matches('/').rsplit_once('/') {
            Some((parent, _)) if !parent.is_empty() => parent.to_owned(),
            _ => "/".to_owned(),
        };
        Ok(())
    }

    fn size(&mut self, file: &str) -> Result<u64, SessionError> {
        Ok(self.file(file)?.len() as u64)
    }

    fn retrieve(
        &mut self,
        file: &str,
        offset: u64,
        sink: &mut dyn Write,
    ) -> Result<u64, SessionError> {
        let data = self.file(file)?;
        let rest = data.get(offset as usize..).unwrap_or_default();

        let tripwire = self.server.tripwire.lock().take();
        match tripwire {
            Some((bytes, interrupt)) => {
                let (head, tail) = rest.split_at(bytes.min(rest.len()));
                sink.write_all(head)?;
                sink.flush()?;
                interrupt.trigger();
                sink.write_all(tail)?;
            }
            None => sink.write_all(rest)?,
        }

        Ok(rest.len() as u64)
    }
}
