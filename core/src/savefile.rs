//! Sequential typed access to a map or savegame file.
//!
//! A [`Savefile`] wraps either a file on disk or an immutable in-memory
//! buffer, and is opened in exactly one mode at a time. All multi-byte
//! values are little-endian, matching the original data files.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use thiserror::Error;

use crate::constants::STR_TERMINATOR;

#[derive(Debug, Error)]
pub enum SavefileError {
    #[error("savefile is already open")]
    AlreadyOpen,
    #[error("savefile is not open for reading")]
    NotOpenForRead,
    #[error("savefile is not open for writing")]
    NotOpenForWrite,
    #[error("writing is not supported for buffer-backed savefiles")]
    BufferWrite,
    #[error("string value is missing its terminator")]
    UnterminatedString,
    #[error("book {0} is not a supported version")]
    UnsupportedBook(u8),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl SavefileError {
    /// True when the failure means the stream ran out of bytes partway
    /// through a record.
    pub(crate) fn is_truncation(&self) -> bool {
        match self {
            SavefileError::UnterminatedString => true,
            SavefileError::Io(err) => err.kind() == io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}

/// Read source that can push the most recently read byte back.
trait ReadSrc: Read {
    fn unread_one(&mut self) -> io::Result<()>;
}

impl ReadSrc for BufReader<File> {
    fn unread_one(&mut self) -> io::Result<()> {
        self.seek_relative(-1)
    }
}

impl ReadSrc for Cursor<Vec<u8>> {
    fn unread_one(&mut self) -> io::Result<()> {
        self.set_position(self.position() - 1);
        Ok(())
    }
}

enum Backing {
    File(PathBuf),
    /// Immutable in-memory data, e.g. content handed over by an external
    /// decompression wrapper. Empty while an open cursor owns the bytes.
    Buffer(Vec<u8>),
}

enum Handle {
    Closed,
    ReadFile(BufReader<File>),
    ReadBuffer(Cursor<Vec<u8>>),
    Write(BufWriter<File>),
}

pub struct Savefile {
    backing: Backing,
    handle: Handle,
}

impl Savefile {
    /// A savefile backed by a path on disk.
    pub fn new<P: Into<PathBuf>>(filename: P) -> Self {
        Savefile {
            backing: Backing::File(filename.into()),
            handle: Handle::Closed,
        }
    }

    /// A read-only savefile backed by an in-memory buffer.
    pub fn from_buffer(data: Vec<u8>) -> Self {
        Savefile {
            backing: Backing::Buffer(data),
            handle: Handle::Closed,
        }
    }

    /// Re-targets this savefile at a path, dropping any buffer backing.
    /// Takes effect the next time the file is opened.
    pub fn set_filename<P: Into<PathBuf>>(&mut self, filename: P) {
        self.backing = Backing::File(filename.into());
    }

    pub fn filename(&self) -> Option<&Path> {
        match &self.backing {
            Backing::File(path) => Some(path),
            Backing::Buffer(_) => None,
        }
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self.backing, Backing::Buffer(_))
    }

    /// Whether the backing target currently exists. Buffers always do.
    pub fn exists(&self) -> bool {
        match &self.backing {
            Backing::File(path) => path.exists(),
            Backing::Buffer(_) => true,
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.handle, Handle::Closed)
    }

    pub fn open_r(&mut self) -> Result<(), SavefileError> {
        if self.is_open() {
            return Err(SavefileError::AlreadyOpen);
        }
        self.handle = match &mut self.backing {
            Backing::File(path) => Handle::ReadFile(BufReader::new(File::open(path)?)),
            Backing::Buffer(data) => Handle::ReadBuffer(Cursor::new(std::mem::take(data))),
        };
        Ok(())
    }

    pub fn open_w(&mut self) -> Result<(), SavefileError> {
        if self.is_open() {
            return Err(SavefileError::AlreadyOpen);
        }
        let path = match &self.backing {
            Backing::File(path) => path,
            Backing::Buffer(_) => return Err(SavefileError::BufferWrite),
        };
        self.handle = Handle::Write(BufWriter::new(File::create(path)?));
        Ok(())
    }

    /// Releases the underlying handle. A no-op when already closed.
    pub fn close(&mut self) -> Result<(), SavefileError> {
        match std::mem::replace(&mut self.handle, Handle::Closed) {
            Handle::Closed | Handle::ReadFile(_) => Ok(()),
            Handle::ReadBuffer(cursor) => {
                if let Backing::Buffer(data) = &mut self.backing {
                    *data = cursor.into_inner();
                }
                Ok(())
            }
            Handle::Write(mut writer) => {
                writer.flush()?;
                Ok(())
            }
        }
    }

    /// Non-consuming end-of-input probe: reads one byte and, if there was
    /// one, pushes it back so the cursor position is unchanged.
    pub fn eof(&mut self) -> Result<bool, SavefileError> {
        let src = self.read_src()?;
        let mut probe = [0u8; 1];
        if src.read(&mut probe)? == 0 {
            Ok(true)
        } else {
            src.unread_one()?;
            Ok(false)
        }
    }

    fn read_src(&mut self) -> Result<&mut dyn ReadSrc, SavefileError> {
        match &mut self.handle {
            Handle::ReadFile(reader) => Ok(reader),
            Handle::ReadBuffer(cursor) => Ok(cursor),
            _ => Err(SavefileError::NotOpenForRead),
        }
    }

    fn write_dst(&mut self) -> Result<&mut BufWriter<File>, SavefileError> {
        match &mut self.handle {
            Handle::Write(writer) => Ok(writer),
            _ => Err(SavefileError::NotOpenForWrite),
        }
    }

    pub fn read_uchar(&mut self) -> Result<u8, SavefileError> {
        Ok(self.read_src()?.read_u8()?)
    }

    pub fn write_uchar(&mut self, value: u8) -> Result<(), SavefileError> {
        Ok(self.write_dst()?.write_u8(value)?)
    }

    pub fn read_short(&mut self) -> Result<u16, SavefileError> {
        Ok(self.read_src()?.read_u16::<LittleEndian>()?)
    }

    pub fn write_short(&mut self, value: u16) -> Result<(), SavefileError> {
        Ok(self.write_dst()?.write_u16::<LittleEndian>(value)?)
    }

    pub fn read_int(&mut self) -> Result<u32, SavefileError> {
        Ok(self.read_src()?.read_u32::<LittleEndian>()?)
    }

    pub fn write_int(&mut self, value: u32) -> Result<(), SavefileError> {
        Ok(self.write_dst()?.write_u32::<LittleEndian>(value)?)
    }

    pub fn read_sint(&mut self) -> Result<i32, SavefileError> {
        Ok(self.read_src()?.read_i32::<LittleEndian>()?)
    }

    pub fn write_sint(&mut self, value: i32) -> Result<(), SavefileError> {
        Ok(self.write_dst()?.write_i32::<LittleEndian>(value)?)
    }

    pub fn read_float(&mut self) -> Result<f32, SavefileError> {
        Ok(self.read_src()?.read_f32::<LittleEndian>()?)
    }

    pub fn write_float(&mut self, value: f32) -> Result<(), SavefileError> {
        Ok(self.write_dst()?.write_f32::<LittleEndian>(value)?)
    }

    pub fn read_double(&mut self) -> Result<f64, SavefileError> {
        Ok(self.read_src()?.read_f64::<LittleEndian>()?)
    }

    pub fn write_double(&mut self, value: f64) -> Result<(), SavefileError> {
        Ok(self.write_dst()?.write_f64::<LittleEndian>(value)?)
    }

    /// Reads a CR LF terminated string; the terminator is stripped.
    pub fn read_str(&mut self) -> Result<String, SavefileError> {
        let src = self.read_src()?;
        let mut raw = Vec::new();
        loop {
            let mut byte = [0u8; 1];
            if src.read(&mut byte)? == 0 {
                return Err(SavefileError::UnterminatedString);
            }
            raw.push(byte[0]);
            if raw.ends_with(STR_TERMINATOR) {
                raw.truncate(raw.len() - STR_TERMINATOR.len());
                return Ok(match String::from_utf8(raw) {
                    Ok(value) => value,
                    Err(err) => {
                        log::warn!("string value is not valid UTF-8, decoding lossily");
                        String::from_utf8_lossy(err.as_bytes()).into_owned()
                    }
                });
            }
        }
    }

    /// Writes a string followed by the CR LF terminator.
    pub fn write_str(&mut self, value: &str) -> Result<(), SavefileError> {
        let dst = self.write_dst()?;
        dst.write_all(value.as_bytes())?;
        dst.write_all(STR_TERMINATOR)?;
        Ok(())
    }
}
