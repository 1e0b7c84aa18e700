//! Chained byte-stream transformers.
//!
//! A [`Filter`] transforms the bytes it pulls from its upstream into
//! the bytes it hands to its consumer.  Filters stack in a
//! [`Pipeline`]: the consumer pulls from the topmost filter, which
//! pulls from the one below it, down to the pipeline's source.  All
//! I/O happens inside the bottom-most pull; filters never block
//! anywhere else.
//!
//! The lifecycle mirrors the classic control events of a streaming
//! filter: construction plus [`Filter::init`] (INIT), repeated
//! [`Filter::pull`] (UNDERFLOW), and [`Filter::close`] (FREE).
//! `close` is guaranteed to run on every filter even when the
//! pipeline unwinds early: dropping an unclosed [`Pipeline`] fires
//! it.
//!
//! Pipelines are single-threaded; exactly one consumer drives a
//! pipeline.

use std::io;

use crate::Result;
use crate::crypto::DigestSet;

/// Result of a [`Filter::pull`] or [`Source::pull`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Produced {
    /// The number of bytes written into the buffer; never zero.
    Bytes(usize),
    /// The stream is exhausted.
    Eof,
}

/// Something bytes can be pulled from.
pub trait Source {
    /// Produces up to `buf.len()` bytes into `buf`.
    fn pull(&mut self, buf: &mut [u8]) -> Result<Produced>;
}

/// A byte-stream transformer.
pub trait Filter {
    /// A short name for diagnostics.
    fn name(&self) -> &'static str;

    /// Called once before the first pull.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Produces up to `buf.len()` bytes into `buf`, pulling from
    /// `upstream` as needed.
    fn pull(&mut self, upstream: &mut dyn Source, buf: &mut [u8])
            -> Result<Produced>;

    /// Pushes any buffered output downstream.
    ///
    /// Only meaningful for filters that transform in the write
    /// direction; read-side filters ignore it.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called exactly once on every exit path, including error
    /// unwinds.
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

struct IoSource<R>(R);

impl<R: io::Read> Source for IoSource<R> {
    fn pull(&mut self, buf: &mut [u8]) -> Result<Produced> {
        loop {
            match self.0.read(buf) {
                Ok(0) => return Ok(Produced::Eof),
                Ok(n) => return Ok(Produced::Bytes(n)),
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted =>
                    continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

// The consumer-facing view of the bottom source plus the filters
// below the one currently pulling.
struct Stack<'b, 'a> {
    bottom: &'b mut (dyn Source + 'a),
    filters: &'b mut [Box<dyn Filter + 'a>],
}

impl<'b, 'a> Source for Stack<'b, 'a> {
    fn pull(&mut self, buf: &mut [u8]) -> Result<Produced> {
        match self.filters.split_last_mut() {
            Some((top, rest)) => {
                let mut lower = Stack {
                    bottom: &mut *self.bottom,
                    filters: rest,
                };
                top.pull(&mut lower, buf)
            }
            None => self.bottom.pull(buf),
        }
    }
}

/// A stack of filters over a byte source.
///
/// The last filter pushed is the topmost; the consumer pulls from it
/// through [`Pipeline::pull`] or the [`io::Read`] impl.
pub struct Pipeline<'a> {
    bottom: Box<dyn Source + 'a>,
    filters: Vec<Box<dyn Filter + 'a>>,
    closed: bool,
}

impl<'a> Pipeline<'a> {
    /// Creates a pipeline over `reader` with no filters.
    pub fn new<R: io::Read + 'a>(reader: R) -> Self {
        Pipeline {
            bottom: Box::new(IoSource(reader)),
            filters: Vec::new(),
            closed: false,
        }
    }

    /// Pushes `filter` on top of the stack, firing its
    /// [`Filter::init`].
    pub fn push<F: Filter + 'a>(&mut self, filter: F) -> Result<()> {
        let mut filter = Box::new(filter);
        filter.init()?;
        self.filters.push(filter);
        Ok(())
    }

    /// Pulls bytes through the whole stack.
    pub fn pull(&mut self, buf: &mut [u8]) -> Result<Produced> {
        let mut stack = Stack {
            bottom: self.bottom.as_mut(),
            filters: &mut self.filters[..],
        };
        stack.pull(buf)
    }

    /// Closes every filter, top-down.
    ///
    /// Returns the first error, but runs every filter's close
    /// regardless.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let mut result = Ok(());
        for filter in self.filters.iter_mut().rev() {
            if let Err(e) = filter.close() {
                log::debug!("closing {} filter: {}", filter.name(), e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    /// Removes the topmost filter and returns it, without firing its
    /// close.
    pub fn pop(&mut self) -> Option<Box<dyn Filter + 'a>> {
        self.filters.pop()
    }
}

impl<'a> Drop for Pipeline<'a> {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

impl<'a> io::Read for Pipeline<'a> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.pull(buf) {
            Ok(Produced::Bytes(n)) => Ok(n),
            Ok(Produced::Eof) => Ok(0),
            Err(e) => Err(io::Error::new(io::ErrorKind::Other, e)),
        }
    }
}

/// A message-digest tap.
///
/// Forwards bytes unchanged while updating the attached
/// [`DigestSet`].  Inserted immediately below the consumer, it
/// observes bytes in the exact order and quantity delivered — the
/// invariant signature verification depends on.
pub struct DigestFilter {
    md: DigestSet,
}

impl DigestFilter {
    /// Wraps a digest set.
    pub fn new(md: DigestSet) -> Self {
        DigestFilter { md }
    }

    /// Returns the digests accumulated so far.
    pub fn digests(&self) -> &DigestSet {
        &self.md
    }

    /// Consumes the filter, returning the digest set.
    pub fn into_digests(self) -> DigestSet {
        self.md
    }
}

impl Filter for DigestFilter {
    fn name(&self) -> &'static str {
        "md"
    }

    fn pull(&mut self, upstream: &mut dyn Source, buf: &mut [u8])
            -> Result<Produced> {
        let produced = upstream.pull(buf)?;
        if let Produced::Bytes(n) = produced {
            self.md.update(&buf[..n]);
        }
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;
    use std::io::Read;
    use std::rc::Rc;

    use crate::types::HashAlgorithm;

    #[test]
    fn empty_pipeline_is_passthrough() {
        let mut p = Pipeline::new(&b"some bytes"[..]);
        let mut out = Vec::new();
        p.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"some bytes");
    }

    struct SliceSource<'a>(&'a [u8]);

    impl<'a> Source for SliceSource<'a> {
        fn pull(&mut self, buf: &mut [u8]) -> Result<Produced> {
            if self.0.is_empty() {
                return Ok(Produced::Eof);
            }
            let n = std::cmp::min(buf.len(), self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(Produced::Bytes(n))
        }
    }

    #[test]
    fn digest_tap_sees_every_byte() {
        let data = b"the quality of mercy is not strained";

        let mut md = DigestSet::new();
        md.enable(HashAlgorithm::SHA1).unwrap();
        md.enable(HashAlgorithm::RipeMD).unwrap();

        let mut tap = DigestFilter::new(md);
        let mut src = SliceSource(data);
        let mut out = Vec::new();
        // Small reads so the tap sees several chunks.
        let mut buf = [0u8; 7];
        loop {
            match tap.pull(&mut src, &mut buf).unwrap() {
                Produced::Bytes(n) => out.extend_from_slice(&buf[..n]),
                Produced::Eof => break,
            }
        }
        assert_eq!(out, data);

        let md = tap.into_digests();
        let mut direct = HashAlgorithm::SHA1.context().unwrap();
        direct.update(data);
        assert_eq!(md.copy_context(HashAlgorithm::SHA1).unwrap()
                       .into_digest().unwrap(),
                   direct.into_digest().unwrap());
    }

    struct Tracer {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
    }

    impl Filter for Tracer {
        fn name(&self) -> &'static str {
            self.name
        }

        fn init(&mut self) -> Result<()> {
            self.log.borrow_mut().push(format!("init {}", self.name));
            Ok(())
        }

        fn pull(&mut self, upstream: &mut dyn Source, buf: &mut [u8])
                -> Result<Produced> {
            upstream.pull(buf)
        }

        fn close(&mut self) -> Result<()> {
            self.log.borrow_mut().push(format!("close {}", self.name));
            Ok(())
        }
    }

    #[test]
    fn close_fires_on_drop_in_reverse_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let mut p = Pipeline::new(&b""[..]);
            p.push(Tracer { name: "a", log: log.clone() }).unwrap();
            p.push(Tracer { name: "b", log: log.clone() }).unwrap();
            // Dropped without an explicit close.
        }
        assert_eq!(*log.borrow(),
                   vec!["init a", "init b", "close b", "close a"]);
    }

    #[test]
    fn close_is_idempotent() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut p = Pipeline::new(&b""[..]);
        p.push(Tracer { name: "a", log: log.clone() }).unwrap();
        p.close().unwrap();
        p.close().unwrap();
        drop(p);
        assert_eq!(*log.borrow(), vec!["init a", "close a"]);
    }
}
