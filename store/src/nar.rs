use std::io::Read;

use anyhow::{bail, Error};

const NAR_MAGIC: &str = "nix-archive-1";

/// One node visited while walking a NAR archive.
#[derive(Debug, Clone)]
pub enum NarEntry {
    Regular { executable: bool, size: u64 },
    Directory,
    Symlink { target: String },
}

/// A parsed NAR archive: the ordered sequence of nodes encountered during the walk.
///
/// An archive with zero entries is considered invalid by the maintenance pass even
/// though it may be structurally well-formed (see the component design notes on
/// cross-layer integrity checking).
pub struct NarArchive {
    entries: Vec<NarEntry>,
}

impl NarArchive {
    pub fn entries(&self) -> &[NarEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a byte stream as a NAR archive, walking every entry.
///
/// Returns an error if the stream is truncated or malformed before reaching the
/// end of the archive. A structurally complete archive with zero nodes (should
/// never happen for a well-formed root, but is defended against regardless) is
/// returned as `Ok` with an empty entry list; callers treat that as invalid too.
pub fn parse(data: &[u8]) -> Result<NarArchive, Error> {
    let mut reader = NarReader::new(data);
    let magic = reader.read_string()?;
    if magic != NAR_MAGIC {
        bail!("not a NAR archive: bad magic");
    }

    let mut entries = Vec::new();
    parse_object(&mut reader, &mut entries)?;

    Ok(NarArchive { entries })
}

fn parse_object(reader: &mut NarReader, entries: &mut Vec<NarEntry>) -> Result<(), Error> {
    reader.expect_string("(")?;
    reader.expect_string("type")?;
    let node_type = reader.read_string()?;

    match node_type.as_str() {
        "regular" => {
            let mut executable = false;
            let mut tag = reader.read_string()?;
            if tag == "executable" {
                reader.expect_string("")?;
                executable = true;
                tag = reader.read_string()?;
            }
            if tag != "contents" {
                bail!("NAR regular node: expected 'contents', got '{tag}'");
            }
            let contents = reader.read_bytes()?;
            entries.push(NarEntry::Regular {
                executable,
                size: contents.len() as u64,
            });
            reader.expect_string(")")?;
        }
        "symlink" => {
            reader.expect_string("target")?;
            let target = reader.read_string()?;
            entries.push(NarEntry::Symlink { target });
            reader.expect_string(")")?;
        }
        "directory" => {
            entries.push(NarEntry::Directory);
            loop {
                let tag = reader.read_string()?;
                if tag == ")" {
                    break;
                }
                if tag != "entry" {
                    bail!("NAR directory node: expected 'entry' or ')', got '{tag}'");
                }
                reader.expect_string("(")?;
                reader.expect_string("name")?;
                let _name = reader.read_string()?;
                reader.expect_string("node")?;
                parse_object(reader, entries)?;
                reader.expect_string(")")?;
            }
        }
        other => bail!("NAR node: unknown type '{other}'"),
    }

    Ok(())
}

struct NarReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> NarReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        NarReader { data, pos: 0 }
    }

    fn read_bytes(&mut self) -> Result<Vec<u8>, Error> {
        let mut len_buf = [0u8; 8];
        self.read_exact(&mut len_buf)?;
        let len = u64::from_le_bytes(len_buf) as usize;

        if len > self.data.len() - self.pos {
            bail!("NAR stream truncated");
        }

        let mut buf = vec![0u8; len];
        self.read_exact(&mut buf)?;

        let padded = len.div_ceil(8) * 8;
        let pad = padded - len;
        if pad > 0 {
            let mut padding = vec![0u8; pad];
            self.read_exact(&mut padding)?;
        }

        Ok(buf)
    }

    fn read_string(&mut self) -> Result<String, Error> {
        let bytes = self.read_bytes()?;
        String::from_utf8(bytes).map_err(|_| anyhow::format_err!("NAR stream: invalid utf-8 string"))
    }

    fn expect_string(&mut self, expected: &str) -> Result<(), Error> {
        let got = self.read_string()?;
        if got != expected {
            bail!("NAR stream: expected '{expected}', got '{got}'");
        }
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let mut slice = &self.data[self.pos..];
        if slice.len() < buf.len() {
            bail!("NAR stream truncated");
        }
        slice.read_exact(buf)?;
        self.pos += buf.len();
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode_string(s: &str, out: &mut Vec<u8>) {
        let len = s.len() as u64;
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(s.as_bytes());
        let padded = s.len().div_ceil(8) * 8;
        out.resize(out.len() + (padded - s.len()), 0);
    }

    fn encode_regular_file(contents: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        encode_string(NAR_MAGIC, &mut out);
        encode_string("(", &mut out);
        encode_string("type", &mut out);
        encode_string("regular", &mut out);
        encode_string("contents", &mut out);
        encode_string(std::str::from_utf8(contents).unwrap(), &mut out);
        encode_string(")", &mut out);
        out
    }

    #[test]
    fn parses_single_regular_file() {
        let data = encode_regular_file(b"hello world");
        let archive = parse(&data).unwrap();
        assert_eq!(archive.entries().len(), 1);
        assert!(!archive.is_empty());
    }

    #[test]
    fn rejects_truncated_stream() {
        let mut data = encode_regular_file(b"hello world");
        data.truncate(data.len() - 4);
        assert!(parse(&data).is_err());
    }

    #[test]
    fn rejects_bad_magic() {
        let mut out = Vec::new();
        encode_string("not-a-nar", &mut out);
        assert!(parse(&out).is_err());
    }

    #[test]
    fn parses_directory_with_entries() {
        let mut out = Vec::new();
        encode_string(NAR_MAGIC, &mut out);
        encode_string("(", &mut out);
        encode_string("type", &mut out);
        encode_string("directory", &mut out);
        encode_string("entry", &mut out);
        encode_string("(", &mut out);
        encode_string("name", &mut out);
        encode_string("foo", &mut out);
        encode_string("node", &mut out);
        encode_string("(", &mut out);
        encode_string("type", &mut out);
        encode_string("regular", &mut out);
        encode_string("contents", &mut out);
        encode_string("data", &mut out);
        encode_string(")", &mut out);
        encode_string(")", &mut out);
        encode_string(")", &mut out);

        let archive = parse(&out).unwrap();
        // directory node + regular file node
        assert_eq!(archive.entries().len(), 2);
    }
}
