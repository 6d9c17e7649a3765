//! Transparent compression for sources and shards.
//!
//! Large warehouse extracts usually arrive compressed, and shards are often
//! uploaded compressed. This module lets the splitter read and write either
//! form without the caller doing anything beyond naming files.
//!
//! ## Detection
//! - **Readers**: file extension first, then magic bytes at the head of the
//!   stream, otherwise plain text.
//! - **Writers**: file extension of the rendered shard name only.
//!
//! ## Built-in codecs
//! Enabled per feature flag:
//! - **Gzip** (`.gz`) via `flate2` (feature `compression-gzip`)
//! - **Zstd** (`.zst`) via `zstd` (feature `compression-zstd`)
//! - **Bzip2** (`.bz2`) via `bzip2` (feature `compression-bzip2`)
//! - **Xz** (`.xz`) via `xz2` (feature `compression-xz`)
//!
//! ## Finishing writers
//! Compressed formats need a trailer written after the last byte. Writers are
//! returned as [`FinishWrite`] and must be closed with
//! [`FinishWrite::finish`] so that trailer and flush errors reach the caller.

use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// A writer that must be explicitly finalized.
pub trait FinishWrite: Write {
    /// Write any trailer, flush every layer, and release the sink.
    fn finish(self: Box<Self>) -> io::Result<()>;
}

impl<W: Write> FinishWrite for BufWriter<W> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        let mut inner = (*self).into_inner().map_err(io::IntoInnerError::into_error)?;
        inner.flush()
    }
}

/// Pluggable compression codec.
///
/// Implementations are stateless descriptors; they are shared as `'static`
/// references and must be `Send + Sync`.
pub trait CompressionCodec: Send + Sync {
    /// Human-readable codec name (e.g., "gzip", "zstd").
    fn name(&self) -> &str;

    /// File extensions associated with this codec, lowercase with leading dot.
    fn extensions(&self) -> &[&str];

    /// Optional magic byte signature for content-based detection.
    fn magic_bytes(&self) -> Option<&[u8]>;

    /// Wrap a reader with decompression.
    fn wrap_reader(&self, reader: Box<dyn Read>) -> io::Result<Box<dyn Read>>;

    /// Wrap a buffered sink with compression.
    fn wrap_writer(&self, writer: BufWriter<Box<dyn Write>>) -> io::Result<Box<dyn FinishWrite>>;
}

static BUILTIN_CODECS: &[&dyn CompressionCodec] = &[
    #[cfg(feature = "compression-gzip")]
    &GzipCodec,
    #[cfg(feature = "compression-zstd")]
    &ZstdCodec,
    #[cfg(feature = "compression-bzip2")]
    &Bzip2Codec,
    #[cfg(feature = "compression-xz")]
    &XzCodec,
];

/// Codecs compiled into this build.
#[must_use]
pub fn codecs() -> &'static [&'static dyn CompressionCodec] {
    BUILTIN_CODECS
}

/// Codec whose extension matches the end of `path`, case-insensitively.
#[must_use]
pub fn codec_for_path(path: impl AsRef<Path>) -> Option<&'static dyn CompressionCodec> {
    let path_str = path.as_ref().to_string_lossy().to_lowercase();
    codecs()
        .iter()
        .copied()
        .find(|codec| codec.extensions().iter().any(|ext| path_str.ends_with(ext)))
}

/// Peek at the head of the stream without consuming it.
fn codec_for_magic<R: BufRead>(reader: &mut R) -> io::Result<Option<&'static dyn CompressionCodec>> {
    let buf = reader.fill_buf()?;
    if buf.is_empty() {
        return Ok(None);
    }
    Ok(codecs().iter().copied().find(|codec| {
        codec
            .magic_bytes()
            .is_some_and(|magic| buf.len() >= magic.len() && buf.starts_with(magic))
    }))
}

/// Wrap `reader` with decompression if the path or content calls for it.
///
/// # Errors
/// Propagates I/O errors from peeking at the stream or building the decoder.
pub fn auto_detect_reader<R: Read + 'static>(
    reader: R,
    path_hint: impl AsRef<Path>,
) -> io::Result<Box<dyn Read>> {
    if let Some(codec) = codec_for_path(&path_hint) {
        tracing::debug!(target: "csvshard", codec = codec.name(), "decompressing source");
        return codec.wrap_reader(Box::new(BufReader::new(reader)));
    }

    let mut buf_reader = BufReader::new(reader);
    if let Some(codec) = codec_for_magic(&mut buf_reader)? {
        tracing::debug!(target: "csvshard", codec = codec.name(), "decompressing source (magic bytes)");
        return codec.wrap_reader(Box::new(buf_reader));
    }

    Ok(Box::new(buf_reader))
}

/// Wrap `writer` with compression chosen from the extension of `path_hint`.
///
/// # Errors
/// Propagates I/O errors from building the encoder.
pub fn auto_detect_writer<W: Write + 'static>(
    writer: W,
    path_hint: impl AsRef<Path>,
) -> io::Result<Box<dyn FinishWrite>> {
    let buffered = BufWriter::new(Box::new(writer) as Box<dyn Write>);
    match codec_for_path(&path_hint) {
        Some(codec) => codec.wrap_writer(buffered),
        None => Ok(Box::new(buffered)),
    }
}

// ============================================================================
// Built-in Codec Implementations
// ============================================================================

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl<W: Write> FinishWrite for flate2::write::GzEncoder<W> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        flate2::write::GzEncoder::finish(*self)?.flush()
    }
}

#[cfg(feature = "compression-gzip")]
impl CompressionCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> io::Result<Box<dyn Read>> {
        // Multi-member streams are common from parallel gzip tools.
        Ok(Box::new(flate2::read::MultiGzDecoder::new(reader)))
    }

    fn wrap_writer(&self, writer: BufWriter<Box<dyn Write>>) -> io::Result<Box<dyn FinishWrite>> {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        Ok(Box::new(GzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-zstd")]
struct ZstdCodec;

#[cfg(feature = "compression-zstd")]
impl<W: Write> FinishWrite for zstd::stream::write::Encoder<'static, W> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        zstd::stream::write::Encoder::finish(*self)?.flush()
    }
}

#[cfg(feature = "compression-zstd")]
impl CompressionCodec for ZstdCodec {
    fn name(&self) -> &str {
        "zstd"
    }

    fn extensions(&self) -> &[&str] {
        &[".zst", ".zstd"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x28, 0xb5, 0x2f, 0xfd])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> io::Result<Box<dyn Read>> {
        zstd::stream::read::Decoder::new(reader).map(|d| Box::new(d) as Box<dyn Read>)
    }

    fn wrap_writer(&self, writer: BufWriter<Box<dyn Write>>) -> io::Result<Box<dyn FinishWrite>> {
        zstd::stream::write::Encoder::new(writer, 3).map(|e| Box::new(e) as Box<dyn FinishWrite>)
    }
}

#[cfg(feature = "compression-bzip2")]
struct Bzip2Codec;

#[cfg(feature = "compression-bzip2")]
impl<W: Write> FinishWrite for bzip2::write::BzEncoder<W> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        bzip2::write::BzEncoder::finish(*self)?.flush()
    }
}

#[cfg(feature = "compression-bzip2")]
impl CompressionCodec for Bzip2Codec {
    fn name(&self) -> &str {
        "bzip2"
    }

    fn extensions(&self) -> &[&str] {
        &[".bz2", ".bzip2"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(b"BZh")
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> io::Result<Box<dyn Read>> {
        Ok(Box::new(bzip2::read::MultiBzDecoder::new(reader)))
    }

    fn wrap_writer(&self, writer: BufWriter<Box<dyn Write>>) -> io::Result<Box<dyn FinishWrite>> {
        use bzip2::Compression;
        use bzip2::write::BzEncoder;
        Ok(Box::new(BzEncoder::new(writer, Compression::default())))
    }
}

#[cfg(feature = "compression-xz")]
struct XzCodec;

#[cfg(feature = "compression-xz")]
impl<W: Write> FinishWrite for xz2::write::XzEncoder<W> {
    fn finish(self: Box<Self>) -> io::Result<()> {
        xz2::write::XzEncoder::finish(*self)?.flush()
    }
}

#[cfg(feature = "compression-xz")]
impl CompressionCodec for XzCodec {
    fn name(&self) -> &str {
        "xz"
    }

    fn extensions(&self) -> &[&str] {
        &[".xz"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00])
    }

    fn wrap_reader(&self, reader: Box<dyn Read>) -> io::Result<Box<dyn Read>> {
        Ok(Box::new(xz2::read::XzDecoder::new_multi_decoder(reader)))
    }

    fn wrap_writer(&self, writer: BufWriter<Box<dyn Write>>) -> io::Result<Box<dyn FinishWrite>> {
        Ok(Box::new(xz2::write::XzEncoder::new(writer, 6)))
    }
}
