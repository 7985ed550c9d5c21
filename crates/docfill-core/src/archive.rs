//! Archive handling for DOCX templates
//!
//! DOCX files are ZIP archives containing XML parts and resources. The
//! renderer unpacks the whole template into memory, rewrites the content
//! parts, and repacks a fresh archive, so the template bytes on disk are
//! never touched.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::Path;

use zip::read::ZipArchive;
use zip::write::ZipWriter;
use zip::CompressionMethod;

use crate::error::{RenderError, Result};

/// Path of the main document part
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Represents an unpacked DOCX template
#[derive(Debug)]
pub struct OoxmlArchive {
    /// All files in the archive, keyed by path
    files: HashMap<String, Vec<u8>>,
}

impl OoxmlArchive {
    /// Open and unpack a DOCX file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Create from any reader that implements Read + Seek
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let mut files = HashMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            // Skip directories
            if name.ends_with('/') {
                continue;
            }

            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;
            files.insert(name, contents);
        }

        Ok(Self { files })
    }

    /// Create an empty archive (mainly for tests)
    pub fn empty() -> Self {
        Self {
            files: HashMap::new(),
        }
    }

    /// Get a file's contents by path
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.files.get(path).map(|v| v.as_slice())
    }

    /// Get the main document content (word/document.xml)
    pub fn document_xml(&self) -> Result<&[u8]> {
        self.get(DOCUMENT_PART)
            .ok_or_else(|| RenderError::MissingFile(DOCUMENT_PART.to_string()))
    }

    /// Paths of every header and footer part present in the template
    ///
    /// Word names these `word/header1.xml`, `word/footer2.xml`, and so on;
    /// the set varies per template, so we enumerate rather than probe fixed
    /// indices. Sorted for deterministic processing order.
    pub fn header_footer_parts(&self) -> Vec<String> {
        let mut parts: Vec<String> = self
            .files
            .keys()
            .filter(|k| {
                let Some(name) = k.strip_prefix("word/") else {
                    return false;
                };
                !name.contains('/')
                    && name.ends_with(".xml")
                    && (name.starts_with("header") || name.starts_with("footer"))
            })
            .cloned()
            .collect();
        parts.sort();
        parts
    }

    /// All content parts the renderer must process: headers, footers, body
    pub fn content_parts(&self) -> Vec<String> {
        let mut parts = self.header_footer_parts();
        if self.contains(DOCUMENT_PART) {
            parts.push(DOCUMENT_PART.to_string());
        }
        parts
    }

    /// Check if a file exists in the archive
    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// Set or update a file's contents
    pub fn set(&mut self, path: impl Into<String>, contents: Vec<u8>) {
        self.files.insert(path.into(), contents);
    }

    /// Write the archive to a file
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_to(file)
    }

    /// Write the archive to any writer
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated);

        // Sort keys for deterministic output
        let mut paths: Vec<_> = self.files.keys().collect();
        paths.sort();

        for path in paths {
            let contents = &self.files[path];
            zip.start_file(path.as_str(), options)?;
            zip.write_all(contents)?;
        }

        zip.finish()?;
        Ok(())
    }

    /// Serialize the archive to an in-memory buffer
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = std::io::Cursor::new(Vec::new());
        self.write_to(&mut buffer)?;
        Ok(buffer.into_inner())
    }
}
