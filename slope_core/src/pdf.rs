//! # PDF Document Sink
//!
//! Encodes a composed [`ReportDocument`] to PDF using Typst.
//!
//! ## Architecture
//!
//! - Document blocks are lowered to Typst markup; user-provided text is
//!   escaped, never interpreted
//! - Embedded PNGs become virtual files in the compilation world
//! - Output is raw PDF bytes (`Vec<u8>`), persisted by [`PdfSink::save`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use slope_core::pdf::PdfSink;
//! use slope_core::report::{Block, DocumentSink, ReportDocument};
//!
//! let mut document = ReportDocument::default();
//! document.blocks.push(Block::Heading {
//!     level: 1,
//!     text: "Slope Stability Analysis".to_string(),
//! });
//! PdfSink::new().save(&document, "report.pdf".as_ref()).unwrap();
//! ```

use std::collections::HashMap;
use std::path::Path;

use chrono::Utc;
use typst::diag::{FileError, FileResult};
use typst::foundations::{Bytes, Datetime};
use typst::syntax::{FileId, Source, VirtualPath};
use typst::text::{Font, FontBook};
use typst::utils::LazyHash;
use typst::{Library, LibraryExt, World};
use typst_pdf::PdfOptions;

use crate::errors::{SlopeError, SlopeResult};
use crate::report::{Block, DocumentSink, Inline, ReportDocument};

// ============================================================================
// Typst World Implementation
// ============================================================================

/// A self-contained Typst world: one main source plus in-memory virtual
/// files for embedded images.
struct ReportWorld {
    /// The main source document
    main: Source,
    /// Virtual files referenced by the source (embedded PNGs)
    files: HashMap<FileId, Bytes>,
    /// Font book
    book: LazyHash<FontBook>,
    /// Available fonts
    fonts: Vec<Font>,
    /// Library (standard functions)
    library: LazyHash<Library>,
}

impl ReportWorld {
    fn new(source: String, files: HashMap<FileId, Bytes>) -> Self {
        let fonts = Self::load_fonts();
        let book = FontBook::from_fonts(&fonts);
        let main_id = FileId::new(None, VirtualPath::new("/main.typ"));

        ReportWorld {
            main: Source::new(main_id, source),
            files,
            book: LazyHash::new(book),
            fonts,
            library: LazyHash::new(Library::default()),
        }
    }

    fn load_fonts() -> Vec<Font> {
        let mut fonts = Vec::new();
        for font_bytes in typst_assets::fonts() {
            let buffer = Bytes::new(font_bytes.to_vec());
            for font in Font::iter(buffer) {
                fonts.push(font);
            }
        }
        fonts
    }
}

impl World for ReportWorld {
    fn library(&self) -> &LazyHash<Library> {
        &self.library
    }

    fn book(&self) -> &LazyHash<FontBook> {
        &self.book
    }

    fn main(&self) -> FileId {
        self.main.id()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.main.id() {
            Ok(self.main.clone())
        } else {
            Err(FileError::NotFound(id.vpath().as_rootless_path().into()))
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        self.files
            .get(&id)
            .cloned()
            .ok_or_else(|| FileError::NotFound(id.vpath().as_rootless_path().into()))
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.fonts.get(index).cloned()
    }

    fn today(&self, _offset: Option<i64>) -> Option<Datetime> {
        let now = Utc::now();
        Datetime::from_ymd(
            now.format("%Y").to_string().parse().ok()?,
            now.format("%m").to_string().parse().ok()?,
            now.format("%d").to_string().parse().ok()?,
        )
    }
}

// ============================================================================
// Block Lowering
// ============================================================================

/// Escape special Typst characters in user-provided text
fn escape_typst(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '*' => "\\*".to_string(),
            '_' => "\\_".to_string(),
            '#' => "\\#".to_string(),
            '$' => "\\$".to_string(),
            '@' => "\\@".to_string(),
            '<' => "\\<".to_string(),
            '>' => "\\>".to_string(),
            '\\' => "\\\\".to_string(),
            '`' => "\\`".to_string(),
            _ => c.to_string(),
        })
        .collect()
}

/// Escaped text with interior newlines lowered to Typst line breaks.
fn escape_multiline(s: &str) -> String {
    escape_typst(s).replace('\n', " \\\n")
}

fn lower_inlines(runs: &[Inline]) -> String {
    let mut out = String::new();
    for run in runs {
        match run {
            Inline::Text(text) => out.push_str(&escape_multiline(text)),
            Inline::Bold(text) => {
                out.push('*');
                out.push_str(&escape_multiline(text));
                out.push('*');
            }
        }
    }
    out
}

/// Lower the document to Typst markup. Embedded PNGs are pulled out into
/// the returned virtual-file map and referenced by path from the source.
fn lower_document(document: &ReportDocument) -> (String, HashMap<FileId, Bytes>) {
    let mut files = HashMap::new();

    let mut source = format!(
        r##"
#set page(
  paper: "a4",
  margin: (top: 25mm, bottom: 25mm, left: 25mm, right: 25mm),
  footer: context [
    #line(length: 100%, stroke: 0.5pt + gray)
    #v(4pt)
    #grid(
      columns: (1fr, 1fr, 1fr),
      align(left)[#text(size: 9pt)[Ref: {reference}]],
      align(center)[#text(size: 9pt)[Page #counter(page).display()]],
      align(right)[#text(size: 9pt)[{date}]],
    )
  ]
)

#set text(size: 11pt)
#set heading(numbering: none)

"##,
        reference = escape_typst(&document.reference),
        date = escape_typst(&document.date),
    );

    for (index, block) in document.blocks.iter().enumerate() {
        match block {
            Block::Heading { level, text } => {
                source.push_str(&format!(
                    "#heading(level: {})[{}]\n\n",
                    (*level).clamp(1, 4),
                    escape_multiline(text)
                ));
            }
            Block::Paragraph(runs) => {
                source.push_str(&lower_inlines(runs));
                source.push_str("\n\n");
            }
            Block::Table { headers, rows } => {
                source.push_str(&format!(
                    "#table(\n  columns: {},\n  inset: 6pt,\n  stroke: 0.5pt,\n",
                    headers.len()
                ));
                source.push_str("  table.header(");
                for header in headers {
                    source.push_str(&format!("[*{}*], ", escape_typst(header)));
                }
                source.push_str("),\n");
                for row in rows {
                    source.push_str("  ");
                    for cell in row {
                        source.push_str(&format!("[{}], ", escape_typst(cell)));
                    }
                    source.push('\n');
                }
                source.push_str(")\n\n");
            }
            Block::Image { png, width_mm } => {
                let vpath = format!("/image-{index}.png");
                let id = FileId::new(None, VirtualPath::new(&vpath));
                files.insert(id, Bytes::new(png.clone()));
                source.push_str(&format!(
                    "#align(center)[#image(\"{vpath}\", width: {width_mm}mm)]\n\n"
                ));
            }
        }
    }

    (source, files)
}

// ============================================================================
// Sink
// ============================================================================

/// Typst-backed [`DocumentSink`]: lowers, compiles, and writes PDF bytes.
#[derive(Debug, Default)]
pub struct PdfSink;

impl PdfSink {
    pub fn new() -> Self {
        PdfSink
    }

    /// Encode a document to PDF bytes without touching the filesystem.
    pub fn render(&self, document: &ReportDocument) -> SlopeResult<Vec<u8>> {
        let (source, files) = lower_document(document);
        let world = ReportWorld::new(source, files);

        let warned = typst::compile(&world);
        let compiled = warned.output.map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
            SlopeError::document(format!("Typst compilation failed: {}", messages.join("; ")))
        })?;

        typst_pdf::pdf(&compiled, &PdfOptions::default()).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.message.to_string()).collect();
            SlopeError::document(format!("PDF rendering failed: {}", messages.join("; ")))
        })
    }
}

impl DocumentSink for PdfSink {
    fn save(&self, document: &ReportDocument, path: &Path) -> SlopeResult<()> {
        let bytes = self.render(document)?;
        std::fs::write(path, bytes)
            .map_err(|e| SlopeError::file_error("write", path.display().to_string(), e.to_string()))
    }
}
