//! Word (Office Open XML) text extraction.
//!
//! Output is the body paragraphs, one per line, followed by every table row
//! with its cell texts joined by spaces.

use crate::error::ExtractError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

const DOCUMENT_PART: &str = "word/document.xml";

pub fn extract_docx_text(path: &Path) -> Result<String, ExtractError> {
    let file = File::open(path)?;
    let mut archive = ZipArchive::new(file)?;

    let mut xml = String::new();
    archive.by_name(DOCUMENT_PART)?.read_to_string(&mut xml)?;

    parse_document_xml(&xml)
}

pub fn parse_document_xml(xml: &str) -> Result<String, ExtractError> {
    let mut reader = Reader::from_str(xml);
    let mut body = BodyCollector::default();

    loop {
        match reader.read_event()? {
            Event::Start(element) => body.open(element.local_name().as_ref()),
            Event::Empty(element) => body.empty(element.local_name().as_ref()),
            Event::End(element) => body.close(element.local_name().as_ref()),
            Event::Text(text) if body.in_text => body.paragraph.push_str(&text.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(body.finish())
}

#[derive(Default)]
struct BodyCollector {
    paragraphs: Vec<String>,
    rows: Vec<String>,
    table_depth: usize,
    paragraph_depth: usize,
    in_text: bool,
    paragraph: String,
    row: Vec<String>,
    cell: Vec<String>,
}

impl BodyCollector {
    fn open(&mut self, name: &[u8]) {
        match name {
            b"tbl" => self.table_depth += 1,
            b"tr" if self.table_depth == 1 => self.row.clear(),
            b"tc" if self.table_depth == 1 => self.cell.clear(),
            b"p" => {
                // text boxes nest paragraphs inside runs; they merge into the outer one
                if self.paragraph_depth == 0 {
                    self.paragraph.clear();
                }
                self.paragraph_depth += 1;
            }
            b"t" => self.in_text = true,
            _ => {}
        }
    }

    fn empty(&mut self, name: &[u8]) {
        match name {
            b"tab" if self.paragraph_depth > 0 => self.paragraph.push('\t'),
            b"br" | b"cr" if self.paragraph_depth > 0 => self.paragraph.push('\n'),
            b"p" if self.paragraph_depth == 0 => self.push_paragraph(String::new()),
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"t" => self.in_text = false,
            b"p" => {
                self.paragraph_depth = self.paragraph_depth.saturating_sub(1);
                if self.paragraph_depth == 0 {
                    let text = std::mem::take(&mut self.paragraph);
                    self.push_paragraph(text);
                }
            }
            b"tc" if self.table_depth == 1 => {
                let cell = self.cell.join("\n");
                self.row.push(cell);
                self.cell.clear();
            }
            b"tr" if self.table_depth == 1 => {
                let row = self.row.join(" ");
                self.rows.push(row);
                self.row.clear();
            }
            b"tbl" => self.table_depth = self.table_depth.saturating_sub(1),
            _ => {}
        }
    }

    fn push_paragraph(&mut self, text: String) {
        if self.table_depth == 0 {
            self.paragraphs.push(text);
        } else {
            self.cell.push(text);
        }
    }

    fn finish(self) -> String {
        self.paragraphs
            .into_iter()
            .chain(self.rows)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
