//! PDF rendering: a title line, a header row and paginated rows laid out
//! right to left.
//!
//! Text is shaped with the bundled DejaVu Sans, embedded as a Type0 font with
//! Identity-H encoding, so Arabic labels and values come out joined and in
//! visual order. Every drawn string also carries its source text as
//! `/ActualText` for copy and search.

use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream, StringFormat};
use rustybuzz::ttf_parser::GlyphId;
use rustybuzz::{Direction, Face, UnicodeBuffer};
use unicode_bidi::ParagraphBidiInfo;

use crate::export::{ColumnMap, ExportError};
use crate::models::Record;

static FONT_DATA: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");
const FONT_NAME: &str = "DejaVuSans";

// A4 landscape, in points
const PAGE_WIDTH: f64 = 842.0;
const PAGE_HEIGHT: f64 = 595.0;
const MARGIN: f64 = 36.0;
const FONT_SIZE: f64 = 8.0;
const LEADING: f64 = 13.0;
const TITLE_SIZE: f64 = 14.0;
const COLUMN_GAP: f64 = 8.0;
const MAX_COLUMN_WIDTH: f64 = 160.0;
const ELLIPSIS: char = '…';

pub fn render(title: &str, columns: &ColumnMap, records: &[Record]) -> Result<Vec<u8>, ExportError> {
    let mut shaper = Shaper::new(FONT_DATA)?;
    let table = Table::layout(&mut shaper, &columns.labels(), &columns.rows(records));

    let rows_per_page = ((PAGE_HEIGHT - 2.0 * MARGIN - 3.0 * TITLE_SIZE) / LEADING) as usize - 1;
    let chunks: Vec<&[Vec<Shaped>]> = if table.rows.is_empty() {
        vec![&table.rows[..]]
    } else {
        table.rows.chunks(rows_per_page.max(1)).collect()
    };
    let page_count = chunks.len();

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.new_object_id();
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids = Vec::with_capacity(page_count);
    for (index, chunk) in chunks.iter().enumerate() {
        let heading = shaper.shape(&format!("{} ({}/{})", title, index + 1, page_count));
        let operations = page_operations(&shaper, &heading, &table, chunk);
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(Object::from(page_id));
    }

    // every glyph is known once all pages are shaped
    let font = embed_font(&mut doc, &shaper);
    doc.objects.insert(font_id, Object::Dictionary(font));

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![Object::Integer(0), Object::Integer(0), pt(PAGE_WIDTH), pt(PAGE_HEIGHT)],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)?;
    Ok(buffer)
}

fn pt(value: f64) -> Object {
    Object::Real(value as f32)
}

/// A shaped string: glyph ids in visual order and their total advance in font units
#[derive(Debug, Clone, Default)]
struct Shaped {
    text: String,
    glyphs: Vec<u16>,
    advance: i64,
}

/// Shapes text with the embedded face and records every glyph it hands out,
/// with the character it came from
struct Shaper<'a> {
    face: Face<'a>,
    units_per_em: f64,
    used: BTreeMap<u16, char>,
}

impl<'a> Shaper<'a> {
    fn new(data: &'a [u8]) -> Result<Self, ExportError> {
        let face = Face::from_slice(data, 0)
            .ok_or_else(|| ExportError::Font("bundled font could not be parsed".to_string()))?;
        let units_per_em = f64::from(face.units_per_em());
        Ok(Self {
            face,
            units_per_em,
            used: BTreeMap::new(),
        })
    }

    /// Split into bidi runs in visual order and shape each run in its own direction
    fn shape(&mut self, text: &str) -> Shaped {
        let mut shaped = Shaped {
            text: text.to_string(),
            ..Shaped::default()
        };
        if text.is_empty() {
            return shaped;
        }

        let bidi = ParagraphBidiInfo::new(text, None);
        let (levels, runs) = bidi.visual_runs(0..text.len());
        for run in runs {
            let segment = &text[run.clone()];
            let mut buffer = UnicodeBuffer::new();
            buffer.push_str(segment);
            buffer.set_direction(if levels[run.start].is_rtl() {
                Direction::RightToLeft
            } else {
                Direction::LeftToRight
            });
            buffer.guess_segment_properties();

            let output = rustybuzz::shape(&self.face, &[], buffer);
            for info in output.glyph_infos() {
                let glyph = info.glyph_id as u16;
                let source = segment
                    .get(info.cluster as usize..)
                    .and_then(|rest| rest.chars().next())
                    .unwrap_or(' ');
                self.used.entry(glyph).or_insert(source);
                shaped.glyphs.push(glyph);
                shaped.advance += self.advance(glyph);
            }
        }
        shaped
    }

    fn advance(&self, glyph: u16) -> i64 {
        self.face.glyph_hor_advance(GlyphId(glyph)).map(i64::from).unwrap_or(0)
    }

    fn width(&self, shaped: &Shaped, size: f64) -> f64 {
        shaped.advance as f64 * size / self.units_per_em
    }

    /// Font units to the 1/1000 text space PDF font dictionaries use
    fn to_pdf_units(&self, value: i64) -> i64 {
        (value as f64 * 1000.0 / self.units_per_em).round() as i64
    }

    /// Shorten from the logical end until the text fits, marking the cut
    fn refit(&mut self, shaped: Shaped, size: f64, max_width: f64) -> Shaped {
        if self.width(&shaped, size) <= max_width {
            return shaped;
        }

        let mut chars: Vec<char> = shaped.text.chars().collect();
        while chars.pop().is_some() {
            let kept: String = chars.iter().collect();
            let candidate = self.shape(&format!("{}{}", kept.trim_end(), ELLIPSIS));
            if self.width(&candidate, size) <= max_width {
                return candidate;
            }
        }
        self.shape("")
    }
}

/// Shaped cells with their column widths in points
struct Table {
    widths: Vec<f64>,
    header: Vec<Shaped>,
    rows: Vec<Vec<Shaped>>,
}

impl Table {
    fn layout(shaper: &mut Shaper, labels: &[&str], rows: &[Vec<String>]) -> Self {
        let header: Vec<Shaped> = labels.iter().map(|label| shaper.shape(label)).collect();
        let mut body: Vec<Vec<Shaped>> = rows
            .iter()
            .map(|row| row.iter().map(|cell| shaper.shape(cell)).collect())
            .collect();

        let mut widths: Vec<f64> = header
            .iter()
            .enumerate()
            .map(|(i, label)| {
                body.iter()
                    .filter_map(|row| row.get(i))
                    .chain(std::iter::once(label))
                    .map(|cell| shaper.width(cell, FONT_SIZE))
                    .fold(0.0, f64::max)
                    .min(MAX_COLUMN_WIDTH)
            })
            .collect();

        let gaps = COLUMN_GAP * widths.len().saturating_sub(1) as f64;
        let available = PAGE_WIDTH - 2.0 * MARGIN - gaps;
        let total: f64 = widths.iter().sum();
        if total > available {
            let scale = available / total;
            widths.iter_mut().for_each(|w| *w *= scale);
        }

        let header = header
            .into_iter()
            .zip(&widths)
            .map(|(label, width)| shaper.refit(label, FONT_SIZE, *width))
            .collect();
        for row in &mut body {
            for (cell, width) in row.iter_mut().zip(&widths) {
                *cell = shaper.refit(std::mem::take(cell), FONT_SIZE, *width);
            }
        }

        Self {
            widths,
            header,
            rows: body,
        }
    }
}

fn page_operations(shaper: &Shaper, heading: &Shaped, table: &Table, rows: &[Vec<Shaped>]) -> Vec<Operation> {
    let right = PAGE_WIDTH - MARGIN;
    let mut ops = Vec::new();

    let mut y = PAGE_HEIGHT - MARGIN - TITLE_SIZE;
    draw_text(&mut ops, heading, TITLE_SIZE, right - shaper.width(heading, TITLE_SIZE), y);

    y -= 2.0 * TITLE_SIZE;
    draw_row(&mut ops, shaper, &table.header, &table.widths, y);
    let rule = y - 3.0;
    ops.extend([
        Operation::new("w", vec![pt(0.5)]),
        Operation::new("m", vec![pt(MARGIN), pt(rule)]),
        Operation::new("l", vec![pt(right), pt(rule)]),
        Operation::new("S", vec![]),
    ]);

    for row in rows {
        y -= LEADING;
        draw_row(&mut ops, shaper, row, &table.widths, y);
    }
    ops
}

/// First column at the right edge; each cell right-aligned in its column
fn draw_row(ops: &mut Vec<Operation>, shaper: &Shaper, cells: &[Shaped], widths: &[f64], y: f64) {
    let mut right = PAGE_WIDTH - MARGIN;
    for (cell, width) in cells.iter().zip(widths) {
        draw_text(ops, cell, FONT_SIZE, right - shaper.width(cell, FONT_SIZE), y);
        right -= width + COLUMN_GAP;
    }
}

fn draw_text(ops: &mut Vec<Operation>, text: &Shaped, size: f64, x: f64, y: f64) {
    if text.glyphs.is_empty() {
        return;
    }
    let codes: Vec<u8> = text.glyphs.iter().flat_map(|glyph| glyph.to_be_bytes()).collect();

    ops.extend([
        Operation::new(
            "BDC",
            vec![
                "Span".into(),
                Object::Dictionary(dictionary! { "ActualText" => utf16_string(&text.text) }),
            ],
        ),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), pt(size)]),
        Operation::new("Td", vec![pt(x), pt(y)]),
        Operation::new("Tj", vec![Object::String(codes, StringFormat::Hexadecimal)]),
        Operation::new("ET", vec![]),
        Operation::new("EMC", vec![]),
    ]);
}

/// PDF text string: UTF-16BE with a byte order mark
fn utf16_string(text: &str) -> Object {
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend(unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Type0 font over the whole bundled TrueType file, glyph ids used as CIDs
fn embed_font(doc: &mut Document, shaper: &Shaper) -> Dictionary {
    let face = &shaper.face;
    let units = |value: i16| shaper.to_pdf_units(i64::from(value));
    let bbox = face.global_bounding_box();

    let file_id = doc.add_object(Stream::new(
        dictionary! { "Length1" => FONT_DATA.len() as i64 },
        FONT_DATA.to_vec(),
    ));
    let descriptor_id = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => FONT_NAME,
        "Flags" => 32i64,
        "FontBBox" => vec![
            Object::Integer(units(bbox.x_min)),
            Object::Integer(units(bbox.y_min)),
            Object::Integer(units(bbox.x_max)),
            Object::Integer(units(bbox.y_max)),
        ],
        "ItalicAngle" => 0i64,
        "Ascent" => units(face.ascender()),
        "Descent" => units(face.descender()),
        "CapHeight" => units(face.capital_height().unwrap_or_else(|| face.ascender())),
        "StemV" => 80i64,
        "FontFile2" => file_id,
    });

    let widths: Vec<Object> = shaper
        .used
        .keys()
        .flat_map(|&glyph| {
            [
                Object::from(i64::from(glyph)),
                Object::Array(vec![Object::Integer(shaper.to_pdf_units(shaper.advance(glyph)))]),
            ]
        })
        .collect();
    let cid_font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => FONT_NAME,
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => 0i64,
        },
        "FontDescriptor" => descriptor_id,
        "DW" => 1000i64,
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });
    let to_unicode_id = doc.add_object(Stream::new(dictionary! {}, to_unicode_cmap(&shaper.used).into_bytes()));

    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => FONT_NAME,
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::from(cid_font_id)],
        "ToUnicode" => to_unicode_id,
    }
}

fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n\
         <0000> <FFFF>\n\
         endcodespacerange\n",
    );

    let entries: Vec<(&u16, &char)> = used.iter().collect();
    // bfchar blocks hold at most 100 entries
    for block in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", block.len()));
        for (glyph, source) in block {
            let mut units = [0u16; 2];
            let hex: String = source
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| format!("{:04X}", unit))
                .collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", glyph, hex));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}
