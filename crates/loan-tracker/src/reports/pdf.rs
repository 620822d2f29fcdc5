use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::ReportError;

pub const REPORT_TITLE: &str = "Loan Applications Report";
pub const LINES_PER_PAGE: usize = 45;

// US letter, in points.
const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN_LEFT: i64 = 50;
const TOP: i64 = PAGE_HEIGHT - 50;
const TITLE_GAP: i64 = 30;
const LINE_HEIGHT: i64 = 15;

// WinAnsi code points 0x80..=0x9F; the rest of 0xA0..=0xFF matches Latin-1.
const WIN_ANSI_EXTRAS: [(char, u8); 27] = [
    ('€', 0x80), ('‚', 0x82), ('ƒ', 0x83), ('„', 0x84), ('…', 0x85), ('†', 0x86),
    ('‡', 0x87), ('ˆ', 0x88), ('‰', 0x89), ('Š', 0x8A), ('‹', 0x8B), ('Œ', 0x8C),
    ('Ž', 0x8E), ('‘', 0x91), ('’', 0x92), ('“', 0x93), ('”', 0x94), ('•', 0x95),
    ('–', 0x96), ('—', 0x97), ('˜', 0x98), ('™', 0x99), ('š', 0x9A), ('›', 0x9B),
    ('œ', 0x9C), ('ž', 0x9E), ('Ÿ', 0x9F),
];

/// Encode text for the standard fonts. Characters outside WinAnsi become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match u32::from(c) {
            code @ (0x20..=0x7E | 0xA0..=0xFF) => code as u8,
            _ => WIN_ANSI_EXTRAS
                .iter()
                .find(|(extra, _)| *extra == c)
                .map_or(b'?', |(_, byte)| *byte),
        })
        .collect()
}

fn text_at(font: &str, size: i64, y: i64, text: &str) -> [Operation; 4] {
    [
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), size.into()]),
        Operation::new("Td", vec![MARGIN_LEFT.into(), y.into()]),
        Operation::new(
            "Tj",
            vec![Object::String(win_ansi(text), StringFormat::Literal)],
        ),
    ]
}

fn page_operations(lines: &[String], with_title: bool) -> Vec<Operation> {
    let mut operations = Vec::new();
    let mut y = TOP;

    if with_title {
        operations.extend(text_at("F2", 14, y, REPORT_TITLE));
        operations.push(Operation::new("ET", vec![]));
        y -= TITLE_GAP;
    }

    for line in lines {
        operations.extend(text_at("F1", 10, y, line));
        operations.push(Operation::new("ET", vec![]));
        y -= LINE_HEIGHT;
    }

    operations
}

/// Render report lines onto US-letter pages, [`LINES_PER_PAGE`] per page, with the
/// title heading the first page. An empty report is a single titled page.
pub fn render_pdf(lines: &[String]) -> Result<Vec<u8>, ReportError> {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();

    let regular = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let chunks: Vec<&[String]> = if lines.is_empty() {
        vec![lines]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };

    let mut kids: Vec<ObjectId> = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.into_iter().enumerate() {
        let content = Content {
            operations: page_operations(chunk, index == 0),
        };
        let content_id = document.add_object(Stream::new(dictionary! {}, content.encode()?));
        kids.push(document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        }));
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids.iter().copied().map(Object::from).collect::<Vec<_>>(),
        "Count" => kids.len() as i64,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
    };
    document.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    document.save_to(&mut buffer)?;
    Ok(buffer)
}
