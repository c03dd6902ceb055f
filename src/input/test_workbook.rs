//! Minimal `.xlsx` writer for reader and batch tests.

use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;

/// One cell of a generated sheet
pub(crate) enum XlsxCell<'a> {
    /// Inline string
    Text(&'a str),
    /// Excel serial day number formatted as a date (numFmt 14)
    Date(u32),
    /// Number without a date format
    Number(f64),
    /// Styled but empty, like formatting left below the data
    Blank,
}

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const PKG_REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

/// Write a workbook whose sheets are given in order as rows of cells
pub(crate) fn write_xlsx(path: &Path, sheets: &[(&str, Vec<Vec<XlsxCell<'_>>>)]) {
    let mut zip = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
    let options = FileOptions::default();

    let mut content_types = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
         <Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>"
    );
    for n in 1..=sheets.len() {
        content_types.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{n}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>"
        ));
    }
    content_types.push_str("</Types>");
    add(&mut zip, options, "[Content_Types].xml", &content_types);

    add(
        &mut zip,
        options,
        "_rels/.rels",
        &format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <Relationships xmlns=\"{PKG_REL_NS}\">\
             <Relationship Id=\"rId1\" Type=\"{REL_NS}/officeDocument\" Target=\"xl/workbook.xml\"/>\
             </Relationships>"
        ),
    );

    let mut workbook = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <workbook xmlns=\"{MAIN_NS}\" xmlns:r=\"{REL_NS}\"><sheets>"
    );
    let mut rels = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <Relationships xmlns=\"{PKG_REL_NS}\">"
    );
    for (i, (name, _)) in sheets.iter().enumerate() {
        let n = i + 1;
        workbook.push_str(&format!(
            "<sheet name=\"{name}\" sheetId=\"{n}\" r:id=\"rId{n}\"/>"
        ));
        rels.push_str(&format!(
            "<Relationship Id=\"rId{n}\" Type=\"{REL_NS}/worksheet\" Target=\"worksheets/sheet{n}.xml\"/>"
        ));
    }
    workbook.push_str("</sheets></workbook>");
    rels.push_str(&format!(
        "<Relationship Id=\"rId{}\" Type=\"{REL_NS}/styles\" Target=\"styles.xml\"/></Relationships>",
        sheets.len() + 1
    ));
    add(&mut zip, options, "xl/workbook.xml", &workbook);
    add(&mut zip, options, "xl/_rels/workbook.xml.rels", &rels);

    // Style 0 is general, style 1 is the built-in short date format
    add(
        &mut zip,
        options,
        "xl/styles.xml",
        &format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
             <styleSheet xmlns=\"{MAIN_NS}\"><cellXfs count=\"2\">\
             <xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/>\
             <xf numFmtId=\"14\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\" applyNumberFormat=\"1\"/>\
             </cellXfs></styleSheet>"
        ),
    );

    for (i, (_, rows)) in sheets.iter().enumerate() {
        add(
            &mut zip,
            options,
            &format!("xl/worksheets/sheet{}.xml", i + 1),
            &sheet_xml(rows),
        );
    }

    zip.finish().unwrap();
}

fn sheet_xml(rows: &[Vec<XlsxCell<'_>>]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <worksheet xmlns=\"{MAIN_NS}\"><sheetData>"
    );
    for (r, cells) in rows.iter().enumerate() {
        let row_num = r + 1;
        xml.push_str(&format!("<row r=\"{row_num}\">"));
        for (c, cell) in cells.iter().enumerate() {
            let reference = format!("{}{row_num}", column_letter(c));
            match cell {
                XlsxCell::Text(text) => xml.push_str(&format!(
                    "<c r=\"{reference}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                    escape(text)
                )),
                XlsxCell::Date(serial) => {
                    xml.push_str(&format!("<c r=\"{reference}\" s=\"1\"><v>{serial}</v></c>"))
                }
                XlsxCell::Number(value) => {
                    xml.push_str(&format!("<c r=\"{reference}\"><v>{value}</v></c>"))
                }
                XlsxCell::Blank => xml.push_str(&format!("<c r=\"{reference}\" s=\"1\"/>")),
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData></worksheet>");
    xml
}

fn column_letter(index: usize) -> char {
    (b'A' + u8::try_from(index).unwrap()) as char
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn add(zip: &mut zip::ZipWriter<std::fs::File>, options: FileOptions, name: &str, content: &str) {
    zip.start_file(name, options).unwrap();
    zip.write_all(content.as_bytes()).unwrap();
}
