//! Fixture builders: schema/invoice JSON and a minimal XLSX writer for
//! Excel-invoice scenarios.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

use serde_json::{json, Value};
use zip::write::SimpleFileOptions;

/// Invoice schema covering every section the tests touch. `basic.dataName`
/// is required; the rest is optional.
pub fn standard_schema() -> Value {
    json!({
        "type": "object",
        "required": ["basic"],
        "properties": {
            "datasetId": {"type": "string"},
            "basic": {
                "type": "object",
                "required": ["dataName"],
                "properties": {
                    "dataName": {"type": "string"},
                    "description": {"type": "string"},
                    "experimentId": {"type": "string"},
                    "dateSubmitted": {"type": "string"},
                    "instrumentId": {"type": "string"}
                }
            },
            "custom": {
                "type": "object",
                "properties": {
                    "isPublic": {"type": "boolean"},
                    "cycles": {"type": "integer"},
                    "weight": {"type": "number"},
                    "phase": {"type": "string"}
                }
            },
            "sample": {
                "type": "object",
                "properties": {
                    "sampleId": {"type": "string"},
                    "ownerId": {"type": "string"},
                    "composition": {"type": "string"},
                    "description": {"type": "string"},
                    "referenceUrl": {"type": "string"},
                    "names": {"type": "array", "items": {"type": "string"}},
                    "generalAttributes": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "termId": {"type": "string"},
                                "value": {"type": "string"}
                            }
                        }
                    },
                    "specificAttributes": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "classId": {"type": "string"},
                                "termId": {"type": "string"},
                                "value": {"type": "string"}
                            }
                        }
                    }
                }
            }
        }
    })
}

/// Same schema with an enum constraint on `basic.dataName`, used to make
/// individual tiles fail validation by input file name.
pub fn schema_with_data_name_enum(allowed: &[&str]) -> Value {
    let mut schema = standard_schema();
    schema["properties"]["basic"]["properties"]["dataName"]["enum"] =
        json!(allowed.iter().map(|s| json!(s)).collect::<Vec<_>>());
    schema
}

pub fn base_invoice() -> Value {
    json!({
        "datasetId": "ds-0001",
        "basic": {
            "dataName": "base-series",
            "description": "base description",
            "experimentId": "EXP-9"
        },
        "custom": {"isPublic": true},
        "sample": {
            "sampleId": "s-1",
            "ownerId": "owner-7",
            "names": ["base"]
        }
    })
}

pub fn metadata_def_with_feature() -> Value {
    json!({
        "length": {
            "name": {"ja": "長さ", "en": "Length"},
            "schema": {"type": "number"},
            "unit": "nm",
            "_feature": true
        },
        "operator": {
            "name": {"ja": "測定者", "en": "Operator"},
            "schema": {"type": "string"}
        }
    })
}

/// Writes a minimal XLSX workbook (inline strings only) that `calamine`
/// can read back. Empty cells are omitted from the sheet XML.
pub fn write_xlsx(path: &Path, sheets: &[(&str, Vec<Vec<&str>>)]) {
    let file = std::fs::File::create(path).expect("create xlsx");
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    let mut content_types = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    for index in 1..=sheets.len() {
        content_types.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{index}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
    }
    content_types.push_str("</Types>");

    let mut workbook = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
    );
    let mut workbook_rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for (index, (name, _)) in sheets.iter().enumerate() {
        let id = index + 1;
        workbook.push_str(&format!(
            r#"<sheet name="{}" sheetId="{id}" r:id="rId{id}"/>"#,
            escape_xml(name)
        ));
        workbook_rels.push_str(&format!(
            r#"<Relationship Id="rId{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{id}.xml"/>"#
        ));
    }
    workbook.push_str("</sheets></workbook>");
    workbook_rels.push_str("</Relationships>");

    let root_rels = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

    let mut put = |name: &str, content: &str| {
        writer.start_file(name, options).expect("zip entry");
        writer.write_all(content.as_bytes()).expect("zip write");
    };

    put("[Content_Types].xml", &content_types);
    put("_rels/.rels", root_rels);
    put("xl/workbook.xml", &workbook);
    put("xl/_rels/workbook.xml.rels", &workbook_rels);

    for (index, (_, grid)) in sheets.iter().enumerate() {
        let mut sheet = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );
        for (row_index, row) in grid.iter().enumerate() {
            let r = row_index + 1;
            sheet.push_str(&format!(r#"<row r="{r}">"#));
            for (col_index, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                sheet.push_str(&format!(
                    r#"<c r="{}{r}" t="inlineStr"><is><t>{}</t></is></c>"#,
                    column_letter(col_index),
                    escape_xml(cell)
                ));
            }
            sheet.push_str("</row>");
        }
        sheet.push_str("</sheetData></worksheet>");
        put(&format!("xl/worksheets/sheet{}.xml", index + 1), &sheet);
    }

    writer.finish().expect("finish xlsx");
}

fn column_letter(mut index: usize) -> String {
    let mut letters = String::new();
    loop {
        letters.insert(0, (b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
