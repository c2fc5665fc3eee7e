//! VOTable 1.1 output for cone search responses.
//!
//! ```xml
//! <?xml version="1.0"?>
//! <VOTABLE version="1.1" xmlns="http://www.ivoa.net/xml/VOTable/v1.1">
//!   <RESOURCE>
//!     <TABLE>
//!       <FIELD name="ra" ucd="POS_EQ_RA_MAIN" unit="deg" datatype="double"/>
//!       ...
//!       <DATA>
//!         <TABLEDATA>
//!           <TR><TD>10.0</TD>...</TR>
//!         </TABLEDATA>
//!       </DATA>
//!     </TABLE>
//!   </RESOURCE>
//! </VOTABLE>
//! ```
//!
//! Errors are reported as a document holding a single
//! `<INFO ID="Error" name="Error" value="..."/>`.

use crate::error::{Error, Result};
use crate::metadata::FieldDescriptor;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

pub const VOTABLE_VERSION: &str = "1.1";
pub const VOTABLE_NAMESPACE: &str = "http://www.ivoa.net/xml/VOTable/v1.1";

/// MIME header line printed by the CGI adapter before the document.
pub const CONTENT_TYPE: &str = "text/xml;content=x-votable";

/// Streaming VOTable writer: [`begin`](Self::begin), any number of
/// [`write_row`](Self::write_row), then [`finish`](Self::finish).
pub struct VoTableWriter<W: Write> {
    writer: Writer<W>,
    rows: usize,
}

impl<W: Write> VoTableWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new_with_indent(inner, b' ', 2),
            rows: 0,
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::Render(e.to_string()))
    }

    fn open_document(&mut self) -> Result<()> {
        self.event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
        let mut root = BytesStart::new("VOTABLE");
        root.push_attribute(("version", VOTABLE_VERSION));
        root.push_attribute(("xmlns", VOTABLE_NAMESPACE));
        self.event(Event::Start(root))
    }

    /// Write everything up to and including the opening `TABLEDATA` tag.
    pub fn begin(&mut self, fields: &[FieldDescriptor]) -> Result<()> {
        self.open_document()?;
        self.event(Event::Start(BytesStart::new("RESOURCE")))?;
        self.event(Event::Start(BytesStart::new("TABLE")))?;
        for field in fields {
            self.event(Event::Empty(field_element(field)))?;
        }
        self.event(Event::Start(BytesStart::new("DATA")))?;
        self.event(Event::Start(BytesStart::new("TABLEDATA")))
    }

    pub fn write_row<S: AsRef<str>>(&mut self, row: &[S]) -> Result<()> {
        self.event(Event::Start(BytesStart::new("TR")))?;
        for cell in row {
            self.event(Event::Start(BytesStart::new("TD")))?;
            self.event(Event::Text(BytesText::new(cell.as_ref())))?;
            self.event(Event::End(BytesEnd::new("TD")))?;
        }
        self.event(Event::End(BytesEnd::new("TR")))?;
        self.rows += 1;
        Ok(())
    }

    /// Close all open elements and hand back the inner writer.
    pub fn finish(mut self) -> Result<W> {
        for tag in ["TABLEDATA", "DATA", "TABLE", "RESOURCE", "VOTABLE"] {
            self.event(Event::End(BytesEnd::new(tag)))?;
        }
        let mut inner = self.writer.into_inner();
        inner.write_all(b"\n")?;
        Ok(inner)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }
}

fn field_element(field: &FieldDescriptor) -> BytesStart<'static> {
    let mut elem = BytesStart::new("FIELD");
    elem.push_attribute(("name", field.name.as_str()));
    if let Some(ucd) = field.ucd {
        elem.push_attribute(("ucd", ucd.as_str()));
    }
    if let Some(unit) = &field.unit {
        elem.push_attribute(("unit", unit.as_str()));
    }
    if let Some(datatype) = field.datatype {
        elem.push_attribute(("datatype", datatype.as_str()));
    }
    if let Some(arraysize) = &field.arraysize {
        elem.push_attribute(("arraysize", arraysize.as_str()));
    }
    elem
}

/// Write a complete table. Stops at the first failing row and returns its
/// error, leaving a truncated document in `out`; render into a buffer when
/// that matters.
pub fn write_votable<W, I>(out: W, fields: &[FieldDescriptor], rows: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = Result<Vec<String>>>,
{
    let mut writer = VoTableWriter::new(out);
    writer.begin(fields)?;
    for row in rows {
        writer.write_row(&row?)?;
    }
    let count = writer.rows();
    writer.finish()?;
    Ok(count)
}

/// Write a VOTable document that only reports `message`.
pub fn write_error<W: Write>(out: W, message: &str) -> Result<()> {
    let mut writer = VoTableWriter::new(out);
    writer.open_document()?;
    let mut info = BytesStart::new("INFO");
    info.push_attribute(("ID", "Error"));
    info.push_attribute(("name", "Error"));
    info.push_attribute(("value", message));
    writer.event(Event::Empty(info))?;
    writer.event(Event::End(BytesEnd::new("VOTABLE")))?;
    writer.writer.into_inner().write_all(b"\n")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Datatype, Ucd};

    fn fields() -> Vec<FieldDescriptor> {
        vec![
            FieldDescriptor::position("ra", Ucd::RaMain),
            FieldDescriptor::position("dec", Ucd::DecMain),
            FieldDescriptor::new("name").with_datatype(Datatype::Char),
        ]
    }

    fn render(rows: Vec<Vec<&str>>) -> String {
        let rows = rows
            .into_iter()
            .map(|r| Ok(r.into_iter().map(String::from).collect()));
        let mut buf = Vec::new();
        write_votable(&mut buf, &fields(), rows).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_document_structure() {
        let xml = render(vec![vec!["10.0", "0.0", "a"], vec!["10.01", "0.0", "b"]]);
        assert!(xml.starts_with("<?xml version=\"1.0\"?>"));
        assert!(xml.contains(
            "<VOTABLE version=\"1.1\" xmlns=\"http://www.ivoa.net/xml/VOTable/v1.1\">"
        ));
        assert!(xml.contains(
            "<FIELD name=\"ra\" ucd=\"POS_EQ_RA_MAIN\" unit=\"deg\" datatype=\"double\"/>"
        ));
        assert!(xml.contains("<FIELD name=\"name\" datatype=\"char\" arraysize=\"*\"/>"));
        assert_eq!(xml.matches("<TR>").count(), 2);
        assert!(xml.contains("<TD>10.01</TD>"));
        assert!(xml.trim_end().ends_with("</VOTABLE>"));
    }

    #[test]
    fn test_cells_are_escaped() {
        let xml = render(vec![vec!["1", "2", "A&B <x>"]]);
        assert!(xml.contains("<TD>A&amp;B &lt;x&gt;</TD>"));
    }

    #[test]
    fn test_empty_table_is_well_formed() {
        let xml = render(vec![]);
        assert!(xml.contains("<TABLEDATA>"));
        assert!(xml.contains("</TABLEDATA>"));
        assert!(!xml.contains("<TR>"));
    }

    #[test]
    fn test_row_error_is_returned() {
        let rows = vec![
            Ok(vec!["1".to_string()]),
            Err(Error::MissingParameter("RA")),
        ];
        let mut buf = Vec::new();
        assert!(matches!(
            write_votable(&mut buf, &fields(), rows),
            Err(Error::MissingParameter("RA"))
        ));
    }

    #[test]
    fn test_error_document() {
        let mut buf = Vec::new();
        write_error(&mut buf, "Missing compulsory parameter RA").unwrap();
        let xml = String::from_utf8(buf).unwrap();
        assert!(xml.contains(
            "<INFO ID=\"Error\" name=\"Error\" value=\"Missing compulsory parameter RA\"/>"
        ));
        assert!(!xml.contains("RESOURCE"));
    }
}
