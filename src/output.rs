// Copyright (c) 2025 Jan Holthuis <jan.holthuis@rub.de>
//
// This Source Code Form is subject to the terms of the Mozilla Public License, v. 2.0. If a copy
// of the MPL was not distributed with this file, You can obtain one at
// http://mozilla.org/MPL/2.0/.
//
// SPDX-License-Identifier: MPL-2.0

//! Plain text and XML rendering.

use std::fmt::Display;
use std::io::{self, Write};

/// Indentation depth of `<query>` elements.
pub const QUERY_DEPTH: usize = 1;
/// Indentation depth of `<albuminfo>` and `<tracklisting>` elements.
pub const SECTION_DEPTH: usize = 2;
/// Indentation depth of album fields and `<track>` elements.
pub const ITEM_DEPTH: usize = 4;
/// Indentation depth of track fields.
pub const TRACK_FIELD_DEPTH: usize = 6;

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One `LABEL:value` fact per line.
    #[default]
    Plain,
    /// A small XML document.
    Xml,
}

/// Escape the characters that are not allowed verbatim in XML text or attribute values.
pub fn escape_xml(data: &str) -> String {
    data.chars().fold(String::with_capacity(data.len()), |mut escaped, c| {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
        escaped
    })
}

/// Render `name="value"` pairs, each preceded by a space.
fn attributes(attrs: &[(&str, &dyn Display)]) -> String {
    attrs
        .iter()
        .map(|(name, value)| format!(" {name}=\"{}\"", escape_xml(&value.to_string())))
        .collect()
}

/// Writes report output in the selected format.
#[derive(Debug)]
pub struct Output<W> {
    /// Sink.
    writer: W,
    /// Format.
    format: OutputFormat,
}

impl<W: Write> Output<W> {
    /// Create a new output writing to `writer`.
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self { writer, format }
    }

    /// Returns `true` in XML mode.
    pub fn is_xml(&self) -> bool {
        self.format == OutputFormat::Xml
    }

    /// Consume the output and return the sink.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Write `depth` tabs.
    fn indent(&mut self, depth: usize) -> io::Result<()> {
        write!(self.writer, "{}", "\t".repeat(depth))
    }

    /// XML prolog and opening `<cdinfo>` tag. Does nothing in plain mode.
    pub fn prolog(&mut self) -> io::Result<()> {
        if self.is_xml() {
            writeln!(self.writer, "<?xml version=\"1.0\" ?>")?;
            writeln!(self.writer, "<cdinfo>")?;
        }
        Ok(())
    }

    /// Closing `</cdinfo>` tag. Does nothing in plain mode.
    pub fn epilogue(&mut self) -> io::Result<()> {
        if self.is_xml() {
            writeln!(self.writer, "</cdinfo>")?;
        }
        self.writer.flush()
    }

    /// Opening tag. Does nothing in plain mode.
    pub fn open(
        &mut self,
        depth: usize,
        tag: &str,
        attrs: &[(&str, &dyn Display)],
    ) -> io::Result<()> {
        if self.is_xml() {
            self.indent(depth)?;
            writeln!(self.writer, "<{tag}{}>", attributes(attrs))?;
        }
        Ok(())
    }

    /// Closing tag. Does nothing in plain mode.
    pub fn close(&mut self, depth: usize, tag: &str) -> io::Result<()> {
        if self.is_xml() {
            self.indent(depth)?;
            writeln!(self.writer, "</{tag}>")?;
        }
        Ok(())
    }

    /// Self-closing tag. Does nothing in plain mode.
    pub fn empty(
        &mut self,
        depth: usize,
        tag: &str,
        attrs: &[(&str, &dyn Display)],
    ) -> io::Result<()> {
        if self.is_xml() {
            self.indent(depth)?;
            writeln!(self.writer, "<{tag}{} />", attributes(attrs))?;
        }
        Ok(())
    }

    /// A single fact: `<tag>value</tag>` in XML mode, `LABEL:value` in plain mode.
    pub fn field(
        &mut self,
        depth: usize,
        tag: &str,
        label: &str,
        value: impl Display,
    ) -> io::Result<()> {
        match self.format {
            OutputFormat::Xml => {
                self.indent(depth)?;
                let value = escape_xml(&value.to_string());
                writeln!(self.writer, "<{tag}>{value}</{tag}>")
            }
            OutputFormat::Plain => writeln!(self.writer, "{label}:{value}"),
        }
    }

    /// A line in plain mode. Does nothing in XML mode.
    pub fn plain(&mut self, line: impl Display) -> io::Result<()> {
        match self.format {
            OutputFormat::Xml => Ok(()),
            OutputFormat::Plain => writeln!(self.writer, "{line}"),
        }
    }

    /// Report an error message as part of the output.
    pub fn error(&mut self, message: impl Display) -> io::Result<()> {
        match self.format {
            OutputFormat::Xml => {
                let message = escape_xml(&message.to_string());
                writeln!(self.writer, "<error msg=\"{message}\" />")
            }
            OutputFormat::Plain => writeln!(self.writer, "{message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(format: OutputFormat, f: impl FnOnce(&mut Output<Vec<u8>>)) -> String {
        let mut output = Output::new(Vec::new(), format);
        f(&mut output);
        String::from_utf8(output.into_inner()).unwrap()
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("Simon & Garfunkel"), "Simon &amp; Garfunkel");
        assert_eq!(
            escape_xml(r#"<"It's">"#),
            "&lt;&quot;It&apos;s&quot;&gt;"
        );
        assert_eq!(escape_xml("Motörhead"), "Motörhead");
    }

    #[test]
    fn test_envelope() {
        let xml = render(OutputFormat::Xml, |output| {
            output.prolog().unwrap();
            output.epilogue().unwrap();
        });
        assert_eq!(xml, "<?xml version=\"1.0\" ?>\n<cdinfo>\n</cdinfo>\n");

        let plain = render(OutputFormat::Plain, |output| {
            output.prolog().unwrap();
            output.epilogue().unwrap();
        });
        assert_eq!(plain, "");
    }

    #[test]
    fn test_xml_elements() {
        let xml = render(OutputFormat::Xml, |output| {
            output
                .open(QUERY_DEPTH, "query", &[("source", &"CDDB"), ("match", &1)])
                .unwrap();
            output.field(ITEM_DEPTH, "title", "TITLE", "A & B").unwrap();
            output.plain("ignored").unwrap();
            output.close(QUERY_DEPTH, "query").unwrap();
            output
                .empty(QUERY_DEPTH, "query", &[("num_matches", &0)])
                .unwrap();
        });
        assert_eq!(
            xml,
            "\t<query source=\"CDDB\" match=\"1\">\n\
             \t\t\t\t<title>A &amp; B</title>\n\
             \t</query>\n\
             \t<query num_matches=\"0\" />\n"
        );
    }

    #[test]
    fn test_plain_elements() {
        let plain = render(OutputFormat::Plain, |output| {
            output.open(QUERY_DEPTH, "query", &[]).unwrap();
            output.field(ITEM_DEPTH, "title", "TITLE", "A & B").unwrap();
            output.plain("1:Intro").unwrap();
            output.close(QUERY_DEPTH, "query").unwrap();
        });
        assert_eq!(plain, "TITLE:A & B\n1:Intro\n");
    }

    #[test]
    fn test_error() {
        let xml = render(OutputFormat::Xml, |output| {
            output.error("connection \"refused\"").unwrap();
        });
        assert_eq!(xml, "<error msg=\"connection &quot;refused&quot;\" />\n");

        let plain = render(OutputFormat::Plain, |output| {
            output.error("connection refused").unwrap();
        });
        assert_eq!(plain, "connection refused\n");
    }
}
