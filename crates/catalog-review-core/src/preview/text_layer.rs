use crate::error::ReviewError;
use crate::model::BoundingBox;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::Write;
use std::process::Command;

/// One line of text positioned on a page, in PDF points.
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub line_index: usize,
    pub text: String,
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
    pub highlighted: bool,
}

/// Searchable text over a rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLayer {
    pub page_number: u32,
    pub width: f64,
    pub height: f64,
    pub spans: Vec<TextSpan>,
}

impl TextLayer {
    /// Mark every span containing `term` (case-insensitive) and clear the
    /// rest. Returns the index of the first match.
    pub fn apply_highlight(&mut self, term: &str) -> Option<usize> {
        let needle = term.trim().to_lowercase();
        let mut first = None;
        for (i, span) in self.spans.iter_mut().enumerate() {
            span.highlighted = !needle.is_empty() && span.text.to_lowercase().contains(&needle);
            if span.highlighted && first.is_none() {
                first = Some(i);
            }
        }
        first
    }

    pub fn clear_highlight(&mut self) {
        for span in &mut self.spans {
            span.highlighted = false;
        }
    }

    pub fn highlighted(&self) -> impl Iterator<Item = &TextSpan> {
        self.spans.iter().filter(|s| s.highlighted)
    }

    /// Span position as page fractions.
    pub fn span_bbox(&self, index: usize) -> Option<BoundingBox> {
        let span = self.spans.get(index)?;
        BoundingBox::from_absolute(
            span.x_min,
            span.y_min,
            span.x_max,
            span.y_max,
            self.width,
            self.height,
        )
    }
}

/// Trait for backends producing per-page text layers.
pub trait TextLayerSource: Send + Sync {
    fn text_layers(&self, pdf_bytes: &[u8]) -> Result<Vec<TextLayer>, ReviewError>;

    /// Name of this backend (for diagnostics).
    fn backend_name(&self) -> &str;
}

/// Text layers from `pdftotext -bbox-layout` (poppler-utils).
pub struct PdftotextTextLayers;

impl PdftotextTextLayers {
    pub fn new() -> Self {
        PdftotextTextLayers
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }
}

impl Default for PdftotextTextLayers {
    fn default() -> Self {
        Self::new()
    }
}

impl TextLayerSource for PdftotextTextLayers {
    fn text_layers(&self, pdf_bytes: &[u8]) -> Result<Vec<TextLayer>, ReviewError> {
        let mut tmpfile =
            tempfile::NamedTempFile::new().map_err(|e| ReviewError::Extraction(e.to_string()))?;
        tmpfile
            .write_all(pdf_bytes)
            .map_err(|e| ReviewError::Extraction(e.to_string()))?;

        let output = Command::new("pdftotext")
            .arg("-bbox-layout")
            .arg(tmpfile.path())
            .arg("-")
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ReviewError::PdftotextNotFound
                } else {
                    ReviewError::Extraction(format!("pdftotext -bbox-layout failed: {}", e))
                }
            })?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(ReviewError::PdftotextFailed { code, stderr });
        }

        parse_bbox_layout(&String::from_utf8_lossy(&output.stdout))
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

#[derive(Default)]
struct OpenLine {
    bbox: [f64; 4],
    words: Vec<String>,
}

/// Parse the XHTML written by `pdftotext -bbox-layout`.
fn parse_bbox_layout(xml: &str) -> Result<Vec<TextLayer>, ReviewError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pages: Vec<TextLayer> = Vec::new();
    let mut line: Option<OpenLine> = None;
    let mut in_word = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ReviewError::Extraction(format!("bad bbox layout XML: {e}")))?;
        match event {
            Event::Start(ref tag) | Event::Empty(ref tag) => {
                let self_closing = matches!(event, Event::Empty(_));
                match tag.name().as_ref() {
                    b"page" => pages.push(TextLayer {
                        page_number: pages.len() as u32 + 1,
                        width: attr_f64(tag, b"width")?.unwrap_or(0.0),
                        height: attr_f64(tag, b"height")?.unwrap_or(0.0),
                        spans: Vec::new(),
                    }),
                    b"line" if !self_closing => {
                        line = Some(OpenLine {
                            bbox: tag_bbox(tag)?,
                            words: Vec::new(),
                        })
                    }
                    b"word" => in_word = !self_closing,
                    _ => {}
                }
            }
            Event::Text(text) if in_word => {
                let word = text
                    .unescape()
                    .map_err(|e| ReviewError::Extraction(format!("bad word text: {e}")))?;
                let word = word.trim();
                if let (Some(open), false) = (line.as_mut(), word.is_empty()) {
                    open.words.push(word.to_string());
                }
            }
            Event::End(tag) => match tag.name().as_ref() {
                b"word" => in_word = false,
                b"line" => {
                    if let (Some(open), Some(page)) = (line.take(), pages.last_mut()) {
                        if !open.words.is_empty() {
                            let [x_min, y_min, x_max, y_max] = open.bbox;
                            page.spans.push(TextSpan {
                                line_index: page.spans.len(),
                                text: open.words.join(" "),
                                x_min,
                                y_min,
                                x_max,
                                y_max,
                                highlighted: false,
                            });
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(pages)
}

fn attr_f64(tag: &BytesStart, name: &[u8]) -> Result<Option<f64>, ReviewError> {
    for attr in tag.attributes() {
        let attr = attr.map_err(|e| ReviewError::Extraction(format!("bad attribute: {e}")))?;
        if attr.key.as_ref() == name {
            let value = attr
                .unescape_value()
                .map_err(|e| ReviewError::Extraction(format!("bad attribute value: {e}")))?;
            return Ok(value.trim().parse().ok());
        }
    }
    Ok(None)
}

fn tag_bbox(tag: &BytesStart) -> Result<[f64; 4], ReviewError> {
    Ok([
        attr_f64(tag, b"xMin")?.unwrap_or(0.0),
        attr_f64(tag, b"yMin")?.unwrap_or(0.0),
        attr_f64(tag, b"xMax")?.unwrap_or(0.0),
        attr_f64(tag, b"yMax")?.unwrap_or(0.0),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
<title></title>
<meta name="Producer" content="Acme &amp; Co"/>
</head>
<body>
<doc>
  <page width="612.000000" height="792.000000">
    <flow>
      <block xMin="50" yMin="70" xMax="300" yMax="100">
        <line xMin="61.2" yMin="79.2" xMax="306.0" yMax="158.4">
          <word xMin="61.2" yMin="79.2" xMax="120.0" yMax="158.4">Ball</word>
          <word xMin="122.0" yMin="79.2" xMax="306.0" yMax="158.4">Valve X-100</word>
        </line>
        <line xMin="61.2" yMin="170" xMax="200" yMax="180">
          <word xMin="61.2" yMin="170" xMax="200" yMax="180">DN50 &amp; PN16</word>
        </line>
      </block>
    </flow>
  </page>
  <page width="612.000000" height="792.000000">
  </page>
</doc>
</body>
</html>
"#;

    #[test]
    fn test_parse_bbox_layout_lines() {
        let pages = parse_bbox_layout(LAYOUT).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].page_number, 1);
        assert_eq!(pages[0].width, 612.0);
        assert_eq!(pages[0].spans.len(), 2);
        assert_eq!(pages[0].spans[0].text, "Ball Valve X-100");
        assert_eq!(pages[0].spans[1].text, "DN50 & PN16");
        assert_eq!(pages[0].spans[1].line_index, 1);
        assert!(pages[1].spans.is_empty());
    }

    #[test]
    fn test_highlight_case_insensitive() {
        let mut page = parse_bbox_layout(LAYOUT).unwrap().remove(0);
        assert_eq!(page.apply_highlight("x-100"), Some(0));
        assert_eq!(page.highlighted().count(), 1);

        assert_eq!(page.apply_highlight("  pn16 "), Some(1));
        assert!(!page.spans[0].highlighted);

        assert_eq!(page.apply_highlight(""), None);
        assert_eq!(page.highlighted().count(), 0);
    }

    #[test]
    fn test_span_bbox_fractions() {
        let page = parse_bbox_layout(LAYOUT).unwrap().remove(0);
        let b = page.span_bbox(0).unwrap();
        assert!((b.x - 0.1).abs() < 1e-9);
        assert!((b.height - 0.1).abs() < 1e-9);
        assert!(page.span_bbox(9).is_none());
    }
}
