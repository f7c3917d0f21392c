//! ARIA surveillance log parsing.
//!
//! A log holds one XML document per line. Every `record` element below the
//! document root becomes one table row, nested records included. A row is
//! built from the first `track` and the first `flightPlan` found anywhere
//! inside its record:
//!
//! ```text
//! <msg><record>
//!   <track><mrtTime>..</mrtTime><acAddress>..</acAddress><lat>..</lat>
//!          <lon>..</lon><reportedAltitude>..</reportedAltitude></track>
//!   <flightPlan><acid>..</acid><acType>..</acType></flightPlan>
//! </record></msg>
//! ```
//!
//! Absent elements leave the field missing. A line that is not well-formed
//! XML is skipped as a whole.

use std::io::BufRead;

use airprox_core::RawRecord;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::{debug, warn};

use crate::error::IngestError;
use crate::table::parse_timestamp;

#[derive(Debug, Clone)]
pub struct AriaOptions {
    pub primary_partition: String,
    pub secondary_partition: String,
}

impl Default for AriaOptions {
    fn default() -> Self {
        Self {
            primary_partition: "USA".to_string(),
            secondary_partition: "Florida".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AriaParse {
    pub rows: Vec<RawRecord>,
    pub lines_read: usize,
    pub skipped_lines: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    MrtTime,
    AcAddress,
    Lat,
    Lon,
    ReportedAltitude,
    Acid,
    AcType,
}

impl Field {
    fn in_track(name: &[u8]) -> Option<Self> {
        match name {
            b"mrtTime" => Some(Self::MrtTime),
            b"acAddress" => Some(Self::AcAddress),
            b"lat" => Some(Self::Lat),
            b"lon" => Some(Self::Lon),
            b"reportedAltitude" => Some(Self::ReportedAltitude),
            _ => None,
        }
    }

    fn in_flight_plan(name: &[u8]) -> Option<Self> {
        match name {
            b"acid" => Some(Self::Acid),
            b"acType" => Some(Self::AcType),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct RecordBuilder {
    depth: usize,
    track_depth: Option<usize>,
    seen_track: bool,
    plan_depth: Option<usize>,
    seen_plan: bool,
    capture: Option<(Field, usize, String)>,
    mrt_time: Option<String>,
    ac_address: Option<String>,
    lat: Option<String>,
    lon: Option<String>,
    reported_altitude: Option<String>,
    acid: Option<String>,
    ac_type: Option<String>,
}

impl RecordBuilder {
    fn new(depth: usize) -> Self {
        Self {
            depth,
            ..Default::default()
        }
    }

    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::MrtTime => &mut self.mrt_time,
            Field::AcAddress => &mut self.ac_address,
            Field::Lat => &mut self.lat,
            Field::Lon => &mut self.lon,
            Field::ReportedAltitude => &mut self.reported_altitude,
            Field::Acid => &mut self.acid,
            Field::AcType => &mut self.ac_type,
        }
    }

    /// Field that a direct child named `name` at `depth` would fill, if any.
    fn field_for(&mut self, name: &[u8], depth: usize) -> Option<Field> {
        let field = if self.track_depth.map(|d| d + 1) == Some(depth) {
            Field::in_track(name)
        } else if self.plan_depth.map(|d| d + 1) == Some(depth) {
            Field::in_flight_plan(name)
        } else {
            None
        }?;
        // Only the first occurrence counts.
        if self.slot(field).is_some() {
            return None;
        }
        Some(field)
    }

    fn open(&mut self, name: &[u8], depth: usize) {
        if self.capture.is_some() {
            return;
        }
        match name {
            b"track" if !self.seen_track => {
                self.seen_track = true;
                self.track_depth = Some(depth);
            }
            b"flightPlan" if !self.seen_plan => {
                self.seen_plan = true;
                self.plan_depth = Some(depth);
            }
            _ => {
                if let Some(field) = self.field_for(name, depth) {
                    self.capture = Some((field, depth, String::new()));
                }
            }
        }
    }

    fn close(&mut self, depth: usize) {
        if let Some((field, capture_depth, _)) = &self.capture {
            if *capture_depth == depth {
                let field = *field;
                if let Some((_, _, text)) = self.capture.take() {
                    *self.slot(field) = Some(text);
                }
                return;
            }
        }
        if self.track_depth == Some(depth) {
            self.track_depth = None;
        }
        if self.plan_depth == Some(depth) {
            self.plan_depth = None;
        }
    }

    fn text(&mut self, text: &str) {
        if let Some((_, _, buf)) = &mut self.capture {
            buf.push_str(text);
        }
    }

    fn finish(self, options: &AriaOptions) -> RawRecord {
        let number = |value: Option<String>| {
            value.and_then(|v| v.trim().parse::<f64>().ok().filter(|n| n.is_finite()))
        };
        RawRecord {
            primary_partition: options.primary_partition.clone(),
            secondary_partition: options.secondary_partition.clone(),
            timestamp: self.mrt_time.as_deref().and_then(parse_timestamp),
            aircraft_id: non_blank(self.ac_address),
            latitude: number(self.lat),
            longitude: number(self.lon),
            altitude_ft: number(self.reported_altitude),
            flight_id: non_blank(self.acid),
            aircraft_type: non_blank(self.ac_type),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn local_name(e: &BytesStart<'_>) -> Vec<u8> {
    e.local_name().as_ref().to_vec()
}

/// Parse one log line. Blank lines yield no rows.
///
/// Rows follow the document order of their `record` start tags. The
/// document root is never a record, even when it is named `record`.
pub fn parse_aria_line(line: &str, options: &AriaOptions) -> Result<Vec<RawRecord>, IngestError> {
    if line.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = Reader::from_str(line);
    reader.config_mut().trim_text(true);

    // One slot per record, reserved when its start tag is seen.
    let mut rows: Vec<Option<RawRecord>> = Vec::new();
    let mut open: Vec<(usize, RecordBuilder)> = Vec::new();
    let mut depth = 0usize;
    let mut saw_element = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                saw_element = true;
                let name = local_name(&e);
                for (_, builder) in open.iter_mut() {
                    builder.open(&name, depth);
                }
                if name == b"record" && depth > 1 {
                    rows.push(None);
                    open.push((rows.len() - 1, RecordBuilder::new(depth)));
                }
            }
            Event::Empty(e) => {
                saw_element = true;
                let name = local_name(&e);
                for (_, builder) in open.iter_mut() {
                    // Self-closing element: open and close at once.
                    builder.open(&name, depth + 1);
                    builder.close(depth + 1);
                }
                if name == b"record" && depth > 0 {
                    rows.push(Some(RecordBuilder::new(depth + 1).finish(options)));
                }
            }
            Event::End(_) => {
                if open.last().is_some_and(|(_, builder)| builder.depth == depth) {
                    if let Some((slot, done)) = open.pop() {
                        rows[slot] = Some(done.finish(options));
                    }
                }
                for (_, builder) in open.iter_mut() {
                    builder.close(depth);
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) => {
                if !open.is_empty() {
                    let text = t
                        .unescape()
                        .map_err(|e| IngestError::Malformed(e.to_string()))?;
                    for (_, builder) in open.iter_mut() {
                        builder.text(&text);
                    }
                }
            }
            Event::CData(t) => {
                let text = String::from_utf8_lossy(&t);
                for (_, builder) in open.iter_mut() {
                    builder.text(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_element {
        return Err(IngestError::Malformed("no XML element".to_string()));
    }
    if depth != 0 {
        return Err(IngestError::Malformed("unclosed element".to_string()));
    }

    Ok(rows.into_iter().flatten().collect())
}

/// Parse a whole log. Lines that fail to parse are logged and skipped;
/// only read failures abort.
pub fn parse_aria_log<R: BufRead>(reader: R, options: &AriaOptions) -> Result<AriaParse, IngestError> {
    let mut parse = AriaParse::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        parse.lines_read += 1;
        match parse_aria_line(&line, options) {
            Ok(rows) => parse.rows.extend(rows),
            Err(err) => {
                parse.skipped_lines += 1;
                warn!("Skipping invalid XML line {}: {}", idx + 1, err);
            }
        }
    }

    debug!(
        "Parsed {} ARIA line(s) into {} row(s), skipped {}",
        parse.lines_read,
        parse.rows.len(),
        parse.skipped_lines
    );
    Ok(parse)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LINE: &str = "<msg><record><track><mrtTime>2024-05-01T12:00:03.400Z</mrtTime>\
<acAddress>A1B2C3</acAddress><lat>28.42941</lat><lon>-81.30889</lon>\
<reportedAltitude>4000</reportedAltitude></track>\
<flightPlan><acid>JBU101 </acid><acType>A320</acType></flightPlan></record></msg>";

    #[test]
    fn parses_track_and_flight_plan_fields() {
        let rows = parse_aria_line(LINE, &AriaOptions::default()).unwrap();
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.primary_partition, "USA");
        assert_eq!(row.secondary_partition, "Florida");
        assert_eq!(row.aircraft_id.as_deref(), Some("A1B2C3"));
        assert_eq!(row.latitude, Some(28.42941));
        assert_eq!(row.longitude, Some(-81.30889));
        assert_eq!(row.altitude_ft, Some(4000.0));
        assert_eq!(row.flight_id.as_deref(), Some("JBU101"));
        assert_eq!(row.aircraft_type.as_deref(), Some("A320"));
        assert_eq!(row.timestamp.map(|ts| ts.timestamp()), Some(1_714_564_803));
    }

    #[test]
    fn missing_flight_plan_leaves_fields_empty() {
        let line =
            "<msg><record><track><acAddress>D4E5F6</acAddress><lat>28.1</lat></track></record></msg>";
        let rows = parse_aria_line(line, &AriaOptions::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].aircraft_id.as_deref(), Some("D4E5F6"));
        assert!(rows[0].longitude.is_none());
        assert!(rows[0].flight_id.is_none());
        assert!(rows[0].timestamp.is_none());
    }

    #[test]
    fn root_record_element_yields_no_row() {
        let options = AriaOptions::default();
        let line = "<record><track><acAddress>D4E5F6</acAddress></track></record>";
        assert!(parse_aria_line(line, &options).unwrap().is_empty());
        assert!(parse_aria_line("<record/>", &options).unwrap().is_empty());
    }

    #[test]
    fn only_first_track_is_used_and_grandchildren_ignored() {
        let line = "<batch>\
<record><track><acAddress>AAA111</acAddress><extra><lat>1.0</lat></extra></track>\
<track><acAddress>BBB222</acAddress><lat>2.0</lat></track></record>\
<record><track><acAddress>CCC333</acAddress></track><record/></record>\
</batch>";
        let rows = parse_aria_line(line, &AriaOptions::default()).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].aircraft_id.as_deref(), Some("AAA111"));
        assert!(rows[0].latitude.is_none());
        assert_eq!(rows[1].aircraft_id.as_deref(), Some("CCC333"));
        assert!(rows[2].aircraft_id.is_none());
        assert!(rows[2].timestamp.is_none());
    }

    #[test]
    fn nested_records_each_yield_a_row_in_document_order() {
        let line = "<msg><record>\
<track><acAddress>AAA111</acAddress><lat>1.5</lat></track>\
<record><track><acAddress>BBB222</acAddress><lat>2.5</lat></track>\
<flightPlan><acid>INNER1</acid></flightPlan></record>\
</record></msg>";
        let rows = parse_aria_line(line, &AriaOptions::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].aircraft_id.as_deref(), Some("AAA111"));
        assert_eq!(rows[0].latitude, Some(1.5));
        // The first flightPlan below the outer record is the inner one.
        assert_eq!(rows[0].flight_id.as_deref(), Some("INNER1"));
        assert_eq!(rows[1].aircraft_id.as_deref(), Some("BBB222"));
        assert_eq!(rows[1].latitude, Some(2.5));
        assert_eq!(rows[1].flight_id.as_deref(), Some("INNER1"));
    }

    #[test]
    fn outer_record_without_track_takes_nested_track() {
        let line = "<msg><record><record><track><acAddress>CCC333</acAddress></track></record>\
</record></msg>";
        let rows = parse_aria_line(line, &AriaOptions::default()).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows
            .iter()
            .all(|row| row.aircraft_id.as_deref() == Some("CCC333")));
    }

    #[test]
    fn malformed_lines_are_rejected() {
        let options = AriaOptions::default();
        assert!(parse_aria_line("<record><track></record>", &options).is_err());
        assert!(parse_aria_line("<record><track>", &options).is_err());
        assert!(parse_aria_line("plain text", &options).is_err());
        assert!(parse_aria_line("   ", &options).unwrap().is_empty());
    }

    #[test]
    fn log_parse_skips_bad_lines_and_keeps_going() {
        let log = format!("{}\nnot xml at all\n\n{}\n", LINE, LINE.replace("A1B2C3", "D4E5F6"));
        let options = AriaOptions {
            primary_partition: "USA".into(),
            secondary_partition: "Georgia".into(),
        };
        let parse = parse_aria_log(log.as_bytes(), &options).unwrap();
        assert_eq!(parse.lines_read, 4);
        assert_eq!(parse.skipped_lines, 1);
        assert_eq!(parse.rows.len(), 2);
        assert_eq!(parse.rows[1].aircraft_id.as_deref(), Some("D4E5F6"));
        assert_eq!(parse.rows[1].secondary_partition, "Georgia");
    }
}
