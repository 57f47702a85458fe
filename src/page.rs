//! Field extraction from vessel detail pages
//!
//! The source site has changed its layout over time, so most fields are
//! described by an ordered list of label candidates rather than a single
//! selector. A value is read from the cell next to the one holding the
//! label text.

use scraper::{ElementRef, Html, Node};
use tracing::{debug, warn};

use crate::{
    models::{Imo, Mmsi, VesselReport},
    normalize,
};

/// Text shown instead of vessel data when the source has no current track
const UNAVAILABLE_SENTINEL: &str = "not in our database";

/// How a located value is cut before parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// The whole cell
    Whole,
    /// The n-th `/`-separated part
    Part(usize),
    /// The n-th `/`-separated part with its unit stripped
    Quantity(usize),
}

impl Shape {
    fn apply<'a>(&self, value: &'a str) -> Option<&'a str> {
        match *self {
            Shape::Whole => Some(value.trim()),
            Shape::Part(n) => value.split('/').nth(n).map(str::trim),
            Shape::Quantity(n) => value.split('/').nth(n).map(normalize::quantity),
        }
    }
}

/// One place a field may be found
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub label: &'static str,
    /// Which occurrence of the label to read, zero-based
    pub occurrence: usize,
    pub shape: Shape,
}

impl Candidate {
    const fn new(label: &'static str, shape: Shape) -> Self {
        Self {
            label,
            occurrence: 0,
            shape,
        }
    }

    const fn nth(label: &'static str, occurrence: usize, shape: Shape) -> Self {
        Self {
            label,
            occurrence,
            shape,
        }
    }
}

/// Field name and its candidates, tried in order
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: &'static str,
    pub candidates: &'static [Candidate],
}

pub const DATE: FieldRule = FieldRule {
    field: "date",
    candidates: &[Candidate::new("Last report", Shape::Whole)],
};

pub const SHIP_TYPE: FieldRule = FieldRule {
    field: "ship_type",
    candidates: &[
        Candidate::new("AIS Type", Shape::Whole),
        Candidate::new("Ship type", Shape::Whole),
    ],
};

pub const COUNTRY: FieldRule = FieldRule {
    field: "country",
    candidates: &[
        Candidate::nth("Flag", 0, Shape::Whole),
        Candidate::nth("Flag", 1, Shape::Whole),
    ],
};

pub const LATITUDE: FieldRule = FieldRule {
    field: "latitude",
    candidates: &[Candidate::new("Coordinates", Shape::Part(0))],
};

pub const LONGITUDE: FieldRule = FieldRule {
    field: "longitude",
    candidates: &[Candidate::new("Coordinates", Shape::Part(1))],
};

pub const SPEED: FieldRule = FieldRule {
    field: "speed",
    candidates: &[Candidate::new("Course / Speed", Shape::Quantity(1))],
};

pub const IMO: FieldRule = FieldRule {
    field: "imo",
    candidates: &[
        Candidate::new("IMO / MMSI", Shape::Part(0)),
        Candidate::new("IMO number", Shape::Whole),
    ],
};

pub const MMSI: FieldRule = FieldRule {
    field: "mmsi",
    candidates: &[Candidate::new("IMO / MMSI", Shape::Part(1))],
};

pub const BUILT: FieldRule = FieldRule {
    field: "built",
    candidates: &[Candidate::new("Year of Built", Shape::Whole)],
};

pub const LENGTH: FieldRule = FieldRule {
    field: "length",
    candidates: &[
        Candidate::new("Length / Beam", Shape::Part(0)),
        Candidate::new("Length Overall (m)", Shape::Whole),
    ],
};

pub const WIDTH: FieldRule = FieldRule {
    field: "width",
    candidates: &[
        Candidate::new("Length / Beam", Shape::Quantity(1)),
        Candidate::new("Beam (m)", Shape::Whole),
    ],
};

pub const GROSS_TONNAGE: FieldRule = FieldRule {
    field: "gt",
    candidates: &[Candidate::new("Gross Tonnage", Shape::Whole)],
};

/// Result of looking at a vessel page
#[derive(Debug, Clone, PartialEq)]
pub enum PageOutcome {
    /// The source has no current data for this vessel
    Unavailable,
    Report(VesselReport),
}

/// Parsed vessel detail page
pub struct VesselPage {
    document: Html,
}

impl VesselPage {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// Whether the page carries vessel data, i.e. lacks the unavailable sentinel
    pub fn in_database(&self) -> bool {
        !self
            .document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == "p" && e.value().classes().any(|c| c == "col-md-8"))
            .any(|e| e.text().collect::<String>().contains(UNAVAILABLE_SENTINEL))
    }

    /// Extract every field of the page
    pub fn extract(&self, url: &str) -> PageOutcome {
        if !self.in_database() {
            return PageOutcome::Unavailable;
        }

        PageOutcome::Report(VesselReport {
            url: url.to_string(),
            name: self.name(),
            date: self.resolve(&DATE, normalize::parse_timestamp),
            ship_type: self.resolve(&SHIP_TYPE, normalize::parse_text),
            country: self.resolve(&COUNTRY, normalize::parse_text),
            latitude: self.resolve(&LATITUDE, |_, raw| normalize::sign_coordinate(raw)),
            longitude: self.resolve(&LONGITUDE, |_, raw| normalize::sign_coordinate(raw)),
            speed: self.resolve(&SPEED, normalize::parse_float),
            imo: self.resolve(&IMO, identifier::<Imo>),
            mmsi: self.resolve(&MMSI, identifier::<Mmsi>),
            built: self.resolve(&BUILT, normalize::parse_int),
            length: self.resolve(&LENGTH, normalize::parse_float),
            width: self.resolve(&WIDTH, normalize::parse_float),
            gt: self.resolve(&GROSS_TONNAGE, normalize::parse_float),
        })
    }

    /// Vessel name: page title up to the first ` - `
    fn name(&self) -> Option<String> {
        let title = self
            .document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "title")?
            .text()
            .collect::<String>();

        let name = title.split(" - ").next().unwrap_or_default().trim();
        if name.is_empty() {
            warn!("could not find name in title {:?}", title);
            return None;
        }
        Some(name.to_string())
    }

    /// Walk the candidates of `rule` and return the first value `parse` accepts
    pub fn resolve<T>(&self, rule: &FieldRule, parse: impl Fn(&str, &str) -> Option<T>) -> Option<T> {
        let mut located = false;
        for candidate in rule.candidates {
            let Some(value) = self.locate(candidate) else {
                continue;
            };
            located = true;
            match candidate.shape.apply(&value) {
                Some(raw) => {
                    if let Some(parsed) = parse(rule.field, raw) {
                        return Some(parsed);
                    }
                }
                None => warn!("could not extract {} from {:?}", rule.field, value),
            }
        }
        if !located {
            debug!("no label for {} on page", rule.field);
        }
        None
    }

    /// Text of the cell following the given occurrence of a label
    fn locate(&self, candidate: &Candidate) -> Option<String> {
        let cell = self
            .document
            .tree
            .root()
            .descendants()
            .filter(|node| {
                node.value()
                    .as_text()
                    .is_some_and(|text| text.trim() == candidate.label)
            })
            .filter_map(|node| node.parent().and_then(ElementRef::wrap))
            .nth(candidate.occurrence)?;

        let sibling = cell.next_siblings().find(|node| match node.value() {
            Node::Text(text) => !text.trim().is_empty(),
            Node::Element(_) => true,
            _ => false,
        })?;

        if let Some(text) = sibling.value().as_text() {
            return non_blank(text);
        }
        let element = ElementRef::wrap(sibling)?;
        element
            .children()
            .find_map(|child| non_blank(child.value().as_text()?))
            .or_else(|| element.text().find_map(non_blank))
    }
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parse an MMSI or IMO number. Zero means "not available" on the page.
fn identifier<T>(field: &str, raw: &str) -> Option<T>
where
    T: TryFrom<u32>,
{
    let value: u32 = normalize::parse_number(field, raw)?;
    if value == 0 {
        debug!("{} not available", field);
        return None;
    }
    match T::try_from(value) {
        Ok(id) => Some(id),
        Err(_) => {
            warn!("{} out of range: {}", field, value);
            None
        }
    }
}
