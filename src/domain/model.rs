use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 13.0;
pub const DEFAULT_EXTENSION_DISTANCE: f64 = 13.0;

/// Sentinel written for dampers that could not be associated with any duct.
pub const UNASSIGNED: &str = "NA";

/// A feature record as delivered by the design-data service, before normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }
}

/// A duct run drawn as a polyline. Extraction guarantees at least two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Duct {
    pub id: String,
    pub points: Vec<Point>,
}

impl Duct {
    pub fn new(id: impl Into<String>, points: Vec<Point>) -> Self {
        Self {
            id: id.into(),
            points,
        }
    }

    pub fn segments(&self) -> impl Iterator<Item = Segment> + '_ {
        self.points
            .windows(2)
            .map(|pair| Segment::new(pair[0], pair[1]))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Damper {
    pub id: String,
    pub location: Point,
    /// Symbol type reported by detection (e.g. `CRD`, `MVD`). Display only.
    pub kind: Option<String>,
    pub confidence: Option<f64>,
}

impl Damper {
    pub fn new(id: impl Into<String>, location: Point) -> Self {
        Self {
            id: id.into(),
            location,
            kind: None,
            confidence: None,
        }
    }
}

/// Where the perpendicular foot of a point lands relative to a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intersection {
    /// Foot lies on the drawn segment.
    Actual,
    /// Foot lies on the tolerance-extended segment only.
    Extended,
    None,
}

impl Intersection {
    /// Ranking used when choosing between candidates; lower wins.
    /// `None` never reaches ranking.
    pub fn priority(self) -> u8 {
        match self {
            Intersection::Actual => 0,
            Intersection::Extended => 1,
            Intersection::None => 2,
        }
    }
}

/// A qualifying (damper, duct) pair. Indices refer to the input slices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub damper_idx: usize,
    pub duct_idx: usize,
    pub distance: f64,
    pub intersection: Intersection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentPolicy {
    /// Each duct is assigned to at most one damper.
    #[default]
    Exclusive,
    /// Any number of dampers may share a duct.
    Shared,
}

impl AssignmentPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentPolicy::Exclusive => "exclusive",
            AssignmentPolicy::Shared => "shared",
        }
    }
}

impl fmt::Display for AssignmentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AssignmentPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exclusive" | "one-to-one" => Ok(AssignmentPolicy::Exclusive),
            "shared" | "many-to-one" => Ok(AssignmentPolicy::Shared),
            other => Err(format!(
                "unknown assignment policy '{}', expected 'exclusive' or 'shared'",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssociationSettings {
    pub distance_threshold: f64,
    pub extension_distance: f64,
    pub policy: AssignmentPolicy,
}

impl Default for AssociationSettings {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            extension_distance: DEFAULT_EXTENSION_DISTANCE,
            policy: AssignmentPolicy::Exclusive,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Assignment {
    Duct(String),
    Unassigned,
}

impl Assignment {
    pub fn duct_id(&self) -> Option<&str> {
        match self {
            Assignment::Duct(id) => Some(id),
            Assignment::Unassigned => None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, Assignment::Duct(_))
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assignment::Duct(id) => f.write_str(id),
            Assignment::Unassigned => f.write_str(UNASSIGNED),
        }
    }
}

impl Serialize for Assignment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Damper id to assignment, ordered by damper id.
pub type Mapping = BTreeMap<String, Assignment>;

/// Dampers and ducts of one worksheet after normalization.
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    pub worksheet_id: String,
    pub ducts: Vec<Duct>,
    pub dampers: Vec<Damper>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssociationReport {
    pub worksheet_id: String,
    pub settings: AssociationSettings,
    pub duct_count: usize,
    pub damper_count: usize,
    pub candidate_count: usize,
    pub unassigned_count: usize,
    pub generated_at: DateTime<Utc>,
    pub mapping: Mapping,
}

/// Page geometry used to map drawing coordinates onto the rendered worksheet image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorksheetMeta {
    pub page_width: f64,
    pub page_height: f64,
    pub fe_width: f64,
    pub fe_height: f64,
}
