use serde::{Serialize, Serializer};

/// Marker written for a `Derived::Degenerate` cell.
pub const DEGENERATE_MARKER: &str = "degenerate";

/// A derived output value.
///
/// The three states never collapse into each other or into zero:
/// - `Computed`: a real value
/// - `Undefined`: not enough history, e.g. the first day-over-day increment
/// - `Degenerate`: the computation itself failed, e.g. a flat normalization
///   range or a trend fit over fewer than two dates
///
/// Serialized as a number, as none (empty CSV field / JSON `null`), and as the
/// string `"degenerate"` respectively.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Derived {
    Computed(f64),
    #[default]
    Undefined,
    Degenerate,
}

impl Derived {
    pub fn value(&self) -> Option<f64> {
        match self {
            Derived::Computed(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, Derived::Computed(_))
    }
}

impl From<Option<f64>> for Derived {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Derived::Undefined, Derived::Computed)
    }
}

impl Serialize for Derived {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Derived::Computed(v) => serializer.serialize_f64(*v),
            Derived::Undefined => serializer.serialize_none(),
            Derived::Degenerate => serializer.serialize_str(DEGENERATE_MARKER),
        }
    }
}
