//! Rectangle types and the intersection filter.
//!
//! Rectangles are axis-aligned boxes described by an origin corner and a
//! size. Which corner the origin denotes does not matter as long as both
//! axes use the same convention, so the filter only ever compares a "lower"
//! and an "upper" corner per axis.

use serde::de::{self, Deserializer, IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Timestamp layout applied to every matched rectangle.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// An axis-aligned rectangle.
///
/// Width and height are not validated. Negative sizes are processed
/// arithmetically like any other value.
///
/// On the wire the fields use capitalized keys (`X`, `Y`, `Width`,
/// `Height`). Decoding matches keys case-insensitively, ignores unknown
/// keys and leaves missing or `null` fields at zero. A `null` rectangle
/// decodes as all zeros.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rectangle {
    #[serde(rename = "X")]
    pub x: i64,
    #[serde(rename = "Y")]
    pub y: i64,
    #[serde(rename = "Width")]
    pub width: i64,
    #[serde(rename = "Height")]
    pub height: i64,
}

impl Rectangle {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Lower and upper corners as `((x, y), (x + width, y + height))`.
    ///
    /// Computed in `i128` so that extreme coordinates cannot overflow.
    fn corners(&self) -> ((i128, i128), (i128, i128)) {
        let x = i128::from(self.x);
        let y = i128::from(self.y);
        (
            (x, y),
            (x + i128::from(self.width), y + i128::from(self.height)),
        )
    }

    /// Returns `true` if the two rectangles share at least one point.
    ///
    /// Rectangles that only touch along an edge or at a corner intersect.
    ///
    /// ```
    /// use filter_server::Rectangle;
    ///
    /// let a = Rectangle::new(0, 0, 10, 10);
    /// assert!(a.intersects(&Rectangle::new(10, 0, 5, 5)));
    /// assert!(!a.intersects(&Rectangle::new(11, 0, 5, 5)));
    /// ```
    pub fn intersects(&self, other: &Rectangle) -> bool {
        let ((ax0, ay0), (ax1, ay1)) = self.corners();
        let ((bx0, by0), (bx1, by1)) = other.corners();

        let lower_x = ax0.max(bx0);
        let lower_y = ay0.max(by0);
        let upper_x = ax1.min(bx1);
        let upper_y = ay1.min(by1);

        lower_x <= upper_x && lower_y <= upper_y
    }

    /// Attach a capture timestamp to this rectangle.
    pub fn tagged(self, captured_at: impl Into<String>) -> TaggedRectangle {
        TaggedRectangle {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            captured_at: captured_at.into(),
        }
    }
}

/// A rectangle that matched a filter request, stamped with the time of the
/// request that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedRectangle {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
    #[serde(rename = "time")]
    pub captured_at: String,
}

impl TaggedRectangle {
    pub fn rectangle(&self) -> Rectangle {
        Rectangle::new(self.x, self.y, self.width, self.height)
    }
}

/// Decoded body of a submit request.
///
/// Keys (`Main`, `Input`) match case-insensitively. A `null` body, a `null`
/// main rectangle or a `null` candidate list decode to their zero values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRequest {
    /// The reference rectangle every candidate is tested against.
    pub main: Rectangle,
    /// Candidates, in submission order.
    pub input: Vec<Rectangle>,
}

impl<'de> Deserialize<'de> for Rectangle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RectangleVisitor;

        impl<'de> Visitor<'de> for RectangleVisitor {
            type Value = Rectangle;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a rectangle object or null")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Rectangle, E> {
                Ok(Rectangle::default())
            }

            fn visit_none<E: de::Error>(self) -> Result<Rectangle, E> {
                Ok(Rectangle::default())
            }

            fn visit_map<A>(self, mut map: A) -> Result<Rectangle, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut rect = Rectangle::default();
                while let Some(key) = map.next_key::<String>()? {
                    let slot = if key.eq_ignore_ascii_case("x") {
                        &mut rect.x
                    } else if key.eq_ignore_ascii_case("y") {
                        &mut rect.y
                    } else if key.eq_ignore_ascii_case("width") {
                        &mut rect.width
                    } else if key.eq_ignore_ascii_case("height") {
                        &mut rect.height
                    } else {
                        map.next_value::<IgnoredAny>()?;
                        continue;
                    };
                    // null leaves the field untouched
                    if let Some(value) = map.next_value::<Option<i64>>()? {
                        *slot = value;
                    }
                }
                Ok(rect)
            }
        }

        deserializer.deserialize_any(RectangleVisitor)
    }
}

impl<'de> Deserialize<'de> for FilterRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct FilterRequestVisitor;

        impl<'de> Visitor<'de> for FilterRequestVisitor {
            type Value = FilterRequest;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a filter request object or null")
            }

            fn visit_unit<E: de::Error>(self) -> Result<FilterRequest, E> {
                Ok(FilterRequest::default())
            }

            fn visit_none<E: de::Error>(self) -> Result<FilterRequest, E> {
                Ok(FilterRequest::default())
            }

            fn visit_map<A>(self, mut map: A) -> Result<FilterRequest, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut request = FilterRequest::default();
                while let Some(key) = map.next_key::<String>()? {
                    if key.eq_ignore_ascii_case("main") {
                        if let Some(main) = map.next_value::<Option<Rectangle>>()? {
                            request.main = main;
                        }
                    } else if key.eq_ignore_ascii_case("input") {
                        request.input = map
                            .next_value::<Option<Vec<Rectangle>>>()?
                            .unwrap_or_default();
                    } else {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
                Ok(request)
            }
        }

        deserializer.deserialize_any(FilterRequestVisitor)
    }
}

/// Formats the current local time as a batch timestamp.
pub fn batch_timestamp() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Keep every candidate that intersects `reference`, tagging each one with
/// the shared batch `timestamp`.
///
/// Output order follows `candidates`; duplicates are kept.
pub fn filter_intersecting(
    reference: &Rectangle,
    candidates: &[Rectangle],
    timestamp: &str,
) -> Vec<TaggedRectangle> {
    candidates
        .iter()
        .filter(|candidate| {
            let hit = reference.intersects(candidate);
            if hit {
                debug!(?candidate, "candidate intersects reference");
            } else {
                debug!(?candidate, "candidate does not intersect reference");
            }
            hit
        })
        .map(|candidate| candidate.tagged(timestamp))
        .collect()
}
