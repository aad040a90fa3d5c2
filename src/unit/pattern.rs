use serde::{Deserialize, Serialize};

use crate::{LoaderError, Result};

/// Largest number of frames a pattern may expand to
pub const MAX_PATTERN_FRAMES: usize = 10_000;

const MAX_PAD_WIDTH: usize = 32;

/// Frame names generated from a printf-style template and index ranges.
///
/// The template holds exactly one integer placeholder, `%d` or a zero-padded
/// `%0Nd`; `%%` is a literal percent sign. Ranges are inclusive and are
/// expanded in the order they were added, so `walk_%d.png` over `1..=3` then
/// `2..=1` is rejected while `1..=3` then `1..=2` yields five frames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FramePattern {
    template: String,
    ranges: Vec<(i32, i32)>,
}

#[derive(Debug)]
struct Template {
    prefix: String,
    width: usize,
    suffix: String,
}

impl FramePattern {
    /// Pattern over a single inclusive range
    pub fn new(template: impl Into<String>, start: i32, end: i32) -> Self {
        Self {
            template: template.into(),
            ranges: vec![(start, end)],
        }
    }

    /// Append a second inclusive range, played after the first
    pub fn then(mut self, start: i32, end: i32) -> Self {
        self.ranges.push((start, end));
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn ranges(&self) -> &[(i32, i32)] {
        &self.ranges
    }

    /// Number of frames the pattern expands to, ignoring invalid ranges
    pub fn len(&self) -> usize {
        self.ranges
            .iter()
            .filter(|(start, end)| start <= end)
            .map(|(start, end)| (i64::from(*end) - i64::from(*start) + 1) as usize)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check the template and ranges without expanding them
    pub fn validate(&self) -> Result<()> {
        self.parse_template()?;
        if self.ranges.is_empty() {
            return Err(LoaderError::Configuration(format!(
                "Frame pattern '{}' has no index range",
                self.template
            )));
        }
        for &(start, end) in &self.ranges {
            if start > end {
                return Err(LoaderError::Configuration(format!(
                    "Frame pattern '{}' has an empty range {}..={}",
                    self.template, start, end
                )));
            }
        }
        if self.len() > MAX_PATTERN_FRAMES {
            return Err(LoaderError::Configuration(format!(
                "Frame pattern '{}' expands to {} frames, limit is {}",
                self.template,
                self.len(),
                MAX_PATTERN_FRAMES
            )));
        }
        Ok(())
    }

    /// Expand the pattern into frame names
    pub fn frame_names(&self) -> Result<Vec<String>> {
        self.validate()?;
        let template = self.parse_template()?;

        let mut names = Vec::with_capacity(self.len());
        for &(start, end) in &self.ranges {
            for index in start..=end {
                names.push(format!(
                    "{}{:0width$}{}",
                    template.prefix,
                    index,
                    template.suffix,
                    width = template.width
                ));
            }
        }
        Ok(names)
    }

    fn parse_template(&self) -> Result<Template> {
        let bad = |reason: &str| {
            LoaderError::Configuration(format!(
                "Invalid frame pattern '{}': {}",
                self.template, reason
            ))
        };

        let mut prefix = String::new();
        let mut rest = self.template.as_str();
        loop {
            let Some(pos) = rest.find('%') else {
                return Err(bad("no integer placeholder"));
            };
            prefix.push_str(&rest[..pos]);
            rest = &rest[pos + 1..];

            if let Some(after) = rest.strip_prefix('%') {
                prefix.push('%');
                rest = after;
                continue;
            }

            let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
            let (spec, after) = rest.split_at(digits);
            let Some(suffix) = after.strip_prefix('d') else {
                return Err(bad("placeholder must be %d or %0Nd"));
            };

            let width = match spec {
                "" => 0,
                s if s.starts_with('0') => match &s[1..] {
                    "" => 0,
                    width => width
                        .parse::<usize>()
                        .ok()
                        .filter(|width| *width <= MAX_PAD_WIDTH)
                        .ok_or_else(|| bad("width too large"))?,
                },
                _ => return Err(bad("width must be zero-padded, e.g. %03d")),
            };

            if suffix.replace("%%", "").contains('%') {
                return Err(bad("more than one placeholder"));
            }

            return Ok(Template {
                prefix,
                width,
                suffix: suffix.replace("%%", "%"),
            });
        }
    }
}
