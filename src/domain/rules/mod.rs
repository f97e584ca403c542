// Domain rules - Ladder validation, stream-set completeness and the output naming contract

use std::collections::HashSet;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Validation rules for a representation ladder
pub struct LadderRules;

impl LadderRules {
    /// Fail if any representation is degenerate or two qualities share an ID
    pub fn validate(ladder: &RepresentationLadder) -> Result<(), ConfigError> {
        if ladder.is_empty() {
            return Err(ConfigError::new("Representation ladder is empty"));
        }

        let mut seen_ids = HashSet::new();
        for entry in ladder.entries() {
            entry.representation.validate().map_err(|e| {
                ConfigError::new(format!("{} representation: {}", entry.quality, e))
            })?;

            if !seen_ids.insert(entry.id.as_str()) {
                return Err(ConfigError::new(format!(
                    "Representation ID '{}' is used by more than one quality",
                    entry.id
                )));
            }
        }

        Ok(())
    }

    /// Whether the IDs are "0".."n-1" in ascending quality order
    pub fn has_positional_ids(ladder: &RepresentationLadder) -> bool {
        ladder
            .entries()
            .enumerate()
            .all(|(index, entry)| entry.id.as_str() == index.to_string())
    }
}

/// Completeness rules for the set of encoded streams handed to packaging
pub struct StreamSetRules;

impl StreamSetRules {
    /// Ladder qualities with no existing stream in `streams`
    pub fn missing_qualities(
        ladder: &RepresentationLadder,
        streams: &[EncodedStream],
    ) -> Vec<Quality> {
        ladder
            .entries()
            .filter(|entry| {
                !streams
                    .iter()
                    .any(|s| s.quality == entry.quality && s.id == entry.id && s.exists())
            })
            .map(|entry| entry.quality)
            .collect()
    }

    /// Streams ordered like the ladder; `None` if any rung has no stream
    pub fn order_by_ladder<'a>(
        ladder: &RepresentationLadder,
        streams: &'a [EncodedStream],
    ) -> Option<Vec<&'a EncodedStream>> {
        ladder
            .entries()
            .map(|entry| streams.iter().find(|s| s.quality == entry.quality))
            .collect()
    }
}

/// Bit-exact output naming shared with players and downstream tooling
pub struct NamingContract;

impl NamingContract {
    pub const MANIFEST_EXTENSION: &'static str = "mpd";
    pub const INIT_SEGMENT_NAME: &'static str = "init.mp4";
    pub const MEDIA_SEGMENT_PREFIX: &'static str = "chunk_";
    pub const MEDIA_SEGMENT_EXTENSION: &'static str = "m4s";
    pub const SEGMENT_NUMBER_WIDTH: usize = 5;
    pub const FIRST_SEGMENT_NUMBER: u32 = 1;

    /// Init segment template handed to the packaging engine
    pub const INIT_SEGMENT_TEMPLATE: &'static str = "$RepresentationID$/init.mp4";
    /// Media segment template handed to the packaging engine
    pub const MEDIA_SEGMENT_TEMPLATE: &'static str = "$RepresentationID$/chunk_$Number%05d$.m4s";

    pub fn manifest_file_name(base_name: &str) -> String {
        format!("{}.{}", base_name, Self::MANIFEST_EXTENSION)
    }

    pub fn media_segment_name(number: u32) -> String {
        format!(
            "{}{:0width$}.{}",
            Self::MEDIA_SEGMENT_PREFIX,
            number,
            Self::MEDIA_SEGMENT_EXTENSION,
            width = Self::SEGMENT_NUMBER_WIDTH
        )
    }

    /// Segment number of a media segment file name, if it follows the contract
    pub fn parse_media_segment_name(file_name: &str) -> Option<u32> {
        let digits = file_name
            .strip_prefix(Self::MEDIA_SEGMENT_PREFIX)?
            .strip_suffix(Self::MEDIA_SEGMENT_EXTENSION)?
            .strip_suffix('.')?;
        if digits.len() < Self::SEGMENT_NUMBER_WIDTH || !digits.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        let number: u32 = digits.parse().ok()?;
        // Wider numbers are only legal once five digits overflow
        if digits.len() > Self::SEGMENT_NUMBER_WIDTH && digits.starts_with('0') {
            return None;
        }
        Some(number)
    }

    /// Expand a segment template the way the packaging engine does
    pub fn expand_template(template: &str, id: &RepresentationId, number: Option<u32>) -> String {
        let expanded = template.replace("$RepresentationID$", id.as_str());
        match number {
            Some(n) => expanded.replace(
                "$Number%05d$",
                &format!("{:0width$}", n, width = Self::SEGMENT_NUMBER_WIDTH),
            ),
            None => expanded,
        }
    }

    /// Number of media segments for a duration cut at a target length
    pub fn expected_segment_count(duration_secs: f64, target_secs: f64) -> usize {
        if duration_secs <= 0.0 || target_secs <= 0.0 {
            return 0;
        }
        (duration_secs / target_secs).ceil() as usize
    }
}
