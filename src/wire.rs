//! Headset token decoding.
//!
//! The headset streams one text token per hand per frame:
//! `<absolute|relative>:x,y,z|x,y,z|...`. Components past the third in a group
//! are ignored, as is anything after a second `:`. The resolution button sends
//! `Low` or anything else for high.

use crate::types::{HandKeypoints, ResolutionMode};
use crate::{Result, TeleopError};

/// Coordinate frame the headset used for a hand token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeypointMode {
    Absolute,
    Relative,
}

impl KeypointMode {
    /// Leading flag of the flattened payload: 0 absolute, 1 relative.
    pub fn flag(self) -> f64 {
        match self {
            KeypointMode::Absolute => 0.0,
            KeypointMode::Relative => 1.0,
        }
    }
}

/// One decoded hand token.
#[derive(Debug, Clone, PartialEq)]
pub struct HandToken {
    pub mode: KeypointMode,
    pub keypoints: HandKeypoints,
}

impl HandToken {
    /// `[flag, x0, y0, z0, x1, ...]`, the layout republished downstream.
    pub fn to_flat(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(1 + 3 * self.keypoints.0.len());
        out.push(self.mode.flag());
        for p in &self.keypoints.0 {
            out.extend_from_slice(p);
        }
        out
    }
}

/// Decode a raw hand token. Surrounding whitespace is ignored.
pub fn parse_hand_token(raw: &[u8]) -> Result<HandToken> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| TeleopError::Parse(format!("token is not UTF-8: {}", e)))?
        .trim();

    let mode = if text.starts_with("absolute") {
        KeypointMode::Absolute
    } else {
        KeypointMode::Relative
    };

    // Only the field between the first and second ':' carries keypoints.
    let body = text
        .split(':')
        .nth(1)
        .ok_or_else(|| TeleopError::Parse(format!("missing ':' in {:?}", text)))?;

    let keypoints = body
        .trim()
        .split('|')
        .enumerate()
        .map(|(i, group)| parse_group(i, group))
        .collect::<Result<Vec<_>>>()?;

    Ok(HandToken {
        mode,
        keypoints: HandKeypoints(keypoints),
    })
}

fn parse_group(index: usize, group: &str) -> Result<[f64; 3]> {
    let mut point = [0.0; 3];
    let mut parts = group.split(',');
    for (axis, slot) in point.iter_mut().enumerate() {
        let part = parts.next().ok_or_else(|| {
            TeleopError::Parse(format!("group {} has {} components, need 3", index, axis))
        })?;
        *slot = part.trim().parse().map_err(|_| {
            TeleopError::Parse(format!("group {} component {}: {:?}", index, axis, part))
        })?;
    }
    Ok(point)
}

/// Decode the resolution button token.
pub fn parse_button_token(raw: &[u8]) -> ResolutionMode {
    if raw == b"Low" {
        ResolutionMode::Low
    } else {
        ResolutionMode::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_token() {
        let token = parse_hand_token(b"absolute:0.1,0.2,0.3|1,2,3\n").unwrap();
        assert_eq!(token.mode, KeypointMode::Absolute);
        assert_eq!(token.keypoints.0, vec![[0.1, 0.2, 0.3], [1.0, 2.0, 3.0]]);
        assert_eq!(token.to_flat(), vec![0.0, 0.1, 0.2, 0.3, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_relative_token_drops_extra_components() {
        let token = parse_hand_token(b"relative: 1,2,3,4|5,6,7,8").unwrap();
        assert_eq!(token.mode, KeypointMode::Relative);
        assert_eq!(token.keypoints.0, vec![[1.0, 2.0, 3.0], [5.0, 6.0, 7.0]]);
        assert_eq!(token.to_flat()[0], 1.0);
    }

    #[test]
    fn test_trailing_field_ignored() {
        let token = parse_hand_token(b"absolute:1,2,3|4,5,6:7,8,9").unwrap();
        assert_eq!(token.keypoints.0, vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let token = parse_hand_token(b"relative:1,2,3:").unwrap();
        assert_eq!(token.keypoints.0, vec![[1.0, 2.0, 3.0]]);
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        assert!(matches!(
            parse_hand_token(b"absolute 1,2,3"),
            Err(TeleopError::Parse(_))
        ));
        assert!(parse_hand_token(b"absolute:1,2").is_err());
        assert!(parse_hand_token(b"absolute:1,x,3").is_err());
        assert!(parse_hand_token(b"absolute:").is_err());
        assert!(parse_hand_token(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_button_token() {
        assert_eq!(parse_button_token(b"Low"), ResolutionMode::Low);
        assert_eq!(parse_button_token(b"High"), ResolutionMode::High);
        assert_eq!(parse_button_token(b""), ResolutionMode::High);
    }
}
