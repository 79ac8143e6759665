//! Gesture type and phase definitions.

use thiserror::Error;

/// Axis a drag is locked to for the lifetime of one gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// Kind of dock swipe the gesture recognizer is asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureType {
    /// Switch between spaces / full-screen apps.
    Horizontal,
    /// Mission Control / App Exposé.
    Vertical,
    /// Launchpad / show desktop.
    Pinch,
}

impl GestureType {
    #[must_use]
    pub fn raw(self) -> u32 {
        match self {
            Self::Horizontal => 1,
            Self::Vertical => 2,
            Self::Pinch => 3,
        }
    }

    #[must_use]
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(Self::Horizontal),
            2 => Some(Self::Vertical),
            3 => Some(Self::Pinch),
            _ => None,
        }
    }
}

impl From<Axis> for GestureType {
    fn from(axis: Axis) -> Self {
        match axis {
            Axis::Horizontal => Self::Horizontal,
            Axis::Vertical => Self::Vertical,
        }
    }
}

/// Lifecycle stage of a continuous gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GesturePhase {
    None,
    Began,
    Changed,
    Ended,
    Cancelled,
    MayBegin,
}

impl GesturePhase {
    #[must_use]
    pub fn raw(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Began => 1,
            Self::Changed => 2,
            Self::Ended => 4,
            Self::Cancelled => 8,
            Self::MayBegin => 128,
        }
    }

    /// Whether this phase closes a gesture.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Cancelled)
    }
}

impl std::fmt::Display for GesturePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::Began => write!(f, "began"),
            Self::Changed => write!(f, "changed"),
            Self::Ended => write!(f, "ended"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::MayBegin => write!(f, "may-begin"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown gesture phase {0}")]
pub struct UnknownPhase(pub u8);

impl TryFrom<u8> for GesturePhase {
    type Error = UnknownPhase;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::None),
            1 => Ok(Self::Began),
            2 => Ok(Self::Changed),
            4 => Ok(Self::Ended),
            8 => Ok(Self::Cancelled),
            128 => Ok(Self::MayBegin),
            other => Err(UnknownPhase(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_raw_values() {
        assert_eq!(GesturePhase::Began.raw(), 1);
        assert_eq!(GesturePhase::Cancelled.raw(), 8);
        assert_eq!(GesturePhase::try_from(4), Ok(GesturePhase::Ended));
        assert_eq!(GesturePhase::try_from(3), Err(UnknownPhase(3)));
    }

    #[test]
    fn terminal_phases() {
        assert!(GesturePhase::Ended.is_terminal());
        assert!(GesturePhase::Cancelled.is_terminal());
        assert!(!GesturePhase::Changed.is_terminal());
    }

    #[test]
    fn axis_selects_gesture_type() {
        assert_eq!(GestureType::from(Axis::Horizontal).raw(), 1);
        assert_eq!(GestureType::from(Axis::Vertical).raw(), 2);
        assert_eq!(GestureType::from_raw(3), Some(GestureType::Pinch));
        assert_eq!(GestureType::from_raw(0), None);
    }
}
