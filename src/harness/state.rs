/// Where a [`ProjectFixture`](super::ProjectFixture) is in its lifecycle.
///
/// Transitions only move forward, one step at a time. A rotated fixture is
/// finished; the next test builds a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FixtureState {
    Uninitialized,
    TreeBuilt,
    ConfigLoaded,
    EntitiesSeeded,
    RotatedToBackup,
}

impl FixtureState {
    pub fn successor(self) -> Option<FixtureState> {
        match self {
            FixtureState::Uninitialized => Some(FixtureState::TreeBuilt),
            FixtureState::TreeBuilt => Some(FixtureState::ConfigLoaded),
            FixtureState::ConfigLoaded => Some(FixtureState::EntitiesSeeded),
            FixtureState::EntitiesSeeded => Some(FixtureState::RotatedToBackup),
            FixtureState::RotatedToBackup => None,
        }
    }

    /// Move to `next` if it is the direct successor.
    pub fn advance(self, next: FixtureState) -> Result<FixtureState, super::FixtureError> {
        if self.successor() == Some(next) {
            Ok(next)
        } else {
            Err(super::FixtureError::InvalidTransition { from: self, to: next })
        }
    }

    /// Configuration is loaded and not yet rotated away.
    pub fn is_active(self) -> bool {
        matches!(self, FixtureState::ConfigLoaded | FixtureState::EntitiesSeeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_forward_one_step_at_a_time() {
        let mut s = FixtureState::Uninitialized;
        for next in [
            FixtureState::TreeBuilt,
            FixtureState::ConfigLoaded,
            FixtureState::EntitiesSeeded,
            FixtureState::RotatedToBackup,
        ] {
            s = s.advance(next).unwrap();
        }
        assert_eq!(s, FixtureState::RotatedToBackup);
        assert!(s.successor().is_none());
    }

    #[test]
    fn rejects_skips_and_rollbacks() {
        assert!(FixtureState::Uninitialized.advance(FixtureState::ConfigLoaded).is_err());
        assert!(FixtureState::EntitiesSeeded.advance(FixtureState::TreeBuilt).is_err());
        assert!(FixtureState::RotatedToBackup.advance(FixtureState::RotatedToBackup).is_err());
    }
}
