use onesat_primitives::{EffectiveStatus, ProgressStage};

/// Stage a single status maps to, without any viewing history.
pub fn progress_stage(status: EffectiveStatus) -> ProgressStage {
    ProgressStage::from(status)
}

/// Four-step progress shown while watching one deposit.
///
/// The stage never moves backwards within a viewing session. `expired` is
/// only accepted before anything past step 0 was shown, and freezes the
/// indicator except for a late `deposited`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressIndicator {
    stage: Option<ProgressStage>,
}

impl ProgressIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&self) -> Option<ProgressStage> {
        self.stage
    }

    /// Feeds a freshly derived status and returns the stage to display.
    pub fn observe(&mut self, status: EffectiveStatus) -> ProgressStage {
        let next = progress_stage(status);

        let stage = match (self.stage, next) {
            (None, next) => next,
            (Some(ProgressStage::Expired), ProgressStage::Success) => ProgressStage::Success,
            (Some(ProgressStage::Expired), _) => ProgressStage::Expired,
            (Some(cur), ProgressStage::Expired) => {
                if cur == ProgressStage::Submitted {
                    ProgressStage::Expired
                } else {
                    cur
                }
            }
            (Some(cur), next) => {
                if next.index() > cur.index() {
                    next
                } else {
                    cur
                }
            }
        };

        self.stage = Some(stage);
        stage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_never_decreases() {
        let mut ind = ProgressIndicator::new();
        assert_eq!(ind.observe(EffectiveStatus::Checking), ProgressStage::Submitted);
        assert_eq!(ind.observe(EffectiveStatus::Redeemed), ProgressStage::Redeemed);
        // stale sources briefly reporting an earlier stage
        assert_eq!(ind.observe(EffectiveStatus::Initiated), ProgressStage::Redeemed);
        assert_eq!(ind.observe(EffectiveStatus::Created), ProgressStage::Redeemed);
        assert_eq!(ind.observe(EffectiveStatus::Deposited), ProgressStage::Success);
        assert_eq!(ind.observe(EffectiveStatus::Created), ProgressStage::Success);
    }

    #[test]
    fn test_expired_only_from_first_step() {
        let mut ind = ProgressIndicator::new();
        ind.observe(EffectiveStatus::Initiated);
        assert_eq!(ind.observe(EffectiveStatus::Expired), ProgressStage::BtcDetected);

        let mut ind = ProgressIndicator::new();
        ind.observe(EffectiveStatus::Created);
        assert_eq!(ind.observe(EffectiveStatus::Expired), ProgressStage::Expired);
    }

    #[test]
    fn test_expired_freezes_except_success() {
        let mut ind = ProgressIndicator::new();
        assert_eq!(ind.observe(EffectiveStatus::Expired), ProgressStage::Expired);
        assert_eq!(ind.observe(EffectiveStatus::Redeemed), ProgressStage::Expired);
        assert_eq!(ind.observe(EffectiveStatus::Deposited), ProgressStage::Success);
    }
}
