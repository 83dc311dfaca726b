//! Simulated premium checkout.
//!
//! No real gateway: every confirmed payment settles successfully after a
//! fixed delay. The profile upgrade itself happens at the session layer
//! once settlement is reported.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::PremiumPlan;
use crate::config::PaymentConfig;

/// Destination account shown for bank transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferAccount {
    pub number: &'static str,
    pub bank: &'static str,
    pub name: &'static str,
}

pub const TRANSFER_ACCOUNT: TransferAccount = TransferAccount {
    number: "1823975746",
    bank: "Access Bank",
    name: "Samuel Asepeoluwa David",
};

/// Dial code shown for USSD payments.
pub const USSD_CODE: &str = "*901*000*1823975746#";

/// Cosmetic selector only; every method settles the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Transfer,
    Ussd,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [Self::Card, Self::Transfer, Self::Ussd];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Card => "Card",
            Self::Transfer => "Transfer",
            Self::Ussd => "USSD",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentState {
    /// Checkout open, method not yet confirmed.
    SelectingMethod,
    /// Settlement delay running.
    Processing(PaymentMethod),
    /// Settled; the account may now be upgraded.
    Succeeded(PaymentMethod),
}

/// One checkout for one plan. Created when the upgrade prompt is accepted,
/// dropped when the checkout closes.
#[derive(Debug)]
pub struct PaymentFlow {
    plan: PremiumPlan,
    state: PaymentState,
    settlement_delay: Duration,
}

impl PaymentFlow {
    pub fn new(plan: PremiumPlan, config: &PaymentConfig) -> Self {
        Self {
            plan,
            state: PaymentState::SelectingMethod,
            settlement_delay: Duration::from_millis(config.settlement_delay_ms),
        }
    }

    pub fn plan(&self) -> &PremiumPlan {
        &self.plan
    }

    pub fn state(&self) -> PaymentState {
        self.state
    }

    /// Confirm a method and wait out the simulated settlement. Always
    /// succeeds; a real gateway would report failures here.
    pub async fn process(&mut self, method: PaymentMethod) {
        info!(method = method.label(), plan = self.plan.name, "processing payment");
        self.state = PaymentState::Processing(method);
        tokio::time::sleep(self.settlement_delay).await;
        self.state = PaymentState::Succeeded(method);
        info!(plan = self.plan.name, "payment settled");
    }

    pub fn settled(&self) -> bool {
        matches!(self.state, PaymentState::Succeeded(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::plan_for_level;
    use crate::profile::EducationLevel;

    fn config() -> PaymentConfig {
        PaymentConfig {
            settlement_delay_ms: 2500,
        }
    }

    #[test]
    fn test_checkout_opens_on_method_selection() {
        let flow = PaymentFlow::new(plan_for_level(EducationLevel::Secondary), &config());
        assert_eq!(flow.state(), PaymentState::SelectingMethod);
        assert!(!flow.settled());
        assert_eq!(flow.plan().name, "Exam Success");
    }

    #[tokio::test(start_paused = true)]
    async fn test_settlement_takes_the_configured_delay() {
        let mut flow = PaymentFlow::new(plan_for_level(EducationLevel::College), &config());

        let before = tokio::time::Instant::now();
        flow.process(PaymentMethod::Transfer).await;
        assert!(before.elapsed() >= Duration::from_millis(2500));
        assert_eq!(flow.state(), PaymentState::Succeeded(PaymentMethod::Transfer));
        assert!(flow.settled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_method_settles() {
        for method in PaymentMethod::ALL {
            let mut flow = PaymentFlow::new(plan_for_level(EducationLevel::Primary), &config());
            flow.process(method).await;
            assert_eq!(flow.state(), PaymentState::Succeeded(method));
        }
    }

    #[test]
    fn test_transfer_account_details() {
        assert_eq!(TRANSFER_ACCOUNT.number, "1823975746");
        assert_eq!(TRANSFER_ACCOUNT.bank, "Access Bank");
        assert!(USSD_CODE.contains(TRANSFER_ACCOUNT.number));
    }
}
