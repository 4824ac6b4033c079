pub mod billing;
pub mod domain;
pub mod onboarding;
pub mod ports;
pub mod subscription;
pub mod tutorial;

pub use billing::{BillingError, BillingService, ConfirmedPurchase, PlanSelection, SubscriptionView};
pub use domain::{
    AuthSession, AvailablePlan, CreatedOrder, InvoiceRecord, PaymentConfirmation, PaymentOrder,
    PendingOrder, PlanPricing, SubscriptionRecord, SubscriptionStatus, SubscriptionTier, User,
    UserCredentials, UserSettings, ALL_AVAILABLE_PLANS,
};
pub use onboarding::{CompletionNotice, CompletionOutcome, OnboardingService};
pub use ports::{
    CheckoutStore, InvoiceStore, PaymentGateway, PortError, PortResult, SettingsStore,
    SubscriptionStore, UserStore,
};
pub use subscription::{resolve, LimitKind, PlanLimits, PrivilegeList, ResolvedSubscription};
pub use tutorial::{
    EndOutcome, RunState, StepPresentation, StepStatus, TutorialError, TutorialEvent, TutorialKey,
    TutorialSequencer, TutorialStep,
};
