//! Subscription activation reconciler
//!
//! Drives one checkout attempt:
//! Idle -> Creating -> AwaitingPayment -> Polling -> Resolved(Success | Timeout)
//! with Failed reachable from Creating and from a payment error.
//!
//! The reconciler is the only writer of its state. Collaborators report back
//! through return values, and the current phase is published on a watch
//! channel for whatever renders it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::abort::{AbortFlag, TeardownHandle};
use super::api::{BillingApi, Navigator, PaymentConfirmer};
use super::classifier::{classify_failure, FailurePresentation};
use super::config::{ApiConfig, ReconcilerConfig};
use super::error::{BillingError, Result};
use super::http::HttpBillingApi;
use super::poller::{poll_until_active, PollGuard, PollOutcome};
use super::types::{
    BillingInterval, Destination, PaymentOutcome, ReconciliationAttempt, SubscriptionIntent,
    SubscriptionStatus,
};

/// Explicitly passed collaborators for one checkout view
#[derive(Clone)]
pub struct CheckoutContext {
    pub api: Arc<dyn BillingApi>,
    pub payments: Arc<dyn PaymentConfirmer>,
    pub navigator: Arc<dyn Navigator>,
    pub config: ReconcilerConfig,
}

impl CheckoutContext {
    pub fn new(
        api: Arc<dyn BillingApi>,
        payments: Arc<dyn PaymentConfirmer>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            api,
            payments,
            navigator,
            config: ReconcilerConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Build a context against the HTTP backend configured in the environment
    pub fn from_env(
        payments: Arc<dyn PaymentConfirmer>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        super::config::load_dotenv();
        let api = HttpBillingApi::new(ApiConfig::from_env()?);
        Ok(Self::new(Arc::new(api), payments, navigator).with_config(ReconcilerConfig::from_env()?))
    }
}

/// A failure shown on the checkout page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutFailure {
    pub message: String,
    pub presentation: FailurePresentation,
}

/// Terminal outcome of a checkout
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Success { tier_slug: String },
    /// Activation not observed in time; routed to the pending page
    Timeout { tier_slug: String },
}

/// Current state of the checkout flow
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutPhase {
    #[default]
    Idle,
    Creating {
        tier_slug: String,
        billing_interval: BillingInterval,
    },
    AwaitingPayment {
        intent: SubscriptionIntent,
    },
    Polling {
        tier_slug: String,
        attempt: Option<ReconciliationAttempt>,
    },
    Resolved(Resolution),
    Failed(CheckoutFailure),
}

impl CheckoutPhase {
    /// Activation confirmed; nothing can move the checkout out of here
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved(Resolution::Success { .. }))
    }

    pub fn failure(&self) -> Option<&CheckoutFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// State machine reconciling a subscription purchase with backend activation
pub struct SubscriptionReconciler {
    ctx: CheckoutContext,
    phase: watch::Sender<CheckoutPhase>,
    /// Last tier/interval requested, reused by `retry`
    request: Option<(String, BillingInterval)>,
    intent: Option<SubscriptionIntent>,
    /// Status fetched before intent creation, used to classify failures
    last_status: Option<SubscriptionStatus>,
    lifetime: AbortFlag,
    poll_abort: Option<AbortFlag>,
    active_polls: Arc<AtomicUsize>,
    intents_requested: u32,
}

impl SubscriptionReconciler {
    pub fn new(ctx: CheckoutContext) -> Self {
        let (phase, _rx) = watch::channel(CheckoutPhase::Idle);
        Self {
            ctx,
            phase,
            request: None,
            intent: None,
            last_status: None,
            lifetime: AbortFlag::new(),
            poll_abort: None,
            active_polls: Arc::new(AtomicUsize::new(0)),
            intents_requested: 0,
        }
    }

    /// Receive every phase change
    pub fn subscribe(&self) -> watch::Receiver<CheckoutPhase> {
        self.phase.subscribe()
    }

    pub fn phase(&self) -> CheckoutPhase {
        self.phase.borrow().clone()
    }

    pub fn intent(&self) -> Option<&SubscriptionIntent> {
        self.intent.as_ref()
    }

    /// Handle for the hosting view to call on unmount
    pub fn teardown_handle(&self) -> TeardownHandle {
        TeardownHandle(self.lifetime.clone())
    }

    pub fn teardown(&self) {
        self.lifetime.abort();
    }

    pub fn is_torn_down(&self) -> bool {
        self.lifetime.is_aborted()
    }

    /// Intents with an outstanding client secret awaiting payment (0 or 1)
    pub fn live_intents(&self) -> usize {
        let awaiting = matches!(*self.phase.borrow(), CheckoutPhase::AwaitingPayment { .. });
        usize::from(awaiting && self.intent.as_ref().is_some_and(SubscriptionIntent::is_live))
    }

    /// Poll loops currently running (0 or 1)
    pub fn active_poll_loops(&self) -> usize {
        self.active_polls.load(Ordering::SeqCst)
    }

    /// Number of creation requests issued over this reconciler's lifetime
    pub fn intents_requested(&self) -> u32 {
        self.intents_requested
    }

    /// Run the whole flow: create the intent, collect payment, reconcile
    pub async fn checkout(
        &mut self,
        tier_slug: &str,
        billing_interval: BillingInterval,
    ) -> CheckoutPhase {
        let phase = self.start(tier_slug, billing_interval).await;
        if matches!(phase, CheckoutPhase::AwaitingPayment { .. }) {
            self.collect_payment().await
        } else {
            phase
        }
    }

    /// Check preconditions and request a payable intent
    pub async fn start(
        &mut self,
        tier_slug: &str,
        billing_interval: BillingInterval,
    ) -> CheckoutPhase {
        if self.is_torn_down() {
            return self.phase();
        }

        self.invalidate();
        let tier_slug = tier_slug.trim();

        if tier_slug.is_empty() {
            self.reject_precondition(BillingError::NoTierSelected);
            return self.phase();
        }

        self.request = Some((tier_slug.to_string(), billing_interval));
        self.set_phase(CheckoutPhase::Creating {
            tier_slug: tier_slug.to_string(),
            billing_interval,
        });

        let tiers = match self.ctx.api.get_subscription_tiers().await {
            Ok(tiers) => tiers,
            Err(e) => {
                warn!(error = %e, "Could not load subscription tiers");
                self.fail(tier_slug, &e.user_message());
                return self.phase();
            }
        };
        if self.is_torn_down() {
            return self.phase();
        }
        if !tiers.iter().any(|t| t.slug == tier_slug) {
            self.reject_precondition(BillingError::UnknownTier(tier_slug.to_string()));
            return self.phase();
        }

        match self.ctx.api.get_subscription_status().await {
            Ok(status) => {
                let duplicate = status.is_subscribed_to(tier_slug);
                self.last_status = Some(status);
                if duplicate {
                    info!(tier = tier_slug, "User already subscribed to requested tier");
                    let err = BillingError::AlreadySubscribed {
                        tier_slug: tier_slug.to_string(),
                    };
                    self.fail(tier_slug, &err.to_string());
                    return self.phase();
                }
            }
            Err(e) => {
                warn!(error = %e, "Could not pre-check subscription status, continuing");
                self.last_status = None;
            }
        }
        if self.is_torn_down() {
            return self.phase();
        }

        self.intents_requested += 1;
        debug!(tier = tier_slug, interval = %billing_interval, "Creating subscription intent");
        let response = self
            .ctx
            .api
            .create_subscription(tier_slug, billing_interval)
            .await;
        if self.is_torn_down() {
            return self.phase();
        }

        match response {
            Ok(body) => match body.client_secret.filter(|s| !s.is_empty()) {
                Some(secret) => {
                    let intent = SubscriptionIntent {
                        tier_slug: tier_slug.to_string(),
                        billing_interval,
                        client_secret: Some(secret),
                    };
                    self.intent = Some(intent.clone());
                    self.set_phase(CheckoutPhase::AwaitingPayment { intent });
                }
                None => {
                    warn!(tier = tier_slug, "Subscription created without a client secret");
                    self.fail(tier_slug, &BillingError::InitializationFailure.to_string());
                }
            },
            Err(e) => {
                warn!(tier = tier_slug, error = %e, "Subscription creation failed");
                self.fail(tier_slug, &e.user_message());
            }
        }

        self.phase()
    }

    /// Hand the client secret to the payment form and act on its outcome
    pub async fn collect_payment(&mut self) -> CheckoutPhase {
        let Some(secret) = self.awaiting_intent().and_then(|i| i.client_secret) else {
            warn!("collect_payment called without a payable intent");
            return self.phase();
        };

        let outcome = tokio::select! {
            biased;
            _ = self.lifetime.aborted() => return self.phase(),
            outcome = self.ctx.payments.confirm_payment(&secret) => outcome,
        };

        match outcome {
            PaymentOutcome::Succeeded => self.on_payment_success().await,
            PaymentOutcome::Failed(message) => self.on_payment_error(&message),
        }
    }

    /// Payment form confirmed; poll until the backend activates the subscription
    pub async fn on_payment_success(&mut self) -> CheckoutPhase {
        if self.is_torn_down() {
            return self.phase();
        }
        let Some(tier_slug) = self.awaiting_intent().map(|i| i.tier_slug) else {
            warn!("Payment success reported outside of AwaitingPayment, ignoring");
            return self.phase();
        };

        self.poll_for_activation(tier_slug).await
    }

    /// Payment form failed; never enters polling
    pub fn on_payment_error(&mut self, message: &str) -> CheckoutPhase {
        if self.is_torn_down() {
            return self.phase();
        }
        let Some(tier_slug) = self.awaiting_intent().map(|i| i.tier_slug) else {
            warn!("Payment error reported outside of AwaitingPayment, ignoring");
            return self.phase();
        };

        warn!(tier = %tier_slug, error = message, "Payment failed");
        self.intent = None;
        self.fail(&tier_slug, message);
        self.phase()
    }

    /// Discard the current intent and request a new one for the same tier
    ///
    /// A confirmed activation is final, so retry is a no-op there.
    pub async fn retry(&mut self) -> CheckoutPhase {
        if self.is_torn_down() || self.phase.borrow().is_terminal() {
            return self.phase();
        }
        self.invalidate();
        self.set_phase(CheckoutPhase::Idle);

        match self.request.clone() {
            Some((tier_slug, interval)) => self.start(&tier_slug, interval).await,
            None => self.phase(),
        }
    }

    /// Clear a failure without retrying
    pub fn dismiss(&mut self) {
        if matches!(*self.phase.borrow(), CheckoutPhase::Failed(_)) {
            self.invalidate();
            self.set_phase(CheckoutPhase::Idle);
        }
    }

    /// Leave checkout for billing management (already-subscribed path)
    pub fn manage_billing(&mut self) {
        self.invalidate();
        self.navigate(Destination::BillingSettings);
    }

    /// Leave checkout for plan selection
    pub fn go_back(&mut self) {
        self.invalidate();
        self.navigate(Destination::PlanSelection);
    }

    async fn poll_for_activation(&mut self, tier_slug: String) -> CheckoutPhase {
        let abort = self.lifetime.child();
        if let Some(previous) = self.poll_abort.replace(abort.clone()) {
            previous.abort();
        }
        let _guard = PollGuard::enter(&self.active_polls);

        info!(tier = %tier_slug, "Payment confirmed, waiting for activation");
        self.set_phase(CheckoutPhase::Polling {
            tier_slug: tier_slug.clone(),
            attempt: None,
        });

        let phase = &self.phase;
        let outcome = poll_until_active(self.ctx.api.as_ref(), &self.ctx.config, &abort, |attempt| {
            phase.send_replace(CheckoutPhase::Polling {
                tier_slug: tier_slug.clone(),
                attempt: Some(attempt),
            });
        })
        .await;

        self.poll_abort = None;

        match outcome {
            PollOutcome::Active { .. } => {
                self.intent = None;
                self.set_phase(CheckoutPhase::Resolved(Resolution::Success {
                    tier_slug: tier_slug.clone(),
                }));
                self.navigate(Destination::Success { tier_slug });
            }
            PollOutcome::TimedOut { attempts } => {
                info!(tier = %tier_slug, attempts, "Routing to pending confirmation");
                self.intent = None;
                self.set_phase(CheckoutPhase::Resolved(Resolution::Timeout {
                    tier_slug: tier_slug.clone(),
                }));
                self.navigate(Destination::Pending { tier_slug });
            }
            PollOutcome::Aborted { attempts } => {
                debug!(tier = %tier_slug, attempts, "Activation polling cancelled");
            }
        }

        self.phase()
    }

    fn awaiting_intent(&self) -> Option<SubscriptionIntent> {
        match &*self.phase.borrow() {
            CheckoutPhase::AwaitingPayment { intent } => Some(intent.clone()),
            _ => None,
        }
    }

    /// Drop the current intent and stop any poll loop
    fn invalidate(&mut self) {
        if let Some(abort) = self.poll_abort.take() {
            abort.abort();
        }
        self.intent = None;
    }

    fn reject_precondition(&mut self, err: BillingError) {
        warn!(error = %err, "Checkout precondition failed, returning to plan selection");
        self.request = None;
        self.set_phase(CheckoutPhase::Idle);
        self.navigate(Destination::PlanSelection);
    }

    fn fail(&mut self, tier_slug: &str, message: &str) {
        let presentation = classify_failure(message, self.last_status.as_ref(), tier_slug);
        self.set_phase(CheckoutPhase::Failed(CheckoutFailure {
            message: message.to_string(),
            presentation,
        }));
    }

    fn set_phase(&self, phase: CheckoutPhase) {
        if self.is_torn_down() {
            return;
        }
        self.phase.send_replace(phase);
    }

    fn navigate(&self, destination: Destination) {
        if self.is_torn_down() {
            return;
        }
        info!(path = %destination.path(), "Navigating");
        self.ctx.navigator.navigate(destination);
    }
}

impl Drop for SubscriptionReconciler {
    fn drop(&mut self) {
        self.lifetime.abort();
    }
}
