//! Admission pipeline: the ordered gate a submission passes before it is
//! persisted.
//!
//! Rules run in a fixed order and the first failure wins. The order is the
//! rule list itself, see [`AdmissionPipeline::rules`].
//!
//! The pipeline holds no per-sender state. The cooldown consults the store
//! for the sender's latest entry, so two concurrent submissions from the same
//! sender may both pass before either is inserted.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use guestbook_types::{GuestbookEntry, Submission};
use thiserror::Error;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::GuestbookConfig;
use crate::hash::entry_id;
use crate::moderation::{ProfanityMatcher, UrlFilter};
use crate::registry::SiteRegistry;
use crate::store::{EntryStore, StoreError};

/// Broad category of a rejection, used to pick the response class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    NotFound,
    RateLimited,
    ValidationFailed,
}

/// A rule refused the submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct Rejection {
    /// Name of the rule that failed
    pub rule: &'static str,
    pub kind: RejectionKind,
    /// Human-readable explanation shown to the poster
    pub reason: String,
}

impl Rejection {
    pub fn new(rule: &'static str, kind: RejectionKind, reason: impl Into<String>) -> Self {
        Self {
            rule,
            kind,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("rejected by {}: {}", .0.rule, .0.reason)]
    Rejected(Rejection),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<Rejection> for AdmissionError {
    fn from(rejection: Rejection) -> Self {
        AdmissionError::Rejected(rejection)
    }
}

/// What a rule may consult besides the submission itself.
pub struct RuleContext<'a> {
    pub site: &'a str,
    pub registry: &'a dyn SiteRegistry,
    pub store: &'a dyn EntryStore,
    pub now: DateTime<Utc>,
}

/// One admission check.
pub trait AdmissionRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(())` lets the submission through to the next rule.
    fn check(&self, submission: &Submission, ctx: &RuleContext<'_>) -> Result<(), AdmissionError>;
}

pub struct SiteExists;

impl AdmissionRule for SiteExists {
    fn name(&self) -> &'static str {
        "site_exists"
    }

    fn check(&self, _submission: &Submission, ctx: &RuleContext<'_>) -> Result<(), AdmissionError> {
        if ctx.registry.exists(ctx.site) {
            Ok(())
        } else {
            Err(Rejection::new(self.name(), RejectionKind::NotFound, SITE_NOT_FOUND).into())
        }
    }
}

/// Reason given when a post targets an unregistered site.
pub const SITE_NOT_FOUND: &str = "the site does not exist";

/// One accepted post per (user agent, origin IP) per window.
pub struct Cooldown {
    window: Duration,
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    fn reason(&self) -> String {
        let minutes = self.window.num_minutes();
        let every = match minutes {
            60 => "one message per hour".to_string(),
            1 => "one message per minute".to_string(),
            n => format!("one message every {n} minutes"),
        };
        format!("In order to prevent abuse, we're only allowing {every}.")
    }
}

impl AdmissionRule for Cooldown {
    fn name(&self) -> &'static str {
        "cooldown"
    }

    fn check(&self, submission: &Submission, ctx: &RuleContext<'_>) -> Result<(), AdmissionError> {
        let Some(latest) = ctx
            .store
            .find_latest_by(&submission.user_agent, &submission.origin_ip)?
        else {
            return Ok(());
        };

        // A latest entry stamped in the future still counts as recent.
        if ctx.now.signed_duration_since(latest.created) < self.window {
            return Err(Rejection::new(self.name(), RejectionKind::RateLimited, self.reason()).into());
        }
        Ok(())
    }
}

pub struct NonEmptyMessage;

impl AdmissionRule for NonEmptyMessage {
    fn name(&self) -> &'static str {
        "non_empty_message"
    }

    fn check(&self, submission: &Submission, _ctx: &RuleContext<'_>) -> Result<(), AdmissionError> {
        if submission.message.trim().is_empty() {
            return Err(validation(self.name(), "Please write a message before posting."));
        }
        Ok(())
    }
}

/// Rejects messages of `max` characters or more.
pub struct MaxLength {
    max: usize,
}

impl MaxLength {
    pub fn new(max: usize) -> Self {
        Self { max }
    }
}

impl AdmissionRule for MaxLength {
    fn name(&self) -> &'static str {
        "max_length"
    }

    fn check(&self, submission: &Submission, _ctx: &RuleContext<'_>) -> Result<(), AdmissionError> {
        if submission.message.chars().count() >= self.max {
            return Err(validation(
                self.name(),
                format!(
                    "Please remain within {} characters in your message.",
                    self.max
                ),
            ));
        }
        Ok(())
    }
}

pub struct NonEmptyNickname;

impl AdmissionRule for NonEmptyNickname {
    fn name(&self) -> &'static str {
        "non_empty_nickname"
    }

    fn check(&self, submission: &Submission, _ctx: &RuleContext<'_>) -> Result<(), AdmissionError> {
        if submission.nickname.trim().is_empty() {
            return Err(validation(self.name(), "Please insert a nickname before posting."));
        }
        Ok(())
    }
}

pub struct ProfanityFilter {
    matcher: Arc<dyn ProfanityMatcher>,
}

impl ProfanityFilter {
    pub fn new(matcher: Arc<dyn ProfanityMatcher>) -> Self {
        Self { matcher }
    }
}

impl AdmissionRule for ProfanityFilter {
    fn name(&self) -> &'static str {
        "profanity"
    }

    fn check(&self, submission: &Submission, _ctx: &RuleContext<'_>) -> Result<(), AdmissionError> {
        if self.matcher.is_profane(&submission.message) {
            return Err(validation(
                self.name(),
                "Please be nice, let's keep the guestbook friendly and clean.",
            ));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct NoLinks {
    filter: UrlFilter,
}

impl AdmissionRule for NoLinks {
    fn name(&self) -> &'static str {
        "no_links"
    }

    fn check(&self, submission: &Submission, _ctx: &RuleContext<'_>) -> Result<(), AdmissionError> {
        if self.filter.contains_url(&submission.message) {
            return Err(validation(self.name(), "URLs are not allowed in the Guestbook."));
        }
        Ok(())
    }
}

fn validation(rule: &'static str, reason: impl Into<String>) -> AdmissionError {
    Rejection::new(rule, RejectionKind::ValidationFailed, reason).into()
}

/// Ordered list of admission rules plus the clock that stamps new entries.
pub struct AdmissionPipeline {
    rules: Vec<Box<dyn AdmissionRule>>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for AdmissionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdmissionPipeline")
            .field("rules", &self.rules())
            .field("clock", &self.clock)
            .finish()
    }
}

impl AdmissionPipeline {
    pub fn new(rules: Vec<Box<dyn AdmissionRule>>, clock: Arc<dyn Clock>) -> Self {
        Self { rules, clock }
    }

    /// The standard rule order: site, cooldown, empty message, length,
    /// empty nickname, profanity, links.
    pub fn standard(
        config: &GuestbookConfig,
        matcher: Arc<dyn ProfanityMatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(
            vec![
                Box::new(SiteExists),
                Box::new(Cooldown::new(config.cooldown())),
                Box::new(NonEmptyMessage),
                Box::new(MaxLength::new(config.max_message_length)),
                Box::new(NonEmptyNickname),
                Box::new(ProfanityFilter::new(matcher)),
                Box::new(NoLinks::default()),
            ],
            clock,
        )
    }

    /// Rule names in evaluation order.
    pub fn rules(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    /// Run every rule and, if all pass, stamp and insert the entry.
    pub fn admit(
        &self,
        site: &str,
        submission: &Submission,
        registry: &dyn SiteRegistry,
        store: &dyn EntryStore,
    ) -> Result<GuestbookEntry, AdmissionError> {
        let now = self.clock.now();
        let ctx = RuleContext {
            site,
            registry,
            store,
            now,
        };
        self.run(submission, &ctx)?;

        let entry = GuestbookEntry {
            id: entry_id(now, &submission.message, &submission.origin_ip),
            created: now,
            message: submission.message.clone(),
            origin_ip: submission.origin_ip.clone(),
            user_agent: submission.user_agent.clone(),
            nickname: submission.nickname.clone(),
        };
        store.insert(&entry)?;

        info!(%site, id = %entry.id, "guestbook entry admitted");
        Ok(entry)
    }

    fn run(&self, submission: &Submission, ctx: &RuleContext<'_>) -> Result<(), AdmissionError> {
        for rule in &self.rules {
            if let Err(err) = rule.check(submission, ctx) {
                if let AdmissionError::Rejected(rejection) = &err {
                    debug!(site = %ctx.site, rule = rejection.rule, "submission rejected");
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::moderation::WordListMatcher;
    use crate::registry::YamlSiteRegistry;
    use crate::store::Partition;
    use guestbook_types::Site;

    struct Fixture {
        _dir: tempfile::TempDir,
        registry: YamlSiteRegistry,
        store: Partition,
        clock: Arc<ManualClock>,
        pipeline: AdmissionPipeline,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let registry = YamlSiteRegistry::new(dir.path().join("sites.yaml"));
        registry.add(Site::new("blog")).unwrap();

        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let mut config = GuestbookConfig::default();
        config.max_message_length = 20;
        let pipeline =
            AdmissionPipeline::standard(&config, Arc::new(WordListMatcher::default()), clock.clone());

        Fixture {
            _dir: dir,
            registry,
            store: Partition::in_memory().unwrap(),
            clock,
            pipeline,
        }
    }

    fn submission(message: &str, nickname: &str) -> Submission {
        Submission {
            message: message.into(),
            origin_ip: "1.2.3.4".into(),
            user_agent: "UA1".into(),
            nickname: nickname.into(),
        }
    }

    fn rejection(result: Result<GuestbookEntry, AdmissionError>) -> Rejection {
        match result {
            Err(AdmissionError::Rejected(rejection)) => rejection,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    impl Fixture {
        fn admit(&self, site: &str, sub: &Submission) -> Result<GuestbookEntry, AdmissionError> {
            self.pipeline.admit(site, sub, &self.registry, &self.store)
        }
    }

    #[test]
    fn test_standard_rule_order() {
        let f = fixture();
        assert_eq!(
            f.pipeline.rules(),
            vec![
                "site_exists",
                "cooldown",
                "non_empty_message",
                "max_length",
                "non_empty_nickname",
                "profanity",
                "no_links",
            ]
        );
    }

    #[test]
    fn test_admits_and_stamps_entry() {
        let f = fixture();
        let entry = f.admit("blog", &submission("hello", "Al")).unwrap();

        assert_eq!(entry.created, f.clock.now());
        assert_eq!(entry.id, entry_id(f.clock.now(), "hello", "1.2.3.4"));
        assert_eq!(f.store.list(0, 10).unwrap(), vec![entry]);
    }

    #[test]
    fn test_unknown_site_rejected_before_anything_else() {
        let f = fixture();
        // Also empty, which would fail a later rule.
        let r = rejection(f.admit("ghost", &submission("", "")));
        assert_eq!(r.kind, RejectionKind::NotFound);
        assert_eq!(r.reason, "the site does not exist");
        assert_eq!(f.store.count().unwrap(), 0);
    }

    #[test]
    fn test_cooldown_precedes_validation() {
        let f = fixture();
        f.admit("blog", &submission("hello", "Al")).unwrap();

        let r = rejection(f.admit("blog", &submission("", "Al")));
        assert_eq!(r.rule, "cooldown");
        assert_eq!(r.kind, RejectionKind::RateLimited);
        assert!(r.reason.contains("one message per hour"));
    }

    #[test]
    fn test_cooldown_elapses() {
        let f = fixture();
        f.admit("blog", &submission("hello", "Al")).unwrap();

        f.clock.advance(Duration::minutes(59));
        assert_eq!(rejection(f.admit("blog", &submission("again", "Al"))).rule, "cooldown");

        f.clock.advance(Duration::minutes(1));
        f.admit("blog", &submission("again", "Al")).unwrap();
        assert_eq!(f.store.count().unwrap(), 2);
    }

    #[test]
    fn test_future_dated_entry_counts_as_recent() {
        let f = fixture();
        let now = f.clock.now();
        let imported = GuestbookEntry {
            id: entry_id(now, "from tomorrow", "1.2.3.4"),
            created: now + Duration::days(1),
            message: "from tomorrow".into(),
            origin_ip: "1.2.3.4".into(),
            user_agent: "UA1".into(),
            nickname: "Al".into(),
        };
        f.store.insert(&imported).unwrap();

        let r = rejection(f.admit("blog", &submission("hello", "Al")));
        assert_eq!(r.rule, "cooldown");
        assert_eq!(r.kind, RejectionKind::RateLimited);
        assert_eq!(f.store.count().unwrap(), 1);
    }

    #[test]
    fn test_cooldown_is_per_sender() {
        let f = fixture();
        f.admit("blog", &submission("hello", "Al")).unwrap();

        let mut other_ip = submission("hi", "Bo");
        other_ip.origin_ip = "5.6.7.8".into();
        f.admit("blog", &other_ip).unwrap();

        let mut other_ua = submission("hey", "Cy");
        other_ua.user_agent = "UA2".into();
        f.admit("blog", &other_ua).unwrap();
    }

    #[test]
    fn test_cooldown_reason_names_window() {
        assert_eq!(
            Cooldown::new(Duration::minutes(5)).reason(),
            "In order to prevent abuse, we're only allowing one message every 5 minutes."
        );
    }

    #[test]
    fn test_empty_message_precedes_length_and_nickname() {
        let f = fixture();
        let r = rejection(f.admit("blog", &submission("   ", "")));
        assert_eq!(r.rule, "non_empty_message");
        assert_eq!(r.reason, "Please write a message before posting.");
    }

    #[test]
    fn test_length_bound_is_exclusive() {
        let f = fixture();
        let r = rejection(f.admit("blog", &submission(&"a".repeat(20), "")));
        assert_eq!(r.rule, "max_length");
        assert_eq!(r.reason, "Please remain within 20 characters in your message.");

        f.admit("blog", &submission(&"a".repeat(19), "Al")).unwrap();
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let f = fixture();
        f.admit("blog", &submission(&"é".repeat(19), "Al")).unwrap();
    }

    #[test]
    fn test_empty_nickname_precedes_profanity() {
        let f = fixture();
        let r = rejection(f.admit("blog", &submission("fuck", "")));
        assert_eq!(r.rule, "non_empty_nickname");
        assert_eq!(r.reason, "Please insert a nickname before posting.");
    }

    #[test]
    fn test_profanity_precedes_links() {
        let f = fixture();
        let r = rejection(f.admit("blog", &submission("shit http://a.com", "Al")));
        assert_eq!(r.rule, "profanity");
        assert_eq!(
            r.reason,
            "Please be nice, let's keep the guestbook friendly and clean."
        );
    }

    #[test]
    fn test_links_rejected() {
        let f = fixture();
        let r = rejection(f.admit("blog", &submission("http://example.com", "Al")));
        assert_eq!(r.rule, "no_links");
        assert_eq!(r.kind, RejectionKind::ValidationFailed);
        assert!(r.reason.contains("URLs are not allowed"));
        assert_eq!(f.store.count().unwrap(), 0);
    }

    #[test]
    fn test_rejected_submission_does_not_start_cooldown() {
        let f = fixture();
        rejection(f.admit("blog", &submission("", "Al")));
        f.admit("blog", &submission("hello", "Al")).unwrap();
    }

    #[test]
    fn test_custom_rule_list() {
        struct AlwaysReject;
        impl AdmissionRule for AlwaysReject {
            fn name(&self) -> &'static str {
                "always"
            }
            fn check(&self, _: &Submission, _: &RuleContext<'_>) -> Result<(), AdmissionError> {
                Err(validation(self.name(), "no"))
            }
        }

        let f = fixture();
        let pipeline = AdmissionPipeline::new(
            vec![Box::new(SiteExists), Box::new(AlwaysReject)],
            f.clock.clone(),
        );
        assert_eq!(pipeline.rules(), vec!["site_exists", "always"]);

        let r = rejection(pipeline.admit("blog", &submission("hello", "Al"), &f.registry, &f.store));
        assert_eq!(r.rule, "always");
    }
}
